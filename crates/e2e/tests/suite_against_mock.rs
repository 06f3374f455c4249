//! The css-adapt suite end to end against the in-memory page

#![allow(clippy::expect_used, clippy::unwrap_used)]

use async_trait::async_trait;
use css_adapt_e2e::prelude::*;
use css_adapt_e2e::{Outcome, CURRENT_WIDTH, TARGET_WIDTH};
use std::sync::Arc;
use std::time::Duration;

fn config() -> HarnessConfig {
    HarnessConfig::default()
        .with_base_url("https://css-adapt.test/")
        .with_fixtures_dir(concat!(env!("CARGO_MANIFEST_DIR"), "/fixtures"))
}

async fn context(app: Arc<MockApp>) -> ScenarioContext {
    ScenarioContext::start(app, config(), Arc::new(SyntaxValidator::new()))
        .await
        .expect("context should start")
}

fn failure(report: &SuiteReport, scenario: &str) -> (Option<String>, String) {
    let (_, failed) = report
        .failures()
        .into_iter()
        .find(|(_, s)| s.name == scenario)
        .expect("scenario should have failed");
    match &failed.outcome {
        Outcome::Failed { step, kind, .. } => (step.clone(), kind.clone()),
        Outcome::Passed => unreachable!(),
    }
}

// ============================================================================
// Full suite
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_full_suite_passes() {
    let app = Arc::new(MockApp::new());
    let ctx = context(app.clone()).await;
    let report = SuiteRunner::new().run(&css_adapt_suite(), &ctx).await;

    assert!(report.all_passed(), "failures: {:?}", report.failures());
    assert_eq!(report.total(), 11);
    assert_eq!(report.groups.len(), 4);
    assert!(report.groups.iter().all(|g| g.cleanup_error.is_none()));
    assert!(app.was_called("clear_local_storage"));
    assert_eq!(ctx.session().network().rule_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_group_filter_runs_only_validation() {
    let app = Arc::new(MockApp::new());
    let ctx = context(app.clone()).await;
    let report = SuiteRunner::new()
        .with_group_filter("validation")
        .run(&css_adapt_suite(), &ctx)
        .await;

    assert!(report.all_passed());
    assert_eq!(report.total(), 5);
    // No conversion request leaves the page when validation fails
    assert!(ctx.session().network().unmatched_requests().is_empty());
    assert!(ctx.session().network().exchanges().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_report_round_trips_through_json() {
    let ctx = context(Arc::new(MockApp::new())).await;
    let report = SuiteRunner::new()
        .with_group_filter("theme")
        .run(&css_adapt_suite(), &ctx)
        .await;
    let json = serde_json::to_string(&report).unwrap();
    let back: SuiteReport = serde_json::from_str(&json).unwrap();
    assert_eq!(back, report);
}

// ============================================================================
// Failure classification
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_denied_clipboard_is_a_setup_failure() {
    let app = Arc::new(MockApp::new().with_clipboard_permission(false));
    let ctx = context(app).await;
    let report = SuiteRunner::new()
        .with_group_filter("clipboard")
        .run(&css_adapt_suite(), &ctx)
        .await;

    assert_eq!(report.failed_count(), 1);
    let (step, kind) = failure(&report, "copy the converted css to the clipboard");
    assert_eq!(step.as_deref(), Some("check the clipboard holds the api response"));
    assert_eq!(kind, "clipboard-setup");
}

/// Waits for a conversion that is never triggered
struct NeverSubmits;

#[async_trait]
impl Scenario for NeverSubmits {
    fn name(&self) -> &str {
        "never submits"
    }

    async fn run(&self, ctx: &ScenarioContext) -> HarnessResult<()> {
        ctx.step("visit the application");
        ctx.form().visit().await?;
        ctx.session().intercept(
            InterceptionRule::new(HttpMethod::Post, ADAPT_CSS_PATH, MockResponse::text("a{}"))
                .alias("neverSent"),
        );
        ctx.step("wait for @neverSent");
        ctx.session().wait_for("neverSent").await?;
        Ok(())
    }
}

#[tokio::test(start_paused = true)]
async fn test_interception_timeout_is_distinct_from_assertion() {
    let ctx = context(Arc::new(MockApp::new())).await;
    let suite = Suite::new("timeouts").with_group(ScenarioGroup::new("g").with(NeverSubmits));
    let report = SuiteRunner::new().run(&suite, &ctx).await;

    let (step, kind) = failure(&report, "never submits");
    assert_eq!(step.as_deref(), Some("wait for @neverSent"));
    assert_eq!(kind, "interception");
    let took = report.groups[0].scenarios[0].duration_ms;
    assert!((5000..6000).contains(&took), "took {took}ms");
}

// ============================================================================
// Interception lifecycle
// ============================================================================

/// Installs a route and leaves it for whoever comes next
struct InstallsRoute;

#[async_trait]
impl Scenario for InstallsRoute {
    fn name(&self) -> &str {
        "installs a route"
    }

    async fn run(&self, ctx: &ScenarioContext) -> HarnessResult<()> {
        ctx.session().intercept(
            InterceptionRule::new(HttpMethod::Post, ADAPT_CSS_PATH, MockResponse::text("a{}"))
                .persistent(),
        );
        Ok(())
    }
}

/// Submits a valid form without installing a route
struct SubmitsUnrouted;

#[async_trait]
impl Scenario for SubmitsUnrouted {
    fn name(&self) -> &str {
        "submits without a route"
    }

    async fn run(&self, ctx: &ScenarioContext) -> HarnessResult<()> {
        let samples = ctx.fixtures().css_samples()?;
        ctx.step("visit the application");
        ctx.form().visit().await?;
        ctx.form().enter_css_code(&samples.css_valid).await?;
        ctx.form().enter_current_width(CURRENT_WIDTH).await?;
        ctx.form().enter_target_width(TARGET_WIDTH).await?;
        ctx.step("submit the form");
        ctx.form().submit().await?;
        ctx.step("check no success toast");
        ctx.toasts()
            .should_have(toast_roles::TOAST_SUCCESS, Matcher::NotExist)
            .await
    }
}

#[tokio::test(start_paused = true)]
async fn test_routes_do_not_leak_between_groups() {
    let ctx = context(Arc::new(MockApp::new())).await;
    let suite = Suite::new("leaks")
        .with_group(ScenarioGroup::new("first").with(InstallsRoute))
        .with_group(ScenarioGroup::new("second").with(SubmitsUnrouted));
    let report = SuiteRunner::new().run(&suite, &ctx).await;

    assert!(report.all_passed(), "failures: {:?}", report.failures());
    // The submission in the second group found no rule
    assert!(ctx.session().network().exchanges().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_delayed_response_is_awaited_by_assertions() {
    let app = Arc::new(MockApp::new());
    let ctx = context(app.clone()).await;
    let samples = ctx.fixtures().css_samples().unwrap();
    let responses = ctx.fixtures().api_responses().unwrap();

    ctx.form().visit().await.unwrap();
    ctx.form().enter_css_code(&samples.css_valid).await.unwrap();
    ctx.form().enter_current_width(CURRENT_WIDTH).await.unwrap();
    ctx.form().enter_target_width(TARGET_WIDTH).await.unwrap();
    ctx.session().intercept(
        InterceptionRule::new(
            HttpMethod::Post,
            ADAPT_CSS_PATH,
            MockResponse::text(&responses.response_valid_css).with_delay(1500),
        )
        .alias("slow"),
    );
    ctx.form().submit().await.unwrap();
    ctx.session().wait_for("slow").await.unwrap();
    assert_eq!(app.pending_responses().unwrap(), 1);

    let start = tokio::time::Instant::now();
    ctx.toasts().toast_success_should_exist().await.unwrap();
    assert!(start.elapsed() >= Duration::from_millis(1500));
    assert_eq!(ctx.form().result_value().await.unwrap(), responses.response_valid_css);
}
