//! Scenario composition and the suite runner.
//!
//! A [`Scenario`] is an ordered pipeline of named steps. Scenarios are
//! grouped; a group shares the browser session and runs its scenarios in
//! declaration order. The runner records a failure against the step that
//! was executing and moves on to the next scenario.

use crate::config::HarnessConfig;
use crate::driver::PageDriver;
use crate::fixture::FixtureStore;
use crate::oracle::CssValidator;
use crate::page_object::{FormPage, ToastsPage};
use crate::result::{HarnessError, HarnessResult};
use crate::session::Session;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::{Arc, Mutex};
use tokio::time::Instant;
use tracing::Instrument;

/// Everything a scenario acts through
pub struct ScenarioContext {
    session: Session,
    form: FormPage,
    toasts: ToastsPage,
    fixtures: FixtureStore,
    validator: Arc<dyn CssValidator>,
    step: Mutex<Option<String>>,
}

impl fmt::Debug for ScenarioContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScenarioContext")
            .field("session", &self.session)
            .field("fixtures", &self.fixtures)
            .field("validator", &self.validator.name())
            .finish_non_exhaustive()
    }
}

impl ScenarioContext {
    /// Build a context over an existing session
    #[must_use]
    pub fn new(session: Session, fixtures: FixtureStore, validator: Arc<dyn CssValidator>) -> Self {
        Self {
            form: FormPage::new(session.clone()),
            toasts: ToastsPage::new(session.clone()),
            session,
            fixtures,
            validator,
            step: Mutex::new(None),
        }
    }

    /// Start a session on `driver` and build a context from `config`
    pub async fn start(
        driver: Arc<dyn PageDriver>,
        config: HarnessConfig,
        validator: Arc<dyn CssValidator>,
    ) -> HarnessResult<Self> {
        let fixtures = FixtureStore::new(config.fixtures_dir.clone());
        let session = Session::start(driver, config).await?;
        Ok(Self::new(session, fixtures, validator))
    }

    /// Session
    #[must_use]
    pub const fn session(&self) -> &Session {
        &self.session
    }

    /// Form page object
    #[must_use]
    pub const fn form(&self) -> &FormPage {
        &self.form
    }

    /// Toast page object
    #[must_use]
    pub const fn toasts(&self) -> &ToastsPage {
        &self.toasts
    }

    /// Fixture store
    #[must_use]
    pub const fn fixtures(&self) -> &FixtureStore {
        &self.fixtures
    }

    /// CSS oracle
    #[must_use]
    pub fn validator(&self) -> &dyn CssValidator {
        self.validator.as_ref()
    }

    /// Mark the start of a named step
    pub fn step(&self, name: &str) {
        tracing::debug!(step = name, "step");
        if let Ok(mut current) = self.step.lock() {
            *current = Some(name.to_string());
        }
    }

    /// Step currently executing
    #[must_use]
    pub fn current_step(&self) -> Option<String> {
        self.step.lock().ok().and_then(|s| s.clone())
    }

    fn reset_step(&self) {
        if let Ok(mut current) = self.step.lock() {
            *current = None;
        }
    }
}

/// One user-visible flow
#[async_trait]
pub trait Scenario: Send + Sync {
    /// Scenario title
    fn name(&self) -> &str;

    /// Execute the steps; the first failing step ends the scenario
    async fn run(&self, ctx: &ScenarioContext) -> HarnessResult<()>;
}

/// Scenarios sharing a session, with after-all cleanup
pub struct ScenarioGroup {
    name: String,
    scenarios: Vec<Box<dyn Scenario>>,
}

impl fmt::Debug for ScenarioGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScenarioGroup")
            .field("name", &self.name)
            .field("scenarios", &self.scenario_names())
            .finish()
    }
}

impl ScenarioGroup {
    /// Create an empty group
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            scenarios: Vec::new(),
        }
    }

    /// Append a scenario
    #[must_use]
    pub fn with(mut self, scenario: impl Scenario + 'static) -> Self {
        self.scenarios.push(Box::new(scenario));
        self
    }

    /// Group title
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Scenario titles in order
    #[must_use]
    pub fn scenario_names(&self) -> Vec<&str> {
        self.scenarios.iter().map(|s| s.name()).collect()
    }

    /// Number of scenarios
    #[must_use]
    pub fn len(&self) -> usize {
        self.scenarios.len()
    }

    /// Check if the group has no scenarios
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.scenarios.is_empty()
    }
}

/// Ordered list of groups
#[derive(Debug)]
pub struct Suite {
    name: String,
    groups: Vec<ScenarioGroup>,
}

impl Suite {
    /// Create an empty suite
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            groups: Vec::new(),
        }
    }

    /// Append a group
    #[must_use]
    pub fn with_group(mut self, group: ScenarioGroup) -> Self {
        self.groups.push(group);
        self
    }

    /// Suite title
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Groups in order
    #[must_use]
    pub fn groups(&self) -> &[ScenarioGroup] {
        &self.groups
    }

    /// Total scenario count
    #[must_use]
    pub fn scenario_count(&self) -> usize {
        self.groups.iter().map(ScenarioGroup::len).sum()
    }
}

/// How a scenario ended
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Outcome {
    /// Every step passed
    Passed,
    /// A step failed
    Failed {
        /// Step that was executing
        step: Option<String>,
        /// Error category
        kind: String,
        /// Error message
        error: String,
    },
}

impl Outcome {
    fn from_error(step: Option<String>, error: &HarnessError) -> Self {
        Self::Failed {
            step,
            kind: error.kind().to_string(),
            error: error.to_string(),
        }
    }
}

/// Result of one scenario
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScenarioReport {
    /// Scenario title
    pub name: String,
    /// Outcome
    pub outcome: Outcome,
    /// Wall time in milliseconds
    pub duration_ms: u64,
}

impl ScenarioReport {
    /// Check if the scenario passed
    #[must_use]
    pub fn passed(&self) -> bool {
        self.outcome == Outcome::Passed
    }
}

/// Result of one group
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupReport {
    /// Group title
    pub name: String,
    /// Scenario results in order
    pub scenarios: Vec<ScenarioReport>,
    /// After-all hook failure, if any
    pub cleanup_error: Option<String>,
}

/// Result of a suite run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuiteReport {
    /// Suite title
    pub suite: String,
    /// Group results in order
    pub groups: Vec<GroupReport>,
    /// Wall time in milliseconds
    pub duration_ms: u64,
}

impl SuiteReport {
    fn scenarios(&self) -> impl Iterator<Item = &ScenarioReport> {
        self.groups.iter().flat_map(|g| g.scenarios.iter())
    }

    /// Check if every scenario passed
    #[must_use]
    pub fn all_passed(&self) -> bool {
        self.scenarios().all(ScenarioReport::passed)
    }

    /// Count passed scenarios
    #[must_use]
    pub fn passed_count(&self) -> usize {
        self.scenarios().filter(|s| s.passed()).count()
    }

    /// Count failed scenarios
    #[must_use]
    pub fn failed_count(&self) -> usize {
        self.total() - self.passed_count()
    }

    /// Total scenario count
    #[must_use]
    pub fn total(&self) -> usize {
        self.scenarios().count()
    }

    /// Failed scenarios with their group
    #[must_use]
    pub fn failures(&self) -> Vec<(&str, &ScenarioReport)> {
        self.groups
            .iter()
            .flat_map(|g| {
                g.scenarios
                    .iter()
                    .filter(|s| !s.passed())
                    .map(move |s| (g.name.as_str(), s))
            })
            .collect()
    }
}

fn elapsed_ms(start: Instant) -> u64 {
    u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX)
}

/// Executes suites
#[derive(Debug, Clone, Default)]
pub struct SuiteRunner {
    group_filter: Option<String>,
}

impl SuiteRunner {
    /// Create a runner for every group
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Only run groups whose title contains `filter` (case-insensitive)
    #[must_use]
    pub fn with_group_filter(mut self, filter: impl Into<String>) -> Self {
        self.group_filter = Some(filter.into());
        self
    }

    fn selected(&self, group: &ScenarioGroup) -> bool {
        self.group_filter.as_ref().map_or(true, |f| {
            group.name.to_lowercase().contains(&f.to_lowercase())
        })
    }

    /// Run `suite`; failures are recorded, never propagated
    pub async fn run(&self, suite: &Suite, ctx: &ScenarioContext) -> SuiteReport {
        let start = Instant::now();
        let mut groups = Vec::new();
        for group in suite.groups.iter().filter(|g| self.selected(g)) {
            let span = tracing::info_span!("group", name = %group.name);
            groups.push(self.run_group(group, ctx).instrument(span).await);
        }
        let report = SuiteReport {
            suite: suite.name.clone(),
            groups,
            duration_ms: elapsed_ms(start),
        };
        tracing::info!(
            passed = report.passed_count(),
            failed = report.failed_count(),
            "suite finished"
        );
        report
    }

    async fn run_group(&self, group: &ScenarioGroup, ctx: &ScenarioContext) -> GroupReport {
        tracing::info!(scenarios = group.len(), "group started");
        let mut scenarios = Vec::with_capacity(group.len());
        for scenario in &group.scenarios {
            let span = tracing::info_span!("scenario", name = scenario.name());
            let report = Self::run_scenario(scenario.as_ref(), ctx).instrument(span).await;
            scenarios.push(report);
        }

        let cleanup_error = match ctx.session.clear_local_storage().await {
            Ok(()) => None,
            Err(e) => {
                tracing::warn!(error = %e, "group cleanup failed");
                Some(e.to_string())
            }
        };
        ctx.session.network().reset();
        GroupReport {
            name: group.name.clone(),
            scenarios,
            cleanup_error,
        }
    }

    async fn run_scenario(scenario: &dyn Scenario, ctx: &ScenarioContext) -> ScenarioReport {
        ctx.reset_step();
        let start = Instant::now();
        let budget = ctx.session.config().scenario_timeout();
        let outcome = match tokio::time::timeout(budget, scenario.run(ctx)).await {
            Ok(Ok(())) => Outcome::Passed,
            Ok(Err(e)) => Outcome::from_error(ctx.current_step(), &e),
            Err(_) => Outcome::from_error(
                ctx.current_step(),
                &HarnessError::ScenarioTimeout {
                    scenario: scenario.name().to_string(),
                    ms: ctx.session.config().scenario_timeout_ms,
                },
            ),
        };
        ctx.session.network().reset();

        match &outcome {
            Outcome::Passed => tracing::info!("scenario passed"),
            Outcome::Failed { step, error, .. } => tracing::info!(
                step = step.as_deref().unwrap_or("-"),
                %error,
                "scenario failed"
            ),
        }
        ScenarioReport {
            name: scenario.name().to_string(),
            outcome,
            duration_ms: elapsed_ms(start),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::mock::MockApp;
    use crate::network::{HttpMethod, InterceptionRule, MockResponse, ADAPT_CSS_PATH};
    use crate::oracle::SyntaxValidator;
    use std::time::Duration;

    struct Passing;

    #[async_trait]
    impl Scenario for Passing {
        fn name(&self) -> &str {
            "passes"
        }

        async fn run(&self, ctx: &ScenarioContext) -> HarnessResult<()> {
            ctx.step("visit");
            ctx.form().visit().await
        }
    }

    struct FailsAtStep;

    #[async_trait]
    impl Scenario for FailsAtStep {
        fn name(&self) -> &str {
            "fails"
        }

        async fn run(&self, ctx: &ScenarioContext) -> HarnessResult<()> {
            ctx.step("visit");
            ctx.form().visit().await?;
            ctx.step("expect success toast");
            ctx.toasts().toast_success_should_exist().await
        }
    }

    struct Hangs;

    #[async_trait]
    impl Scenario for Hangs {
        fn name(&self) -> &str {
            "hangs"
        }

        async fn run(&self, ctx: &ScenarioContext) -> HarnessResult<()> {
            ctx.step("sleep");
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok(())
        }
    }

    struct LeavesRule;

    #[async_trait]
    impl Scenario for LeavesRule {
        fn name(&self) -> &str {
            "leaves rule"
        }

        async fn run(&self, ctx: &ScenarioContext) -> HarnessResult<()> {
            ctx.session().intercept(
                InterceptionRule::new(HttpMethod::Post, ADAPT_CSS_PATH, MockResponse::text("x"))
                    .alias("leak"),
            );
            Ok(())
        }
    }

    async fn context() -> ScenarioContext {
        ScenarioContext::start(
            Arc::new(MockApp::new()),
            HarnessConfig::default().with_scenario_timeout(10_000),
            Arc::new(SyntaxValidator::new()),
        )
        .await
        .unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn test_runner_continues_after_failure() {
        let ctx = context().await;
        let suite = Suite::new("s").with_group(
            ScenarioGroup::new("g")
                .with(FailsAtStep)
                .with(Passing),
        );
        let report = SuiteRunner::new().run(&suite, &ctx).await;
        assert_eq!(report.total(), 2);
        assert_eq!(report.passed_count(), 1);
        assert!(!report.all_passed());

        let failures = report.failures();
        assert_eq!(failures.len(), 1);
        let (group, failed) = failures[0];
        assert_eq!(group, "g");
        match &failed.outcome {
            Outcome::Failed { step, kind, .. } => {
                assert_eq!(step.as_deref(), Some("expect success toast"));
                assert_eq!(kind, "assertion");
            }
            Outcome::Passed => panic!("expected failure"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_scenario_timeout() {
        let ctx = context().await;
        let suite = Suite::new("s").with_group(ScenarioGroup::new("g").with(Hangs));
        let report = SuiteRunner::new().run(&suite, &ctx).await;
        match &report.groups[0].scenarios[0].outcome {
            Outcome::Failed { step, kind, .. } => {
                assert_eq!(step.as_deref(), Some("sleep"));
                assert_eq!(kind, "timeout");
            }
            Outcome::Passed => panic!("expected timeout"),
        }
        assert_eq!(report.groups[0].scenarios[0].duration_ms, 10_000);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rules_reset_between_scenarios() {
        let ctx = context().await;
        let suite = Suite::new("s").with_group(ScenarioGroup::new("g").with(LeavesRule));
        SuiteRunner::new().run(&suite, &ctx).await;
        assert_eq!(ctx.session().network().rule_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_group_filter() {
        let ctx = context().await;
        let suite = Suite::new("s")
            .with_group(ScenarioGroup::new("Theme toggle").with(Passing))
            .with_group(ScenarioGroup::new("Validation").with(Passing));
        let report = SuiteRunner::new()
            .with_group_filter("theme")
            .run(&suite, &ctx)
            .await;
        assert_eq!(report.groups.len(), 1);
        assert_eq!(report.groups[0].name, "Theme toggle");
        assert_eq!(suite.scenario_count(), 2);
    }

    #[test]
    fn test_report_serializes_outcome_tag() {
        let report = ScenarioReport {
            name: "x".into(),
            outcome: Outcome::Failed {
                step: Some("submit".into()),
                kind: "interception".into(),
                error: "timed out".into(),
            },
            duration_ms: 5,
        };
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["outcome"]["status"], "failed");
        assert_eq!(json["outcome"]["step"], "submit");
    }
}
