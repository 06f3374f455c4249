//! Command execution

use crate::commands::{RunArgs, ValidateCssArgs};
use crate::config::CliConfig;
use crate::error::{CliError, CliResult};
use crate::output::{render_json, OutputFormat, ProgressReporter};
use css_adapt_e2e::mock::MockApp;
use css_adapt_e2e::{
    css_adapt_suite, CssSyntaxError, CssValidator, HarnessConfig, PageDriver, ScenarioContext,
    SuiteReport, SuiteRunner, SyntaxValidator,
};
use std::path::Path;
use std::sync::Arc;

/// Resolve the harness configuration: file, then environment, then flags
pub fn harness_config(args: &RunArgs) -> CliResult<HarnessConfig> {
    let mut config = match &args.config {
        Some(path) => HarnessConfig::load(path)?,
        None => HarnessConfig::default(),
    }
    .with_env_overrides();

    if let Some(url) = &args.base_url {
        config = config.with_base_url(url.clone());
    }
    if let Some(dir) = &args.fixtures {
        config = config.with_fixtures_dir(dir.clone());
    }
    if let Some(ms) = args.timeout {
        if ms == 0 {
            return Err(CliError::config("--timeout must be positive"));
        }
        config = config.with_timeout(ms);
    }
    if args.headed {
        config = config.with_headless(false);
    }
    if args.relaxed_security {
        config = config.with_relaxed_web_security(true);
    }
    config.validate()?;
    Ok(config)
}

#[cfg(feature = "browser")]
async fn browser_driver(config: &HarnessConfig) -> CliResult<Arc<dyn PageDriver>> {
    let driver = css_adapt_e2e::ChromiumDriver::launch(config).await?;
    Ok(Arc::new(driver))
}

#[cfg(not(feature = "browser"))]
#[allow(clippy::unused_async)]
async fn browser_driver(_config: &HarnessConfig) -> CliResult<Arc<dyn PageDriver>> {
    Err(CliError::config(
        "built without the browser feature; pass --mock",
    ))
}

/// Run the suite and return its report; scenario failures stay inside the report
pub async fn run_suite(args: &RunArgs, config: HarnessConfig) -> CliResult<SuiteReport> {
    let driver: Arc<dyn PageDriver> = if args.mock {
        tracing::info!("running against the in-memory page");
        Arc::new(MockApp::new())
    } else {
        browser_driver(&config).await?
    };

    let ctx = ScenarioContext::start(driver, config, Arc::new(SyntaxValidator::new())).await?;
    let runner = match &args.group {
        Some(filter) => SuiteRunner::new().with_group_filter(filter.clone()),
        None => SuiteRunner::new(),
    };
    let report = runner.run(&css_adapt_suite(), &ctx).await;

    if let Err(e) = ctx.session().close().await {
        tracing::warn!(error = %e, "failed to close session");
    }
    Ok(report)
}

/// Execute the run command
pub async fn execute_run(args: &RunArgs, cli: &CliConfig) -> CliResult<()> {
    let config = harness_config(args)?;
    let format = OutputFormat::from(args.format);
    let mut reporter = ProgressReporter::new(
        cli.color.should_color(),
        cli.verbosity.is_quiet() || format == OutputFormat::Json,
    );

    reporter.start(&format!("running suite against {}", config.base_url));
    let result = run_suite(args, config).await;
    reporter.finish();
    let report = result?;

    match format {
        OutputFormat::Json => println!("{}", render_json(&report)?),
        OutputFormat::Text => reporter.report(&report),
    }

    if report.total() == 0 {
        return Err(CliError::config("no scenario matched the group filter"));
    }
    if report.all_passed() {
        Ok(())
    } else {
        Err(CliError::SuiteFailed {
            failed: report.failed_count(),
            total: report.total(),
        })
    }
}

/// Lines printed by the list command
#[must_use]
pub fn list_lines() -> Vec<String> {
    let suite = css_adapt_suite();
    let mut lines = Vec::with_capacity(suite.scenario_count() + suite.groups().len());
    for group in suite.groups() {
        lines.push(group.name().to_string());
        for name in group.scenario_names() {
            lines.push(format!("  {name}"));
        }
    }
    lines
}

/// Execute the list command
pub fn execute_list() {
    for line in list_lines() {
        println!("{line}");
    }
}

/// Check a stylesheet on disk
pub fn check_css(path: &Path, allow_empty: bool) -> CliResult<Vec<CssSyntaxError>> {
    let css = std::fs::read_to_string(path)?;
    Ok(SyntaxValidator::new().allow_empty(allow_empty).validate(&css))
}

/// Execute the validate-css command
pub fn execute_validate_css(args: &ValidateCssArgs, cli: &CliConfig) -> CliResult<()> {
    let reporter = ProgressReporter::new(cli.color.should_color(), cli.verbosity.is_quiet());
    let path = args.file.display().to_string();
    let errors = check_css(&args.file, args.allow_empty)?;
    if errors.is_empty() {
        reporter.success(&format!("{path}: valid"));
        return Ok(());
    }
    for error in &errors {
        reporter.failure(&format!("{path}:{error}"));
    }
    Err(CliError::InvalidCss {
        path,
        errors: errors.len(),
    })
}
