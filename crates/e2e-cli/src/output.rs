//! Output formatting and progress reporting

use console::{style, Style, Term};
use css_adapt_e2e::{GroupReport, Outcome, ScenarioReport, SuiteReport};
use indicatif::{ProgressBar, ProgressStyle};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Output format for suite results
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum OutputFormat {
    /// Human-readable text
    #[default]
    Text,
    /// JSON report on stdout
    Json,
}

/// One line describing a scenario result
#[must_use]
pub fn scenario_line(report: &ScenarioReport) -> String {
    match &report.outcome {
        Outcome::Passed => format!("{} ({}ms)", report.name, report.duration_ms),
        Outcome::Failed { step, kind, error } => format!(
            "{} ({}ms)\n    step: {}\n    {kind}: {error}",
            report.name,
            report.duration_ms,
            step.as_deref().unwrap_or("-")
        ),
    }
}

/// Suite report as pretty JSON
pub fn render_json(report: &SuiteReport) -> serde_json::Result<String> {
    serde_json::to_string_pretty(report)
}

/// Progress reporter for suite execution
#[derive(Debug)]
pub struct ProgressReporter {
    term: Term,
    spinner: Option<ProgressBar>,
    /// Whether to use colors
    pub use_color: bool,
    /// Quiet mode
    pub quiet: bool,
}

impl Default for ProgressReporter {
    fn default() -> Self {
        Self::new(true, false)
    }
}

impl ProgressReporter {
    /// Create a new progress reporter
    #[must_use]
    pub fn new(use_color: bool, quiet: bool) -> Self {
        Self {
            term: Term::stderr(),
            spinner: None,
            use_color,
            quiet,
        }
    }

    /// Start a spinner while the suite runs
    pub fn start(&mut self, message: &str) {
        if self.quiet || !self.term.is_term() {
            return;
        }

        let spinner = ProgressBar::new_spinner();
        spinner.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} {msg} [{elapsed}]")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        spinner.set_message(message.to_string());
        spinner.enable_steady_tick(Duration::from_millis(100));
        self.spinner = Some(spinner);
    }

    /// Stop the spinner
    pub fn finish(&mut self) {
        if let Some(spinner) = self.spinner.take() {
            spinner.finish_and_clear();
        }
    }

    fn line(&self, prefix: &str, message: &str) {
        let _ = self.term.write_line(&format!("{prefix} {message}"));
    }

    /// Print a success message
    pub fn success(&self, message: &str) {
        if self.quiet {
            return;
        }
        let prefix = if self.use_color {
            style("✓").green().bold().to_string()
        } else {
            "PASS".to_string()
        };
        self.line(&prefix, message);
    }

    /// Print a failure message
    pub fn failure(&self, message: &str) {
        // Always print failures, even in quiet mode
        let prefix = if self.use_color {
            style("✗").red().bold().to_string()
        } else {
            "FAIL".to_string()
        };
        self.line(&prefix, message);
    }

    /// Print a warning message
    pub fn warning(&self, message: &str) {
        if self.quiet {
            return;
        }
        let prefix = if self.use_color {
            style("⚠").yellow().bold().to_string()
        } else {
            "WARN".to_string()
        };
        self.line(&prefix, message);
    }

    /// Print a section header
    pub fn header(&self, title: &str) {
        if self.quiet {
            return;
        }
        let styled = if self.use_color {
            style(title).bold().underlined().to_string()
        } else {
            format!("=== {title} ===")
        };
        let _ = self.term.write_line("");
        let _ = self.term.write_line(&styled);
    }

    /// Print one group's results
    pub fn group(&self, group: &GroupReport) {
        self.header(&group.name);
        for scenario in &group.scenarios {
            if scenario.passed() {
                self.success(&scenario_line(scenario));
            } else {
                self.failure(&scenario_line(scenario));
            }
        }
        if let Some(error) = &group.cleanup_error {
            self.warning(&format!("cleanup failed: {error}"));
        }
    }

    /// Print every group and the summary
    pub fn report(&self, report: &SuiteReport) {
        for group in &report.groups {
            self.group(group);
        }
        self.summary(
            report.passed_count(),
            report.failed_count(),
            Duration::from_millis(report.duration_ms),
        );
    }

    /// Print suite summary
    pub fn summary(&self, passed: usize, failed: usize, duration: Duration) {
        if self.quiet && failed == 0 {
            return;
        }

        let _ = self.term.write_line("");
        let total = passed + failed;
        let duration_secs = duration.as_secs_f64();

        if self.use_color {
            let passed_style = Style::new().green().bold();
            let failed_style = Style::new().red().bold();
            let status = if failed > 0 {
                failed_style.apply_to("FAILED")
            } else {
                passed_style.apply_to("PASSED")
            };
            let _ = self.term.write_line(&format!(
                "{status} {total} scenarios in {duration_secs:.2}s ({} passed, {} failed)",
                passed_style.apply_to(passed),
                if failed > 0 {
                    failed_style.apply_to(failed).to_string()
                } else {
                    failed.to_string()
                },
            ));
        } else {
            let status = if failed > 0 { "FAILED" } else { "PASSED" };
            let _ = self.term.write_line(&format!(
                "{status} {total} scenarios in {duration_secs:.2}s ({passed} passed, {failed} failed)"
            ));
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn failed_report() -> ScenarioReport {
        ScenarioReport {
            name: "copy the converted css to the clipboard".to_string(),
            outcome: Outcome::Failed {
                step: Some("check the clipboard holds the api response".to_string()),
                kind: "clipboard".to_string(),
                error: "clipboard differs".to_string(),
            },
            duration_ms: 4000,
        }
    }

    mod line_tests {
        use super::*;

        #[test]
        fn test_passed_line() {
            let report = ScenarioReport {
                name: "toggle".to_string(),
                outcome: Outcome::Passed,
                duration_ms: 12,
            };
            assert_eq!(scenario_line(&report), "toggle (12ms)");
        }

        #[test]
        fn test_failed_line_names_step_and_kind() {
            let line = scenario_line(&failed_report());
            assert!(line.contains("step: check the clipboard holds the api response"));
            assert!(line.contains("clipboard: clipboard differs"));
        }

        #[test]
        fn test_json_report() {
            let report = SuiteReport {
                suite: "css-adapt".to_string(),
                groups: vec![GroupReport {
                    name: "g".to_string(),
                    scenarios: vec![failed_report()],
                    cleanup_error: None,
                }],
                duration_ms: 4000,
            };
            let json = render_json(&report).unwrap();
            let value: serde_json::Value = serde_json::from_str(&json).unwrap();
            assert_eq!(value["groups"][0]["scenarios"][0]["outcome"]["status"], "failed");
        }
    }

    mod progress_reporter_tests {
        use super::*;

        #[test]
        fn test_new_reporter() {
            let reporter = ProgressReporter::new(true, false);
            assert!(reporter.use_color);
            assert!(!reporter.quiet);
        }

        #[test]
        fn test_quiet_mode_suppresses_output() {
            let mut reporter = ProgressReporter::new(false, true);
            reporter.start("running");
            assert!(reporter.spinner.is_none());
            reporter.success("hidden");
            reporter.header("hidden");
            reporter.failure("shown");
            reporter.finish();
        }

        #[test]
        fn test_summary_failed() {
            let reporter = ProgressReporter::new(false, false);
            reporter.summary(9, 2, Duration::from_secs(3));
        }
    }
}
