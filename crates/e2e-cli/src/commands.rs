//! CLI command definitions using clap

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// css-adapt-e2e: end-to-end suite for the css-adapt form
#[derive(Parser, Debug)]
#[command(name = "css-adapt-e2e")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Quiet mode (suppress non-error output)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Color output (auto, always, never)
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorArg,

    /// Subcommand to run
    #[command(subcommand)]
    pub command: Commands,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the suite
    Run(RunArgs),

    /// List groups and scenarios
    List,

    /// Check a CSS file with the syntax oracle
    ValidateCss(ValidateCssArgs),
}

/// Arguments for the run command
#[derive(Parser, Debug, Default)]
#[allow(clippy::struct_excessive_bools)]
pub struct RunArgs {
    /// Application base URL
    #[arg(long, env = "CSS_ADAPT_E2E_BASE_URL")]
    pub base_url: Option<String>,

    /// Harness configuration file (YAML or JSON)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Fixture directory
    #[arg(long, env = "CSS_ADAPT_E2E_FIXTURES")]
    pub fixtures: Option<PathBuf>,

    /// Only run groups whose title contains this text
    #[arg(short, long)]
    pub group: Option<String>,

    /// Show the browser window
    #[arg(long)]
    pub headed: bool,

    /// Relax cross-origin checks in the browser
    #[arg(long)]
    pub relaxed_security: bool,

    /// Lookup and assertion timeout in milliseconds
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Report format
    #[arg(short, long, default_value = "text")]
    pub format: FormatArg,

    /// Run against the in-memory page instead of chromium
    #[arg(long)]
    pub mock: bool,
}

/// Arguments for the validate-css command
#[derive(Parser, Debug)]
pub struct ValidateCssArgs {
    /// CSS file to check
    pub file: PathBuf,

    /// Accept an empty stylesheet
    #[arg(long)]
    pub allow_empty: bool,
}

/// Report format argument
#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum FormatArg {
    /// Human-readable lines
    #[default]
    Text,
    /// The suite report as JSON on stdout
    Json,
}

impl From<FormatArg> for crate::output::OutputFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Text => Self::Text,
            FormatArg::Json => Self::Json,
        }
    }
}

/// Color argument for CLI
#[derive(ValueEnum, Clone, Debug, Default)]
pub enum ColorArg {
    /// Automatic color detection
    #[default]
    Auto,
    /// Always use colors
    Always,
    /// Never use colors
    Never,
}

impl From<ColorArg> for crate::config::ColorChoice {
    fn from(arg: ColorArg) -> Self {
        match arg {
            ColorArg::Auto => Self::Auto,
            ColorArg::Always => Self::Always,
            ColorArg::Never => Self::Never,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;

    mod cli_tests {
        use super::*;

        #[test]
        fn test_parse_run_defaults() {
            let cli = Cli::try_parse_from(["css-adapt-e2e", "run"]).unwrap();
            let Commands::Run(args) = cli.command else {
                panic!("expected Run command");
            };
            assert!(!args.mock);
            assert!(!args.headed);
            assert_eq!(args.format, FormatArg::Text);
            assert!(args.timeout.is_none());
        }

        #[test]
        fn test_parse_run_with_options() {
            let cli = Cli::try_parse_from([
                "css-adapt-e2e",
                "run",
                "--mock",
                "--group",
                "validation",
                "--timeout",
                "2500",
                "--format",
                "json",
                "--base-url",
                "http://localhost:5173/",
            ])
            .unwrap();
            let Commands::Run(args) = cli.command else {
                panic!("expected Run command");
            };
            assert!(args.mock);
            assert_eq!(args.group.as_deref(), Some("validation"));
            assert_eq!(args.timeout, Some(2500));
            assert_eq!(args.format, FormatArg::Json);
            assert_eq!(args.base_url.as_deref(), Some("http://localhost:5173/"));
        }

        #[test]
        fn test_parse_validate_css() {
            let cli =
                Cli::try_parse_from(["css-adapt-e2e", "validate-css", "out.css", "--allow-empty"])
                    .unwrap();
            let Commands::ValidateCss(args) = cli.command else {
                panic!("expected ValidateCss command");
            };
            assert_eq!(args.file, PathBuf::from("out.css"));
            assert!(args.allow_empty);
        }

        #[test]
        fn test_global_flags_after_subcommand() {
            let cli = Cli::try_parse_from(["css-adapt-e2e", "list", "-vv", "--color", "never"])
                .unwrap();
            assert_eq!(cli.verbose, 2);
            assert!(matches!(cli.color, ColorArg::Never));
        }

        #[test]
        fn test_subcommand_required() {
            assert!(Cli::try_parse_from(["css-adapt-e2e"]).is_err());
        }
    }
}
