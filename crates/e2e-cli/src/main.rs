//! css-adapt-e2e: command-line runner for the css-adapt end-to-end suite
//!
//! ## Usage
//!
//! ```bash
//! css-adapt-e2e run                         # Run the suite in headless chromium
//! css-adapt-e2e run --mock                  # Run against the in-memory page
//! css-adapt-e2e run --group validation      # Filter groups
//! css-adapt-e2e run --format json           # Machine-readable report
//! css-adapt-e2e list                        # Show groups and scenarios
//! css-adapt-e2e validate-css out.css        # Check a stylesheet
//! ```

use clap::Parser;
use css_adapt_e2e_cli::{
    execute_list, execute_run, execute_validate_css, Cli, CliConfig, CliError, CliResult,
    Commands, Verbosity,
};
use std::process::ExitCode;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Exit code when the harness itself could not run
const EXIT_HARNESS_ERROR: u8 = 2;

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) if e.is_verdict() => {
            eprintln!("{e}");
            ExitCode::FAILURE
        }
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::from(EXIT_HARNESS_ERROR)
        }
    }
}

fn run() -> CliResult<()> {
    let cli = Cli::parse();
    let config = build_config(&cli);
    init_tracing(config.verbosity);

    match cli.command {
        Commands::Run(args) => {
            let runtime = tokio::runtime::Builder::new_multi_thread()
                .enable_all()
                .build()
                .map_err(CliError::Io)?;
            runtime.block_on(execute_run(&args, &config))
        }
        Commands::List => {
            execute_list();
            Ok(())
        }
        Commands::ValidateCss(args) => execute_validate_css(&args, &config),
    }
}

fn build_config(cli: &Cli) -> CliConfig {
    CliConfig::new()
        .with_verbosity(Verbosity::from_flags(cli.quiet, cli.verbose))
        .with_color(cli.color.clone().into())
}

fn init_tracing(verbosity: Verbosity) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(verbosity.log_filter()));
    let _ = tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .with(filter)
        .try_init();
}
