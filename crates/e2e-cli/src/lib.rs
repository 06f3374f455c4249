//! css-adapt-e2e CLI library
//!
//! Command-line runner for the css-adapt end-to-end suite: runs the suite
//! against chromium or the in-memory page, lists scenarios, and checks
//! stylesheets with the syntax oracle.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)] // Error types are self-documenting

mod commands;
mod config;
mod error;
mod output;
mod runner;

pub use commands::{Cli, ColorArg, Commands, FormatArg, RunArgs, ValidateCssArgs};
pub use config::{CliConfig, ColorChoice, Verbosity};
pub use error::{CliError, CliResult};
pub use output::{render_json, scenario_line, OutputFormat, ProgressReporter};
pub use runner::{
    check_css, execute_list, execute_run, execute_validate_css, harness_config, list_lines,
    run_suite,
};
