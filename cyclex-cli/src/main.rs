//! ## cyclex
//! **Command-line entrypoint for the cyclic executive**
//!
//! `run` drives the scheduler on the monotonic clock, `simulate` on a
//! virtual one, `check` only validates. Every failure ends the process with
//! the exit code listed in [`error`].

use std::process;

use clap::error::ErrorKind;
use clap::Parser;
use tracing::error;

use cyclex_telemetry::EventLogger;

mod commands;
mod error;
mod runtime;

use commands::Cli;
use error::{CliError, EXIT_CONFIG};

/// Exit code for a failed argument parse. Help and version requests are not
/// failures and keep clap's own exit.
fn parse_exit_code(err: &clap::Error) -> Option<i32> {
    match err.kind() {
        ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => None,
        _ => Some(EXIT_CONFIG),
    }
}

fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            let Some(code) = parse_exit_code(&err) else {
                err.exit();
            };
            let _ = err.print();
            process::exit(code);
        }
    };

    let config = commands::load_config(&cli);
    let filter = config
        .as_ref()
        .map_or("info", |config| config.telemetry.log_filter.as_str());
    if let Err(err) = EventLogger::init(filter) {
        eprintln!("cyclex: failed to initialise logging: {}", err);
    }

    let result = config
        .map_err(CliError::from)
        .and_then(|config| commands::run_command(cli, config));

    if let Err(err) = result {
        let code = err.exit_code();
        error!(exit_code = code, "{}", err);
        eprintln!("cyclex: {}", err);
        process::exit(code);
    }
}
