pub(crate) mod ai;
pub(crate) mod cli;
pub(crate) mod config;
mod error;
pub(crate) mod git;
pub(crate) mod io_utils;
mod logging;
pub(crate) mod report;
pub(crate) mod time_utils;

pub(crate) use error::{AppError, AppResult};

use clap::Parser;
use std::process::exit;
use tracing::debug;

use crate::cli::Cli;

#[tokio::main]
async fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            // --help and --version are reported as "errors" on stdout
            exit(if e.use_stderr() { 1 } else { 0 });
        }
    };

    logging::setup_logger(&cli.verbosity);

    if let Err(e) = cli.run().await {
        debug!("Report generation failed: {:?}", e);
        match e {
            AppError::Validation(_) => eprintln!("{e}"),
            e => eprintln!("Error: {e}"),
        }
        exit(1);
    }
}
