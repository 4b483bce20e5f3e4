//! `stencil`: render templates from variables gathered out of files,
//! environment and stdin.
//!
//! Logging goes to stderr and is filtered by `STENCIL_LOG`
//! (e.g. `STENCIL_LOG=debug`), defaulting to warnings.

mod app;
mod cli;

use std::process::ExitCode;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::cli::Cli;

fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_env("STENCIL_LOG")
                .unwrap_or_else(|_| "warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args: Vec<String> = std::env::args().collect();
    let (cli, matches) = match Cli::try_parse_with_matches(&args) {
        Ok(parsed) => parsed,
        Err(err) => err.exit(),
    };

    match app::run(&cli, &matches, args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!("{err:#}");
            ExitCode::FAILURE
        }
    }
}
