//! callwire: realtime call event client CLI.
//!
//! `listen` connects to a call event endpoint and prints every call event
//! as a JSON line on stdout. `serve` runs a local endpoint speaking the
//! same protocol, for development without the CRM backend.

mod cli;
mod listen;
mod serve;

use std::process::ExitCode;

use callwire_config::schema::{CallwireConfig, LogLevel};
use tracing_subscriber::filter::{Directive, LevelFilter};
use tracing_subscriber::EnvFilter;

use crate::cli::Command;

fn init_logging(directive: &str) {
    let directive = directive
        .parse::<Directive>()
        .unwrap_or_else(|_| Directive::from(LevelFilter::INFO));
    // stdout carries event JSON; logs go to stderr.
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(EnvFilter::from_default_env().add_directive(directive))
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = cli::parse();

    let loaded = match &args.config {
        Some(path) => callwire_config::load_config_from(path),
        None => callwire_config::load_config(),
    };

    let level = loaded
        .as_ref()
        .map(|config| config.logging.level)
        .unwrap_or_default();
    let directive = args
        .log_level
        .clone()
        .unwrap_or_else(|| log_directive(level));
    init_logging(&directive);

    tracing::info!("callwire v{} starting...", env!("CARGO_PKG_VERSION"));

    let config = match loaded {
        Ok(config) => config,
        Err(e) if args.config.is_none() => {
            tracing::warn!("Config load failed, using defaults: {e}");
            CallwireConfig::default()
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to load config");
            return ExitCode::FAILURE;
        }
    };

    let result = match args.command {
        Command::Listen(listen_args) => listen::run(&config, listen_args).await,
        Command::Serve(serve_args) => serve::serve(serve_args).await,
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "callwire failed");
            ExitCode::FAILURE
        }
    }
}

fn log_directive(level: LogLevel) -> String {
    format!("callwire={}", level.as_str())
}
