use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// Callwire: realtime call event client and development endpoint.
#[derive(Parser, Debug)]
#[command(name = "callwire", version, about)]
pub struct Cli {
    /// Config file path override.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Log level override (trace, debug, info, warn, error).
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Connect to a call event endpoint and print call events as JSON lines.
    Listen(ListenArgs),
    /// Run a local call event endpoint that replays call lifecycles.
    Serve(ServeArgs),
}

#[derive(Args, Debug, Default)]
pub struct ListenArgs {
    /// Page origin the endpoint is derived from (https gives wss).
    #[arg(long)]
    pub origin: Option<String>,

    /// Explicit ws:// or wss:// endpoint.
    #[arg(long)]
    pub endpoint: Option<String>,

    /// Call to subscribe to once connected. Repeatable.
    #[arg(long = "call", value_name = "ID")]
    pub calls: Vec<String>,
}

#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Port to listen on.
    #[arg(short, long, default_value_t = 8080)]
    pub port: u16,

    /// Seconds between call lifecycle steps.
    #[arg(long, default_value_t = 5)]
    pub interval_secs: u64,
}

pub fn parse() -> Cli {
    Cli::parse()
}
