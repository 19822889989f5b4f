//! Resolves one remoting request against a dispatcher configuration file
//! and prints the resulting factory and service metadata as JSON.

use std::path::PathBuf;
use std::process;

use clap::Parser;
use remoting_core::{RemotingRequest, REMOTING_MESSAGE_TYPE};
use remoting_server::service::Resolution;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// CLI arguments
#[derive(Parser, Debug)]
#[command(name = "remoting-resolve")]
#[command(about = "Resolve the service factory and invoker for a remoting request", long_about = None)]
struct Args {
    /// Dispatcher configuration file (JSON)
    #[arg(short, long, env = "REMOTING_CONFIG")]
    config: PathBuf,

    /// Destination id addressed by the request
    #[arg(short, long)]
    destination: String,

    /// Operation invoked on the destination
    #[arg(short, long, default_value = "")]
    operation: String,

    /// Message type discriminator
    #[arg(long, default_value = REMOTING_MESSAGE_TYPE)]
    message_type: String,

    /// Emit logs as JSON lines
    #[arg(long)]
    json_logs: bool,
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into());
    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_target(false))
            .init();
    }
}

fn run(args: Args) -> anyhow::Result<String> {
    let request = RemotingRequest::new(args.message_type, args.destination, args.operation);
    let resolution = Resolution::resolve_file(&args.config, &request)?;
    Ok(serde_json::to_string_pretty(&resolution)?)
}

fn main() {
    let args = Args::parse();
    init_tracing(args.json_logs);

    match run(args) {
        Ok(json) => println!("{json}"),
        Err(e) => {
            tracing::error!(error = ?e, "Resolution failed");
            eprintln!("error: {e:#}");
            process::exit(1);
        }
    }
}
