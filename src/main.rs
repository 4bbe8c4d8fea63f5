//! agent-shell: launcher for the AI agent desktop system.

use clap::Parser;
use std::path::PathBuf;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use agent_shell::config::AppConfig;
use agent_shell::launcher::{self, Launcher};

#[derive(Parser, Debug)]
#[command(name = "agent-shell", about = "AI agent desktop launcher")]
struct Args {
    /// Path to config.yaml
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Repository root holding the transcribe/, agent-main/ and widget/
    /// service directories (defaults to the current directory)
    #[arg(short, long)]
    root: Option<PathBuf>,

    /// Enable verbose (debug) logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    let filter = if args.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("agent-shell starting");

    let config = AppConfig::load(args.config.as_deref());
    info!("Agent: {}", config.agent_name);

    // Fatal precondition: without the credential nothing is started, so
    // there is nothing to clean up either.
    let api_key = match launcher::api_key_from_env() {
        Ok(key) => key,
        Err(e) => {
            error!("{e}");
            eprintln!(
                "Error: {e}.\nSet it in your environment before starting the agent shell."
            );
            std::process::exit(1);
        }
    };

    let root = args
        .root
        .or_else(|| std::env::current_dir().ok())
        .unwrap_or_else(|| PathBuf::from("."));

    let launcher = Launcher::new(root, api_key);
    let registry = launcher.registry();

    // Normal completion, error, and interrupt all funnel into the same
    // idempotent shutdown.
    let result = tokio::select! {
        result = launcher.run() => result,
        _ = tokio::signal::ctrl_c() => {
            info!("Received interrupt signal...");
            Ok(())
        }
    };

    registry.lock().await.shutdown().await;

    if let Err(e) = result {
        error!("{e}");
        std::process::exit(1);
    }
}
