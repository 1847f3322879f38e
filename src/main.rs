use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use vhost_proxy::{config, lifecycle, net};

#[derive(Parser)]
#[command(name = "vhost-proxy", version, disable_version_flag = true)]
#[command(about = "Host-based HTTP(S) reverse proxy", long_about = None)]
struct Cli {
    /// Path to the JSON configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Print version
    #[arg(short = 'v', long = "version", action = clap::ArgAction::Version)]
    version: Option<bool>,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "vhost_proxy=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    if let Err(error) = run(cli).await {
        tracing::error!(error = %error, "Startup failed");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "vhost-proxy starting");

    let config = Arc::new(config::resolve(cli.config.as_deref())?);

    let shutdown = lifecycle::Shutdown::new();
    lifecycle::signals::spawn_signal_listener(&shutdown);

    let proxy = net::start(config, &shutdown).await?;
    proxy.wait().await;

    tracing::info!("Shutdown complete");
    Ok(())
}
