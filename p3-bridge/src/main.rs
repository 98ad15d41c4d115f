#![forbid(unsafe_code)]

use clap::Parser;
use p3_bridge_lib::config::{load_from_path, Mode};
use p3_bridge_lib::Bridge;
use std::path::PathBuf;
use tokio::sync::watch;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about = "MYLAPS P3 decoder to HTTP race-control bridge")]
struct Cli {
    /// Path to configuration TOML file
    #[arg(short, long, value_name = "FILE", default_value = "p3-bridge.toml")]
    config: PathBuf,

    /// Override defaults.mode ("tcp" or "udp")
    #[arg(long)]
    mode: Option<String>,

    /// Override the decoder host
    #[arg(long)]
    tcp_host: Option<String>,

    /// Override the decoder TCP port
    #[arg(long)]
    tcp_port: Option<u16>,

    /// Override the UDP listen port
    #[arg(long)]
    udp_port: Option<u16>,

    /// Parse and log records without POSTing them
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let mut cfg = match load_from_path(&cli.config) {
        Ok(cfg) => cfg,
        Err(err) => {
            init_tracing("info");
            error!(%err, config = %cli.config.display(), "failed to load configuration");
            std::process::exit(1);
        }
    };
    init_tracing(&cfg.logging.level);

    if let Some(mode) = &cli.mode {
        cfg.defaults.mode = match mode.as_str() {
            "tcp" => Mode::Tcp,
            "udp" => Mode::Udp,
            other => {
                error!(mode = %other, "unknown --mode, expected tcp or udp");
                std::process::exit(1);
            }
        };
    }
    if let Some(host) = cli.tcp_host {
        cfg.defaults.tcp_host = host;
    }
    if let Some(port) = cli.tcp_port {
        cfg.defaults.tcp_port = port;
    }
    if let Some(port) = cli.udp_port {
        cfg.defaults.udp_listen_port = port;
    }
    if cli.dry_run {
        cfg.post.enabled = false;
    }

    info!(
        mode = ?cfg.defaults.mode,
        host = %cfg.defaults.tcp_host,
        post_enabled = cfg.post.enabled,
        "configuration loaded"
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("shutdown requested");
            let _ = shutdown_tx.send(true);
        }
    });

    let bridge = Bridge::new(cfg);
    if let Err(err) = bridge.run(shutdown_rx).await {
        error!(%err, "bridge exited with error");
        std::process::exit(1);
    }
}

fn init_tracing(level: &str) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.to_string()));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .init();
}
