//! VoxRoute Server
//!
//! Serves conversation statistics for an ElevenLabs conversational-AI account:
//! - Walks every page of the conversation history and aggregates it
//! - Caches aggregates in a REST key-value store for five minutes
//! - Routes `?version=vN` to the configured handler for that version
//! - Passes voice and conversation lookups through to ElevenLabs
//!
//! Usage:
//! ```bash
//! # With environment variables only
//! ELEVENLABS_API_KEY=your_key KV_REST_API_URL=... KV_REST_API_TOKEN=... voxroute-server
//!
//! # With a config file (env vars override it)
//! voxroute-server --config voxroute.yaml
//! ```
//!
//! Test with:
//! ```bash
//! curl "http://localhost:3000/api/elevenlabs?startDate=2024-01-01&endDate=2024-01-31"
//! curl "http://localhost:3000/api/elevenlabs?force_refresh=true"
//! curl "http://localhost:3000/api/versions"
//! curl "http://localhost:3000/api/voices?voiceId=21m00Tcm4TlvDq8ikWAM"
//! ```

mod bootstrap;
mod config;

use clap::Parser;
use config::ServerConfig;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{Level, info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};
use voxroute_observability::{Metrics, ReadinessChecker};

const BANNER: &str = concat!(
    r#"
 __     __          ____             _
 \ \   / /____  __ |  _ \ ___  _   _| |_ ___
  \ \ / / _ \ \/ / | |_) / _ \| | | | __/ _ \
   \ V / (_) >  <  |  _ < (_) | |_| | ||  __/
    \_/ \___/_/\_\ |_| \_\___/ \__,_|\__\___|

   version : "#,
    env!("VERSION"),
    "\n   commit  : ",
    env!("SHA"),
    "\n"
);

/// VoxRoute Server - conversation statistics proxy for ElevenLabs
#[derive(Parser)]
#[command(name = "voxroute-server")]
#[command(about = "VoxRoute server for ElevenLabs conversation statistics", long_about = None)]
#[command(version = env!("VERSION"))]
#[command(before_help = BANNER)]
struct Cli {
    /// Path to configuration file (YAML or TOML)
    #[arg(short, long, value_name = "FILE", env = "VOXROUTE_CONFIG")]
    config: Option<String>,

    /// Address to bind (overrides config and VOXROUTE_HOST)
    #[arg(long, value_name = "HOST")]
    host: Option<String>,

    /// Port to listen on (overrides config and VOXROUTE_PORT)
    #[arg(short, long, value_name = "PORT")]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Load configuration
    let mut config = match &cli.config {
        Some(config_path) => ServerConfig::from_file(config_path)?,
        None => ServerConfig::default(),
    };

    // Merge environment variables (they override config file)
    config.merge_env();

    // CLI flags have the highest precedence
    if let Some(host) = cli.host {
        config.host = host;
    }
    if let Some(port) = cli.port {
        config.port = port;
    }

    config.validate()?;

    let log_level = match config.logging.level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::new(format!("{}", log_level)))
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    println!("{}", BANNER);

    match &cli.config {
        Some(config_path) => info!("📁 Loaded configuration from: {}", config_path),
        None => info!("📁 Using default configuration"),
    }
    info!("🚀 Initializing VoxRoute");

    info!("📊 Initializing observability (metrics, health endpoints)");
    let metrics = Arc::new(Metrics::new()?);

    let app = bootstrap::build_app(&config, metrics)?;
    if config.logging.log_requests {
        info!("📋 Per-request logging enabled");
    }
    if !app.readiness.is_ready() {
        warn!("⚠️  Not ready: /readyz will report 503 until credentials are configured");
    }

    let router = app.router.layer(TraceLayer::new_for_http());

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    let listener = TcpListener::bind(addr).await?;

    info!("");
    info!("✅ VoxRoute listening on http://{}", addr);
    info!("   API endpoints:");
    info!(
        "   - Statistics:    http://{}/api/elevenlabs (default {})",
        addr, app.default_version
    );
    info!("   - Versions:      http://{}/api/versions", addr);
    info!("   - Voices:        http://{}/api/voices", addr);
    info!("   - Conversations: http://{}/api/conversations/{{id}}", addr);
    info!("   Observability:");
    info!("   - Health check:       http://{}/healthz", addr);
    info!("   - Readiness check:    http://{}/readyz", addr);
    info!("   - Prometheus metrics: http://{}/metrics", addr);
    info!("");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

/// Wait for shutdown signal (SIGINT or SIGTERM)
async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
