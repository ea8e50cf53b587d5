//! Echo broker server binary.

use anyhow::{Context, Result};
use clap::Parser;
use echo_core::AppConfig;
use echo_runner::adapter::EchoRunner;
use echo_runner::probe::PassthroughProbe;
use echo_server::{AppState, create_router};
use figment::Figment;
use figment::providers::{Env, Format, Toml};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Echo - a content-addressed artifact broker
#[derive(Parser, Debug)]
#[command(name = "echod")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(
        short,
        long,
        env = "ECHO_CONFIG",
        default_value = "config/server.toml"
    )]
    config: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Echo broker v{}", env!("CARGO_PKG_VERSION"));

    // Every setting has a default, so both the file and the env vars
    // are optional.
    let config_path = std::path::Path::new(&args.config);
    let mut figment = Figment::from(figment::providers::Serialized::defaults(
        AppConfig::default(),
    ));
    if config_path.exists() {
        tracing::info!(config_path = %args.config, "Loading configuration from file");
        figment = figment.merge(Toml::file(&args.config));
    } else {
        tracing::debug!("No config file found at {}", args.config);
    }
    let config: AppConfig = figment
        .merge(Env::prefixed("ECHO_").split("__"))
        .extract()
        .context("failed to load configuration")?;

    if config.server.metrics_enabled {
        echo_server::metrics::register_metrics();
        tracing::info!("Prometheus metrics registered");
    }

    tokio::fs::create_dir_all(&config.cas.root)
        .await
        .with_context(|| format!("failed to create CAS root: {}", config.cas.root.display()))?;
    tracing::info!(cas_root = %config.cas.root.display(), "CAS root ready");

    let runner = Arc::new(EchoRunner::new(
        Arc::new(PassthroughProbe),
        config.runner.clone(),
        config.cas.artifact_name.clone(),
        config.cas.manifest_name.clone(),
    ));

    let state = AppState::new(config.clone(), runner);
    let app = create_router(state);

    let addr: SocketAddr = config.server.bind.parse().context("invalid bind address")?;
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind to {}", addr))?;
    axum::serve(listener, app).await?;

    Ok(())
}
