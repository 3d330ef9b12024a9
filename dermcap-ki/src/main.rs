//! dermcap-ki - KM Import microservice
//!
//! **Module Identity:**
//! - Name: dermcap-ki (KM Import)
//! - Default port: 5790
//!
//! Serves the operator form's preview and upload calls. One instance runs per
//! site server; every configured location is selectable from the form.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use dermcap_common::config::{ConfigFileResolver, TomlConfig};
use tokio::signal;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use dermcap_ki::AppState;

/// Command-line arguments for dermcap-ki
#[derive(Parser, Debug)]
#[command(name = "dermcap-ki")]
#[command(about = "Skin measurement import service")]
#[command(version)]
struct Args {
    /// TOML configuration file
    #[arg(short, long, env = "DERMCAP_CONFIG")]
    config: Option<PathBuf>,

    /// Port to listen on (overrides the config file)
    #[arg(short, long, env = "DERMCAP_KI_PORT")]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Config is loaded before logging so its level can seed the filter
    let config_path = ConfigFileResolver::new("dermcap-ki")
        .resolve(args.config.as_deref())
        .context("Failed to locate configuration")?;
    let mut config = TomlConfig::load(&config_path)
        .with_context(|| format!("Failed to load {}", config_path.display()))?;
    if let Some(port) = args.port {
        config.port = port;
    }

    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                EnvFilter::new(format!("{},tower_http=info", config.logging.level))
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting dermcap-ki (KM Import) microservice");
    info!(
        version = env!("CARGO_PKG_VERSION"),
        git_hash = env!("GIT_HASH"),
        build_timestamp = env!("BUILD_TIMESTAMP"),
        build_profile = env!("BUILD_PROFILE"),
        "Build info"
    );
    info!("Configuration: {}", config_path.display());
    for location in &config.locations {
        info!(
            location = %location.name,
            session_scoped = location.session_scoped,
            operators = location.operators.len(),
            reference = location.reference.is_some(),
            "Location configured"
        );
    }

    let addr = format!("{}:{}", config.host, config.port);
    let state = AppState::new(config).context("Failed to initialize application state")?;
    let app = dermcap_ki::build_router(state);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;
    info!("Listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Resolves on Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
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
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
