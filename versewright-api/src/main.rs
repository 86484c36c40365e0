//! versewright-api - Poem generation service
//!
//! HTTP backend for the Versewright poetry application: metered poem
//! generation behind an entitlement gate, a per-user poem library, and
//! subscription billing via Stripe checkout and webhooks.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tracing::{error, info, warn};
use versewright_common::config::Config;
use versewright_common::db::init_database;
use versewright_api::auth::{HttpIdentityProvider, IdentityProvider, StaticIdentityProvider};
use versewright_api::{build_router, generation, AppState};

/// Command-line arguments for versewright-api
#[derive(Parser, Debug)]
#[command(name = "versewright-api")]
#[command(about = "Poem generation service for Versewright")]
#[command(version)]
struct Args {
    /// Path to a TOML configuration file
    #[arg(short, long, env = "VERSEWRIGHT_CONFIG")]
    config: Option<PathBuf>,

    /// Port to listen on (overrides configuration)
    #[arg(short, long)]
    port: Option<u16>,

    /// Host to bind (overrides configuration)
    #[arg(long)]
    host: Option<String>,

    /// SQLite database path (overrides configuration)
    #[arg(long)]
    database: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing subscriber
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    info!(
        "Starting Versewright API v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    let args = Args::parse();

    // Precedence: CLI > environment > TOML > built-in default
    let mut config = Config::load(args.config.as_deref()).context("Failed to load configuration")?;
    if let Some(host) = args.host {
        config.server.host = host;
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }
    if let Some(database) = args.database {
        config.database.path = database;
    }

    info!("Database path: {}", config.database.path.display());
    let pool = match init_database(&config.database.path).await {
        Ok(pool) => {
            info!("✓ Database ready");
            pool
        }
        Err(e) => {
            error!("Failed to initialize database: {}", e);
            return Err(e.into());
        }
    };

    let generator = generation::from_config(&config.generation);
    info!("Generation backend: {}", generator.backend_id());

    let identity: Arc<dyn IdentityProvider> = match &config.identity.base_url {
        Some(base_url) => {
            info!("Identity provider: {}", base_url);
            Arc::new(HttpIdentityProvider::new(
                base_url.clone(),
                Duration::from_secs(config.identity.timeout_secs),
            ))
        }
        None => {
            warn!("No identity provider configured; bearer tokens will be rejected");
            Arc::new(StaticIdentityProvider::new())
        }
    };

    if config.billing.secret_key.is_none() || config.billing.price_id.is_none() {
        info!("Billing credentials not configured; checkout endpoint disabled");
    }
    if config.billing.webhook_secret.is_none() {
        warn!("No webhook signing secret configured; webhook endpoint disabled");
    }

    let state = AppState::new(pool, generator, identity, &config.billing);
    let app = build_router(state);

    let addr = config.server.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .context("Failed to bind to address")?;
    info!("versewright-api listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
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
