//! Realty HTTP server.
//!
//! This binary provides:
//! - **Accounts**: captcha-gated registration, bearer sessions, profiles
//! - **Listings**: property search, detail pages, owner edits, comments
//! - **Messaging**: direct messages, the dialogue list and the blacklist
//! - **Admin API** behind a static bearer token

mod api;
mod auth;
mod captcha;
mod config;
mod error;

use std::time::Duration;

use tracing::info;
use tracing_subscriber::EnvFilter;

use realty_store::Database;

use crate::api::AppState;
use crate::config::ServerConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // -----------------------------------------------------------------------
    // 1. Initialize tracing (respects RUST_LOG env var)
    // -----------------------------------------------------------------------
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                EnvFilter::new("info,realty_server=debug,realty_store=info")
            }),
        )
        .init();

    info!("Starting Realty server v{}", env!("CARGO_PKG_VERSION"));

    // -----------------------------------------------------------------------
    // 2. Load configuration
    // -----------------------------------------------------------------------
    let config = ServerConfig::from_env();
    info!(
        instance = %config.instance_name,
        registration_open = config.registration_open,
        admin_enabled = config.admin_token.is_some(),
        captcha_ttl_secs = config.captcha_ttl.as_secs(),
        "Loaded configuration"
    );

    // -----------------------------------------------------------------------
    // 3. Open the database (runs migrations)
    // -----------------------------------------------------------------------
    let db = match &config.database_path {
        Some(path) => {
            if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
                std::fs::create_dir_all(dir)?;
            }
            Database::open_at(path)?
        }
        None => Database::new()?,
    };

    let http_addr = config.http_addr;
    let app_state = AppState::new(db, config);

    // -----------------------------------------------------------------------
    // 4. Spawn background tasks
    // -----------------------------------------------------------------------

    // Expired captcha cleanup (every minute)
    let captchas = app_state.captcha.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(60));
        loop {
            interval.tick().await;
            let purged = captchas.purge_expired().await;
            if purged > 0 {
                tracing::debug!(purged, "expired captchas removed");
            }
        }
    });

    // -----------------------------------------------------------------------
    // 5. Run the HTTP server (blocks until shutdown)
    // -----------------------------------------------------------------------
    tokio::select! {
        result = api::serve(app_state, http_addr) => {
            if let Err(e) = result {
                tracing::error!(error = %e, "HTTP server failed");
                return Err(e);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down");
        }
    }

    Ok(())
}
