//! HTTP API (axum).
//!
//! Handlers are grouped by area; this module owns the shared state, the
//! router and the listener.

mod accounts;
mod admin;
mod messaging;
mod properties;

use std::sync::Arc;
use std::time::Instant;

use axum::{
    extract::State,
    http::Method,
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use tokio::sync::Mutex;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use realty_shared::PropertyType;
use realty_store::{Database, SiteStats};

use crate::captcha::CaptchaStore;
use crate::config::ServerConfig;
use crate::error::ServerError;

#[derive(Clone)]
pub struct AppState {
    pub db: Arc<Mutex<Database>>,
    pub captcha: CaptchaStore,
    pub config: Arc<ServerConfig>,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(db: Database, config: ServerConfig) -> Self {
        Self {
            db: Arc::new(Mutex::new(db)),
            captcha: CaptchaStore::new(config.captcha_ttl),
            config: Arc::new(config),
            started_at: Instant::now(),
        }
    }
}

pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_check))
        .route("/", get(home))
        // accounts
        .route("/register/captcha", get(accounts::issue_captcha))
        .route("/register/check", get(accounts::check_availability))
        .route("/register", post(accounts::register))
        .route("/login", post(accounts::login))
        .route("/logout", post(accounts::logout))
        .route(
            "/profile",
            get(accounts::profile).post(accounts::update_profile),
        )
        // listings
        .route(
            "/properties",
            get(properties::search).post(properties::create),
        )
        .route(
            "/properties/:id",
            get(properties::detail)
                .post(properties::edit)
                .delete(properties::remove),
        )
        .route("/properties/:id/sold", post(properties::mark_sold))
        .route("/properties/:id/hide", post(properties::hide))
        .route("/properties/:id/reactivate", post(properties::reactivate))
        .route("/properties/:id/comments", post(properties::add_comment))
        // messaging
        .route("/messages", get(messaging::dialogues))
        .route("/messages/users", get(messaging::recipients))
        .route(
            "/messages/:user_id",
            get(messaging::conversation).post(messaging::send),
        )
        .route("/blacklist", get(messaging::blacklist))
        .route("/blacklist/:user_id", post(messaging::block))
        // admin
        .route("/admin/status", get(admin::status))
        .route("/admin/cleanup", post(admin::cleanup))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

#[derive(Serialize)]
struct TypeChoice {
    value: &'static str,
    label: &'static str,
}

#[derive(Serialize)]
struct HomeResponse {
    name: String,
    #[serde(flatten)]
    stats: SiteStats,
    /// Choices for the search form's type selector.
    property_types: Vec<TypeChoice>,
}

async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

async fn home(State(state): State<AppState>) -> Result<Json<HomeResponse>, ServerError> {
    let stats = state.db.lock().await.site_stats()?;
    Ok(Json(HomeResponse {
        name: state.config.instance_name.clone(),
        stats,
        property_types: PropertyType::ALL
            .iter()
            .map(|t| TypeChoice {
                value: t.as_str(),
                label: t.label(),
            })
            .collect(),
    }))
}

pub async fn serve(state: AppState, addr: std::net::SocketAddr) -> anyhow::Result<()> {
    let app = build_router(state);

    info!(addr = %addr, "Starting HTTP API server");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
