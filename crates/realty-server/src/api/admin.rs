use axum::{extract::State, http::HeaderMap, Json};
use serde::Serialize;
use tracing::info;

use realty_shared::PropertyStatus;

use super::AppState;
use crate::auth::verify_admin_token;
use crate::error::ServerError;

#[derive(Serialize)]
pub struct AdminStatusResponse {
    name: String,
    version: &'static str,
    registration_open: bool,
    uptime_secs: u64,
    users: u64,
    active_properties: u64,
    pending_captchas: usize,
}

#[derive(Serialize)]
pub struct CleanupResponse {
    deleted_messages: usize,
    expired_captchas: usize,
}

pub async fn status(
    headers: HeaderMap,
    State(state): State<AppState>,
) -> Result<Json<AdminStatusResponse>, ServerError> {
    verify_admin_token(&headers, &state.config)?;

    let (users, active_properties) = {
        let db = state.db.lock().await;
        (
            db.count_users(None)?,
            db.count_properties(PropertyStatus::Active)?,
        )
    };

    Ok(Json(AdminStatusResponse {
        name: state.config.instance_name.clone(),
        version: env!("CARGO_PKG_VERSION"),
        registration_open: state.config.registration_open,
        uptime_secs: state.started_at.elapsed().as_secs(),
        users,
        active_properties,
        pending_captchas: state.captcha.pending().await,
    }))
}

pub async fn cleanup(
    headers: HeaderMap,
    State(state): State<AppState>,
) -> Result<Json<CleanupResponse>, ServerError> {
    verify_admin_token(&headers, &state.config)?;

    let deleted_messages = state.db.lock().await.purge_orphaned_messages()?;
    let expired_captchas = state.captcha.purge_expired().await;

    info!(deleted_messages, expired_captchas, "Admin cleanup");
    Ok(Json(CleanupResponse {
        deleted_messages,
        expired_captchas,
    }))
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;

    use crate::api::test_support::*;
    use crate::config::ServerConfig;

    fn admin_app() -> axum::Router {
        test_app_with(ServerConfig {
            admin_token: Some("hunter22".into()),
            instance_name: "Test Homes".into(),
            ..ServerConfig::default()
        })
    }

    #[tokio::test]
    async fn test_admin_disabled_without_token() {
        let app = test_app();
        let (status, _) = call(&app, "GET", "/admin/status", Some("anything"), None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_admin_status_and_cleanup() {
        let app = admin_app();

        let (status, _) = call(&app, "GET", "/admin/status", Some("wrong"), None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        register(&app, "alice").await;
        let (status, body) = call(&app, "GET", "/admin/status", Some("hunter22"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["name"], "Test Homes");
        assert_eq!(body["users"], 1);
        assert_eq!(body["active_properties"], 0);

        let (status, body) = call(&app, "POST", "/admin/cleanup", Some("hunter22"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["deleted_messages"], 0);
    }
}
