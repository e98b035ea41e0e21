//! Registration, login and the profile screen.

use axum::{
    extract::{Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use realty_shared::ValidationError;
use realty_store::{password, NewUser, ProfileUpdate, PropertyCard, StoreError, User};

use super::AppState;
use crate::auth::CurrentUser;
use crate::error::ServerError;

#[derive(Serialize)]
pub struct CaptchaResponse {
    token: Uuid,
    text: String,
}

#[derive(Deserialize)]
pub struct AvailabilityQuery {
    username: Option<String>,
    email: Option<String>,
}

#[derive(Serialize)]
pub struct AvailabilityResponse {
    username_exists: Option<bool>,
    email_exists: Option<bool>,
}

#[derive(Deserialize)]
pub struct RegisterRequest {
    #[serde(flatten)]
    form: NewUser,
    captcha_token: Uuid,
    captcha: String,
}

#[derive(Deserialize)]
pub struct LoginRequest {
    username: String,
    password: String,
}

#[derive(Serialize)]
pub struct SessionResponse {
    success: bool,
    token: String,
    user: User,
}

#[derive(Serialize)]
pub struct ProfileResponse {
    user: User,
    properties: Vec<PropertyCard>,
}

pub async fn issue_captcha(State(state): State<AppState>) -> Json<CaptchaResponse> {
    let (token, text) = state.captcha.issue().await;
    Json(CaptchaResponse { token, text })
}

/// Live form check; only the parameters present are answered.
pub async fn check_availability(
    State(state): State<AppState>,
    Query(query): Query<AvailabilityQuery>,
) -> Result<Json<AvailabilityResponse>, ServerError> {
    let db = state.db.lock().await;
    let username_exists = match query.username.as_deref().map(str::trim) {
        Some(name) if !name.is_empty() => Some(db.username_exists(name)?),
        _ => None,
    };
    let email_exists = match query.email.as_deref().map(str::trim) {
        Some(email) if !email.is_empty() => Some(db.email_exists(email)?),
        _ => None,
    };
    Ok(Json(AvailabilityResponse {
        username_exists,
        email_exists,
    }))
}

/// Create an account and log it in.
pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<Json<SessionResponse>, ServerError> {
    if !state.config.registration_open {
        return Err(ServerError::Forbidden("Registration is closed".into()));
    }
    if !state.captcha.verify(req.captcha_token, &req.captcha).await {
        return Err(ValidationError::single("captcha", "Invalid verification code").into());
    }

    let password1 = req.form.password1.clone();
    let password_hash = blocking(move || password::hash_password(&password1)).await?;

    let db = state.db.lock().await;
    let user = db.insert_user(&req.form, &password_hash)?;
    let token = db.create_session(user.id)?;

    Ok(Json(SessionResponse {
        success: true,
        token,
        user,
    }))
}

pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<SessionResponse>, ServerError> {
    let rejected = || ServerError::Unauthorized("Invalid username or password".into());

    let found = state.db.lock().await.credentials(&req.username);
    let (user, hash) = match found {
        Ok(found) => found,
        Err(StoreError::NotFound) => return Err(rejected()),
        Err(e) => return Err(e.into()),
    };

    let attempt = req.password;
    if !blocking(move || password::verify_password(&attempt, &hash)).await? {
        tracing::debug!(user_id = %user.id, "password mismatch");
        return Err(rejected());
    }

    let token = state.db.lock().await.create_session(user.id)?;

    info!(user_id = %user.id, "user logged in");
    Ok(Json(SessionResponse {
        success: true,
        token,
        user,
    }))
}

/// Run Argon2 work off the async workers. The db mutex is not held here.
async fn blocking<T, F>(work: F) -> Result<T, ServerError>
where
    T: Send + 'static,
    F: FnOnce() -> realty_store::Result<T> + Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| ServerError::Internal(e.to_string()))?
        .map_err(Into::into)
}

pub async fn logout(
    State(state): State<AppState>,
    current: CurrentUser,
) -> Result<Json<serde_json::Value>, ServerError> {
    state.db.lock().await.delete_session(&current.token)?;
    Ok(Json(serde_json::json!({ "success": true })))
}

pub async fn profile(
    State(state): State<AppState>,
    current: CurrentUser,
) -> Result<Json<ProfileResponse>, ServerError> {
    let properties = state
        .db
        .lock()
        .await
        .properties_for_owner(current.user.id)?;
    Ok(Json(ProfileResponse {
        user: current.user,
        properties,
    }))
}

pub async fn update_profile(
    State(state): State<AppState>,
    current: CurrentUser,
    Json(update): Json<ProfileUpdate>,
) -> Result<Json<serde_json::Value>, ServerError> {
    let user = state
        .db
        .lock()
        .await
        .update_profile(current.user.id, &update)?;
    Ok(Json(serde_json::json!({ "success": true, "user": user })))
}
