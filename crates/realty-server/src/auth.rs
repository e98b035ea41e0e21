//! Request authentication: user sessions and the admin token.

use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::{header, HeaderMap};
use subtle::ConstantTimeEq;

use realty_store::{StoreError, User};

use crate::api::AppState;
use crate::config::ServerConfig;
use crate::error::ServerError;

/// The user behind the request's `Authorization: Bearer <token>` header.
pub struct CurrentUser {
    pub user: User,
    pub token: String,
}

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = ServerError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(&parts.headers)
            .ok_or_else(|| ServerError::Unauthorized("Login required".into()))?
            .to_string();

        let db = state.db.lock().await;
        match db.session_user(&token) {
            Ok(user) => Ok(CurrentUser { user, token }),
            Err(StoreError::NotFound) => {
                Err(ServerError::Unauthorized("Invalid or expired session".into()))
            }
            Err(e) => Err(e.into()),
        }
    }
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

pub fn verify_admin_token(headers: &HeaderMap, config: &ServerConfig) -> Result<(), ServerError> {
    let Some(ref expected) = config.admin_token else {
        return Err(ServerError::Forbidden(
            "Admin API is disabled (no ADMIN_TOKEN configured)".into(),
        ));
    };

    let token = bearer_token(headers).unwrap_or("");

    // Constant-time comparison so the token cannot be guessed byte by byte.
    let token_bytes = token.as_bytes();
    let expected_bytes = expected.as_bytes();
    if token_bytes.len() != expected_bytes.len()
        || token_bytes.ct_eq(expected_bytes).unwrap_u8() != 1
    {
        tracing::warn!("rejected admin token");
        return Err(ServerError::Forbidden("Invalid admin token".into()));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers_with(auth: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_str(auth).unwrap());
        headers
    }

    #[test]
    fn test_bearer_token_parsing() {
        assert_eq!(bearer_token(&headers_with("Bearer abc")), Some("abc"));
        assert_eq!(bearer_token(&headers_with("Basic abc")), None);
        assert_eq!(bearer_token(&headers_with("Bearer ")), None);
        assert_eq!(bearer_token(&HeaderMap::new()), None);
    }

    #[test]
    fn test_admin_token() {
        let mut config = ServerConfig::default();
        assert!(verify_admin_token(&headers_with("Bearer x"), &config).is_err());

        config.admin_token = Some("letmein".into());
        assert!(verify_admin_token(&headers_with("Bearer letmein"), &config).is_ok());
        assert!(verify_admin_token(&headers_with("Bearer letmeout"), &config).is_err());
        assert!(verify_admin_token(&HeaderMap::new(), &config).is_err());
    }
}
