use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;

use realty_shared::ValidationError;
use realty_store::StoreError;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error(transparent)]
    Validation(ValidationError),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<StoreError> for ServerError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound => ServerError::NotFound("Record not found".into()),
            StoreError::Validation(v) => ServerError::Validation(v),
            StoreError::Blocked => ServerError::Forbidden(StoreError::Blocked.to_string()),
            StoreError::Forbidden(reason) => ServerError::Forbidden(reason),
            other => {
                tracing::error!(error = %other, "store failure");
                ServerError::Internal(other.to_string())
            }
        }
    }
}

impl From<ValidationError> for ServerError {
    fn from(e: ValidationError) -> Self {
        ServerError::Validation(e)
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ServerError::Validation(v) => {
                let errors: serde_json::Map<String, serde_json::Value> = v
                    .fields()
                    .iter()
                    .map(|(field, messages)| {
                        let list = messages
                            .iter()
                            .map(|m| json!({ "message": m }))
                            .collect();
                        (field.clone(), serde_json::Value::Array(list))
                    })
                    .collect();
                let body = json!({ "success": false, "errors": errors });
                return (StatusCode::BAD_REQUEST, axum::Json(body)).into_response();
            }
            ServerError::NotFound(_) => (StatusCode::NOT_FOUND, self.to_string()),
            ServerError::Unauthorized(_) => (StatusCode::UNAUTHORIZED, self.to_string()),
            ServerError::Forbidden(_) => (StatusCode::FORBIDDEN, self.to_string()),
            ServerError::Internal(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
            ),
        };

        let body = json!({
            "error": message,
        });

        (status, axum::Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_errors_map_to_status() {
        let cases = [
            (StoreError::NotFound, StatusCode::NOT_FOUND),
            (StoreError::Blocked, StatusCode::FORBIDDEN),
            (StoreError::Forbidden("owner only".into()), StatusCode::FORBIDDEN),
            (
                StoreError::Validation(ValidationError::single("content", "required")),
                StatusCode::BAD_REQUEST,
            ),
            (StoreError::Migration("boom".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, status) in cases {
            assert_eq!(ServerError::from(err).into_response().status(), status);
        }
    }
}
