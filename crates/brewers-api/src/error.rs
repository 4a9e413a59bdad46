use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Authentication required")]
    Unauthorized,

    #[error("{0}")]
    Forbidden(String),

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Conflict(String),

    /// A request pointed at a parent record that does not exist.
    #[error("Referenced {0} does not exist")]
    InvalidReference(&'static str),

    #[error("Internal error: {0:#}")]
    Internal(anyhow::Error),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::InvalidReference(_) | ApiError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Replaces the generic message of a storage uniqueness conflict.
    pub fn on_conflict(self, message: &str) -> Self {
        match self {
            ApiError::Conflict(_) => ApiError::Conflict(message.to_string()),
            other => other,
        }
    }
}

/// Storage errors are internal unless they are uniqueness violations, which
/// the user can act on.
impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        if brewers_db::is_unique_violation(&err) {
            ApiError::Conflict("Record already exists".to_string())
        } else {
            ApiError::Internal(err)
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();

        let message = match &self {
            ApiError::Internal(e) => {
                error!("Internal error: {:#}", e);
                "Internal server error".to_string()
            }
            other => other.to_string(),
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}

/// Required text fields reject empty and whitespace-only input.
pub fn require_text(field: &str, value: &str) -> Result<(), ApiError> {
    if value.trim().is_empty() {
        return Err(ApiError::Validation(format!("{field} is required")));
    }
    Ok(())
}
