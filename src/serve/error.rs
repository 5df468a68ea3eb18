use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use super::dispatch::AttemptResult;

#[derive(Debug)]
pub enum ApiError {
    /// No credential supplied.
    Unauthorized,
    /// Credential supplied but wrong.
    Forbidden,
    BadRequest(String),
    Configuration(String),
    UpstreamUnavailable(Vec<AttemptResult>),
    /// Upstream answered 401/403, remaining candidates were skipped.
    UpstreamAuth(Vec<AttemptResult>),
}

#[derive(Serialize)]
struct ErrorBody {
    ok: bool,
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    attempts: Option<Vec<AttemptResult>>,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden => StatusCode::FORBIDDEN,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Configuration(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::UpstreamUnavailable(_) | ApiError::UpstreamAuth(_) => {
                StatusCode::BAD_GATEWAY
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let (error, attempts) = match self {
            ApiError::Unauthorized => ("unauthorized".to_string(), None),
            ApiError::Forbidden => ("forbidden".to_string(), None),
            ApiError::BadRequest(msg) => (msg, None),
            ApiError::Configuration(msg) => (msg, None),
            ApiError::UpstreamUnavailable(attempts) => {
                ("upstream unavailable".to_string(), Some(attempts))
            }
            ApiError::UpstreamAuth(attempts) => {
                ("upstream rejected credentials".to_string(), Some(attempts))
            }
        };

        let body = ErrorBody {
            ok: false,
            error,
            attempts,
        };
        (status, Json(body)).into_response()
    }
}
