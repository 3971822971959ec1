//! HTTP rendering of library errors.
//!
//! Handlers return `Result<T, ApiError>`. Client errors carry their message;
//! internal errors are logged in full and reported generically so SQL or
//! file service details never reach the browser.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use tracing::error;

use crate::error::Error;

#[derive(Debug)]
pub struct ApiError(pub Error);

impl From<Error> for ApiError {
    fn from(e: Error) -> Self {
        Self(e)
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            Error::NotFound(_) => StatusCode::NOT_FOUND,
            Error::InvalidTransition { .. }
            | Error::AlreadyClaimed { .. }
            | Error::UsernameTaken(_) => StatusCode::CONFLICT,
            Error::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            Error::Forbidden(_) => StatusCode::FORBIDDEN,
            Error::Validation(_) => StatusCode::BAD_REQUEST,
            Error::Maintenance => StatusCode::SERVICE_UNAVAILABLE,
            Error::SelfDestructed { .. } => StatusCode::GONE,
            Error::FileStore(_) => StatusCode::BAD_GATEWAY,
            Error::Notification(_)
            | Error::Config(_)
            | Error::Store(_)
            | Error::Io(_)
            | Error::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self.0 {
            Error::FileStore(detail) => {
                error!(error = %detail, "file store error");
                "file service unavailable".to_string()
            }
            e if status == StatusCode::INTERNAL_SERVER_ERROR => {
                error!(error = %e, "internal server error");
                "internal server error".to_string()
            }
            e => e.to_string(),
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::item::Status;

    #[test]
    fn statuses_by_kind() {
        let cases = [
            (Error::NotFound("x".into()), 404),
            (
                Error::InvalidTransition {
                    from: Status::Queued,
                    to: Status::Completed,
                },
                409,
            ),
            (Error::Unauthenticated("x".into()), 401),
            (Error::Forbidden("x".into()), 403),
            (Error::Validation("x".into()), 400),
            (Error::Maintenance, 503),
            (Error::SelfDestructed { days: 5 }, 410),
            (Error::FileStore("x".into()), 502),
            (Error::Other("x".into()), 500),
        ];
        for (error, code) in cases {
            assert_eq!(ApiError(error).status().as_u16(), code);
        }
    }
}
