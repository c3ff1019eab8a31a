use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use tracing::error;

use crate::runtime::CommandError;

const LOG_TARGET: &str = "server::error";

/// HTTP-facing wrapper over `CommandError`, mapping the full error-kind
/// table onto HTTP status codes.
#[derive(Debug)]
pub struct ApiError(CommandError);

#[derive(Debug, Serialize)]
struct ErrorBody {
    code: &'static str,
    message: String,
}

impl From<CommandError> for ApiError {
    fn from(err: CommandError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = match &self.0 {
            CommandError::Unauthorized => (StatusCode::UNAUTHORIZED, "unauthorized"),
            CommandError::ForbiddenPolicy(_) => (StatusCode::FORBIDDEN, "forbidden_policy"),
            CommandError::ConflictState(_) => (StatusCode::CONFLICT, "conflict_state"),
            CommandError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
            CommandError::InvalidInput(_) => (StatusCode::BAD_REQUEST, "invalid_input"),
            CommandError::StoreFailure(_) => (StatusCode::SERVICE_UNAVAILABLE, "store_failure"),
            CommandError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal"),
        };
        if status == StatusCode::INTERNAL_SERVER_ERROR || status == StatusCode::SERVICE_UNAVAILABLE {
            error!(target: LOG_TARGET, error = %self.0, "command failed");
        }
        let body = ErrorBody {
            code,
            message: self.0.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status_for(err: CommandError) -> StatusCode {
        ApiError::from(err).into_response().status()
    }

    #[test]
    fn taxonomy_maps_to_expected_status_codes() {
        assert_eq!(status_for(CommandError::Unauthorized), StatusCode::UNAUTHORIZED);
        assert_eq!(
            status_for(CommandError::ForbiddenPolicy("x".into())),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            status_for(CommandError::ConflictState("x".into())),
            StatusCode::CONFLICT
        );
        assert_eq!(status_for(CommandError::NotFound("x".into())), StatusCode::NOT_FOUND);
        assert_eq!(
            status_for(CommandError::InvalidInput("x".into())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_for(CommandError::StoreFailure("x".into())),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            status_for(CommandError::Internal("x".into())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
