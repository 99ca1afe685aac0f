use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use eventease_core::CoreError;
use serde_json::json;

#[derive(Debug)]
pub enum AppError {
    AuthenticationError(String),
    Core(CoreError),
    InternalServerError(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, error_message) = match self {
            AppError::AuthenticationError(msg) => {
                (StatusCode::UNAUTHORIZED, "authentication_error", msg)
            }
            AppError::Core(err) => {
                let status = match &err {
                    CoreError::ValidationError(_) => StatusCode::BAD_REQUEST,
                    CoreError::InvalidTransitionError { .. }
                    | CoreError::StaleStateError(_)
                    | CoreError::ResponseWindowClosed { .. } => StatusCode::CONFLICT,
                    CoreError::AuthorizationError(_) => StatusCode::FORBIDDEN,
                    CoreError::NotFound(_) => StatusCode::NOT_FOUND,
                    CoreError::TransportError(_) => StatusCode::SERVICE_UNAVAILABLE,
                    CoreError::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
                };
                let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
                    tracing::error!("Internal Server Error: {}", err);
                    "Internal Server Error".to_string()
                } else {
                    tracing::debug!(code = err.code(), "Request rejected: {}", err);
                    err.to_string()
                };
                (status, err.code(), message)
            }
            AppError::InternalServerError(msg) => {
                tracing::error!("Internal Server Error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", "Internal Server Error".to_string())
            }
        };

        let body = Json(json!({
            "error": error_message,
            "code": code,
        }));

        (status, body).into_response()
    }
}

impl From<CoreError> for AppError {
    fn from(err: CoreError) -> Self {
        Self::Core(err)
    }
}
