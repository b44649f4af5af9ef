use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use lure_core::{ErrorKind, SpoofError};
use tracing::{error, warn};

pub enum ApiError {
    Spoof(SpoofError),
    SessionActive,
}

impl From<SpoofError> for ApiError {
    fn from(err: SpoofError) -> Self {
        Self::Spoof(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ApiError::SessionActive => (
                StatusCode::CONFLICT,
                "a spoofing session is already active".to_string(),
            ),
            ApiError::Spoof(err) => match err.kind() {
                ErrorKind::Configuration => (StatusCode::BAD_REQUEST, err.to_string()),
                ErrorKind::Resource | ErrorKind::Resolution | ErrorKind::Transmission => {
                    (StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
                }
            },
        };

        if status.is_server_error() {
            error!(status = status.as_u16(), %message, "request failed");
        } else {
            warn!(status = status.as_u16(), %message, "request rejected");
        }
        (status, message).into_response()
    }
}
