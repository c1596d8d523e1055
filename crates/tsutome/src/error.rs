//! Error types for the server crate.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use tsutome_protocol::MessageBody;
use tsutome_session::SessionError;

/// Errors from building or running the server.
///
/// The `#[from]` attribute on each variant auto-generates `From` impls,
/// so the `?` operator converts sub-crate errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum TsutomeError {
    /// Seeding accounts failed.
    #[error(transparent)]
    Session(#[from] SessionError),

    /// Binding or serving failed.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// An environment variable held something unusable.
    #[error("invalid configuration: {0}")]
    Config(String),
}

/// Errors a request handler answers with.
///
/// Every variant renders as `{"message": "..."}` with the matching
/// status code.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ApiError {
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Not authenticated")]
    Unauthenticated,

    #[error("{0}")]
    BadRequest(String),

    #[error("Internal server error")]
    Internal,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::InvalidCredentials | ApiError::Unauthenticated => StatusCode::UNAUTHORIZED,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<SessionError> for ApiError {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::InvalidCredentials => ApiError::InvalidCredentials,
            SessionError::UnknownSession | SessionError::SessionExpired(_) => {
                ApiError::Unauthenticated
            }
            SessionError::UsernameTaken(name) => {
                ApiError::BadRequest(format!("username {name} is taken"))
            }
            SessionError::Hashing(e) => {
                tracing::error!(error = %e, "password check failed");
                ApiError::Internal
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status(), Json(MessageBody::new(self.to_string()))).into_response()
    }
}
