//! Error taxonomy of the auth client.
//!
//! A 401 on the session probe is NOT in here: it is the normal "logged
//! out" answer and comes back as `Ok(None)`.

use tsutome_protocol::ProtocolError;
use tsutome_transport::TransportError;

/// Errors returned by [`AuthApi`](crate::AuthApi).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ClientError {
    /// Login rejected. Carries the server's message with any
    /// `"401: "` prefix already stripped, ready to show inline.
    #[error("{0}")]
    InvalidCredentials(String),

    /// The server answered with an error status other than the expected
    /// 401 (5xx, or an unexpected 4xx).
    #[error("server error ({status}): {message}")]
    Server { status: u16, message: String },

    /// No HTTP status was obtained (refused, reset, timed out), or the
    /// probe got a status it has no meaning for.
    #[error("network error: {0}")]
    Network(String),

    /// A player-scoped query was made without a live session.
    #[error("not logged in")]
    Unauthenticated,

    /// The status was fine but the body didn't parse.
    #[error("unexpected response: {0}")]
    Decode(String),
}

impl ClientError {
    /// Text suitable for an inline form message.
    pub fn user_message(&self) -> String {
        match self {
            Self::InvalidCredentials(message) => message.clone(),
            Self::Server { message, .. } if !message.is_empty() => {
                message.clone()
            }
            Self::Server { .. } => "Server error".to_string(),
            Self::Network(_) => {
                "Could not reach the server. Please try again.".to_string()
            }
            Self::Unauthenticated => "Please log in.".to_string(),
            Self::Decode(_) => "Unexpected response from the server.".to_string(),
        }
    }

    /// `true` when trying again later might succeed without the user
    /// changing anything.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Network(_) | Self::Server { .. } | Self::Decode(_))
    }
}

impl From<TransportError> for ClientError {
    fn from(e: TransportError) -> Self {
        Self::Network(e.to_string())
    }
}

impl From<ProtocolError> for ClientError {
    fn from(e: ProtocolError) -> Self {
        Self::Decode(e.to_string())
    }
}
