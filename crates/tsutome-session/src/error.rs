//! Error types for the session layer.

use tsutome_protocol::PlayerId;

/// Errors that can occur during login, session lookup, and account setup.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// Username unknown or password wrong. Deliberately one variant, so
    /// a caller can't tell which of the two it was.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// No session exists for the presented token. Either it never existed,
    /// the player logged out, or it was already reaped.
    #[error("unknown session")]
    UnknownSession,

    /// The session existed but sat idle longer than the configured timeout.
    /// It has been removed as a side effect of the lookup.
    #[error("session expired for player {0}")]
    SessionExpired(PlayerId),

    /// Registration with a username that is already in use.
    #[error("username {0:?} is already taken")]
    UsernameTaken(String),

    /// Password hashing or verification failed for a reason other than a
    /// wrong password (bad parameters, corrupt stored hash, task panic).
    #[error("password hashing failed: {0}")]
    Hashing(String),
}
