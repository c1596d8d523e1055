//! Error types for the state layer.

use tsutome_client::ClientError;

/// Errors returned by [`AuthContext`](crate::AuthContext) operations.
///
/// Probe failures are not in here: they are folded into
/// [`AuthState`](crate::AuthState) as a retryable state.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    /// The request itself failed (bad credentials, server, network).
    #[error(transparent)]
    Client(#[from] ClientError),

    /// Another login on the same context has not settled yet. No request
    /// was sent for this one.
    #[error("a login is already in progress")]
    LoginInFlight,

    /// The context was disposed (the UI root unmounted).
    #[error("auth context has been disposed")]
    Disposed,
}
