//! Credential hook for turning a username/password into a player.
//!
//! The HTTP layer doesn't know where accounts live. It asks a
//! [`PlayerDirectory`] two questions: "are these credentials valid?" at
//! login, and "who is player N?" whenever a session cookie is presented.
//! [`AccountDirectory`](crate::AccountDirectory) answers from memory;
//! a database-backed directory would implement the same trait.

use std::future::Future;

use tsutome_protocol::{PlayerId, PublicPlayer};

use crate::SessionError;

/// Validates credentials and resolves player ids to public profiles.
///
/// - `Send + Sync` → one directory is shared by every request handler.
/// - `'static` → it lives as long as the server.
///
/// # Example
///
/// ```rust
/// use tsutome_protocol::{PlayerId, PublicPlayer, Role};
/// use tsutome_session::{PlayerDirectory, SessionError};
///
/// /// Knows exactly one account. Only for tests and demos.
/// struct SingleAccount(PublicPlayer);
///
/// impl PlayerDirectory for SingleAccount {
///     async fn verify(
///         &self,
///         username: &str,
///         password: &str,
///     ) -> Result<PublicPlayer, SessionError> {
///         if username == self.0.username && password == "secret" {
///             Ok(self.0.clone())
///         } else {
///             Err(SessionError::InvalidCredentials)
///         }
///     }
///
///     async fn lookup(&self, player_id: PlayerId) -> Option<PublicPlayer> {
///         (player_id == self.0.id).then(|| self.0.clone())
///     }
/// }
/// ```
pub trait PlayerDirectory: Send + Sync + 'static {
    /// Checks a username/password pair.
    ///
    /// # Returns
    /// - `Ok(PublicPlayer)`: credentials valid
    /// - `Err(SessionError::InvalidCredentials)`: unknown user or wrong
    ///   password (indistinguishable on purpose)
    /// - other errors: the check itself failed
    fn verify(
        &self,
        username: &str,
        password: &str,
    ) -> impl Future<Output = Result<PublicPlayer, SessionError>> + Send;

    /// Returns the current public profile of `player_id`, or `None` if the
    /// account no longer exists.
    fn lookup(
        &self,
        player_id: PlayerId,
    ) -> impl Future<Output = Option<PublicPlayer>> + Send;
}
