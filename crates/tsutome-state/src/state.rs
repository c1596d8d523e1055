//! The value every subscriber of an [`AuthContext`](crate::AuthContext)
//! sees.

use tsutome_protocol::{PlayerId, PublicPlayer, Role};

/// What the client currently believes about its session.
///
/// ```text
///          ┌───────────── loading ─────────────┐
///          │   user: None, is_loading: true    │
///          └──────┬─────────────────────┬──────┘
///       probe 200 │                     │ probe 401 / network error
///                 ▼                     ▼
///       authenticated(user)      unauthenticated
///                 │   ▲  login ok       │
///                 │   └─────────────────┘
///                 └── logout / 401 ─────┘
/// ```
///
/// `authenticated` is not stored; it is derived from `user`, so the two
/// can never disagree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthState {
    user: Option<PublicPlayer>,
    is_loading: bool,
    probe_error: Option<String>,
}

impl AuthState {
    /// Before the first probe has resolved.
    pub fn loading() -> Self {
        Self {
            user: None,
            is_loading: true,
            probe_error: None,
        }
    }

    /// A probe answered definitively: `Some` for a live session, `None`
    /// for "not logged in".
    pub fn resolved(user: Option<PublicPlayer>) -> Self {
        Self {
            user,
            is_loading: false,
            probe_error: None,
        }
    }

    /// The probe could not reach a verdict. The last known user (if any)
    /// is kept and the failure is recorded for a retry prompt.
    pub(crate) fn unreachable(user: Option<PublicPlayer>, error: String) -> Self {
        Self {
            user,
            is_loading: false,
            probe_error: Some(error),
        }
    }

    pub fn user(&self) -> Option<&PublicPlayer> {
        self.user.as_ref()
    }

    pub fn authenticated(&self) -> bool {
        self.user.is_some()
    }

    pub fn is_loading(&self) -> bool {
        self.is_loading
    }

    /// Why the last probe failed, if it did.
    pub fn probe_error(&self) -> Option<&str> {
        self.probe_error.as_deref()
    }

    /// `true` when the UI should offer a retry rather than trust the
    /// current verdict.
    pub fn is_retryable(&self) -> bool {
        self.probe_error.is_some()
    }

    pub fn player_id(&self) -> Option<PlayerId> {
        self.user.as_ref().map(|u| u.id)
    }

    pub fn role(&self) -> Option<Role> {
        self.user.as_ref().map(|u| u.role)
    }
}

impl Default for AuthState {
    fn default() -> Self {
        Self::loading()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn player(id: u64, role: Role) -> PublicPlayer {
        PublicPlayer {
            id: PlayerId(id),
            username: format!("p{id}"),
            display_name: format!("P{id}"),
            role,
            level: 1,
            exp: 0,
            coins: 0,
        }
    }

    #[test]
    fn test_loading_has_no_user() {
        let state = AuthState::loading();
        assert!(state.is_loading());
        assert!(!state.authenticated());
        assert!(state.user().is_none());
        assert_eq!(state, AuthState::default());
    }

    #[test]
    fn test_resolved_authenticated_tracks_user() {
        let signed_in = AuthState::resolved(Some(player(1, Role::Admin)));
        let signed_out = AuthState::resolved(None);

        assert!(signed_in.authenticated());
        assert_eq!(signed_in.role(), Some(Role::Admin));
        assert_eq!(signed_in.player_id(), Some(PlayerId(1)));
        assert!(!signed_out.authenticated());
        assert!(!signed_out.is_loading());
        assert!(!signed_out.is_retryable());
    }

    #[test]
    fn test_unreachable_keeps_user_and_is_retryable() {
        let state = AuthState::unreachable(Some(player(2, Role::Player)), "down".into());

        assert!(state.authenticated());
        assert!(!state.is_loading());
        assert!(state.is_retryable());
        assert_eq!(state.probe_error(), Some("down"));
    }
}
