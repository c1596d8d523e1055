//! Session types: the server's record of a logged-in browser.
//!
//! A session tracks:
//! - WHO is logged in (`PlayerId`)
//! - HOW the browser proves it (an opaque token, sent as a cookie)
//! - WHEN it was last used (so idle sessions can be expired)

use std::time::{Duration, Instant};

use tsutome_protocol::PlayerId;

// ---------------------------------------------------------------------------
// SessionConfig
// ---------------------------------------------------------------------------

/// Configuration for session lifetime.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// How long (in seconds) a session may go unused before it is
    /// expired. Every successful lookup resets the clock.
    ///
    /// Default: one week. 0 expires every session on its first lookup.
    pub idle_timeout_secs: u64,

    /// How often (in seconds) the server sweeps idle sessions out of
    /// memory. Lookups expire sessions on their own; the sweep only
    /// reclaims the ones nobody presents again.
    pub reap_interval_secs: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            idle_timeout_secs: 7 * 24 * 60 * 60,
            reap_interval_secs: 60,
        }
    }
}

impl SessionConfig {
    /// The idle timeout as a `Duration`.
    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs)
    }
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// A single logged-in browser.
///
/// Created by a successful `POST /api/login`, destroyed by
/// `POST /api/logout` or idle expiry. One player may hold several
/// sessions at once (phone and laptop).
#[derive(Debug, Clone)]
pub struct Session {
    /// 32 hex characters (128 bits of randomness). The client never
    /// interprets it; it only stores and replays the cookie.
    pub token: String,

    /// Which player this session belongs to.
    pub player_id: PlayerId,

    /// When the session was created.
    pub created_at: Instant,

    /// When the session was last presented.
    pub last_seen: Instant,
}

impl Session {
    pub(crate) fn new(token: String, player_id: PlayerId) -> Self {
        let now = Instant::now();
        Self {
            token,
            player_id,
            created_at: now,
            last_seen: now,
        }
    }

    /// `true` once the session has been idle for at least `timeout`.
    ///
    /// `>=` rather than `>` so a zero timeout expires deterministically.
    pub fn is_idle(&self, timeout: Duration) -> bool {
        self.last_seen.elapsed() >= timeout
    }

    /// Time since the session was created.
    pub fn age(&self) -> Duration {
        self.created_at.elapsed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_config_default() {
        let config = SessionConfig::default();
        assert_eq!(config.idle_timeout(), Duration::from_secs(604_800));
        assert_eq!(config.reap_interval_secs, 60);
    }

    #[test]
    fn test_is_idle_zero_timeout_always_idle() {
        let session = Session::new("t".into(), PlayerId(1));
        assert!(session.is_idle(Duration::ZERO));
    }

    #[test]
    fn test_age_counts_from_creation_not_last_seen() {
        let mut session = Session::new("t".into(), PlayerId(1));
        session.created_at -= Duration::from_secs(30);

        assert!(session.age() >= Duration::from_secs(30));
        assert!(session.last_seen.elapsed() < Duration::from_secs(30));
    }

    #[test]
    fn test_is_idle_long_timeout_not_idle() {
        let session = Session::new("t".into(), PlayerId(1));
        assert!(!session.is_idle(Duration::from_secs(3600)));
    }
}
