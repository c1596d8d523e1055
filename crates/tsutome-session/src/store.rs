//! The session store: maps session tokens to player ids.
//!
//! Responsibilities:
//! - Issuing a fresh token when a player logs in
//! - Resolving a token back to a player (and refreshing its idle clock)
//! - Destroying sessions on logout
//! - Expiring sessions that sat idle too long
//!
//! # Concurrency note
//!
//! `SessionStore` is NOT thread-safe by itself: it uses a plain `HashMap`.
//! The server wraps it in a `tokio::sync::Mutex` and holds the lock only
//! for the duration of one call, never across network I/O.

use std::collections::HashMap;

use rand::Rng;
use tsutome_protocol::PlayerId;

use crate::{Session, SessionConfig, SessionError};

/// Holds every live session, keyed by token.
///
/// ## Lifecycle
///
/// ```text
/// create() ──→ resolve() ──→ ... ──→ destroy()
///                  │
///                  └── idle ≥ timeout ──→ removed, SessionExpired
///
/// expire_stale() sweeps idle sessions nobody presents again.
/// ```
pub struct SessionStore {
    /// Live sessions, keyed by their token.
    sessions: HashMap<String, Session>,

    /// Configuration (idle timeout).
    config: SessionConfig,
}

impl SessionStore {
    /// Creates a new, empty store with the given config.
    pub fn new(config: SessionConfig) -> Self {
        Self {
            sessions: HashMap::new(),
            config,
        }
    }

    /// The store's configuration.
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Creates a session for a player who just proved their identity.
    ///
    /// Existing sessions of the same player are left alone: logging in on
    /// a second device doesn't log the first one out.
    pub fn create(&mut self, player_id: PlayerId) -> &Session {
        let mut token = generate_token();
        // 128 random bits won't collide in practice; the loop makes the
        // "one token, one session" invariant unconditional anyway.
        while self.sessions.contains_key(&token) {
            token = generate_token();
        }

        tracing::info!(%player_id, "session created");
        self.sessions
            .entry(token.clone())
            .or_insert(Session::new(token, player_id))
    }

    /// Resolves a token to its player and refreshes the idle clock.
    ///
    /// # Errors
    /// - [`SessionError::UnknownSession`]: token not recognized
    /// - [`SessionError::SessionExpired`]: idle too long; the session is
    ///   removed before returning
    pub fn resolve(&mut self, token: &str) -> Result<PlayerId, SessionError> {
        let timeout = self.config.idle_timeout();
        let session = self
            .sessions
            .get_mut(token)
            .ok_or(SessionError::UnknownSession)?;

        if session.is_idle(timeout) {
            let player_id = session.player_id;
            self.sessions.remove(token);
            tracing::info!(%player_id, "session expired on lookup");
            return Err(SessionError::SessionExpired(player_id));
        }

        session.last_seen = std::time::Instant::now();
        Ok(session.player_id)
    }

    /// Destroys a session (logout).
    ///
    /// # Errors
    /// Returns [`SessionError::UnknownSession`] if the token isn't live.
    pub fn destroy(&mut self, token: &str) -> Result<PlayerId, SessionError> {
        let session = self
            .sessions
            .remove(token)
            .ok_or(SessionError::UnknownSession)?;
        tracing::info!(
            player_id = %session.player_id,
            age_secs = session.age().as_secs(),
            "session destroyed"
        );
        Ok(session.player_id)
    }

    /// Destroys every session of one player, e.g. after the account was
    /// removed. Returns how many were destroyed.
    pub fn destroy_player(&mut self, player_id: PlayerId) -> usize {
        let before = self.sessions.len();
        self.sessions.retain(|_, s| s.player_id != player_id);
        let removed = before - self.sessions.len();
        if removed > 0 {
            tracing::info!(%player_id, removed, "all sessions of player destroyed");
        }
        removed
    }

    /// Removes every session idle for at least the configured timeout.
    ///
    /// Returns the owners of the removed sessions (one entry per session,
    /// so a player may appear more than once).
    pub fn expire_stale(&mut self) -> Vec<PlayerId> {
        let timeout = self.config.idle_timeout();
        let mut expired = Vec::new();

        self.sessions.retain(|_, session| {
            if session.is_idle(timeout) {
                expired.push(session.player_id);
                false
            } else {
                true
            }
        });

        if !expired.is_empty() {
            tracing::info!(count = expired.len(), "idle sessions expired");
        }
        expired
    }

    /// Looks up a session without touching its idle clock.
    pub fn get(&self, token: &str) -> Option<&Session> {
        self.sessions.get(token)
    }

    /// Number of live sessions belonging to `player_id`.
    pub fn count_for(&self, player_id: PlayerId) -> usize {
        self.sessions
            .values()
            .filter(|s| s.player_id == player_id)
            .count()
    }

    /// Returns the number of live sessions.
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Returns `true` if there are no sessions.
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

/// Generates a random 32-character hex string (128 bits of entropy).
pub(crate) fn generate_token() -> String {
    let mut rng = rand::rng();
    let bytes: [u8; 16] = rng.random();
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

// =========================================================================
// Tests
// =========================================================================
