//! Core protocol types for the `/api/*` JSON bodies.
//!
//! Everything here travels "on the wire": the server serializes it, the
//! client deserializes it. Field names and casing are part of the contract
//! with the browser UI, so the serde attributes matter as much as the types.

use serde::{Deserialize, Serialize};

use std::fmt;

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// A unique identifier for a player account.
///
/// Newtype wrapper around `u64` so a `PlayerId` can't be confused with a
/// [`QuestId`]. `#[serde(transparent)]` keeps the JSON a plain number:
/// `PlayerId(42)` is `42`, not `{ "0": 42 }`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerId(pub u64);

/// `tracing::info!(%player_id, "logged in")` prints `P-42`.
impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "P-{}", self.0)
    }
}

/// Identifier for a Tsutome (one-off task) or Shuren (habit).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QuestId(pub u64);

impl fmt::Display for QuestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Q-{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Role
// ---------------------------------------------------------------------------

/// What a logged-in account is allowed to see.
///
/// Serialized lowercase (`"player"`, `"admin"`) to match the JSON the UI
/// already reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// A regular player: quests, habits, story.
    #[default]
    Player,

    /// Can additionally open the `/admin` screens.
    Admin,
}

impl Role {
    /// Returns `true` for [`Role::Admin`].
    pub fn is_admin(self) -> bool {
        matches!(self, Self::Admin)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Player => write!(f, "player"),
            Self::Admin => write!(f, "admin"),
        }
    }
}

// ---------------------------------------------------------------------------
// PublicPlayer
// ---------------------------------------------------------------------------

/// The subset of an account that is safe to hand to the client.
///
/// The auth core treats this as an opaque payload: it only ever looks at
/// `id` (to detect an identity change) and `role` (for admin routing).
/// The remaining fields exist for the pages that render the player card.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicPlayer {
    pub id: PlayerId,
    pub username: String,
    pub display_name: String,
    pub role: Role,
    pub level: u32,
    pub exp: u32,
    pub coins: u32,
}

// ---------------------------------------------------------------------------
// Request / response bodies
// ---------------------------------------------------------------------------

/// Body of `GET /api/me`.
///
/// ```text
/// 200 {"authenticated":true,"player":{...}}
/// 401 {"authenticated":false}
/// ```
///
/// `player` is omitted entirely when absent, which is why it carries both
/// `default` (accept a missing key) and `skip_serializing_if` (emit none).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeResponse {
    pub authenticated: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub player: Option<PublicPlayer>,
}

impl MeResponse {
    /// The reply for a request carrying a live session.
    pub fn signed_in(player: PublicPlayer) -> Self {
        Self {
            authenticated: true,
            player: Some(player),
        }
    }

    /// The reply for a request without a (live) session.
    pub fn signed_out() -> Self {
        Self {
            authenticated: false,
            player: None,
        }
    }

    /// Collapses the reply into "who is logged in", rejecting the one
    /// inconsistent shape: `authenticated: true` with no player.
    ///
    /// `authenticated: false` with a stray player is treated as logged out;
    /// the flag wins.
    pub fn into_player(self) -> Result<Option<PublicPlayer>, crate::ProtocolError> {
        match (self.authenticated, self.player) {
            (true, Some(player)) => Ok(Some(player)),
            (true, None) => Err(crate::ProtocolError::InvalidMessage(
                "authenticated reply without a player".into(),
            )),
            (false, _) => Ok(None),
        }
    }
}

/// Body of `POST /api/login`.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Manual `Debug` so passwords never end up in logs.
impl fmt::Debug for LoginRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginRequest")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Successful `POST /api/login` reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginResponse {
    pub player: PublicPlayer,
}

/// A human-readable message, used for errors and for `POST /api/logout`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageBody {
    pub message: String,
}

impl MessageBody {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Quest summaries
// ---------------------------------------------------------------------------

/// A one-off task, framed as a monster to defeat.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tsutome {
    pub id: QuestId,
    pub title: String,
    pub monster: String,
    pub defeated: bool,
}

/// A recurring habit, tracked by its current streak in days.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Shuren {
    pub id: QuestId,
    pub title: String,
    pub streak: u32,
}

// ---------------------------------------------------------------------------
// Error text
// ---------------------------------------------------------------------------

/// Strips a leading `"<status>: "` prefix from an error message.
///
/// Error text that went through a generic request helper often arrives
/// as `"401: Invalid credentials"`; the UI shows only the part after the
/// prefix. Anything that doesn't start with digits followed by `:` is
/// returned trimmed but otherwise unchanged.
///
/// ```rust
/// use tsutome_protocol::strip_status_prefix;
///
/// assert_eq!(strip_status_prefix("401: Invalid credentials"), "Invalid credentials");
/// assert_eq!(strip_status_prefix("Invalid credentials"), "Invalid credentials");
/// ```
pub fn strip_status_prefix(message: &str) -> &str {
    let trimmed = message.trim();
    let digits = trimmed
        .bytes()
        .take_while(|b| b.is_ascii_digit())
        .count();
    if digits == 0 {
        return trimmed;
    }
    match trimmed[digits..].strip_prefix(':') {
        Some(rest) => rest.trim_start(),
        None => trimmed,
    }
}
