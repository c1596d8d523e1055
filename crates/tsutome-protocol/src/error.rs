//! Error types for the protocol layer.
//!
//! Each crate in Tsutome defines its own error enum. When you see a
//! `ProtocolError`, you know the problem is in serialization, not in
//! networking or session handling.

/// Errors that can occur in the protocol layer.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serialization failed (turning a Rust type into bytes).
    #[cfg(feature = "json")]
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// Deserialization failed (turning bytes into a Rust type).
    ///
    /// Common causes: an HTML error page where JSON was expected,
    /// missing required fields, or a truncated body.
    #[cfg(feature = "json")]
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),

    /// The body parsed but violates an invariant of the protocol, e.g. a
    /// `/api/me` reply claiming `authenticated: true` without a player.
    #[error("invalid message: {0}")]
    InvalidMessage(String),
}
