//! Wire protocol for Tsutome.
//!
//! This crate defines the "language" that the browser-side client and the
//! HTTP server speak:
//!
//! - **Types** ([`PublicPlayer`], [`MeResponse`], [`LoginRequest`], etc.):
//!   the JSON bodies of the `/api/*` endpoints.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]): how those bodies are
//!   converted to/from bytes.
//! - **Errors** ([`ProtocolError`]): what can go wrong during
//!   encoding/decoding.
//!
//! # Architecture
//!
//! The protocol layer sits between transport (raw HTTP bodies) and the
//! auth client (player identity). It doesn't know about sessions or
//! routes: it only knows how to serialize and deserialize bodies.
//!
//! ```text
//! Transport (bytes) → Protocol (MeResponse, ...) → Client (AuthState)
//! ```

// ---------------------------------------------------------------------------
// Module declarations
// ---------------------------------------------------------------------------

mod codec;
mod error;
mod types;

// ---------------------------------------------------------------------------
// Re-exports
// ---------------------------------------------------------------------------

// `pub use` makes items from submodules available at the crate root.
// Users can write `use tsutome_protocol::PublicPlayer` instead of
// `use tsutome_protocol::types::PublicPlayer`.

pub use codec::Codec;
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use error::ProtocolError;
pub use types::{
    LoginRequest, LoginResponse, MeResponse, MessageBody, PlayerId, PublicPlayer, QuestId, Role,
    Shuren, Tsutome, strip_status_prefix,
};
