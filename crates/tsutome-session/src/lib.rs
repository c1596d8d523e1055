//! Server-side session management for Tsutome.
//!
//! This crate handles "who is behind this cookie?":
//!
//! 1. **Credentials**: checking a username/password and turning it into a
//!    [`PublicPlayer`](tsutome_protocol::PublicPlayer)
//!    ([`PlayerDirectory`] trait, [`AccountDirectory`] implementation)
//! 2. **Sessions**: mapping opaque tokens to player ids
//!    ([`SessionStore`]), with idle expiry
//!
//! # How it fits in the stack
//!
//! ```text
//! HTTP handlers (above)  ← read the cookie, ask the store who it is
//!     ↕
//! Session Layer (this crate)  ← tokens, expiry, password checks
//!     ↕
//! Protocol Layer (below)  ← PlayerId, PublicPlayer
//! ```

mod accounts;
mod auth;
mod error;
mod session;
mod store;

pub use accounts::AccountDirectory;
pub use auth::PlayerDirectory;
pub use error::SessionError;
pub use session::{Session, SessionConfig};
pub use store::SessionStore;

/// Argon2 cost parameters, re-exported so callers can tune
/// [`AccountDirectory::with_params`] without depending on `argon2`.
pub use argon2::Params as HashParams;
