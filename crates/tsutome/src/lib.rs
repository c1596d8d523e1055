//! # Tsutome
//!
//! The HTTP side of the Tsutome quest app: cookie sessions, login and
//! logout, and the player-scoped quest lists the pages read.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use tsutome::prelude::*;
//!
//! # async fn run() -> Result<(), TsutomeError> {
//! let accounts = AccountDirectory::new();
//! accounts.register("AdminTsutome", "AdminTsutome", Role::Admin)?;
//!
//! let server = TsutomeServerBuilder::new()
//!     .bind("127.0.0.1:8080")
//!     .build(accounts)
//!     .await?;
//! server.run().await
//! # }
//! ```
//!
//! The client half lives in `tsutome-client` (requests) and
//! `tsutome-state` (auth context and routing).

mod config;
mod error;
mod handler;
mod quests;
mod server;

pub use config::ServerConfig;
pub use error::{ApiError, TsutomeError};
pub use handler::SESSION_COOKIE;
pub use quests::QuestBoard;
pub use server::{TsutomeServer, TsutomeServerBuilder};

/// Everything needed to stand up a server.
pub mod prelude {
    pub use crate::{QuestBoard, ServerConfig, TsutomeError, TsutomeServer, TsutomeServerBuilder};
    pub use tsutome_protocol::{PlayerId, PublicPlayer, Role};
    pub use tsutome_session::{AccountDirectory, PlayerDirectory, SessionConfig, SessionError};
}
