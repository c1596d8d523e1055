//! Client-side session state for Tsutome.
//!
//! Everything the UI needs to answer "what should this tab show right now?":
//!
//! 1. **[`QueryCache`]**: results of server queries, keyed by
//!    [`QueryKey`], with explicit invalidation
//! 2. **[`AuthContext`]**: the single source of truth for [`AuthState`];
//!    probes the server, runs login/logout, notifies subscribers
//! 3. **[`RouteGuard`]**: pure decision: render, wait, or redirect
//! 4. **[`Navigator`]**: current location, re-guarded on every auth change
//! 5. **[`LoginForm`]** / **[`QuestQueries`]**: the two consumers every
//!    page tree has
//!
//! # How it fits in the stack
//!
//! ```text
//! Pages (above)  ← read View, call LoginForm / QuestQueries
//!     ↕
//! State Layer (this crate)  ← AuthState, cache, routing decisions
//!     ↕
//! Client Layer (below)  ← probe / login / logout requests
//! ```
//!
//! # Lifecycle
//!
//! [`AuthContext::init`] on root mount (must run inside a Tokio runtime;
//! it spawns the initial probe), [`AuthContext::dispose`] on unmount.
//! There is no global: the context is a handle passed to whoever needs it.

mod cache;
mod context;
mod error;
mod guard;
mod login;
mod navigator;
mod queries;
mod state;

pub use cache::{QueryCache, QueryKey};
pub use context::{AuthContext, AuthSubscription};
pub use error::AuthError;
pub use guard::{Access, GuardDecision, GuardState, RouteGuard, RouteTable};
pub use login::{LoginForm, SubmitOutcome};
pub use navigator::{Navigator, View};
pub use queries::QuestQueries;
pub use state::AuthState;
