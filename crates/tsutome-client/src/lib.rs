//! Auth API client for Tsutome.
//!
//! [`AuthApi`] wraps the four requests the auth flow needs, plus the
//! player-scoped quest queries, on top of any
//! [`Transport`](tsutome_transport::Transport):
//!
//! | Call | Request | "Logged out" outcome |
//! |---|---|---|
//! | [`AuthApi::probe_session`] | `GET /api/me` | `Ok(None)` |
//! | [`AuthApi::login`] | `POST /api/login` | `Err(InvalidCredentials)` |
//! | [`AuthApi::logout`] | `POST /api/logout` | `Ok(())` |
//! | [`AuthApi::tsutomes`] / [`AuthApi::shurens`] | `GET /api/...` | `Err(Unauthenticated)` |
//!
//! The client holds no state of its own; caching and "who is logged in"
//! live one layer up, in `tsutome-state`.

mod api;
mod error;

pub use api::{
    AuthApi, LOGIN_PATH, LOGOUT_PATH, ME_PATH, SHURENS_PATH, TSUTOMES_PATH,
};
pub use error::ClientError;
