//! `TsutomeServer` builder and serve loop.
//!
//! This ties the layers together: the axum router in front, the session
//! store and player directory behind it, and a background task sweeping
//! idle sessions.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::routing::{get, post};
use tokio::net::TcpListener;
use tokio::sync::Mutex;
use tsutome_client::{LOGIN_PATH, LOGOUT_PATH, ME_PATH, SHURENS_PATH, TSUTOMES_PATH};
use tsutome_session::{PlayerDirectory, SessionConfig, SessionStore};

use crate::handler;
use crate::{QuestBoard, ServerConfig, TsutomeError};

/// Shared server state passed to every handler.
///
/// Wrapped in `Arc` so it can be cheaply cloned across tasks.
/// Interior mutability via `Mutex` where needed.
pub(crate) struct ServerState<D: PlayerDirectory> {
    pub(crate) sessions: Mutex<SessionStore>,
    pub(crate) directory: D,
    pub(crate) quests: Arc<QuestBoard>,
    pub(crate) secure_cookie: bool,
}

/// Builder for configuring and starting a Tsutome server.
///
/// # Example
///
/// ```rust,ignore
/// let server = TsutomeServerBuilder::new()
///     .bind("0.0.0.0:8080")
///     .build(accounts)
///     .await?;
/// server.run().await
/// ```
pub struct TsutomeServerBuilder {
    config: ServerConfig,
    quests: Arc<QuestBoard>,
}

impl TsutomeServerBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self::from_config(ServerConfig::default())
    }

    /// Starts from an existing config, e.g. [`ServerConfig::from_env`].
    pub fn from_config(config: ServerConfig) -> Self {
        Self {
            config,
            quests: Arc::new(QuestBoard::new()),
        }
    }

    /// Sets the address to bind the server to.
    pub fn bind(mut self, addr: &str) -> Self {
        self.config.bind_addr = addr.to_string();
        self
    }

    /// Sets the session configuration.
    pub fn session_config(mut self, config: SessionConfig) -> Self {
        self.config.session = config;
        self
    }

    /// Adds `Secure` to the session cookie.
    pub fn secure_cookie(mut self, secure: bool) -> Self {
        self.config.secure_cookie = secure;
        self
    }

    /// Serves quest lists from `quests` instead of an empty board.
    pub fn quests(mut self, quests: Arc<QuestBoard>) -> Self {
        self.quests = quests;
        self
    }

    /// Binds the listener. Nothing is served until
    /// [`run`](TsutomeServer::run).
    pub async fn build<D: PlayerDirectory>(
        self,
        directory: D,
    ) -> Result<TsutomeServer<D>, TsutomeError> {
        let listener = TcpListener::bind(&self.config.bind_addr).await?;

        let state = Arc::new(ServerState {
            sessions: Mutex::new(SessionStore::new(self.config.session.clone())),
            directory,
            quests: self.quests,
            secure_cookie: self.config.secure_cookie,
        });

        Ok(TsutomeServer {
            listener,
            state,
            reap_interval: Duration::from_secs(self.config.session.reap_interval_secs.max(1)),
        })
    }
}

impl Default for TsutomeServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A bound Tsutome server.
///
/// Call [`run()`](Self::run) to start serving.
pub struct TsutomeServer<D: PlayerDirectory> {
    listener: TcpListener,
    state: Arc<ServerState<D>>,
    reap_interval: Duration,
}

impl<D: PlayerDirectory> TsutomeServer<D> {
    /// Returns the local address the server is bound to.
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// The quest board handlers read from.
    pub fn quests(&self) -> &Arc<QuestBoard> {
        &self.state.quests
    }

    /// The player directory.
    pub fn directory(&self) -> &D {
        &self.state.directory
    }

    /// Number of live sessions.
    pub async fn session_count(&self) -> usize {
        self.state.sessions.lock().await.len()
    }

    /// The `/api/*` routes, bound to this server's state.
    pub fn router(&self) -> Router {
        Router::new()
            .route(ME_PATH, get(handler::me::<D>))
            .route(LOGIN_PATH, post(handler::login::<D>))
            .route(LOGOUT_PATH, post(handler::logout::<D>))
            .route(TSUTOMES_PATH, get(handler::tsutomes::<D>))
            .route(SHURENS_PATH, get(handler::shurens::<D>))
            .with_state(Arc::clone(&self.state))
    }

    /// Serves until the process is terminated.
    pub async fn run(self) -> Result<(), TsutomeError> {
        let app = self.router();
        let reaper = tokio::spawn(reap_idle_sessions(
            Arc::clone(&self.state),
            self.reap_interval,
        ));

        tracing::info!(addr = ?self.listener.local_addr().ok(), "Tsutome server running");
        let served = axum::serve(self.listener, app).await;

        reaper.abort();
        served.map_err(TsutomeError::from)
    }
}

/// Sweeps idle sessions every `interval`.
async fn reap_idle_sessions<D: PlayerDirectory>(state: Arc<ServerState<D>>, interval: Duration) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    loop {
        ticker.tick().await;
        let expired = state.sessions.lock().await.expire_stale();
        if !expired.is_empty() {
            tracing::debug!(count = expired.len(), "reaper removed idle sessions");
        }
    }
}
