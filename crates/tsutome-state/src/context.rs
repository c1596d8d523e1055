//! The auth context: one source of truth for "who is logged in".
//!
//! # Responsibilities
//!
//! - Probe the server once on mount (or reuse a fresh cached probe)
//! - Publish every [`AuthState`] change to subscribers
//! - Run login (with double-submit suppression) and logout
//! - Clear the [`QueryCache`] whenever the identity changes, before
//!   anyone is told about the change
//!
//! # Ordering
//!
//! Every probe, login and logout takes a ticket from a counter when it
//! starts. Its result is committed only if no later ticket has been
//! committed yet:
//!
//! ```text
//! probe #1 ──────────────────────────── 200(A) ✗ discarded
//! logout   #2 ──── ok ✓ committed (signed out)
//! ```
//!
//! So a slow probe that started before a logout cannot resurrect the old
//! session in the UI.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use tokio::sync::{Mutex as AsyncMutex, Notify, watch};
use tokio::task::JoinHandle;
use tsutome_client::{AuthApi, ClientError};
use tsutome_protocol::PublicPlayer;
use tsutome_transport::Transport;

use crate::{AuthError, AuthState, QueryCache, QueryKey};

type ProbeResult = Result<Option<PublicPlayer>, ClientError>;

// ---------------------------------------------------------------------------
// AuthContext
// ---------------------------------------------------------------------------

/// Handle to the auth context. Cheap to clone; all clones share state.
pub struct AuthContext<T: Transport> {
    inner: Arc<Inner<T>>,
}

impl<T: Transport> Clone for AuthContext<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

struct Inner<T: Transport> {
    api: AuthApi<T>,
    cache: QueryCache,
    state: watch::Sender<AuthState>,

    /// Last ticket handed out.
    tickets: AtomicU64,
    /// Ticket of the result currently published.
    committed: parking_lot::Mutex<u64>,

    /// Held for the duration of one login.
    login_gate: AsyncMutex<()>,

    disposed: AtomicBool,
    /// Wakes `resolved()` callers on dispose without publishing a state.
    on_dispose: Notify,
    /// Background probes, aborted on dispose.
    tasks: parking_lot::Mutex<Vec<JoinHandle<()>>>,
}

impl<T: Transport> AuthContext<T> {
    /// Mounts the context.
    ///
    /// If `cache` already holds a probe result it is used as-is and no
    /// request is made. Otherwise exactly one probe is spawned and the
    /// state stays [`AuthState::loading`] until it settles.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn init(api: AuthApi<T>, cache: QueryCache) -> Self {
        let (state, _) = watch::channel(AuthState::loading());
        let ctx = Self {
            inner: Arc::new(Inner {
                api,
                cache,
                state,
                tickets: AtomicU64::new(0),
                committed: parking_lot::Mutex::new(0),
                login_gate: AsyncMutex::new(()),
                disposed: AtomicBool::new(false),
                on_dispose: Notify::new(),
                tasks: parking_lot::Mutex::new(Vec::new()),
            }),
        };

        match ctx.inner.cache.get::<Option<PublicPlayer>>(QueryKey::Me) {
            Some(cached) => {
                tracing::debug!("reusing cached session probe");
                let ticket = ctx.inner.take_ticket();
                ctx.inner.commit(ticket, Ok((*cached).clone()));
            }
            None => ctx.spawn_probe(),
        }
        ctx
    }

    /// Current state.
    pub fn state(&self) -> AuthState {
        self.inner.state.borrow().clone()
    }

    /// A new subscription. The current state counts as already seen.
    pub fn subscribe(&self) -> AuthSubscription {
        AuthSubscription {
            rx: self.inner.state.subscribe(),
        }
    }

    /// Waits until the state is no longer loading and returns it.
    ///
    /// Returns the current state immediately if the context was disposed
    /// while still loading.
    pub async fn resolved(&self) -> AuthState {
        let mut rx = self.inner.state.subscribe();
        loop {
            // Registered before the flag is checked so a concurrent
            // dispose() cannot slip in between.
            let disposed = self.inner.on_dispose.notified();
            tokio::pin!(disposed);
            disposed.as_mut().enable();

            {
                let current = rx.borrow_and_update();
                if !current.is_loading() || self.is_disposed() {
                    return current.clone();
                }
            }
            tokio::select! {
                changed = rx.changed() => {
                    if changed.is_err() {
                        return self.state();
                    }
                }
                () = &mut disposed => return self.state(),
            }
        }
    }

    /// Re-probes the server and returns the state that results.
    ///
    /// If a newer operation committed while this probe was in flight, its
    /// state is returned instead.
    pub async fn refetch(&self) -> AuthState {
        if self.is_disposed() {
            return self.state();
        }
        self.inner.cache.invalidate(QueryKey::Me);
        self.inner.probe().await
    }

    /// Marks the session probe stale and re-probes in the background.
    ///
    /// Used when some other query came back 401: the session may have
    /// ended server-side.
    pub fn invalidate(&self) {
        if self.is_disposed() {
            return;
        }
        self.inner.cache.invalidate(QueryKey::Me);
        self.spawn_probe();
    }

    /// Logs in and re-probes.
    ///
    /// The returned state is whatever the follow-up probe committed. A
    /// failed login leaves the state untouched.
    ///
    /// # Errors
    /// - [`AuthError::LoginInFlight`] if another login on this context has
    ///   not finished; no request is sent
    /// - [`AuthError::Client`] if the server rejected the credentials or
    ///   could not be reached
    /// - [`AuthError::Disposed`] after [`dispose`](Self::dispose)
    pub async fn login(&self, username: &str, password: &str) -> Result<AuthState, AuthError> {
        self.ensure_live()?;
        let _gate = self
            .inner
            .login_gate
            .try_lock()
            .map_err(|_| AuthError::LoginInFlight)?;

        self.inner.api.login(username, password).await?;
        tracing::info!(username, "login accepted; refreshing session");
        Ok(self.refetch().await)
    }

    /// Logs out and publishes the signed-out state.
    ///
    /// # Errors
    /// The server's error if logout failed; the state is left as it was.
    pub async fn logout(&self) -> Result<AuthState, AuthError> {
        self.ensure_live()?;
        self.inner.api.logout().await?;

        let ticket = self.inner.take_ticket();
        tracing::info!("logged out");
        Ok(self.inner.commit(ticket, Ok(None)))
    }

    /// Unmounts the context. In-flight probes are aborted and any result
    /// that still arrives is discarded. Idempotent.
    pub fn dispose(&self) {
        if self.inner.disposed.swap(true, Ordering::AcqRel) {
            return;
        }
        for task in self.inner.tasks.lock().drain(..) {
            task.abort();
        }
        self.inner.on_dispose.notify_waiters();
        tracing::debug!("auth context disposed");
    }

    pub fn is_disposed(&self) -> bool {
        self.inner.disposed.load(Ordering::Acquire)
    }

    pub fn api(&self) -> &AuthApi<T> {
        &self.inner.api
    }

    pub fn cache(&self) -> &QueryCache {
        &self.inner.cache
    }

    fn ensure_live(&self) -> Result<(), AuthError> {
        if self.is_disposed() {
            Err(AuthError::Disposed)
        } else {
            Ok(())
        }
    }

    fn spawn_probe(&self) {
        let inner = Arc::clone(&self.inner);
        let task = tokio::spawn(async move {
            inner.probe().await;
        });

        let mut tasks = self.inner.tasks.lock();
        tasks.retain(|t| !t.is_finished());
        tasks.push(task);
    }
}

impl<T: Transport> Inner<T> {
    fn take_ticket(&self) -> u64 {
        self.tickets.fetch_add(1, Ordering::AcqRel) + 1
    }

    async fn probe(&self) -> AuthState {
        let ticket = self.take_ticket();
        let result = self.api.probe_session().await;
        self.commit(ticket, result)
    }

    /// Publishes the outcome of the operation holding `ticket`, unless a
    /// newer one was committed first. Returns the state now published.
    fn commit(&self, ticket: u64, result: ProbeResult) -> AuthState {
        if self.disposed.load(Ordering::Acquire) {
            tracing::trace!(ticket, "discarding result for disposed context");
            return self.state.borrow().clone();
        }

        let mut committed = self.committed.lock();
        if ticket < *committed {
            tracing::debug!(ticket, committed = *committed, "discarding superseded auth result");
            return self.state.borrow().clone();
        }
        *committed = ticket;

        let previous = self.state.borrow().clone();
        let next = match result {
            Ok(user) => AuthState::resolved(user),
            Err(error) => {
                tracing::warn!(%error, "session probe failed; keeping last known user");
                AuthState::unreachable(previous.user().cloned(), error.to_string())
            }
        };

        if previous.authenticated() && previous.player_id() != next.player_id() {
            tracing::info!(
                from = ?previous.player_id(),
                to = ?next.player_id(),
                "identity changed; clearing query cache"
            );
            self.cache.clear();
        }
        if !next.is_retryable() {
            self.cache.insert(QueryKey::Me, next.user().cloned());
        }

        self.state.send_replace(next.clone());
        next
    }
}

// ---------------------------------------------------------------------------
// AuthSubscription
// ---------------------------------------------------------------------------

/// Receives [`AuthState`] changes from one [`AuthContext`].
#[derive(Debug, Clone)]
pub struct AuthSubscription {
    rx: watch::Receiver<AuthState>,
}

impl AuthSubscription {
    /// The latest state, without marking it seen.
    pub fn current(&self) -> AuthState {
        self.rx.borrow().clone()
    }

    /// The latest state, marking it seen.
    pub fn mark_seen(&mut self) -> AuthState {
        self.rx.borrow_and_update().clone()
    }

    /// `true` if a state was published since the last one seen.
    pub fn has_changed(&self) -> bool {
        self.rx.has_changed().unwrap_or(false)
    }

    /// Waits for the next published state. `None` once every handle to
    /// the context is gone.
    pub async fn changed(&mut self) -> Option<AuthState> {
        self.rx.changed().await.ok()?;
        Some(self.mark_seen())
    }
}

// =========================================================================
// Tests
// =========================================================================

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tsutome_client::{LOGIN_PATH, LOGOUT_PATH, ME_PATH};
    use tsutome_protocol::{MeResponse, PlayerId, Role};
    use tsutome_transport::testing::ScriptedTransport;
    use tsutome_transport::{Method, TransportError};

    use super::*;

    fn player(id: u64, role: Role) -> PublicPlayer {
        PublicPlayer {
            id: PlayerId(id),
            username: format!("player{id}"),
            display_name: format!("Player {id}"),
            role,
            level: 1,
            exp: 0,
            coins: 0,
        }
    }

    fn me(player: PublicPlayer) -> String {
        serde_json::to_string(&MeResponse::signed_in(player)).unwrap()
    }

    const SIGNED_OUT: &str = r#"{"authenticated":false}"#;

    fn context() -> (AuthContext<ScriptedTransport>, Arc<ScriptedTransport>) {
        let transport = Arc::new(ScriptedTransport::new());
        let api = AuthApi::from_shared(Arc::clone(&transport));
        (AuthContext::init(api, QueryCache::new()), transport)
    }

    fn probes(transport: &ScriptedTransport) -> usize {
        transport.count(Method::Get, ME_PATH)
    }

    // =====================================================================
    // init()
    // =====================================================================

    #[tokio::test]
    async fn test_init_starts_loading_and_probes_once() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.respond(Method::Get, ME_PATH, 200, me(player(1, Role::Player)));
        let ctx = AuthContext::init(
            AuthApi::from_shared(Arc::clone(&transport)),
            QueryCache::new(),
        );

        assert!(ctx.state().is_loading());

        let state = ctx.resolved().await;
        assert!(state.authenticated());
        assert_eq!(state.player_id(), Some(PlayerId(1)));
        assert_eq!(probes(&transport), 1);
    }

    #[tokio::test]
    async fn test_init_with_cached_probe_makes_no_request() {
        let transport = Arc::new(ScriptedTransport::new());
        let cache = QueryCache::new();
        cache.insert(QueryKey::Me, Some(player(3, Role::Admin)));

        let ctx = AuthContext::init(AuthApi::from_shared(Arc::clone(&transport)), cache);

        let state = ctx.state();
        assert!(!state.is_loading());
        assert_eq!(state.role(), Some(Role::Admin));
        tokio::task::yield_now().await;
        assert_eq!(probes(&transport), 0);
    }

    #[tokio::test]
    async fn test_init_401_resolves_unauthenticated() {
        let (ctx, transport) = context();
        transport.respond(Method::Get, ME_PATH, 401, SIGNED_OUT);

        let state = ctx.resolved().await;

        assert!(!state.authenticated());
        assert!(!state.is_loading());
        assert!(!state.is_retryable());
    }

    #[tokio::test]
    async fn test_init_network_failure_resolves_retryable_not_loading() {
        let (ctx, transport) = context();
        transport.fail(
            Method::Get,
            ME_PATH,
            TransportError::ConnectionFailed("refused".into()),
        );

        let state = ctx.resolved().await;

        assert!(!state.is_loading(), "network failure must not hang in loading");
        assert!(!state.authenticated());
        assert!(state.is_retryable());
        assert!(!ctx.cache().contains(QueryKey::Me), "failed probes are not cached");
    }

    // =====================================================================
    // refetch()
    // =====================================================================

    #[tokio::test]
    async fn test_refetch_network_failure_keeps_previous_user() {
        let (ctx, transport) = context();
        transport
            .respond(Method::Get, ME_PATH, 200, me(player(1, Role::Player)))
            .fail(Method::Get, ME_PATH, TransportError::Timeout);
        ctx.resolved().await;

        let state = ctx.refetch().await;

        assert_eq!(state.player_id(), Some(PlayerId(1)));
        assert!(state.is_retryable());
    }

    #[tokio::test]
    async fn test_refetch_result_matches_what_subscribers_see() {
        let (ctx, transport) = context();
        transport
            .respond(Method::Get, ME_PATH, 401, SIGNED_OUT)
            .respond(Method::Get, ME_PATH, 200, me(player(2, Role::Player)));
        ctx.resolved().await;
        let mut sub = ctx.subscribe();

        let returned = ctx.refetch().await;

        assert!(sub.has_changed());
        assert_eq!(sub.changed().await, Some(returned.clone()));
        assert_eq!(returned.player_id(), Some(PlayerId(2)));
    }

    #[tokio::test]
    async fn test_refetch_sequence_authenticated_always_matches_user() {
        let (ctx, transport) = context();
        transport
            .respond(Method::Get, ME_PATH, 200, me(player(1, Role::Player)))
            .respond(Method::Get, ME_PATH, 401, SIGNED_OUT)
            .fail(Method::Get, ME_PATH, TransportError::Timeout)
            .respond(Method::Get, ME_PATH, 500, "boom")
            .respond(Method::Get, ME_PATH, 200, me(player(1, Role::Admin)));
        ctx.resolved().await;

        for _ in 0..4 {
            let state = ctx.refetch().await;
            assert_eq!(state.authenticated(), state.user().is_some());
            assert!(!state.is_loading());
        }
    }

    #[tokio::test]
    async fn test_commit_older_ticket_is_discarded() {
        let (ctx, transport) = context();
        transport.respond(Method::Get, ME_PATH, 401, SIGNED_OUT);
        ctx.resolved().await;

        let older = ctx.inner.take_ticket();
        let newer = ctx.inner.take_ticket();
        ctx.inner.commit(newer, Ok(Some(player(5, Role::Player))));
        let after_stale = ctx.inner.commit(older, Ok(None));

        assert_eq!(after_stale.player_id(), Some(PlayerId(5)));
        assert_eq!(ctx.state().player_id(), Some(PlayerId(5)));
    }

    // =====================================================================
    // identity changes and the cache
    // =====================================================================

    #[tokio::test]
    async fn test_identity_change_clears_cache_before_publishing() {
        let (ctx, transport) = context();
        transport
            .respond(Method::Get, ME_PATH, 200, me(player(1, Role::Player)))
            .respond(Method::Get, ME_PATH, 200, me(player(2, Role::Player)));
        ctx.resolved().await;
        ctx.cache().insert(QueryKey::Tsutomes, vec!["player one's quest"]);
        let mut sub = ctx.subscribe();

        ctx.refetch().await;

        let seen = sub.changed().await.unwrap();
        assert_eq!(seen.player_id(), Some(PlayerId(2)));
        assert!(!ctx.cache().contains(QueryKey::Tsutomes));
    }

    #[tokio::test]
    async fn test_same_identity_keeps_cache() {
        let (ctx, transport) = context();
        transport.respond(Method::Get, ME_PATH, 200, me(player(1, Role::Player)));
        ctx.resolved().await;
        ctx.cache().insert(QueryKey::Tsutomes, 1u8);

        ctx.refetch().await;

        assert!(ctx.cache().contains(QueryKey::Tsutomes));
    }

    // =====================================================================
    // login() / logout()
    // =====================================================================

    #[tokio::test]
    async fn test_login_success_refetches_and_publishes_user() {
        let (ctx, transport) = context();
        transport
            .respond(Method::Get, ME_PATH, 401, SIGNED_OUT)
            .respond(Method::Get, ME_PATH, 200, me(player(1, Role::Admin)));
        transport.respond(Method::Post, LOGIN_PATH, 200, "{}");
        ctx.resolved().await;

        let state = ctx.login("AdminTsutome", "AdminTsutome").await.unwrap();

        assert_eq!(state.role(), Some(Role::Admin));
        assert_eq!(ctx.state(), state);
        assert_eq!(probes(&transport), 2);
        assert_eq!(transport.count(Method::Post, LOGIN_PATH), 1);
    }

    #[tokio::test]
    async fn test_login_rejected_leaves_state_unchanged() {
        let (ctx, transport) = context();
        transport.respond(Method::Get, ME_PATH, 401, SIGNED_OUT);
        transport.respond(Method::Post, LOGIN_PATH, 401, "401: Invalid credentials");
        let before = ctx.resolved().await;

        let result = ctx.login("invalid_user", "wrong_password").await;

        assert_eq!(
            result,
            Err(AuthError::Client(ClientError::InvalidCredentials(
                "Invalid credentials".into()
            )))
        );
        assert_eq!(ctx.state(), before);
        assert_eq!(probes(&transport), 1, "no refetch after a failed login");
    }

    #[tokio::test]
    async fn test_login_concurrent_submit_sends_one_request() {
        let (ctx, transport) = context();
        transport
            .respond(Method::Get, ME_PATH, 401, SIGNED_OUT)
            .respond(Method::Get, ME_PATH, 200, me(player(1, Role::Player)));
        transport.respond(Method::Post, LOGIN_PATH, 200, "{}");
        ctx.resolved().await;
        transport.set_delay(Duration::from_millis(20));

        let (first, second) = tokio::join!(ctx.login("a", "b"), ctx.login("a", "b"));

        assert!(first.is_ok());
        assert_eq!(second, Err(AuthError::LoginInFlight));
        assert_eq!(transport.count(Method::Post, LOGIN_PATH), 1);
    }

    #[tokio::test]
    async fn test_login_after_settling_can_retry() {
        let (ctx, transport) = context();
        transport.respond(Method::Get, ME_PATH, 401, SIGNED_OUT);
        transport
            .respond(Method::Post, LOGIN_PATH, 401, "Invalid credentials")
            .respond(Method::Post, LOGIN_PATH, 401, "Invalid credentials");
        ctx.resolved().await;

        assert!(ctx.login("a", "b").await.is_err());
        let second = ctx.login("a", "b").await;

        assert!(matches!(second, Err(AuthError::Client(_))));
        assert_eq!(transport.count(Method::Post, LOGIN_PATH), 2);
    }

    #[tokio::test]
    async fn test_logout_publishes_signed_out_and_clears_cache() {
        let (ctx, transport) = context();
        transport.respond(Method::Get, ME_PATH, 200, me(player(1, Role::Player)));
        transport.respond(Method::Post, LOGOUT_PATH, 200, "{}");
        ctx.resolved().await;
        ctx.cache().insert(QueryKey::Tsutomes, 1u8);

        let state = ctx.logout().await.unwrap();

        assert!(!state.authenticated());
        assert!(!state.is_loading());
        assert!(!ctx.cache().contains(QueryKey::Tsutomes));
        assert_eq!(
            *ctx.cache().get::<Option<PublicPlayer>>(QueryKey::Me).unwrap(),
            None
        );
    }

    #[tokio::test]
    async fn test_logout_failure_keeps_user() {
        let (ctx, transport) = context();
        transport.respond(Method::Get, ME_PATH, 200, me(player(1, Role::Player)));
        transport.fail(Method::Post, LOGOUT_PATH, TransportError::Timeout);
        ctx.resolved().await;

        let result = ctx.logout().await;

        assert!(matches!(result, Err(AuthError::Client(ClientError::Network(_)))));
        assert!(ctx.state().authenticated());
    }

    // =====================================================================
    // invalidate() / dispose()
    // =====================================================================

    #[tokio::test]
    async fn test_invalidate_reprobes_in_background() {
        let (ctx, transport) = context();
        transport
            .respond(Method::Get, ME_PATH, 200, me(player(1, Role::Player)))
            .respond(Method::Get, ME_PATH, 401, SIGNED_OUT);
        ctx.resolved().await;
        let mut sub = ctx.subscribe();

        ctx.invalidate();
        let state = sub.changed().await.unwrap();

        assert!(!state.authenticated());
        assert_eq!(probes(&transport), 2);
    }

    #[tokio::test]
    async fn test_dispose_discards_inflight_probe() {
        let (ctx, transport) = context();
        transport.set_delay(Duration::from_millis(30));
        transport.respond(Method::Get, ME_PATH, 200, me(player(1, Role::Player)));
        let sub = ctx.subscribe();

        ctx.dispose();
        tokio::time::sleep(Duration::from_millis(60)).await;

        assert!(ctx.state().is_loading());
        assert!(!sub.has_changed());
        assert_eq!(ctx.resolved().await, AuthState::loading());
    }

    #[tokio::test]
    async fn test_dispose_wakes_pending_resolved() {
        let (ctx, transport) = context();
        transport.set_delay(Duration::from_millis(50));
        transport.respond(Method::Get, ME_PATH, 200, me(player(1, Role::Player)));
        let waiter = tokio::spawn({
            let ctx = ctx.clone();
            async move { ctx.resolved().await }
        });
        tokio::task::yield_now().await;

        ctx.dispose();

        let state = tokio::time::timeout(Duration::from_millis(500), waiter)
            .await
            .expect("resolved() returns once the context is disposed")
            .expect("waiter task completes");
        assert!(state.is_loading());
        assert!(!state.authenticated());
    }

    #[tokio::test]
    async fn test_operations_after_dispose_fail_fast() {
        let (ctx, transport) = context();
        transport.respond(Method::Get, ME_PATH, 401, SIGNED_OUT);
        ctx.resolved().await;

        ctx.dispose();
        ctx.dispose();

        assert_eq!(ctx.login("a", "b").await, Err(AuthError::Disposed));
        assert_eq!(ctx.logout().await, Err(AuthError::Disposed));
        assert_eq!(transport.count(Method::Post, LOGIN_PATH), 0);
    }
}
