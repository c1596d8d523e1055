//! Tracks the current location and re-applies the [`RouteGuard`] every
//! time the auth state changes.

use crate::{AuthContext, AuthState, AuthSubscription, GuardDecision, RouteGuard};
use tsutome_transport::Transport;

/// Redirect chains longer than this mean the route table is circular.
const MAX_REDIRECTS: usize = 4;

/// What the page area shows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum View {
    /// Auth is still loading.
    Loading,
    /// The page at this path.
    Page(String),
}

/// The client's router.
///
/// The location it holds is always where the guard last allowed the user
/// to be: redirects replace it, so a deep link that bounced to the login
/// page is forgotten.
#[derive(Debug)]
pub struct Navigator {
    guard: RouteGuard,
    subscription: AuthSubscription,
    location: String,
    view: View,
}

impl Navigator {
    /// Starts at `path` and resolves it against the context's current
    /// state.
    pub fn new<T: Transport>(context: &AuthContext<T>, guard: RouteGuard, path: &str) -> Self {
        let mut navigator = Self {
            guard,
            subscription: context.subscribe(),
            location: path.to_string(),
            view: View::Loading,
        };
        navigator.sync();
        navigator
    }

    /// Navigates to `path`.
    pub fn navigate(&mut self, path: &str) -> &View {
        self.location = path.to_string();
        let state = self.subscription.current();
        self.apply(&state);
        &self.view
    }

    /// Re-resolves the location against the latest auth state.
    pub fn sync(&mut self) -> &View {
        let state = self.subscription.mark_seen();
        self.apply(&state);
        &self.view
    }

    /// Waits for the next auth change and re-resolves. `None` once the
    /// context is gone.
    pub async fn follow(&mut self) -> Option<&View> {
        let state = self.subscription.changed().await?;
        self.apply(&state);
        Some(&self.view)
    }

    pub fn location(&self) -> &str {
        &self.location
    }

    pub fn view(&self) -> &View {
        &self.view
    }

    fn apply(&mut self, state: &AuthState) {
        for _ in 0..MAX_REDIRECTS {
            match self.guard.decide(&self.location, state) {
                GuardDecision::Pending => {
                    self.view = View::Loading;
                    return;
                }
                GuardDecision::Render(path) => {
                    self.location = path.clone();
                    self.view = View::Page(path);
                    return;
                }
                GuardDecision::Redirect(to) => {
                    tracing::debug!(from = %self.location, %to, "route guard redirect");
                    self.location = to;
                }
            }
        }
        tracing::warn!(location = %self.location, "redirect loop in route table");
        self.view = View::Page(self.location.clone());
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use tsutome_client::{AuthApi, LOGIN_PATH, LOGOUT_PATH, ME_PATH};
    use tsutome_protocol::{MeResponse, PlayerId, PublicPlayer, Role};
    use tsutome_transport::Method;
    use tsutome_transport::testing::ScriptedTransport;

    use super::*;
    use crate::QueryCache;

    fn me(role: Role) -> String {
        serde_json::to_string(&MeResponse::signed_in(PublicPlayer {
            id: PlayerId(1),
            username: "u".into(),
            display_name: "U".into(),
            role,
            level: 1,
            exp: 0,
            coins: 0,
        }))
        .unwrap()
    }

    fn context(transport: &Arc<ScriptedTransport>) -> AuthContext<ScriptedTransport> {
        AuthContext::init(AuthApi::from_shared(Arc::clone(transport)), QueryCache::new())
    }

    #[tokio::test]
    async fn test_new_while_loading_shows_loading_then_resolves() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.respond(Method::Get, ME_PATH, 200, me(Role::Player));
        let ctx = context(&transport);

        let mut nav = Navigator::new(&ctx, RouteGuard::default(), "/tsutome");
        assert_eq!(nav.view(), &View::Loading);

        assert_eq!(nav.follow().await, Some(&View::Page("/tsutome".into())));
    }

    #[tokio::test]
    async fn test_deep_link_unauthenticated_lands_on_login_and_is_forgotten() {
        let transport = Arc::new(ScriptedTransport::new());
        transport
            .respond(Method::Get, ME_PATH, 401, r#"{"authenticated":false}"#)
            .respond(Method::Get, ME_PATH, 200, me(Role::Player));
        transport.respond(Method::Post, LOGIN_PATH, 200, "{}");
        let ctx = context(&transport);
        ctx.resolved().await;

        let mut nav = Navigator::new(&ctx, RouteGuard::default(), "/tsutome/42");
        assert_eq!(nav.location(), "/login");

        ctx.login("u", "p").await.unwrap();
        nav.sync();

        assert_eq!(nav.location(), "/");
    }

    #[tokio::test]
    async fn test_logout_anywhere_sends_to_login() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.respond(Method::Get, ME_PATH, 200, me(Role::Admin));
        transport.respond(Method::Post, LOGOUT_PATH, 200, "{}");
        let ctx = context(&transport);
        ctx.resolved().await;
        let mut nav = Navigator::new(&ctx, RouteGuard::default(), "/admin/players");
        assert_eq!(nav.view(), &View::Page("/admin/players".into()));

        ctx.logout().await.unwrap();

        assert_eq!(nav.follow().await, Some(&View::Page("/login".into())));
    }

    #[tokio::test]
    async fn test_navigate_player_to_admin_is_sent_home() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.respond(Method::Get, ME_PATH, 200, me(Role::Player));
        let ctx = context(&transport);
        ctx.resolved().await;
        let mut nav = Navigator::new(&ctx, RouteGuard::default(), "/");

        assert_eq!(nav.navigate("/admin"), &View::Page("/".into()));
    }
}
