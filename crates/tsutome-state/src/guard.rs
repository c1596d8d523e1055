//! Route guarding: a pure function of (path, auth state).
//!
//! | state           | public route   | player route   | admin route          |
//! |-----------------|----------------|----------------|----------------------|
//! | loading         | Pending        | Pending        | Pending              |
//! | unauthenticated | Render         | → login        | → login              |
//! | player          | → landing      | Render         | → landing            |
//! | admin           | → admin home   | Render         | Render               |
//!
//! The guard never consults the network and never renders protected
//! content while the state is still loading.

use tsutome_protocol::Role;

use crate::AuthState;

/// Which paths are public, which are admin-only, and where to send
/// people.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteTable {
    /// The login page. The only public route.
    pub login: String,
    /// Where a logged-in player lands.
    pub landing: String,
    /// Where a logged-in admin lands.
    pub admin_landing: String,
    /// Paths equal to this, or below it, are admin-only.
    pub admin_prefix: String,
}

impl Default for RouteTable {
    fn default() -> Self {
        Self {
            login: "/login".into(),
            landing: "/".into(),
            admin_landing: "/admin".into(),
            admin_prefix: "/admin".into(),
        }
    }
}

/// Who may see a route.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Public,
    Authenticated,
    Admin,
}

impl RouteTable {
    /// Classifies `path`. Query strings, fragments and trailing slashes
    /// are ignored.
    pub fn access(&self, path: &str) -> Access {
        let path = normalize(path);
        if path == normalize(&self.login) {
            return Access::Public;
        }
        let admin = normalize(&self.admin_prefix);
        let below_admin = path
            .strip_prefix(admin)
            .is_some_and(|rest| rest.is_empty() || rest.starts_with('/'));
        if below_admin {
            Access::Admin
        } else {
            Access::Authenticated
        }
    }

    /// Landing page for a freshly authenticated user.
    pub fn landing_for(&self, role: Role) -> &str {
        if role.is_admin() {
            &self.admin_landing
        } else {
            &self.landing
        }
    }
}

/// `AuthState` reduced to what routing needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardState {
    Loading,
    Unauthenticated,
    Authenticated(Role),
}

impl From<&AuthState> for GuardState {
    fn from(state: &AuthState) -> Self {
        match (state.is_loading(), state.role()) {
            (true, _) => GuardState::Loading,
            (false, Some(role)) => GuardState::Authenticated(role),
            (false, None) => GuardState::Unauthenticated,
        }
    }
}

/// What to do with a navigation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardDecision {
    /// Auth is still loading; show a placeholder, not the page.
    Pending,
    /// Show the page at this path.
    Render(String),
    /// Go here instead.
    Redirect(String),
}

/// Applies a [`RouteTable`] to navigations.
#[derive(Debug, Clone, Default)]
pub struct RouteGuard {
    routes: RouteTable,
}

impl RouteGuard {
    pub fn new(routes: RouteTable) -> Self {
        Self { routes }
    }

    pub fn routes(&self) -> &RouteTable {
        &self.routes
    }

    pub fn decide(&self, path: &str, state: &AuthState) -> GuardDecision {
        self.decide_for(path, GuardState::from(state))
    }

    pub fn decide_for(&self, path: &str, state: GuardState) -> GuardDecision {
        let access = self.routes.access(path);
        match (state, access) {
            (GuardState::Loading, _) => GuardDecision::Pending,

            (GuardState::Unauthenticated, Access::Public) => render(path),
            (GuardState::Unauthenticated, _) => {
                GuardDecision::Redirect(self.routes.login.clone())
            }

            (GuardState::Authenticated(role), Access::Public) => {
                GuardDecision::Redirect(self.routes.landing_for(role).to_string())
            }
            (GuardState::Authenticated(role), Access::Admin) if !role.is_admin() => {
                GuardDecision::Redirect(self.routes.landing.clone())
            }
            (GuardState::Authenticated(_), _) => render(path),
        }
    }
}

fn render(path: &str) -> GuardDecision {
    GuardDecision::Render(normalize(path).to_string())
}

/// Strips query and fragment, and any trailing slash except the root's.
fn normalize(path: &str) -> &str {
    let end = path.find(['?', '#']).unwrap_or(path.len());
    let trimmed = path[..end].trim_end_matches('/');
    if trimmed.is_empty() { "/" } else { trimmed }
}
