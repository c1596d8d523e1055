//! The login form's submit logic.

use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;
use tsutome_transport::Transport;

use crate::{AuthContext, AuthError, AuthState};

/// Result of one submit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Logged in; the state the follow-up probe committed.
    LoggedIn(AuthState),
    /// Rejected; the message is what the form shows.
    Rejected(String),
    /// Ignored because a submit was already running.
    Suppressed,
}

/// Submit-side state of the login page.
///
/// Holds the error line and the "submitting" flag the button reads.
/// While a submit is running, further submits are suppressed without a
/// request.
pub struct LoginForm<T: Transport> {
    context: AuthContext<T>,
    submitting: AtomicBool,
    error: Mutex<Option<String>>,
}

impl<T: Transport> LoginForm<T> {
    pub fn new(context: AuthContext<T>) -> Self {
        Self {
            context,
            submitting: AtomicBool::new(false),
            error: Mutex::new(None),
        }
    }

    pub async fn submit(&self, username: &str, password: &str) -> SubmitOutcome {
        if username.trim().is_empty() || password.is_empty() {
            return self.reject("Username and password are required".into());
        }
        if self.submitting.swap(true, Ordering::AcqRel) {
            tracing::debug!("login submit suppressed; one is already running");
            return SubmitOutcome::Suppressed;
        }
        let _submitting = Submitting(&self.submitting);

        match self.context.login(username, password).await {
            Ok(state) => {
                *self.error.lock() = None;
                SubmitOutcome::LoggedIn(state)
            }
            Err(AuthError::LoginInFlight) => SubmitOutcome::Suppressed,
            Err(AuthError::Client(error)) => self.reject(error.user_message()),
            Err(AuthError::Disposed) => self.reject("The page is closing".into()),
        }
    }

    /// `true` while a submit is running; the button is disabled.
    pub fn is_submitting(&self) -> bool {
        self.submitting.load(Ordering::Acquire)
    }

    /// The message under the form, if the last submit failed.
    pub fn error(&self) -> Option<String> {
        self.error.lock().clone()
    }

    fn reject(&self, message: String) -> SubmitOutcome {
        *self.error.lock() = Some(message.clone());
        SubmitOutcome::Rejected(message)
    }
}

/// Clears the submitting flag when the submit ends, including when its
/// future is dropped mid-flight.
struct Submitting<'a>(&'a AtomicBool);

impl Drop for Submitting<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use tsutome_client::{AuthApi, LOGIN_PATH, ME_PATH};
    use tsutome_protocol::{MeResponse, PlayerId, PublicPlayer, Role};
    use tsutome_transport::testing::ScriptedTransport;
    use tsutome_transport::{Method, TransportError};

    use super::*;
    use crate::QueryCache;

    fn admin_me() -> String {
        serde_json::to_string(&MeResponse::signed_in(PublicPlayer {
            id: PlayerId(1),
            username: "AdminTsutome".into(),
            display_name: "Admin".into(),
            role: Role::Admin,
            level: 1,
            exp: 0,
            coins: 0,
        }))
        .unwrap()
    }

    /// Starts signed out; every later probe sees the admin.
    async fn form() -> (LoginForm<ScriptedTransport>, Arc<ScriptedTransport>) {
        let transport = Arc::new(ScriptedTransport::new());
        transport
            .respond(Method::Get, ME_PATH, 401, r#"{"authenticated":false}"#)
            .respond(Method::Get, ME_PATH, 200, admin_me());
        let ctx =
            AuthContext::init(AuthApi::from_shared(Arc::clone(&transport)), QueryCache::new());
        ctx.resolved().await;
        (LoginForm::new(ctx), transport)
    }

    #[tokio::test]
    async fn test_submit_invalid_credentials_shows_message() {
        let (form, transport) = form().await;
        transport.respond(Method::Post, LOGIN_PATH, 401, "401: Invalid credentials");

        let outcome = form.submit("invalid_user", "wrong_password").await;

        assert_eq!(outcome, SubmitOutcome::Rejected("Invalid credentials".into()));
        assert_eq!(form.error().as_deref(), Some("Invalid credentials"));
        assert!(!form.is_submitting());
    }

    #[tokio::test]
    async fn test_submit_empty_fields_sends_nothing() {
        let (form, transport) = form().await;

        let outcome = form.submit("  ", "pw").await;

        assert!(matches!(outcome, SubmitOutcome::Rejected(_)));
        assert_eq!(transport.count(Method::Post, LOGIN_PATH), 0);
    }

    #[tokio::test]
    async fn test_submit_network_error_shows_connection_message() {
        let (form, transport) = form().await;
        transport.fail(Method::Post, LOGIN_PATH, TransportError::Timeout);

        let outcome = form.submit("a", "b").await;

        let SubmitOutcome::Rejected(message) = outcome else {
            panic!("expected rejection, got {outcome:?}");
        };
        assert!(!message.is_empty());
    }

    #[tokio::test]
    async fn test_submit_twice_quickly_sends_one_request() {
        let (form, transport) = form().await;
        transport.respond(Method::Post, LOGIN_PATH, 200, "{}");
        transport.set_delay(Duration::from_millis(20));

        let (first, second) = tokio::join!(
            form.submit("AdminTsutome", "AdminTsutome"),
            form.submit("AdminTsutome", "AdminTsutome"),
        );

        assert!(matches!(first, SubmitOutcome::LoggedIn(ref s) if s.role() == Some(Role::Admin)));
        assert_eq!(second, SubmitOutcome::Suppressed);
        assert_eq!(transport.count(Method::Post, LOGIN_PATH), 1);
        assert!(form.error().is_none());
    }

    #[tokio::test]
    async fn test_submit_success_clears_previous_error() {
        let (form, transport) = form().await;
        transport
            .respond(Method::Post, LOGIN_PATH, 401, "Invalid credentials")
            .respond(Method::Post, LOGIN_PATH, 200, "{}");

        form.submit("a", "wrong").await;
        assert!(form.error().is_some());
        form.submit("a", "right").await;

        assert!(form.error().is_none());
    }
}
