//! An in-memory [`Transport`] with canned responses, for tests.
//!
//! ```rust
//! use tsutome_transport::testing::ScriptedTransport;
//! use tsutome_transport::Method;
//!
//! let transport = ScriptedTransport::new();
//! transport.respond(Method::Get, "/api/me", 401, r#"{"authenticated":false}"#);
//! assert_eq!(transport.count(Method::Get, "/api/me"), 0);
//! ```

use std::collections::{HashMap, VecDeque};
use std::time::Duration;

use parking_lot::Mutex;

use crate::{HttpRequest, HttpResponse, Method, Transport, TransportError};

type Scripted = Result<HttpResponse, TransportError>;

/// Replies to each `(method, path)` from a queue of scripted results.
///
/// - Results are consumed in order; the LAST one is sticky and keeps
///   being returned, so "always 401" needs a single call.
/// - Unscripted routes answer `404`.
/// - Every request is recorded, including ones that fail.
/// - An optional delay is applied before answering, to keep a request
///   "in flight" while a test does something else.
#[derive(Debug, Default)]
pub struct ScriptedTransport {
    routes: Mutex<HashMap<(Method, String), VecDeque<Scripted>>>,
    requests: Mutex<Vec<HttpRequest>>,
    delay: Mutex<Option<Duration>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a response for `(method, path)`.
    pub fn respond(
        &self,
        method: Method,
        path: &str,
        status: u16,
        body: impl Into<Vec<u8>>,
    ) -> &Self {
        self.push(method, path, Ok(HttpResponse::new(status, body)))
    }

    /// Queues a transport failure for `(method, path)`.
    pub fn fail(&self, method: Method, path: &str, error: TransportError) -> &Self {
        self.push(method, path, Err(error))
    }

    /// Delays every answer by `delay`.
    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock() = Some(delay);
    }

    /// All requests seen so far, in arrival order.
    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().clone()
    }

    /// How many requests hit `(method, path)`.
    pub fn count(&self, method: Method, path: &str) -> usize {
        self.requests.lock().iter().filter(|r| r.method == method && r.path == path).count()
    }

    fn push(&self, method: Method, path: &str, result: Scripted) -> &Self {
        self.routes.lock().entry((method, path.to_string())).or_default().push_back(result);
        self
    }

    fn next_result(&self, method: Method, path: &str) -> Scripted {
        let mut routes = self.routes.lock();
        match routes.get_mut(&(method, path.to_string())) {
            Some(queue) if queue.len() > 1 => {
                queue.pop_front().unwrap_or(Ok(HttpResponse::new(404, "")))
            }
            Some(queue) => queue.front().cloned().unwrap_or(Ok(HttpResponse::new(404, ""))),
            None => Ok(HttpResponse::new(404, "")),
        }
    }
}

impl Transport for ScriptedTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let (method, path) = (request.method, request.path.clone());
        self.requests.lock().push(request);

        let delay = *self.delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        self.next_result(method, &path)
    }
}
