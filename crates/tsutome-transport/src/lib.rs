//! Transport abstraction layer for the Tsutome client.
//!
//! Provides the [`Transport`] trait: "send this request, give me back a
//! status and a body". The auth client is written against the trait, so
//! the same code runs over real HTTP ([`HttpTransport`]) and over a
//! scripted in-memory transport in tests.
//!
//! # Feature Flags
//!
//! - `http` (default): HTTP transport via `reqwest`, with a cookie store
//!   so the session cookie set by `POST /api/login` rides along on later
//!   requests.
//! - `testing`: exposes [`testing::ScriptedTransport`].

mod error;
#[cfg(feature = "http")]
mod http;
#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use error::TransportError;
#[cfg(feature = "http")]
pub use http::{HttpConfig, HttpTransport};

use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};

/// Counter for generating unique request IDs.
static NEXT_REQUEST_ID: AtomicU64 = AtomicU64::new(1);

/// Opaque identifier for one request, used to correlate log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RequestId(u64);

impl RequestId {
    /// Allocates the next process-wide request ID.
    pub fn next() -> Self {
        Self(NEXT_REQUEST_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Returns the underlying `u64` value.
    pub fn into_inner(self) -> u64 {
        self.0
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "req-{}", self.0)
    }
}

/// The HTTP methods the `/api/*` surface uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Get => write!(f, "GET"),
            Self::Post => write!(f, "POST"),
        }
    }
}

/// A request relative to the transport's base URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub method: Method,
    /// Absolute path, e.g. `/api/me`.
    pub path: String,
    /// JSON body, if any.
    pub body: Option<Vec<u8>>,
}

impl HttpRequest {
    /// A body-less `GET`.
    pub fn get(path: impl Into<String>) -> Self {
        Self {
            method: Method::Get,
            path: path.into(),
            body: None,
        }
    }

    /// A `POST`, optionally carrying a JSON body.
    pub fn post(path: impl Into<String>, body: Option<Vec<u8>>) -> Self {
        Self {
            method: Method::Post,
            path: path.into(),
            body,
        }
    }
}

/// What came back: a status code and the raw body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// `true` for any 2xx status.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// `true` for any 5xx status.
    pub fn is_server_error(&self) -> bool {
        (500..600).contains(&self.status)
    }

    /// The body as text, replacing invalid UTF-8.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Sends requests to the Tsutome server.
///
/// The returned future must be `Send`: the auth context runs probes on
/// spawned Tokio tasks. Implementations may still write `async fn send`.
pub trait Transport: Send + Sync + 'static {
    /// Performs one request.
    ///
    /// # Errors
    /// Returns a [`TransportError`] only when no HTTP status was obtained.
    /// Error statuses are returned as `Ok(HttpResponse)`.
    fn send(
        &self,
        request: HttpRequest,
    ) -> impl Future<Output = Result<HttpResponse, TransportError>> + Send;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_id_next_is_monotonic() {
        let a = RequestId::next();
        let b = RequestId::next();
        assert!(b.into_inner() > a.into_inner());
    }

    #[test]
    fn test_request_id_display() {
        assert!(RequestId::next().to_string().starts_with("req-"));
    }

    #[test]
    fn test_http_request_constructors() {
        let get = HttpRequest::get("/api/me");
        assert_eq!(get.method, Method::Get);
        assert!(get.body.is_none());

        let post = HttpRequest::post("/api/login", Some(b"{}".to_vec()));
        assert_eq!(post.method, Method::Post);
        assert_eq!(post.body.as_deref(), Some(&b"{}"[..]));
    }

    #[test]
    fn test_http_response_status_classes() {
        assert!(HttpResponse::new(200, "").is_success());
        assert!(HttpResponse::new(204, "").is_success());
        assert!(!HttpResponse::new(401, "").is_success());
        assert!(HttpResponse::new(503, "").is_server_error());
        assert!(!HttpResponse::new(404, "").is_server_error());
    }

    #[test]
    fn test_http_response_text_is_lossy() {
        let resp = HttpResponse::new(401, vec![b'o', b'k', 0xff]);
        assert!(resp.text().starts_with("ok"));
    }
}
