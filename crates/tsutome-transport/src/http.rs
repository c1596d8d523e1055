//! HTTP transport implementation using `reqwest`.

use std::time::Duration;

use crate::{HttpRequest, HttpResponse, Method, RequestId, Transport, TransportError};

/// Configuration for [`HttpTransport`].
#[derive(Debug, Clone)]
pub struct HttpConfig {
    /// Scheme, host and port of the server, e.g. `http://127.0.0.1:8080`.
    /// A trailing slash is ignored.
    pub base_url: String,

    /// Upper bound for one request, connect included.
    ///
    /// This is what guarantees the auth context's initial probe always
    /// settles: a hung server turns into [`TransportError::Timeout`].
    pub timeout: Duration,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8080".to_string(),
            timeout: Duration::from_secs(10),
        }
    }
}

impl HttpConfig {
    /// Default config pointed at `base_url`.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self { base_url: base_url.into(), ..Self::default() }
    }

    /// Overrides the request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// A [`Transport`] backed by a `reqwest::Client` with a cookie store.
///
/// The cookie store is what carries the session: `POST /api/login` sets
/// the `tsutome_session` cookie, every later request sends it back, and
/// `POST /api/logout` expires it.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: String,
}

impl HttpTransport {
    /// Builds the client and validates the base URL.
    ///
    /// # Errors
    /// - [`TransportError::InvalidUrl`] if `base_url` doesn't parse
    /// - [`TransportError::ConnectionFailed`] if the TLS backend can't
    ///   be initialized
    pub fn new(config: HttpConfig) -> Result<Self, TransportError> {
        let base_url = config.base_url.trim_end_matches('/').to_string();
        reqwest::Url::parse(&base_url)
            .map_err(|e| TransportError::InvalidUrl(format!("{base_url}: {e}")))?;

        let client = reqwest::Client::builder()
            .cookie_store(true)
            .timeout(config.timeout)
            .build()
            .map_err(|e| TransportError::ConnectionFailed(e.to_string()))?;

        Ok(Self { client, base_url })
    }

    /// The normalized base URL (no trailing slash).
    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

impl Transport for HttpTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let id = RequestId::next();
        let url = format!("{}{}", self.base_url, request.path);
        tracing::debug!(%id, method = %request.method, path = %request.path, "sending request");

        let mut builder = match request.method {
            Method::Get => self.client.get(&url),
            Method::Post => self.client.post(&url),
        };
        if let Some(body) = request.body {
            builder = builder.header(reqwest::header::CONTENT_TYPE, "application/json").body(body);
        }

        let response = builder.send().await.map_err(classify)?;
        let status = response.status().as_u16();
        let body = response.bytes().await.map_err(classify)?.to_vec();

        tracing::debug!(%id, status, bytes = body.len(), "response received");
        Ok(HttpResponse { status, body })
    }
}

/// Maps a `reqwest` failure onto the transport taxonomy.
fn classify(e: reqwest::Error) -> TransportError {
    if e.is_timeout() {
        TransportError::Timeout
    } else if e.is_connect() {
        TransportError::ConnectionFailed(e.to_string())
    } else if e.is_builder() {
        TransportError::InvalidUrl(e.to_string())
    } else {
        TransportError::RequestFailed(e.to_string())
    }
}
