/// Errors that can occur in the transport layer.
///
/// Every variant means "no HTTP status was obtained". A response with a
/// 4xx/5xx status is NOT a transport error; the caller decides what that
/// status means.
///
/// Payloads are strings so the error is `Clone` (the scripted test
/// transport hands the same failure out repeatedly).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    /// The base URL or a request path could not be turned into a URL.
    #[error("invalid url: {0}")]
    InvalidUrl(String),

    /// The TCP/TLS connection could not be established.
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    /// The request did not complete within the configured timeout.
    #[error("request timed out")]
    Timeout,

    /// The connection broke while sending the request or reading the body.
    #[error("request failed: {0}")]
    RequestFailed(String),
}
