//! The request side of the auth flow.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use tsutome_protocol::{
    Codec, JsonCodec, LoginRequest, MeResponse, MessageBody, PublicPlayer, Shuren, Tsutome,
    strip_status_prefix,
};
use tsutome_transport::{HttpRequest, HttpResponse, Transport};

use crate::ClientError;

/// Session probe: "am I logged in, and as whom?"
pub const ME_PATH: &str = "/api/me";
/// Establishes a session.
pub const LOGIN_PATH: &str = "/api/login";
/// Destroys the current session.
pub const LOGOUT_PATH: &str = "/api/logout";
/// One-off tasks of the logged-in player.
pub const TSUTOMES_PATH: &str = "/api/tsutomes";
/// Habits of the logged-in player.
pub const SHURENS_PATH: &str = "/api/shurens";

/// Issues the auth requests over a [`Transport`].
///
/// Cloning is cheap (the transport sits behind an `Arc`) and every clone
/// talks through the same transport, so they share one cookie jar.
pub struct AuthApi<T: Transport> {
    transport: Arc<T>,
    codec: JsonCodec,
}

impl<T: Transport> Clone for AuthApi<T> {
    fn clone(&self) -> Self {
        Self {
            transport: Arc::clone(&self.transport),
            codec: self.codec,
        }
    }
}

impl<T: Transport> AuthApi<T> {
    pub fn new(transport: T) -> Self {
        Self::from_shared(Arc::new(transport))
    }

    /// Builds a client on a transport that is also used elsewhere.
    pub fn from_shared(transport: Arc<T>) -> Self {
        Self {
            transport,
            codec: JsonCodec,
        }
    }

    /// The underlying transport.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Asks the server who the current session belongs to.
    ///
    /// # Returns
    /// - `Ok(Some(player))`: 2xx with `authenticated: true`
    /// - `Ok(None)`: 401, or 2xx with `authenticated: false`. This is the
    ///   ordinary logged-out answer and is logged at debug level only.
    ///
    /// # Errors
    /// - [`ClientError::Network`]: transport failure or any other status
    /// - [`ClientError::Decode`]: 2xx with a body that doesn't parse
    pub async fn probe_session(&self) -> Result<Option<PublicPlayer>, ClientError> {
        let response = self.transport.send(HttpRequest::get(ME_PATH)).await?;

        match response.status {
            401 => {
                tracing::debug!("session probe: not logged in");
                Ok(None)
            }
            _ if response.is_success() => {
                let me: MeResponse = self.codec.decode(&response.body)?;
                let player = me.into_player()?;
                match &player {
                    Some(p) => tracing::debug!(
                        player_id = %p.id,
                        role = %p.role,
                        "session probe: logged in"
                    ),
                    None => tracing::debug!("session probe: not logged in"),
                }
                Ok(player)
            }
            status => Err(ClientError::Network(format!(
                "unexpected status {status} from {ME_PATH}"
            ))),
        }
    }

    /// Submits credentials. On success the server has set the session
    /// cookie; it is the caller's job to re-probe.
    ///
    /// # Errors
    /// - [`ClientError::InvalidCredentials`]: 401, with the server's
    ///   message (status prefix stripped)
    /// - [`ClientError::Server`]: 5xx or another non-2xx status
    /// - [`ClientError::Network`]: transport failure
    pub async fn login(&self, username: &str, password: &str) -> Result<(), ClientError> {
        let body = self.codec.encode(&LoginRequest {
            username: username.to_string(),
            password: password.to_string(),
        })?;
        let response = self.transport.send(HttpRequest::post(LOGIN_PATH, Some(body))).await?;

        if response.is_success() {
            tracing::info!(username, "login accepted");
            return Ok(());
        }

        let message = self.error_message(&response);
        tracing::debug!(username, status = response.status, %message, "login rejected");
        match response.status {
            401 => Err(ClientError::InvalidCredentials(message)),
            status => Err(ClientError::Server { status, message }),
        }
    }

    /// Destroys the server session. Calling it without a session is not
    /// an error; the server answers 200 either way.
    ///
    /// # Errors
    /// [`ClientError::Server`] on a non-2xx status,
    /// [`ClientError::Network`] on transport failure.
    pub async fn logout(&self) -> Result<(), ClientError> {
        let response = self.transport.send(HttpRequest::post(LOGOUT_PATH, None)).await?;

        if response.is_success() {
            tracing::info!("logged out");
            Ok(())
        } else {
            Err(ClientError::Server {
                status: response.status,
                message: self.error_message(&response),
            })
        }
    }

    /// The logged-in player's Tsutome list.
    pub async fn tsutomes(&self) -> Result<Vec<Tsutome>, ClientError> {
        self.get_json(TSUTOMES_PATH).await
    }

    /// The logged-in player's Shuren list.
    pub async fn shurens(&self) -> Result<Vec<Shuren>, ClientError> {
        self.get_json(SHURENS_PATH).await
    }

    /// `GET` a player-scoped JSON resource; 401 becomes
    /// [`ClientError::Unauthenticated`].
    async fn get_json<R: DeserializeOwned>(&self, path: &str) -> Result<R, ClientError> {
        let response = self.transport.send(HttpRequest::get(path)).await?;
        match response.status {
            401 => Err(ClientError::Unauthenticated),
            _ if response.is_success() => Ok(self.codec.decode(&response.body)?),
            status => Err(ClientError::Server {
                status,
                message: self.error_message(&response),
            }),
        }
    }

    /// Extracts a display message from an error response.
    ///
    /// Accepts `{"message": "..."}` or plain text, strips any leading
    /// `"<status>: "`, and falls back to a generic text for empty bodies.
    fn error_message(&self, response: &HttpResponse) -> String {
        let raw = match self.codec.decode::<MessageBody>(&response.body) {
            Ok(body) => body.message,
            Err(_) => response.text(),
        };
        let message = strip_status_prefix(&raw);
        if !message.is_empty() {
            return message.to_string();
        }
        match response.status {
            401 => "Invalid credentials".to_string(),
            _ if response.is_server_error() => "Server error".to_string(),
            s => format!("Request failed ({s})"),
        }
    }
}
