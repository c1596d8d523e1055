//! Request handlers for `/api/*`.
//!
//! Each handler:
//!   1. Reads the session cookie (if it needs one)
//!   2. Resolves it through the session store and the player directory
//!   3. Answers with JSON; failures go through [`ApiError`]
//!
//! Session lookups hold the store's lock for one call only, never across
//! the directory's `await`.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::{HeaderMap, HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use tsutome_protocol::{
    LoginRequest, LoginResponse, MeResponse, MessageBody, PublicPlayer, Shuren, Tsutome,
};
use tsutome_session::PlayerDirectory;

use crate::ApiError;
use crate::server::ServerState;

/// Name of the session cookie.
pub const SESSION_COOKIE: &str = "tsutome_session";

type AppState<D> = State<Arc<ServerState<D>>>;

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// `GET /api/me`
pub(crate) async fn me<D: PlayerDirectory>(
    State(state): AppState<D>,
    headers: HeaderMap,
) -> Response {
    match current_player(&state, &headers).await {
        Some(player) => Json(MeResponse::signed_in(player)).into_response(),
        None => (StatusCode::UNAUTHORIZED, Json(MeResponse::signed_out())).into_response(),
    }
}

/// `POST /api/login`
///
/// A session cookie sent along with the request is destroyed before the
/// new session is created, so logging in again never leaves the old
/// token alive.
pub(crate) async fn login<D: PlayerDirectory>(
    State(state): AppState<D>,
    headers: HeaderMap,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(request) = payload.map_err(|rejection| {
        tracing::debug!(error = %rejection, "malformed login body");
        ApiError::BadRequest(rejection.body_text())
    })?;

    let player = match state.directory.verify(&request.username, &request.password).await {
        Ok(player) => player,
        Err(e) => {
            tracing::info!(username = %request.username, error = %e, "login rejected");
            return Err(e.into());
        }
    };

    let (token, sessions_open) = {
        let mut sessions = state.sessions.lock().await;
        if let Some(previous) = parse_cookie(&headers, SESSION_COOKIE) {
            if let Ok(previous_owner) = sessions.destroy(&previous) {
                tracing::debug!(%previous_owner, "previous session replaced by login");
            }
        }
        let token = sessions.create(player.id).token.clone();
        (token, sessions.count_for(player.id))
    };
    tracing::info!(
        player_id = %player.id,
        role = %player.role,
        sessions_open,
        "player logged in"
    );

    let cookie = session_cookie(&token, state.secure_cookie)?;
    Ok(([(header::SET_COOKIE, cookie)], Json(LoginResponse { player })).into_response())
}

/// `POST /api/logout`
///
/// Always succeeds: logging out without a live session is a no-op.
pub(crate) async fn logout<D: PlayerDirectory>(
    State(state): AppState<D>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    if let Some(token) = parse_cookie(&headers, SESSION_COOKIE) {
        let mut sessions = state.sessions.lock().await;
        if let Err(e) = sessions.destroy(&token) {
            tracing::debug!(error = %e, "logout without a live session");
        }
    }

    let cookie = clear_session_cookie(state.secure_cookie)?;
    Ok(([(header::SET_COOKIE, cookie)], Json(MessageBody::new("Logged out"))).into_response())
}

/// `GET /api/tsutomes`
pub(crate) async fn tsutomes<D: PlayerDirectory>(
    State(state): AppState<D>,
    headers: HeaderMap,
) -> Result<Json<Vec<Tsutome>>, ApiError> {
    let player = current_player(&state, &headers).await.ok_or(ApiError::Unauthenticated)?;
    Ok(Json(state.quests.tsutomes(player.id)))
}

/// `GET /api/shurens`
pub(crate) async fn shurens<D: PlayerDirectory>(
    State(state): AppState<D>,
    headers: HeaderMap,
) -> Result<Json<Vec<Shuren>>, ApiError> {
    let player = current_player(&state, &headers).await.ok_or(ApiError::Unauthenticated)?;
    Ok(Json(state.quests.shurens(player.id)))
}

// ---------------------------------------------------------------------------
// Session helpers
// ---------------------------------------------------------------------------

/// The player behind the request's cookie, if the session is live and
/// the account still exists.
async fn current_player<D: PlayerDirectory>(
    state: &ServerState<D>,
    headers: &HeaderMap,
) -> Option<PublicPlayer> {
    let token = parse_cookie(headers, SESSION_COOKIE)?;

    let resolved = state.sessions.lock().await.resolve(&token);
    let player_id = match resolved {
        Ok(id) => id,
        Err(e) => {
            tracing::debug!(error = %e, "session cookie rejected");
            return None;
        }
    };

    match state.directory.lookup(player_id).await {
        Some(player) => Some(player),
        None => {
            // Account gone: its sessions are dead weight.
            state.sessions.lock().await.destroy_player(player_id);
            tracing::info!(%player_id, "session for removed account dropped");
            None
        }
    }
}

/// Value of cookie `name` in the request's `Cookie` header.
pub(crate) fn parse_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value.to_string())
}

fn session_cookie(token: &str, secure: bool) -> Result<HeaderValue, ApiError> {
    cookie_header(&format!(
        "{SESSION_COOKIE}={token}; HttpOnly; SameSite=Strict; Path=/{}",
        secure_attr(secure)
    ))
}

fn clear_session_cookie(secure: bool) -> Result<HeaderValue, ApiError> {
    cookie_header(&format!(
        "{SESSION_COOKIE}=; Max-Age=0; Expires=Thu, 01 Jan 1970 00:00:00 GMT; HttpOnly; SameSite=Strict; Path=/{}",
        secure_attr(secure)
    ))
}

fn secure_attr(secure: bool) -> &'static str {
    if secure { "; Secure" } else { "" }
}

fn cookie_header(value: &str) -> Result<HeaderValue, ApiError> {
    HeaderValue::from_str(value).map_err(|e| {
        tracing::error!(error = %e, "unencodable Set-Cookie value");
        ApiError::Internal
    })
}
