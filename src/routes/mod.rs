//! API routes

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use serde::Serialize;

use crate::config::Persona;
use crate::conversation::RelayReply;
use crate::core::{replies, RelayError};
use crate::AppState;

/// Key used when the forwarded-for header is absent
pub const UNKNOWN_CLIENT: &str = "unknown";

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

/// A `{ message }` body that is never cached
struct NoStore {
    status: StatusCode,
    message: String,
}

impl IntoResponse for NoStore {
    fn into_response(self) -> Response {
        let mut response = (
            self.status,
            Json(RelayReply {
                message: self.message,
            }),
        )
            .into_response();
        response
            .headers_mut()
            .insert(header::CACHE_CONTROL, HeaderValue::from_static("no-store"));
        response
    }
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        NoStore {
            status: StatusCode::from_u16(self.status())
                .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
            message: self.user_message().to_string(),
        }
        .into_response()
    }
}

/// First entry of `x-forwarded-for`, or [`UNKNOWN_CLIENT`]
pub fn client_key(headers: &HeaderMap) -> String {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|ip| !ip.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| UNKNOWN_CLIENT.to_string())
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

async fn respond(
    state: &AppState,
    persona: Persona,
    headers: &HeaderMap,
    body: &[u8],
) -> Response {
    let client = client_key(headers);
    match state.relay.relay(persona, &client, body).await {
        Ok(reply) => NoStore {
            status: StatusCode::OK,
            message: reply.message,
        }
        .into_response(),
        Err(err) => err.into_response(),
    }
}

async fn relay_persona(
    State(state): State<AppState>,
    Path(segment): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    match Persona::from_segment(&segment) {
        Some(persona) => respond(&state, persona, &headers, &body).await,
        None => NoStore {
            status: StatusCode::NOT_FOUND,
            message: replies::NOT_FOUND.to_string(),
        }
        .into_response(),
    }
}

async fn story_chat(State(state): State<AppState>, headers: HeaderMap, body: Bytes) -> Response {
    respond(&state, Persona::Story, &headers, &body).await
}

async fn about_chat(State(state): State<AppState>, headers: HeaderMap, body: Bytes) -> Response {
    respond(&state, Persona::About, &headers, &body).await
}

async fn wiki_chat(State(state): State<AppState>, headers: HeaderMap, body: Bytes) -> Response {
    respond(&state, Persona::Wiki, &headers, &body).await
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/relay/:persona", post(relay_persona))
        .route("/api/chat", post(story_chat))
        .route("/api/about-chat", post(about_chat))
        .route("/api/wiki", post(wiki_chat))
}
