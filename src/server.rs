use crate::error::{RelayError, Result};
use crate::logging::SharedLogger;
use crate::translate::frontend_types::{
    ChatRequest, ChatResponse, ModelList, StructuredRequest, StructuredResponse,
};
use crate::translate::{build_chat_payload, build_structured_payload, extract_json, extract_text};
use crate::upstream::UpstreamClient;

use axum::extract::State;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

#[derive(Clone)]
pub struct AppState {
    pub upstream: UpstreamClient,
    pub logger: SharedLogger,
}

pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/chat", post(handle_chat))
        .route("/structured", post(handle_structured))
        .route("/models", get(handle_models))
        .route("/health", get(handle_health))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn handle_chat(State(state): State<Arc<AppState>>, body: Bytes) -> Response {
    let result = chat(&state, &body).await;
    respond(&state, "/chat", result)
}

async fn handle_structured(State(state): State<Arc<AppState>>, body: Bytes) -> Response {
    let result = structured(&state, &body).await;
    respond(&state, "/structured", result)
}

async fn handle_models(State(state): State<Arc<AppState>>) -> Response {
    let result = state.upstream.list_models().await.map(ModelList::from_ids);
    respond(&state, "/models", result)
}

async fn handle_health(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "model": state.upstream.model(),
    }))
}

async fn chat(state: &AppState, body: &[u8]) -> Result<ChatResponse> {
    let req: ChatRequest = decode(body)?;
    let payload = build_chat_payload(&req, state.upstream.model())?;

    state.logger.info(
        "/chat",
        format!("Request: model={} chars={}", payload.model, req.message.len()),
    );

    let started = Instant::now();
    let resp = state.upstream.send(&payload).await?;
    let text = extract_text(&resp)?;
    state
        .logger
        .completed("/chat", &payload.model, elapsed_ms(started));

    Ok(ChatResponse {
        response: text,
        model: resp.model,
        usage: resp.usage,
    })
}

async fn structured(state: &AppState, body: &[u8]) -> Result<StructuredResponse> {
    let req: StructuredRequest = decode(body)?;
    let payload = build_structured_payload(&req, state.upstream.model())?;

    state.logger.info(
        "/structured",
        format!(
            "Request: model={} schema={}",
            payload.model,
            req.schema.as_ref().is_some_and(|s| !s.is_null())
        ),
    );

    let started = Instant::now();
    let resp = state.upstream.send(&payload).await?;
    let result = extract_json(&resp)?;
    state
        .logger
        .completed("/structured", &payload.model, elapsed_ms(started));

    Ok(StructuredResponse {
        result,
        usage: resp.usage,
    })
}

/// Decode an inbound body; anything that does not fit the shape is a
/// validation failure.
fn decode<T: DeserializeOwned>(body: &[u8]) -> Result<T> {
    serde_json::from_slice(body)
        .map_err(|e| RelayError::validation(format!("Invalid request body: {e}")))
}

fn respond<T: Serialize>(state: &AppState, route: &str, result: Result<T>) -> Response {
    match result {
        Ok(body) => Json(body).into_response(),
        Err(err) => {
            tracing::warn!(route = %route, code = err.code(), "{}", err);
            state.logger.failure(route, &err);
            err.into_response()
        }
    }
}

fn elapsed_ms(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}
