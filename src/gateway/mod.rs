//! HTTP gateway (Axum) exposing `/health`, `/embed` and `/rerank`.
//!
//! This module is primarily used by the `menu-ml` server binary.

#![allow(missing_docs)]

pub mod error;
pub mod handler;
pub mod state;
pub mod types;

#[cfg(test)]
mod handler_tests;

use axum::{
    Json, Router,
    extract::State,
    routing::{get, post},
};
use tower_http::trace::TraceLayer;

pub use error::GatewayError;
pub use handler::{embed_handler, rerank_handler};
pub use state::HandlerState;
pub use types::{EmbedRequest, EmbedResponse, HealthResponse, RerankRequest, RerankResponse};

use crate::constants::APP_NAME;

pub fn create_router_with_state(state: HandlerState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/embed", post(embed_handler))
        .route("/rerank", post(rerank_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Reports embedder readiness and the reranker model (`"(disabled)"` until loaded).
/// Never triggers a model load.
#[tracing::instrument(skip(state))]
pub async fn health_handler(State(state): State<HandlerState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        ok: state.embeddings.is_ready(),
        app: APP_NAME,
        embed_model: state.embeddings.model_id().to_string(),
        rerank_model: state.tracker().health_label().to_string(),
    })
}
