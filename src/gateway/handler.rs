use std::sync::Arc;

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::{HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use tracing::{debug, instrument};

use crate::cache::CacheStatus;
use crate::constants::CACHE_STATUS_HEADER;
use crate::gateway::error::GatewayError;
use crate::gateway::state::HandlerState;
use crate::gateway::types::{EmbedRequest, EmbedResponse, RerankRequest, RerankResponse};

#[instrument(skip(state, payload), fields(texts = tracing::field::Empty))]
pub async fn embed_handler(
    State(state): State<HandlerState>,
    payload: Result<Json<EmbedRequest>, JsonRejection>,
) -> Result<Response, GatewayError> {
    let Json(request) = payload?;
    tracing::Span::current().record("texts", request.texts.len());

    let embeddings = Arc::clone(&state.embeddings);
    let batch = tokio::task::spawn_blocking(move || {
        embeddings.embed_batch(&request.texts, request.locale.as_deref())
    })
    .await
    .map_err(|e| GatewayError::InternalError(format!("embedding task failed: {}", e)))??;

    let cache_status = batch.cache_status();
    debug!(%cache_status, hits = batch.cache_hits, "Embed request served");

    Ok(make_response(
        cache_status,
        EmbedResponse {
            vectors: batch.vectors,
            model: state.embeddings.model_id().to_string(),
        },
    ))
}

#[instrument(skip(state, payload), fields(candidates = tracing::field::Empty))]
pub async fn rerank_handler(
    State(state): State<HandlerState>,
    payload: Result<Json<RerankRequest>, JsonRejection>,
) -> Result<Response, GatewayError> {
    let Json(request) = payload?;
    tracing::Span::current().record("candidates", request.candidates.len());

    let reranker = Arc::clone(&state.reranker);
    let outcome = tokio::task::spawn_blocking(move || {
        reranker.rerank(
            &request.query,
            &request.candidates,
            request.locale.as_deref(),
        )
    })
    .await
    .map_err(|e| GatewayError::InternalError(format!("rerank task failed: {}", e)))??;

    debug!(
        cache_status = %outcome.cache_status,
        model = %outcome.model,
        "Rerank request served"
    );

    Ok(make_response(
        outcome.cache_status,
        RerankResponse {
            ranked: outcome.ranking.items,
            model: outcome.model,
        },
    ))
}

/// Builds a 200 JSON response tagged with the cache status header.
pub fn make_response<T: serde::Serialize>(cache_status: CacheStatus, body: T) -> Response {
    let mut headers = HeaderMap::new();
    headers.insert(
        CACHE_STATUS_HEADER,
        HeaderValue::from_static(cache_status.as_header_value()),
    );

    (StatusCode::OK, headers, Json(body)).into_response()
}
