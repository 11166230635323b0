//! Request and response bodies.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::cache::{Embedding, RankedItem};
use crate::service::RerankCandidate;

#[derive(Debug, Clone, Deserialize)]
pub struct EmbedRequest {
    pub texts: Vec<String>,
    #[serde(default)]
    pub locale: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct EmbedResponse {
    pub vectors: Vec<Embedding>,
    pub model: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RerankRequest {
    pub query: String,
    pub candidates: Vec<RerankCandidate>,
    #[serde(default)]
    pub locale: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct RerankResponse {
    pub ranked: Arc<[RankedItem]>,
    pub model: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub ok: bool,
    pub app: &'static str,
    pub embed_model: String,
    pub rerank_model: String,
}
