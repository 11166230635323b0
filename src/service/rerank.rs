//! Cross-encoder ranking with a cosine-similarity fallback.

use std::sync::Arc;

use serde::Deserialize;
use tracing::debug;

use super::availability::RerankerTracker;
use super::embed::EmbeddingOrchestrator;
use super::error::ServiceError;
use crate::cache::{CacheStatus, CachedRanking, RankedItem, RankingCache, ScoringPath};
use crate::constants::RERANK_FALLBACK_LABEL;
use crate::embedding::{EmbeddingError, RerankerError};
use crate::embedding::utils::dot;
use crate::keys::rerank_key;

/// One candidate to rank. Only `id` takes part in the cache key.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RerankCandidate {
    pub id: String,
    pub text: String,
}

impl RerankCandidate {
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RerankOutcome {
    pub ranking: CachedRanking,
    pub cache_status: CacheStatus,
    /// Reranker model id, or `"(fallback)"` when cosine similarity ranked the candidates.
    pub model: String,
}

pub struct RerankOrchestrator {
    embeddings: Arc<EmbeddingOrchestrator>,
    tracker: Arc<RerankerTracker>,
    cache: RankingCache,
}

impl std::fmt::Debug for RerankOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RerankOrchestrator")
            .field("tracker", &self.tracker)
            .field("cache", &self.cache)
            .finish()
    }
}

impl RerankOrchestrator {
    pub fn new(
        embeddings: Arc<EmbeddingOrchestrator>,
        tracker: Arc<RerankerTracker>,
        cache: RankingCache,
    ) -> Self {
        Self {
            embeddings,
            tracker,
            cache,
        }
    }

    pub fn tracker(&self) -> &Arc<RerankerTracker> {
        &self.tracker
    }

    pub fn cache(&self) -> &RankingCache {
        &self.cache
    }

    /// Ranks `candidates` against `query`, highest score first. Equal scores keep input order.
    pub fn rerank(
        &self,
        query: &str,
        candidates: &[RerankCandidate],
        locale: Option<&str>,
    ) -> Result<RerankOutcome, ServiceError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(ServiceError::validation("query must not be empty"));
        }
        if candidates.is_empty() {
            return Err(ServiceError::validation(
                "candidates must contain at least one item",
            ));
        }
        if !self.embeddings.is_ready() {
            return Err(ServiceError::ModelUnready);
        }

        let locale = self.embeddings.locales().normalize(locale);
        let key = rerank_key(&locale, query, candidates.iter().map(|c| c.id.as_str()));

        if let Some(ranking) = self.cache.get(&key) {
            debug!(locale = %locale, candidates = candidates.len(), "Rerank cache hit");
            return Ok(self.outcome(ranking, CacheStatus::Hit));
        }

        let (scores, scored_by) = match self.tracker.acquire() {
            Some(scorer) => {
                let pairs: Vec<(&str, &str)> =
                    candidates.iter().map(|c| (query, c.text.as_str())).collect();
                let scores = scorer.predict(&pairs)?;
                if scores.len() != candidates.len() {
                    return Err(RerankerError::OutputMismatch {
                        expected: candidates.len(),
                        actual: scores.len(),
                    }
                    .into());
                }
                (scores, ScoringPath::Reranker)
            }
            None => (
                self.cosine_scores(query, candidates, &locale)?,
                ScoringPath::Fallback,
            ),
        };

        let mut items: Vec<RankedItem> = candidates
            .iter()
            .zip(scores)
            .map(|(c, score)| RankedItem {
                id: c.id.clone(),
                score,
            })
            .collect();
        items.sort_by(|a, b| b.score.total_cmp(&a.score));

        debug!(
            locale = %locale,
            candidates = items.len(),
            fallback = scored_by.is_fallback(),
            top_score = items.first().map(|i| i.score),
            "Rerank computed"
        );

        let ranking = CachedRanking {
            items: items.into(),
            scored_by,
        };
        self.cache.put(key, ranking.clone());

        Ok(self.outcome(ranking, CacheStatus::Miss))
    }

    // Query and candidates go through the embedding cache in a single batch.
    fn cosine_scores(
        &self,
        query: &str,
        candidates: &[RerankCandidate],
        locale: &str,
    ) -> Result<Vec<f32>, ServiceError> {
        let texts: Vec<&str> = std::iter::once(query)
            .chain(candidates.iter().map(|c| c.text.as_str()))
            .collect();

        let batch = self.embeddings.embed_batch(&texts, Some(locale))?;
        let (query_vec, candidate_vecs) = match batch.vectors.split_first() {
            Some((query_vec, rest)) if rest.len() == candidates.len() => (query_vec, rest),
            _ => {
                return Err(EmbeddingError::OutputMismatch {
                    expected: texts.len(),
                    actual: batch.vectors.len(),
                }
                .into());
            }
        };

        Ok(candidate_vecs.iter().map(|v| dot(query_vec, v)).collect())
    }

    fn outcome(&self, ranking: CachedRanking, cache_status: CacheStatus) -> RerankOutcome {
        let model = match ranking.scored_by {
            ScoringPath::Reranker => self.tracker.model_id().to_string(),
            ScoringPath::Fallback => RERANK_FALLBACK_LABEL.to_string(),
        };

        RerankOutcome {
            ranking,
            cache_status,
            model,
        }
    }
}
