//! Partial-hit batching over the embedding collaborator.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;

use super::error::ServiceError;
use crate::cache::{CacheStatus, Embedding, EmbeddingCache};
use crate::embedding::{EmbeddingError, TextEmbedder};
use crate::keys::{CacheKey, LocaleNormalizer, embed_key};

/// Vectors for a batch, in input order.
#[derive(Debug, Clone)]
pub struct EmbeddedBatch {
    pub vectors: Vec<Embedding>,
    /// Items answered from cache before the collaborator ran.
    pub cache_hits: usize,
}

impl EmbeddedBatch {
    pub fn cache_status(&self) -> CacheStatus {
        CacheStatus::from_counts(self.cache_hits, self.vectors.len())
    }
}

/// Serves embeddings from cache and sends only the misses to the embedder, in one call.
pub struct EmbeddingOrchestrator {
    embedder: Option<Arc<dyn TextEmbedder>>,
    cache: EmbeddingCache,
    locales: LocaleNormalizer,
    model_id: String,
}

impl std::fmt::Debug for EmbeddingOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmbeddingOrchestrator")
            .field("ready", &self.is_ready())
            .field("model_id", &self.model_id)
            .field("cache", &self.cache)
            .field("locales", &self.locales)
            .finish()
    }
}

impl EmbeddingOrchestrator {
    /// `embedder == None` means the model failed to load; every call then reports
    /// [`ServiceError::ModelUnready`].
    pub fn new(
        embedder: Option<Arc<dyn TextEmbedder>>,
        cache: EmbeddingCache,
        locales: LocaleNormalizer,
        model_id: impl Into<String>,
    ) -> Self {
        Self {
            embedder,
            cache,
            locales,
            model_id: model_id.into(),
        }
    }

    pub fn is_ready(&self) -> bool {
        self.embedder.is_some()
    }

    pub fn model_id(&self) -> &str {
        &self.model_id
    }

    pub fn locales(&self) -> &LocaleNormalizer {
        &self.locales
    }

    pub fn cache(&self) -> &EmbeddingCache {
        &self.cache
    }

    pub fn embed_batch<S: AsRef<str>>(
        &self,
        texts: &[S],
        locale: Option<&str>,
    ) -> Result<EmbeddedBatch, ServiceError> {
        if texts.is_empty() {
            return Err(ServiceError::validation("texts must contain at least one item"));
        }

        let embedder = self.embedder.as_ref().ok_or(ServiceError::ModelUnready)?;

        let locale = self.locales.normalize(locale);
        let keys: Vec<CacheKey> = texts
            .iter()
            .map(|t| embed_key(&locale, t.as_ref()))
            .collect();

        let mut slots: Vec<Option<Embedding>> = keys.iter().map(|k| self.cache.get(k)).collect();
        let misses: Vec<usize> = slots
            .iter()
            .enumerate()
            .filter_map(|(i, slot)| slot.is_none().then_some(i))
            .collect();
        let cache_hits = texts.len() - misses.len();

        debug!(
            locale = %locale,
            total = texts.len(),
            hits = cache_hits,
            misses = misses.len(),
            "Embedding cache lookup"
        );

        if !misses.is_empty() {
            let miss_texts: Vec<&str> = misses.iter().map(|&i| texts[i].as_ref()).collect();
            let computed = embedder.encode(&miss_texts)?;

            if computed.len() != misses.len() {
                return Err(EmbeddingError::OutputMismatch {
                    expected: misses.len(),
                    actual: computed.len(),
                }
                .into());
            }

            // Texts sharing a key inside one batch all take the first computed vector.
            let mut fresh: HashMap<&CacheKey, Embedding> = HashMap::with_capacity(misses.len());
            for (&index, vector) in misses.iter().zip(computed) {
                let embedding = fresh
                    .entry(&keys[index])
                    .or_insert_with(|| Arc::from(vector));
                slots[index] = Some(Arc::clone(embedding));
            }

            for (key, embedding) in fresh {
                self.cache.put(key.clone(), embedding);
            }
        }

        Ok(EmbeddedBatch {
            vectors: slots.into_iter().flatten().collect(),
            cache_hits,
        })
    }
}
