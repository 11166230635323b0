//! Locale normalization and cache-key derivation.
//!
//! Both caches key on `{locale}::{schema}::{fingerprint}`. The locale segment goes through
//! [`LocaleNormalizer`] for every key, so `"en_US"`, `"en-us"` and `"EN"` share entries.

use std::fmt;

use crate::constants::{DEFAULT_LOCALE, KEY_SCHEMA_VERSION};

/// Opaque cache key. Construction never fails.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[inline]
    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Reduces a free-form locale tag to its lowercase language subtag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocaleNormalizer {
    default: String,
}

impl LocaleNormalizer {
    /// Creates a normalizer whose fallback tag is `default` (itself normalized; an unusable
    /// default collapses to `"en"`).
    pub fn new(default: &str) -> Self {
        let default = base_tag(default).unwrap_or_else(|| DEFAULT_LOCALE.to_string());
        Self { default }
    }

    /// Returns the base language tag for `raw`, or the default when `raw` is absent or blank.
    pub fn normalize(&self, raw: Option<&str>) -> String {
        raw.and_then(base_tag)
            .unwrap_or_else(|| self.default.clone())
    }

    /// The tag used when a request carries none.
    pub fn default_locale(&self) -> &str {
        &self.default
    }

    /// Key for a single embedded text: `{locale}::v1::{trimmed lowercase text}`.
    pub fn embed_key(&self, text: &str, locale: Option<&str>) -> CacheKey {
        embed_key(&self.normalize(locale), text)
    }

    /// Key for a rerank request: locale, query, and the ordered candidate ids.
    pub fn rerank_key<'a, I>(&self, query: &str, candidate_ids: I, locale: Option<&str>) -> CacheKey
    where
        I: IntoIterator<Item = &'a str>,
    {
        rerank_key(&self.normalize(locale), query, candidate_ids)
    }
}

impl Default for LocaleNormalizer {
    fn default() -> Self {
        Self::new(DEFAULT_LOCALE)
    }
}

fn base_tag(raw: &str) -> Option<String> {
    let lowered = raw.trim().to_lowercase().replace('_', "-");
    let base = lowered.split('-').next().unwrap_or_default().trim();
    (!base.is_empty()).then(|| base.to_string())
}

/// Builds an embedding key from an already-normalized locale.
pub fn embed_key(locale: &str, text: &str) -> CacheKey {
    CacheKey(format!(
        "{locale}::{KEY_SCHEMA_VERSION}::{}",
        fingerprint_text(text)
    ))
}

/// Builds a rerank key from an already-normalized locale.
///
/// Candidate ids are length-prefixed so an id containing `,` cannot alias two shorter ids.
/// Candidate text is deliberately not part of the key: text under a fixed id is assumed
/// stable for the cache's lifetime.
pub fn rerank_key<'a, I>(locale: &str, query: &str, candidate_ids: I) -> CacheKey
where
    I: IntoIterator<Item = &'a str>,
{
    let ids = candidate_ids
        .into_iter()
        .map(|id| format!("{}:{id}", id.len()))
        .collect::<Vec<_>>()
        .join(",");

    CacheKey(format!(
        "{locale}::{KEY_SCHEMA_VERSION}::{}::{ids}",
        fingerprint_text(query)
    ))
}

#[inline]
fn fingerprint_text(text: &str) -> String {
    text.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_region_variants_share_a_tag() {
        let normalizer = LocaleNormalizer::default();

        for raw in ["en_US", "en-us", "EN", " en ", "en-GB-oxendict"] {
            assert_eq!(normalizer.normalize(Some(raw)), "en", "input {raw:?}");
        }
        assert_eq!(normalizer.normalize(Some("fr_CA")), "fr");
        assert_eq!(normalizer.normalize(Some("pt-BR")), "pt");
    }

    #[test]
    fn test_normalize_blank_input_uses_default() {
        let normalizer = LocaleNormalizer::default();

        assert_eq!(normalizer.normalize(None), "en");
        assert_eq!(normalizer.normalize(Some("")), "en");
        assert_eq!(normalizer.normalize(Some("   ")), "en");
        assert_eq!(normalizer.normalize(Some("-US")), "en");
        assert_eq!(normalizer.normalize(Some("_")), "en");
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let normalizer = LocaleNormalizer::new("it");
        let inputs = [
            None,
            Some(""),
            Some("EN_us"),
            Some("zh-Hant-TW"),
            Some("  de_AT "),
            Some("-"),
            Some("x"),
        ];

        for raw in inputs {
            let once = normalizer.normalize(raw);
            let twice = normalizer.normalize(Some(&once));
            assert_eq!(once, twice, "input {raw:?}");
        }
    }

    #[test]
    fn test_custom_default_is_normalized() {
        assert_eq!(LocaleNormalizer::new("FR_fr").default_locale(), "fr");
        assert_eq!(LocaleNormalizer::new("  ").default_locale(), "en");
        assert_eq!(LocaleNormalizer::new("es").normalize(None), "es");
    }

    #[test]
    fn test_embed_key_layout() {
        let normalizer = LocaleNormalizer::default();
        let key = normalizer.embed_key("  Margherita Pizza ", Some("en_US"));

        assert_eq!(key.as_str(), "en::v1::margherita pizza");
    }

    #[test]
    fn test_embed_key_folds_case_but_not_content() {
        let normalizer = LocaleNormalizer::default();

        assert_eq!(
            normalizer.embed_key("hello", None),
            normalizer.embed_key("HELLO", Some("en"))
        );
        assert_ne!(
            normalizer.embed_key("hello", None),
            normalizer.embed_key("hello!", None)
        );
        assert_ne!(
            normalizer.embed_key("hello", Some("en")),
            normalizer.embed_key("hello", Some("fr"))
        );
    }

    #[test]
    fn test_embed_key_accepts_empty_text() {
        let key = LocaleNormalizer::default().embed_key("", None);
        assert_eq!(key.as_str(), "en::v1::");
    }

    #[test]
    fn test_rerank_key_depends_on_id_order() {
        let normalizer = LocaleNormalizer::default();

        let ab = normalizer.rerank_key("Pizza", ["a", "b"], None);
        let ba = normalizer.rerank_key("Pizza", ["b", "a"], None);

        assert_ne!(ab, ba);
        assert_eq!(ab.as_str(), "en::v1::pizza::1:a,1:b");
    }

    #[test]
    fn test_rerank_key_ids_cannot_alias() {
        let normalizer = LocaleNormalizer::default();

        let joined = normalizer.rerank_key("q", ["a,b"], None);
        let split = normalizer.rerank_key("q", ["a", "b"], None);

        assert_ne!(joined, split);
    }

    #[test]
    fn test_rerank_key_normalizes_query_and_locale() {
        let normalizer = LocaleNormalizer::default();

        assert_eq!(
            normalizer.rerank_key("  PIZZA ", ["1"], Some("EN-gb")),
            normalizer.rerank_key("pizza", ["1"], None)
        );
    }
}
