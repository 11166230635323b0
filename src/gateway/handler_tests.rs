//! Router-level tests for `/health`, `/embed` and `/rerank`.

use std::sync::Arc;

use axum::{Router, body::Body, http::Request, http::StatusCode};
use http_body_util::BodyExt;
use tower::ServiceExt;

use crate::cache::{CacheConfig, EmbeddingCache, RankingCache};
use crate::constants::{CACHE_STATUS_HEADER, STUB_EMBED_LABEL};
use crate::embedding::{
    BertEmbedder, EncoderConfig, MockEmbedder, MockScorerLoader, ScorerLoader, TextEmbedder,
};
use crate::gateway::create_router_with_state;
use crate::gateway::state::HandlerState;
use crate::keys::LocaleNormalizer;
use crate::service::{
    EmbeddingOrchestrator, ModelAvailability, RerankOrchestrator, RerankerTracker,
};

const EMBED_MODEL: &str = "test/embedder";
const RERANK_MODEL: &str = "test/reranker";

struct TestApp {
    router: Router,
    state: HandlerState,
    embedder: Arc<MockEmbedder>,
    loader: Arc<MockScorerLoader>,
}

fn build_app(ready: bool, loader: MockScorerLoader, rerank_cache: CacheConfig) -> TestApp {
    let embedder = Arc::new(MockEmbedder::new());
    let loader = Arc::new(loader);

    let embeddings = Arc::new(EmbeddingOrchestrator::new(
        ready.then(|| embedder.clone() as Arc<dyn TextEmbedder>),
        EmbeddingCache::new(CacheConfig::from_secs(128, 60)),
        LocaleNormalizer::default(),
        EMBED_MODEL,
    ));
    let tracker = Arc::new(RerankerTracker::new(
        loader.clone() as Arc<dyn ScorerLoader>,
        RERANK_MODEL,
        true,
    ));
    let reranker = Arc::new(RerankOrchestrator::new(
        Arc::clone(&embeddings),
        tracker,
        RankingCache::new(rerank_cache),
    ));

    let state = HandlerState::new(embeddings, reranker);

    TestApp {
        router: create_router_with_state(state.clone()),
        state,
        embedder,
        loader,
    }
}

/// Router over a stub-mode `BertEmbedder`, labelled the way the server binary labels it.
fn stub_app() -> Router {
    let embedder = BertEmbedder::load(EncoderConfig::stub()).unwrap();
    let label = embedder.model_label("intfloat/multilingual-e5-small");

    let embeddings = Arc::new(EmbeddingOrchestrator::new(
        Some(Arc::new(embedder) as Arc<dyn TextEmbedder>),
        EmbeddingCache::new(CacheConfig::from_secs(16, 60)),
        LocaleNormalizer::default(),
        label,
    ));
    let tracker = Arc::new(RerankerTracker::new(
        Arc::new(MockScorerLoader::failing()) as Arc<dyn ScorerLoader>,
        RERANK_MODEL,
        true,
    ));
    let reranker = Arc::new(RerankOrchestrator::new(
        Arc::clone(&embeddings),
        tracker,
        RankingCache::new(CacheConfig::from_secs(8, 60)),
    ));

    create_router_with_state(HandlerState::new(embeddings, reranker))
}

fn fallback_app() -> TestApp {
    build_app(
        true,
        MockScorerLoader::failing(),
        CacheConfig::from_secs(32, 60),
    )
}

async fn post_json(
    router: &Router,
    uri: &str,
    body: serde_json::Value,
) -> axum::response::Response {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header("Content-Type", "application/json")
        .body(Body::from(serde_json::to_string(&body).unwrap()))
        .unwrap();

    router.clone().oneshot(request).await.unwrap()
}

async fn get(router: &Router, uri: &str) -> axum::response::Response {
    let request = Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap();

    router.clone().oneshot(request).await.unwrap()
}

fn cache_header(response: &axum::response::Response) -> Option<String> {
    response
        .headers()
        .get(CACHE_STATUS_HEADER)
        .map(|v| v.to_str().unwrap().to_string())
}

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

mod health_handler_tests {
    use super::*;

    #[tokio::test]
    async fn test_health_reports_disabled_reranker_before_load() {
        let app = fallback_app();

        let response = get(&app.router, "/health").await;

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["ok"], true);
        assert_eq!(body["app"], "smart-menu-ml");
        assert_eq!(body["embedModel"], EMBED_MODEL);
        assert_eq!(body["rerankModel"], "(disabled)");
        assert_eq!(app.loader.load_count(), 0);
    }

    #[tokio::test]
    async fn test_health_reports_loaded_reranker() {
        let app = build_app(
            true,
            MockScorerLoader::succeeding(),
            CacheConfig::from_secs(8, 60),
        );
        assert!(app.state.tracker().ensure_loaded());

        let body = body_json(get(&app.router, "/health").await).await;

        assert_eq!(body["rerankModel"], RERANK_MODEL);
    }

    #[tokio::test]
    async fn test_health_reports_stub_embedder_label() {
        let router = stub_app();

        let body = body_json(get(&router, "/health").await).await;

        assert_eq!(body["ok"], true);
        assert_eq!(body["embedModel"], STUB_EMBED_LABEL);
    }

    #[tokio::test]
    async fn test_health_when_embedder_unready() {
        let app = build_app(
            false,
            MockScorerLoader::failing(),
            CacheConfig::from_secs(8, 60),
        );

        let response = get(&app.router, "/health").await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["ok"], false);
    }
}

mod embed_handler_tests {
    use super::*;

    #[tokio::test]
    async fn test_embed_duplicates_are_bit_identical() {
        let app = fallback_app();

        let response = post_json(
            &app.router,
            "/embed",
            serde_json::json!({"texts": ["Margherita pizza", "Margherita pizza"]}),
        )
        .await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(cache_header(&response).as_deref(), Some("MISS"));

        let body = body_json(response).await;
        let vectors = body["vectors"].as_array().unwrap();
        assert_eq!(vectors.len(), 2);
        assert_eq!(vectors[0], vectors[1]);
        assert_eq!(vectors[0].as_array().unwrap().len(), 384);
        assert_eq!(body["model"], EMBED_MODEL);
        assert_eq!(app.embedder.call_count(), 1);
    }

    #[tokio::test]
    async fn test_embed_stub_embedder_reports_stub_label() {
        let router = stub_app();

        let response =
            post_json(&router, "/embed", serde_json::json!({"texts": ["pizza"]})).await;

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["model"], STUB_EMBED_LABEL);
        assert_ne!(body["model"], "intfloat/multilingual-e5-small");
    }

    #[tokio::test]
    async fn test_embed_cache_status_header() {
        let app = fallback_app();

        post_json(
            &app.router,
            "/embed",
            serde_json::json!({"texts": ["lasagna"], "locale": "it_IT"}),
        )
        .await;

        let partial = post_json(
            &app.router,
            "/embed",
            serde_json::json!({"texts": ["lasagna", "gnocchi"], "locale": "it"}),
        )
        .await;
        assert_eq!(cache_header(&partial).as_deref(), Some("PARTIAL"));

        let hit = post_json(
            &app.router,
            "/embed",
            serde_json::json!({"texts": ["GNOCCHI", "lasagna"], "locale": "IT"}),
        )
        .await;
        assert_eq!(cache_header(&hit).as_deref(), Some("HIT"));
        assert_eq!(app.embedder.call_count(), 2);
    }

    #[tokio::test]
    async fn test_embed_empty_texts_is_unprocessable() {
        let app = fallback_app();

        let response = post_json(&app.router, "/embed", serde_json::json!({"texts": []})).await;

        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let body = body_json(response).await;
        assert_eq!(body["code"], 422);
        assert!(body["error"].as_str().unwrap().contains("texts"));
        assert_eq!(app.embedder.call_count(), 0);
    }

    #[tokio::test]
    async fn test_embed_malformed_body_is_unprocessable() {
        let app = fallback_app();

        let response =
            post_json(&app.router, "/embed", serde_json::json!({"text": "pizza"})).await;

        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body_json(response).await["code"], 422);
    }

    #[tokio::test]
    async fn test_embed_unready_model() {
        let app = build_app(
            false,
            MockScorerLoader::failing(),
            CacheConfig::from_secs(8, 60),
        );

        let response =
            post_json(&app.router, "/embed", serde_json::json!({"texts": ["pizza"]})).await;

        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body_json(response).await["code"], 503);
    }

    #[tokio::test]
    async fn test_embed_inference_failure() {
        let app = fallback_app();
        app.embedder.set_failing(true);

        let response =
            post_json(&app.router, "/embed", serde_json::json!({"texts": ["pizza"]})).await;

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body_json(response).await["code"], 500);
    }
}

mod rerank_handler_tests {
    use super::*;

    fn pizza_request() -> serde_json::Value {
        serde_json::json!({
            "query": "pizza",
            "candidates": [
                {"id": "a", "text": "pizza margherita"},
                {"id": "b", "text": "sushi roll"}
            ]
        })
    }

    #[tokio::test]
    async fn test_rerank_fallback_ranking() {
        let app = fallback_app();

        let response = post_json(&app.router, "/rerank", pizza_request()).await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(cache_header(&response).as_deref(), Some("MISS"));

        let body = body_json(response).await;
        assert_eq!(body["model"], "(fallback)");
        let ranked = body["ranked"].as_array().unwrap();
        assert_eq!(ranked[0]["id"], "a");
        assert_eq!(ranked[1]["id"], "b");
        assert!(ranked[0]["score"].as_f64().unwrap() >= ranked[1]["score"].as_f64().unwrap());
        assert_eq!(
            app.state.tracker().availability(),
            ModelAvailability::Unavailable
        );
    }

    #[tokio::test]
    async fn test_rerank_uses_loaded_model() {
        let app = build_app(
            true,
            MockScorerLoader::succeeding(),
            CacheConfig::from_secs(8, 60),
        );

        let body = body_json(post_json(&app.router, "/rerank", pizza_request()).await).await;

        assert_eq!(body["model"], RERANK_MODEL);
        assert_eq!(body["ranked"][0]["id"], "a");
        assert_eq!(body["ranked"][0]["score"], 1.0);
    }

    #[tokio::test]
    async fn test_rerank_repeat_is_cache_hit() {
        let app = fallback_app();

        let first = body_json(post_json(&app.router, "/rerank", pizza_request()).await).await;
        let response = post_json(&app.router, "/rerank", pizza_request()).await;

        assert_eq!(cache_header(&response).as_deref(), Some("HIT"));
        let second = body_json(response).await;
        assert_eq!(first, second);
        assert_eq!(app.embedder.call_count(), 1);
    }

    #[tokio::test]
    async fn test_rerank_empty_query_creates_no_entry() {
        let app = fallback_app();

        let response = post_json(
            &app.router,
            "/rerank",
            serde_json::json!({"query": "", "candidates": [{"id": "1", "text": "x"}]}),
        )
        .await;

        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body_json(response).await["code"], 422);
        assert!(app.state.reranker.cache().is_empty());
        assert!(app.state.embeddings.cache().is_empty());
    }

    #[tokio::test]
    async fn test_rerank_empty_candidates() {
        let app = fallback_app();

        let response = post_json(
            &app.router,
            "/rerank",
            serde_json::json!({"query": "pizza", "candidates": []}),
        )
        .await;

        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn test_rerank_unready_embedder() {
        let app = build_app(
            false,
            MockScorerLoader::succeeding(),
            CacheConfig::from_secs(8, 60),
        );

        let response = post_json(&app.router, "/rerank", pizza_request()).await;

        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(app.loader.load_count(), 0);
    }

    #[tokio::test]
    async fn test_rerank_scorer_failure() {
        let app = build_app(
            true,
            MockScorerLoader::succeeding(),
            CacheConfig::from_secs(8, 60),
        );
        app.loader.scorer().set_failing(true);

        let response = post_json(&app.router, "/rerank", pizza_request()).await;

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(app.state.reranker.cache().is_empty());
    }

    #[tokio::test]
    async fn test_rerank_fallback_vector_mismatch_is_internal_error() {
        let app = fallback_app();
        app.embedder.set_drop_last(true);

        let response = post_json(&app.router, "/rerank", pizza_request()).await;

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = body_json(response).await;
        assert_eq!(body["code"], 500);
        assert!(
            body["error"]
                .as_str()
                .unwrap()
                .contains("returned 2 vectors for 3 texts")
        );
        assert!(app.state.reranker.cache().is_empty());
    }

    #[tokio::test]
    async fn test_rerank_zero_ttl_never_hits() {
        let app = build_app(
            true,
            MockScorerLoader::failing(),
            CacheConfig::from_secs(8, 0),
        );

        post_json(&app.router, "/rerank", pizza_request()).await;
        let response = post_json(&app.router, "/rerank", pizza_request()).await;

        assert_eq!(cache_header(&response).as_deref(), Some("MISS"));
    }
}
