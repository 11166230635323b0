//! End-to-end tests against a real listener on an ephemeral port.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use menu_ml::cache::{CacheConfig, EmbeddingCache, RankingCache};
use menu_ml::constants::{CACHE_STATUS_HEADER, STUB_EMBED_LABEL};
use menu_ml::embedding::{BertEmbedder, EncoderConfig, RerankerConfig, TextEmbedder};
use menu_ml::gateway::{HandlerState, create_router_with_state};
use menu_ml::keys::LocaleNormalizer;
use menu_ml::service::{EmbeddingOrchestrator, RerankOrchestrator, RerankerTracker};
use menu_ml::{MockScorerLoader, ScorerLoader};

struct TestServer {
    addr: SocketAddr,
    shutdown_tx: Option<oneshot::Sender<()>>,
    _handle: JoinHandle<()>,
}

impl TestServer {
    fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

/// Stub embedder plus a reranker that can never load (no model path configured).
async fn start_server() -> TestServer {
    let embedder = BertEmbedder::load(EncoderConfig::stub()).expect("stub embedder");
    let label = embedder.model_label("intfloat/multilingual-e5-small");
    let embeddings = Arc::new(EmbeddingOrchestrator::new(
        Some(Arc::new(embedder) as Arc<dyn TextEmbedder>),
        EmbeddingCache::new(CacheConfig::from_secs(256, 60)),
        LocaleNormalizer::default(),
        label,
    ));
    let tracker = Arc::new(RerankerTracker::new(
        Arc::new(RerankerConfig::unconfigured()),
        "cross-encoder/ms-marco-MiniLM-L-6-v2",
        true,
    ));
    start_with(embeddings, tracker).await
}

async fn start_with(
    embeddings: Arc<EmbeddingOrchestrator>,
    tracker: Arc<RerankerTracker>,
) -> TestServer {
    let reranker = Arc::new(RerankOrchestrator::new(
        Arc::clone(&embeddings),
        tracker,
        RankingCache::new(CacheConfig::from_secs(64, 60)),
    ));
    let app = create_router_with_state(HandlerState::new(embeddings, reranker));

    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("local addr");
    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

    let handle = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async {
                let _ = shutdown_rx.await;
            })
            .await
            .expect("server error");
    });

    TestServer {
        addr,
        shutdown_tx: Some(shutdown_tx),
        _handle: handle,
    }
}

#[tokio::test]
async fn test_health_endpoint() {
    let server = start_server().await;

    let response = reqwest::get(server.url("/health")).await.expect("request");
    assert!(response.status().is_success());

    let body: serde_json::Value = response.json().await.expect("json");
    assert_eq!(body["ok"], true);
    assert_eq!(body["app"], "smart-menu-ml");
    assert_eq!(body["embedModel"], STUB_EMBED_LABEL);
    assert_eq!(body["rerankModel"], "(disabled)");
}

#[tokio::test]
async fn test_embed_duplicate_texts_identical() {
    let server = start_server().await;
    let client = reqwest::Client::new();

    let response = client
        .post(server.url("/embed"))
        .json(&serde_json::json!({"texts": ["Margherita pizza", "Margherita pizza"]}))
        .send()
        .await
        .expect("request");

    assert_eq!(response.status().as_u16(), 200);
    assert_eq!(
        response
            .headers()
            .get(CACHE_STATUS_HEADER)
            .and_then(|v| v.to_str().ok()),
        Some("MISS")
    );

    let body: serde_json::Value = response.json().await.expect("json");
    let vectors = body["vectors"].as_array().expect("vectors");
    assert_eq!(vectors.len(), 2);
    assert_eq!(vectors[0], vectors[1]);
    assert_eq!(body["model"], STUB_EMBED_LABEL);

    let norm: f64 = vectors[0]
        .as_array()
        .expect("vector")
        .iter()
        .map(|x| x.as_f64().unwrap_or_default().powi(2))
        .sum::<f64>()
        .sqrt();
    assert!((norm - 1.0).abs() < 1e-3);
}

#[tokio::test]
async fn test_rerank_empty_query_rejected() {
    let server = start_server().await;
    let client = reqwest::Client::new();

    let response = client
        .post(server.url("/rerank"))
        .json(&serde_json::json!({"query": "", "candidates": [{"id": "1", "text": "x"}]}))
        .send()
        .await
        .expect("request");

    assert_eq!(response.status().as_u16(), 422);
    let body: serde_json::Value = response.json().await.expect("json");
    assert_eq!(body["code"], 422);
}

#[tokio::test]
async fn test_rerank_fallback_with_stub_embedder() {
    let server = start_server().await;
    let client = reqwest::Client::new();
    let request = serde_json::json!({
        "query": "pizza",
        "candidates": [
            {"id": "a", "text": "pizza margherita"},
            {"id": "b", "text": "sushi roll"}
        ]
    });

    let response = client
        .post(server.url("/rerank"))
        .json(&request)
        .send()
        .await
        .expect("request");
    assert_eq!(response.status().as_u16(), 200);

    let body: serde_json::Value = response.json().await.expect("json");
    assert_eq!(body["model"], "(fallback)");
    assert_eq!(body["ranked"][0]["id"], "a");
    assert_eq!(body["ranked"][1]["id"], "b");

    let repeat = client
        .post(server.url("/rerank"))
        .json(&request)
        .send()
        .await
        .expect("request");
    assert_eq!(
        repeat
            .headers()
            .get(CACHE_STATUS_HEADER)
            .and_then(|v| v.to_str().ok()),
        Some("HIT")
    );
}

#[tokio::test]
async fn test_rerank_with_loaded_scorer() {
    let embedder = BertEmbedder::load(EncoderConfig::stub()).expect("stub embedder");
    let embeddings = Arc::new(EmbeddingOrchestrator::new(
        Some(Arc::new(embedder) as Arc<dyn TextEmbedder>),
        EmbeddingCache::new(CacheConfig::from_secs(16, 60)),
        LocaleNormalizer::default(),
        "stub",
    ));
    let loader = Arc::new(MockScorerLoader::succeeding());
    let tracker = Arc::new(RerankerTracker::new(
        loader.clone() as Arc<dyn ScorerLoader>,
        "mock/reranker",
        true,
    ));
    let server = start_with(embeddings, tracker).await;

    let body: serde_json::Value = reqwest::Client::new()
        .post(server.url("/rerank"))
        .json(&serde_json::json!({
            "query": "garlic bread",
            "candidates": [
                {"id": "soup", "text": "tomato soup"},
                {"id": "bread", "text": "Garlic bread with cheese"}
            ],
            "locale": "en_GB"
        }))
        .send()
        .await
        .expect("request")
        .json()
        .await
        .expect("json");

    assert_eq!(body["model"], "mock/reranker");
    assert_eq!(body["ranked"][0]["id"], "bread");
    assert_eq!(loader.load_count(), 1);
}
