//! smart-menu-ml HTTP server entrypoint.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use mimalloc::MiMalloc;
use tokio::net::TcpListener;
use tokio::signal;

use menu_ml::cache::{EmbeddingCache, RankingCache};
use menu_ml::config::Config;
use menu_ml::embedding::{BertEmbedder, EncoderConfig, RerankerConfig, TextEmbedder};
use menu_ml::gateway::{HandlerState, create_router_with_state};
use menu_ml::keys::LocaleNormalizer;
use menu_ml::service::{EmbeddingOrchestrator, RerankOrchestrator, RerankerTracker};

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if std::env::args().any(|arg| arg == "--health-check") {
        std::process::exit(run_health_check());
    }

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let config = Config::from_env()?;
    config.validate()?;
    let addr: SocketAddr = config.socket_addr().parse()?;

    tracing::info!(
        bind_addr = %config.bind_addr,
        port = config.port,
        embed_model = %config.embed_model,
        rerank_model = %config.rerank_model,
        rerank_enabled = config.rerank_enabled,
        "smart-menu-ml starting"
    );

    let (embedder, embed_label) = load_embedder(&config).await;

    let embeddings = Arc::new(EmbeddingOrchestrator::new(
        embedder,
        EmbeddingCache::new(config.embed_cache()),
        LocaleNormalizer::new(&config.default_locale),
        embed_label,
    ));

    let reranker_config = match &config.rerank_model_path {
        Some(path) => RerankerConfig::new(path.clone()),
        None => RerankerConfig::unconfigured(),
    };
    let tracker = Arc::new(RerankerTracker::new(
        Arc::new(reranker_config),
        config.rerank_model.clone(),
        config.rerank_enabled,
    ));

    if config.eager_load_reranker {
        let tracker = Arc::clone(&tracker);
        let loaded = tokio::task::spawn_blocking(move || tracker.ensure_loaded()).await?;
        tracing::info!(loaded, "Eager reranker load finished");
    }

    let reranker = Arc::new(RerankOrchestrator::new(
        Arc::clone(&embeddings),
        tracker,
        RankingCache::new(config.rerank_cache()),
    ));

    let app = create_router_with_state(HandlerState::new(embeddings, reranker));

    let listener = TcpListener::bind(addr).await?;
    tracing::info!(addr = %addr, "Server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("smart-menu-ml shutdown complete");
    Ok(())
}

/// Loads the embedder off the async runtime and returns it with the model label to report.
/// A failed load leaves the service running but unready (`/embed` and `/rerank` answer 503).
async fn load_embedder(config: &Config) -> (Option<Arc<dyn TextEmbedder>>, String) {
    let encoder_config = if let Some(path) = &config.embed_model_path {
        EncoderConfig::new(path.clone())
    } else {
        tracing::warn!("No EMBED_MODEL_PATH configured, running embedder in stub mode");
        EncoderConfig::stub()
    };

    match tokio::task::spawn_blocking(move || BertEmbedder::load(encoder_config)).await {
        Ok(Ok(embedder)) => {
            let label = embedder.model_label(&config.embed_model);
            (Some(Arc::new(embedder)), label)
        }
        Ok(Err(e)) => {
            tracing::error!(error = %e, "Failed to load embedding model");
            (None, config.embed_model.clone())
        }
        Err(e) => {
            tracing::error!(error = %e, "Embedding model load task failed");
            (None, config.embed_model.clone())
        }
    }
}

fn run_health_check() -> i32 {
    let port = std::env::var("PORT")
        .ok()
        .and_then(|p| p.parse::<u16>().ok())
        .unwrap_or(8000);

    let url = format!("http://127.0.0.1:{}/health", port);

    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("failed to build runtime");

    rt.block_on(async {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(1))
            .build()
            .expect("failed to build client");

        match client.get(&url).send().await {
            Ok(res) if res.status().is_success() => match res.json::<serde_json::Value>().await {
                Ok(body) if body["ok"] == true => 0,
                _ => 1,
            },
            _ => 1,
        }
    })
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, initiating graceful shutdown");
        }
    }
}
