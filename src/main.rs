use std::sync::Arc;

use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

use voicepress::config::AppConfig;
use voicepress::generation::{ContentGenerator, OpenAiProvider, PromptSet};
use voicepress::routes;
use voicepress::state::AppState;
use voicepress::storage::{BlobStore, HybridStorage, LocalBlobStore, S3BlobStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    init_tracing();

    let config = AppConfig::from_env()?;
    tracing::info!(
        cloud_storage = config.wants_cloud_storage(),
        data_dir = %config.data_dir.display(),
        model = %config.model,
        "loaded configuration"
    );

    let local: Arc<dyn BlobStore> = Arc::new(LocalBlobStore::new(config.data_dir.clone()));
    let object: Option<Arc<dyn BlobStore>> = if config.wants_cloud_storage() {
        Some(Arc::new(S3BlobStore::from_config(&config).await?))
    } else {
        None
    };
    let store = Arc::new(HybridStorage::new(
        object,
        local,
        config.wants_cloud_storage(),
    ));

    let provider = Arc::new(OpenAiProvider::from_config(&config));
    let generator = Arc::new(ContentGenerator::new(
        provider,
        PromptSet::from_config(&config),
    ));

    let addr = format!("{}:{}", config.server_host, config.server_port);
    let state = AppState::new(config, store, generator);
    let router = routes::create_router(state);

    let listener = TcpListener::bind(&addr).await?;
    tracing::info!(%addr, "listening");
    axum::serve(listener, router).await?;
    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();
}
