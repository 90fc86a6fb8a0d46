use std::sync::Arc;

use crate::{config::AppConfig, generation::ContentGenerator, storage::HybridStorage};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub store: Arc<HybridStorage>,
    pub generator: Arc<ContentGenerator>,
}

impl AppState {
    pub fn new(
        config: AppConfig,
        store: Arc<HybridStorage>,
        generator: Arc<ContentGenerator>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            store,
            generator,
        }
    }
}
