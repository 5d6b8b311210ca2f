use std::sync::Arc;

use thiserror::Error;

use crate::answer::{Answerer, GeminiClient};
use crate::core::config::Settings;
use crate::core::errors::ApiError;
use crate::embedding::{Embedder, RemoteEmbedder};
use crate::index::sqlite::IndexStore;
use crate::index::VectorIndex;

#[derive(Debug, Error)]
pub enum InitializationError {
    #[error("configuration error: {0}")]
    Config(ApiError),
    #[error("vector index error: {0}")]
    Index(ApiError),
    #[error("embedder error: {0}")]
    Embedder(ApiError),
    #[error("generation client error: {0}")]
    Generation(ApiError),
}

/// Immutable application context shared across request handlers.
///
/// The vector index and the embedder are read-only after initialization, so
/// the whole state is safe to share between concurrent requests.
pub struct AppState {
    pub settings: Arc<Settings>,
    pub index: Arc<VectorIndex>,
    pub answerer: Answerer,
}

impl AppState {
    /// Initializes the application context.
    ///
    /// Loading the vector index is a prerequisite for serving: a missing,
    /// unreadable or incompatible index aborts startup before the listener
    /// binds.
    pub async fn initialize(settings: Settings) -> Result<Arc<Self>, InitializationError> {
        if settings.generation.api_key.trim().is_empty() {
            return Err(InitializationError::Config(ApiError::Internal(
                "GEMINI_API_KEY must be set".to_string(),
            )));
        }

        let embedder: Arc<dyn Embedder> = Arc::new(
            RemoteEmbedder::new(&settings.embedding).map_err(InitializationError::Embedder)?,
        );
        let generator = Arc::new(
            GeminiClient::new(&settings.generation).map_err(InitializationError::Generation)?,
        );

        let store = IndexStore::open(&settings.index_dir)
            .await
            .map_err(InitializationError::Index)?;
        let index = Arc::new(
            store
                .load(&settings.embedding.model)
                .await
                .map_err(InitializationError::Index)?,
        );
        tracing::info!(
            "Vector index loaded: {} entries, dimension {}",
            index.len(),
            index.dimension()
        );

        let answerer = Answerer::new(
            embedder,
            index.clone(),
            generator,
            &settings.generation,
            &settings.retrieval,
        );

        Ok(Arc::new(AppState {
            settings: Arc::new(settings),
            index,
            answerer,
        }))
    }
}
