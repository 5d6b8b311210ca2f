//! Text embedding behind a provider seam.
//!
//! The same embedder instance is used for chunk text at build time and for
//! question text at query time; retrieval quality silently degrades if the
//! two sides ever use different models, so the index records the model name
//! and refuses to load under a different configuration.

mod remote;

pub use remote::RemoteEmbedder;

use async_trait::async_trait;

use crate::core::errors::ApiError;

#[async_trait]
pub trait Embedder: Send + Sync {
    /// Embeds a batch of texts; output order matches input order.
    async fn embed(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>, ApiError>;
}
