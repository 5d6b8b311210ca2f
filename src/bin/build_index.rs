//! Offline index build: scan the corpus directory, chunk, embed, persist.

use anyhow::Context;

use corpusqa_backend::core::config::Settings;
use corpusqa_backend::embedding::{Embedder, RemoteEmbedder};
use corpusqa_backend::index::sqlite::IndexStore;
use corpusqa_backend::index::IndexEntry;
use corpusqa_backend::ingest::{load_corpus, split_documents};
use corpusqa_backend::logging;

const EMBED_BATCH_SIZE: usize = 64;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = Settings::load().context("Failed to load settings")?;
    logging::init(&settings.log_dir);

    let documents =
        load_corpus(&settings.corpus_dir).context("Failed to scan corpus directory")?;
    tracing::info!(
        "Loaded {} documents from {}",
        documents.len(),
        settings.corpus_dir.display()
    );

    let chunks = split_documents(&documents, &settings.chunking);
    if chunks.is_empty() {
        tracing::warn!("Corpus produced no chunks; writing an empty index");
    }

    let embedder = RemoteEmbedder::new(&settings.embedding)?;
    let texts: Vec<String> = chunks.iter().map(|chunk| chunk.text.clone()).collect();
    let mut vectors = Vec::with_capacity(texts.len());
    for batch in texts.chunks(EMBED_BATCH_SIZE) {
        let embedded = embedder
            .embed(batch)
            .await
            .context("Failed to embed chunk batch")?;
        vectors.extend(embedded);
    }

    let entries: Vec<IndexEntry> = chunks
        .into_iter()
        .zip(vectors)
        .map(|(chunk, embedding)| IndexEntry { chunk, embedding })
        .collect();

    let store = IndexStore::create(&settings.index_dir).await?;
    store
        .save(&entries, &settings.embedding.model)
        .await
        .context("Failed to save vector index")?;

    tracing::info!(
        "Vector index written to {} with {} chunks",
        settings.index_dir.display(),
        entries.len()
    );
    Ok(())
}
