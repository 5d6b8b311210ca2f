//! Corpus ingestion: directory scanning and text chunking.

mod loader;
mod splitter;

pub use loader::{load_corpus, Document};
pub use splitter::{split_documents, split_text, Chunk};
