//! Vector index: in-memory similarity search over persisted entries.

pub mod sqlite;

use std::cmp::Ordering;

use crate::ingest::Chunk;

/// One (embedding, chunk) pair. Entries keep build-time insertion order.
#[derive(Debug, Clone)]
pub struct IndexEntry {
    pub chunk: Chunk,
    pub embedding: Vec<f32>,
}

/// Read-only view of the persisted index, fully loaded at startup.
///
/// Immutable after construction and safe to share across concurrent
/// requests.
#[derive(Debug)]
pub struct VectorIndex {
    entries: Vec<IndexEntry>,
    dimension: usize,
    model: String,
}

impl VectorIndex {
    pub fn new(entries: Vec<IndexEntry>, dimension: usize, model: String) -> Self {
        Self {
            entries,
            dimension,
            model,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Embedding model the index was built with.
    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn entries(&self) -> &[IndexEntry] {
        &self.entries
    }

    /// Returns the `k` entries most similar to the query vector, best first.
    ///
    /// The sort is stable, so equal scores keep insertion order. Asking for
    /// more entries than the index holds returns all of them.
    pub fn search(&self, query: &[f32], k: usize) -> Vec<(Chunk, f32)> {
        let mut scored: Vec<(usize, f32)> = self
            .entries
            .iter()
            .enumerate()
            .map(|(idx, entry)| (idx, cosine_similarity(query, &entry.embedding)))
            .collect();
        scored.sort_by(|left, right| right.1.partial_cmp(&left.1).unwrap_or(Ordering::Equal));

        scored
            .into_iter()
            .take(k)
            .map(|(idx, score)| (self.entries[idx].chunk.clone(), score))
            .collect()
    }
}

/// Cosine similarity; mismatched or empty vectors score 0.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    let denom = norm_a * norm_b;

    if denom <= f32::EPSILON {
        0.0
    } else {
        dot / denom
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx_eq(left: f32, right: f32) -> bool {
        (left - right).abs() < 1e-5
    }

    fn entry(text: &str, embedding: Vec<f32>, position: usize) -> IndexEntry {
        IndexEntry {
            chunk: Chunk {
                id: format!("chunk-{}", position),
                text: text.to_string(),
                source: "corpus/source.txt".to_string(),
                page: None,
                position,
            },
            embedding,
        }
    }

    fn index(entries: Vec<IndexEntry>) -> VectorIndex {
        VectorIndex::new(entries, 2, "test-model".to_string())
    }

    #[test]
    fn cosine_is_one_for_identical_vectors() {
        let vec = vec![1.0, 2.0, 3.0, 4.0];
        assert!(approx_eq(cosine_similarity(&vec, &vec), 1.0));
    }

    #[test]
    fn cosine_is_zero_for_orthogonal_vectors() {
        assert!(approx_eq(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]), 0.0));
    }

    #[test]
    fn cosine_is_zero_for_mismatched_lengths() {
        assert!(approx_eq(cosine_similarity(&[1.0, 0.0], &[1.0]), 0.0));
    }

    #[test]
    fn search_returns_best_first() {
        let idx = index(vec![
            entry("middling", vec![0.8, 0.2], 0),
            entry("worst", vec![0.1, 0.9], 1),
            entry("best", vec![0.9, 0.0], 2),
        ]);

        let hits = idx.search(&[1.0, 0.0], 3);
        assert_eq!(hits.len(), 3);
        assert_eq!(hits[0].0.text, "best");
        assert_eq!(hits[2].0.text, "worst");
        assert!(hits[0].1 >= hits[1].1 && hits[1].1 >= hits[2].1);
    }

    #[test]
    fn search_is_bounded_by_k_and_by_entry_count() {
        let idx = index(vec![
            entry("a", vec![1.0, 0.0], 0),
            entry("b", vec![0.0, 1.0], 1),
        ]);

        assert_eq!(idx.search(&[1.0, 0.0], 1).len(), 1);
        assert_eq!(idx.search(&[1.0, 0.0], 10).len(), 2);
    }

    #[test]
    fn equal_scores_keep_insertion_order() {
        let idx = index(vec![
            entry("first", vec![1.0, 0.0], 0),
            entry("second", vec![1.0, 0.0], 1),
        ]);

        let hits = idx.search(&[1.0, 0.0], 2);
        assert_eq!(hits[0].0.text, "first");
        assert_eq!(hits[1].0.text, "second");
    }

    #[test]
    fn empty_index_returns_no_hits() {
        let idx = index(Vec::new());
        assert!(idx.search(&[1.0, 0.0], 3).is_empty());
    }
}
