use std::collections::VecDeque;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::core::config::ChunkingSettings;

use super::Document;

/// A bounded-length text segment with the metadata of its source document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chunk {
    pub id: String,
    pub text: String,
    pub source: String,
    pub page: Option<u32>,
    /// Global insertion order across the whole build.
    pub position: usize,
}

/// Splits every document into overlapping chunks, in document order.
pub fn split_documents(documents: &[Document], cfg: &ChunkingSettings) -> Vec<Chunk> {
    let mut chunks = Vec::new();
    for document in documents {
        for text in split_text(
            &document.text,
            cfg.max_chars,
            cfg.overlap_chars,
            &cfg.separators,
        ) {
            let position = chunks.len();
            chunks.push(Chunk {
                id: Uuid::new_v4().to_string(),
                text,
                source: document.source.to_string_lossy().to_string(),
                page: document.page,
                position,
            });
        }
    }
    chunks
}

/// Recursive character splitting.
///
/// Splits on the first separator found in the text, recursing into finer
/// separators for pieces that are still too large (the empty separator is
/// the character-level fallback), then greedily merges small pieces back
/// together up to `max_chars`, carrying `overlap` trailing characters into
/// the next chunk. Lengths are measured in characters, not bytes.
pub fn split_text(
    text: &str,
    max_chars: usize,
    overlap: usize,
    separators: &[String],
) -> Vec<String> {
    if max_chars == 0 {
        return vec![text.to_string()];
    }
    let overlap = if overlap >= max_chars {
        max_chars / 4
    } else {
        overlap
    };

    recursive_split(text, max_chars, overlap, separators)
        .into_iter()
        .map(|chunk| chunk.trim().to_string())
        .filter(|chunk| !chunk.is_empty())
        .collect()
}

fn recursive_split(
    text: &str,
    max_chars: usize,
    overlap: usize,
    separators: &[String],
) -> Vec<String> {
    let (separator, remaining) = pick_separator(text, separators);
    let pieces = split_on(text, &separator);

    let mut chunks = Vec::new();
    let mut small: Vec<String> = Vec::new();
    for piece in pieces {
        if char_len(&piece) < max_chars {
            small.push(piece);
            continue;
        }
        if !small.is_empty() {
            chunks.extend(merge_pieces(&small, &separator, max_chars, overlap));
            small.clear();
        }
        if remaining.is_empty() {
            chunks.push(piece);
        } else {
            chunks.extend(recursive_split(&piece, max_chars, overlap, remaining));
        }
    }
    if !small.is_empty() {
        chunks.extend(merge_pieces(&small, &separator, max_chars, overlap));
    }
    chunks
}

/// First separator that occurs in the text wins; the empty string always
/// matches and leaves nothing to recurse into.
fn pick_separator<'a>(text: &str, separators: &'a [String]) -> (String, &'a [String]) {
    for (idx, candidate) in separators.iter().enumerate() {
        if candidate.is_empty() {
            return (String::new(), &[]);
        }
        if text.contains(candidate.as_str()) {
            return (candidate.clone(), &separators[idx + 1..]);
        }
    }
    match separators.last() {
        Some(last) => (last.clone(), &[]),
        None => (String::new(), &[]),
    }
}

fn split_on(text: &str, separator: &str) -> Vec<String> {
    if separator.is_empty() {
        return text.chars().map(|c| c.to_string()).collect();
    }
    text.split(separator)
        .filter(|piece| !piece.is_empty())
        .map(|piece| piece.to_string())
        .collect()
}

/// Greedy merge: accumulate pieces (joined by the separator) until the next
/// piece would push the chunk past `max_chars`, emit, then drop pieces from
/// the front until at most `overlap` characters remain to seed the next
/// chunk.
fn merge_pieces(pieces: &[String], separator: &str, max_chars: usize, overlap: usize) -> Vec<String> {
    let separator_len = char_len(separator);
    let mut chunks = Vec::new();
    let mut current: VecDeque<&String> = VecDeque::new();
    let mut total = 0usize;

    for piece in pieces {
        let piece_len = char_len(piece);
        let join_len = if current.is_empty() { 0 } else { separator_len };
        if total + piece_len + join_len > max_chars && !current.is_empty() {
            if let Some(chunk) = join_pieces(&current, separator) {
                chunks.push(chunk);
            }
            while total > overlap
                || (total + piece_len + if current.is_empty() { 0 } else { separator_len }
                    > max_chars
                    && total > 0)
            {
                let Some(first) = current.pop_front() else {
                    break;
                };
                let dropped_join = if current.is_empty() { 0 } else { separator_len };
                total -= char_len(first) + dropped_join;
            }
        }
        current.push_back(piece);
        total += piece_len + if current.len() > 1 { separator_len } else { 0 };
    }

    if let Some(chunk) = join_pieces(&current, separator) {
        chunks.push(chunk);
    }
    chunks
}

fn join_pieces(pieces: &VecDeque<&String>, separator: &str) -> Option<String> {
    let joined = pieces
        .iter()
        .map(|piece| piece.as_str())
        .collect::<Vec<_>>()
        .join(separator);
    let trimmed = joined.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

fn char_len(text: &str) -> usize {
    text.chars().count()
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;

    fn default_separators() -> Vec<String> {
        ChunkingSettings::default().separators
    }

    fn document(text: &str, source: &str) -> Document {
        Document {
            text: text.to_string(),
            source: PathBuf::from(source),
            page: None,
        }
    }

    #[test]
    fn splitting_is_deterministic() {
        let text = "Admission results.\n\nComputer Science cutoff: 26.5 points.\nPhysics cutoff: 25.0 points.\n\nContact the office for appeals.";
        let first = split_text(text, 60, 10, &default_separators());
        let second = split_text(text, 60, 10, &default_separators());
        assert_eq!(first, second);
        assert!(!first.is_empty());
    }

    #[test]
    fn small_text_stays_in_one_chunk() {
        let text = "first paragraph.\n\nsecond paragraph.";
        let chunks = split_text(text, 500, 20, &default_separators());
        assert_eq!(chunks, vec![text.to_string()]);
    }

    #[test]
    fn chunks_respect_the_size_limit() {
        let text = "word ".repeat(300);
        let chunks = split_text(&text, 50, 10, &default_separators());
        assert!(chunks.len() > 1);
        for chunk in &chunks {
            assert!(chunk.chars().count() <= 50, "oversize chunk: {:?}", chunk);
        }
    }

    #[test]
    fn character_fallback_produces_overlapping_windows() {
        // No separators occur, so the empty-string fallback slices by
        // character: windows of 50 stepping by 40.
        let text: String = (0..200)
            .map(|i| char::from(b'a' + (i % 26) as u8))
            .collect();
        let chunks = split_text(&text, 50, 10, &default_separators());

        assert_eq!(chunks.len(), 5);
        for chunk in &chunks[..4] {
            assert_eq!(chunk.chars().count(), 50);
        }
        assert_eq!(chunks[4].chars().count(), 40);
        let tail: String = chunks[0].chars().skip(40).collect();
        assert!(chunks[1].starts_with(&tail));
    }

    #[test]
    fn oversize_paragraph_falls_back_to_line_splitting() {
        let long_line = "x".repeat(30);
        let text = format!("{}\n{}\n{}", long_line, long_line, long_line);
        let chunks = split_text(&text, 40, 0, &default_separators());
        assert!(chunks.len() >= 2);
        for chunk in &chunks {
            assert!(chunk.chars().count() <= 40);
        }
    }

    #[test]
    fn chunk_metadata_comes_from_the_owning_document() {
        let documents = vec![
            document("Computer Science cutoff: 26.5 points", "cs_scores.txt"),
            document("Physics cutoff: 25.0 points", "physics_scores.txt"),
        ];
        let chunks = split_documents(&documents, &ChunkingSettings::default());

        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].text, "Computer Science cutoff: 26.5 points");
        assert_eq!(chunks[0].source, "cs_scores.txt");
        assert_eq!(chunks[0].position, 0);
        assert_eq!(chunks[1].source, "physics_scores.txt");
        assert_eq!(chunks[1].position, 1);
        assert_ne!(chunks[0].id, chunks[1].id);
    }

    #[test]
    fn empty_document_list_produces_no_chunks() {
        let chunks = split_documents(&[], &ChunkingSettings::default());
        assert!(chunks.is_empty());
    }
}
