//! The retrieval-and-answer pipeline: embed the question, fetch the nearest
//! chunks, build the prompt, and walk the model fallback list.

mod gemini;

pub use gemini::{GeminiClient, GenerationClient, SamplingParams};

use std::path::Path;
use std::sync::Arc;

use serde::Serialize;

use crate::core::config::{GenerationSettings, RetrievalSettings};
use crate::core::errors::ApiError;
use crate::embedding::Embedder;
use crate::index::VectorIndex;
use crate::ingest::Chunk;

/// Returned when retrieval finds nothing; no generation call is made.
pub const NOT_FOUND_MESSAGE: &str =
    "No relevant information was found in the knowledge base.";

/// Returned when every model in the fallback list failed.
pub const EXHAUSTED_MESSAGE: &str =
    "Sorry, I am unable to answer this question right now.";

const PROMPT_TEMPLATE: &str = "You are a professional assistant. Answer the question based ONLY on the reference content below. If the information is not present in the content, say clearly that you do not know.\n\nREFERENCE CONTENT:\n{context}\n\nQUESTION: {question}\n\nAnswer accurately and concisely, using only the information above:";

/// Outcome of walking the model fallback list.
#[derive(Debug)]
pub enum GenerationOutcome {
    Answered(String),
    /// Every model failed; one entry per attempted model.
    Exhausted(Vec<ModelFailure>),
}

#[derive(Debug)]
pub struct ModelFailure {
    pub model: String,
    pub error: ApiError,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Citation {
    /// Source file basename, directory stripped.
    pub source: String,
    pub page: PageRef,
}

/// Page reference serialized as a number, or `"N/A"` for pageless sources.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageRef {
    Number(u32),
    NotApplicable,
}

impl Serialize for PageRef {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            PageRef::Number(page) => serializer.serialize_u32(*page),
            PageRef::NotApplicable => serializer.serialize_str("N/A"),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RagAnswer {
    pub answer: String,
    pub sources: Vec<Citation>,
}

pub struct Answerer {
    embedder: Arc<dyn Embedder>,
    index: Arc<VectorIndex>,
    generator: Arc<dyn GenerationClient>,
    models: Vec<String>,
    top_k: usize,
    sampling: SamplingParams,
}

impl Answerer {
    pub fn new(
        embedder: Arc<dyn Embedder>,
        index: Arc<VectorIndex>,
        generator: Arc<dyn GenerationClient>,
        generation: &GenerationSettings,
        retrieval: &RetrievalSettings,
    ) -> Self {
        Self {
            embedder,
            index,
            generator,
            models: generation.models.clone(),
            top_k: retrieval.top_k,
            sampling: SamplingParams {
                temperature: generation.temperature,
                max_output_tokens: generation.max_output_tokens,
            },
        }
    }

    pub async fn answer(&self, question: &str) -> Result<RagAnswer, ApiError> {
        let vectors = self.embedder.embed(&[question.to_string()]).await?;
        let query_vector = vectors.into_iter().next().ok_or_else(|| {
            ApiError::Upstream("embedder returned no vector for the question".to_string())
        })?;

        let hits = self.index.search(&query_vector, self.top_k);
        if hits.is_empty() {
            return Ok(RagAnswer {
                answer: NOT_FOUND_MESSAGE.to_string(),
                sources: Vec::new(),
            });
        }

        let prompt = build_prompt(&format_context(&hits), question);
        match self.generate_with_fallback(&prompt).await {
            GenerationOutcome::Answered(text) => Ok(RagAnswer {
                answer: text,
                sources: citations(&hits),
            }),
            GenerationOutcome::Exhausted(_) => Ok(RagAnswer {
                answer: EXHAUSTED_MESSAGE.to_string(),
                sources: Vec::new(),
            }),
        }
    }

    /// Tries each configured model in order, returning either the first
    /// successful text or the full list of failures. One warning is logged
    /// per failed attempt.
    async fn generate_with_fallback(&self, prompt: &str) -> GenerationOutcome {
        let mut failures = Vec::new();
        for model in &self.models {
            match self.generator.generate(model, prompt, self.sampling).await {
                Ok(text) => return GenerationOutcome::Answered(text),
                Err(error) => {
                    tracing::warn!("generation failed for model {}: {}", model, error);
                    failures.push(ModelFailure {
                        model: model.clone(),
                        error,
                    });
                }
            }
        }
        GenerationOutcome::Exhausted(failures)
    }
}

fn format_context(hits: &[(Chunk, f32)]) -> String {
    hits.iter()
        .map(|(chunk, _)| format!("- {}", chunk.text))
        .collect::<Vec<_>>()
        .join("\n")
}

fn build_prompt(context: &str, question: &str) -> String {
    PROMPT_TEMPLATE
        .replace("{context}", context)
        .replace("{question}", question)
}

/// One citation per retrieved chunk, with exact duplicate (source, page)
/// pairs collapsed; first-seen order is preserved.
fn citations(hits: &[(Chunk, f32)]) -> Vec<Citation> {
    let mut seen: Vec<Citation> = Vec::with_capacity(hits.len());
    for (chunk, _) in hits {
        let citation = Citation {
            source: basename(&chunk.source),
            page: chunk
                .page
                .map(PageRef::Number)
                .unwrap_or(PageRef::NotApplicable),
        };
        if !seen.contains(&citation) {
            seen.push(citation);
        }
    }
    seen
}

fn basename(source: &str) -> String {
    Path::new(source)
        .file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_else(|| source.to_string())
}
