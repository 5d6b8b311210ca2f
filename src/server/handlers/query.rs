use std::sync::Arc;

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;

use crate::core::errors::ApiError;
use crate::state::AppState;

pub const EMPTY_QUESTION_MESSAGE: &str = "Question must not be empty.";

#[derive(Debug, Deserialize)]
pub struct QueryRequest {
    pub question: String,
}

/// `POST /query`: validates the question, runs the retrieval-and-answer
/// pipeline, and returns the answer with its citations.
///
/// A blank question is rejected before the pipeline is touched. Generation
/// failures never surface here as transport errors; they are absorbed into
/// the answer payload.
pub async fn query(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<QueryRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let question = payload.question.trim();
    if question.is_empty() {
        return Err(ApiError::BadRequest(EMPTY_QUESTION_MESSAGE.to_string()));
    }

    let answer = state.answerer.answer(question).await?;
    Ok(Json(answer))
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use axum::http::StatusCode;

    use super::*;
    use crate::answer::{Answerer, GenerationClient, SamplingParams, NOT_FOUND_MESSAGE};
    use crate::core::config::Settings;
    use crate::embedding::Embedder;
    use crate::index::VectorIndex;

    struct CountingEmbedder {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl Embedder for CountingEmbedder {
        async fn embed(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>, ApiError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(inputs.iter().map(|_| vec![1.0, 0.0]).collect())
        }
    }

    struct CountingGenerator {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl GenerationClient for CountingGenerator {
        async fn generate(
            &self,
            _model: &str,
            _prompt: &str,
            _params: SamplingParams,
        ) -> Result<String, ApiError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok("generated answer".to_string())
        }
    }

    fn test_state() -> (Arc<AppState>, Arc<CountingEmbedder>, Arc<CountingGenerator>) {
        let settings = Settings::default();
        let embedder = Arc::new(CountingEmbedder {
            calls: AtomicUsize::new(0),
        });
        let generator = Arc::new(CountingGenerator {
            calls: AtomicUsize::new(0),
        });
        let index = Arc::new(VectorIndex::new(Vec::new(), 2, "test-model".to_string()));
        let answerer = Answerer::new(
            embedder.clone(),
            index.clone(),
            generator.clone(),
            &settings.generation,
            &settings.retrieval,
        );
        let state = Arc::new(AppState {
            settings: Arc::new(settings),
            index,
            answerer,
        });
        (state, embedder, generator)
    }

    async fn response_body(response: axum::response::Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("read body");
        serde_json::from_slice(&bytes).expect("json body")
    }

    #[tokio::test]
    async fn blank_question_is_rejected_without_touching_the_pipeline() {
        let (state, embedder, generator) = test_state();

        let result = query(
            State(state),
            Json(QueryRequest {
                question: "   ".to_string(),
            }),
        )
        .await;

        let response = match result {
            Ok(_) => panic!("blank question must be rejected"),
            Err(err) => err.into_response(),
        };
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = response_body(response).await;
        assert_eq!(body["detail"], EMPTY_QUESTION_MESSAGE);
        assert_eq!(embedder.calls.load(Ordering::SeqCst), 0);
        assert_eq!(generator.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn zero_hits_return_the_not_found_payload() {
        let (state, _embedder, generator) = test_state();

        let response = query(
            State(state),
            Json(QueryRequest {
                question: "what is the cutoff?".to_string(),
            }),
        )
        .await
        .expect("query should succeed")
        .into_response();

        assert_eq!(response.status(), StatusCode::OK);
        let body = response_body(response).await;
        assert_eq!(body["answer"], NOT_FOUND_MESSAGE);
        assert_eq!(body["sources"], serde_json::json!([]));
        assert_eq!(generator.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn question_whitespace_is_trimmed_before_answering() {
        let (state, embedder, _generator) = test_state();

        let response = query(
            State(state),
            Json(QueryRequest {
                question: "  cutoff?  ".to_string(),
            }),
        )
        .await
        .expect("query should succeed")
        .into_response();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(embedder.calls.load(Ordering::SeqCst), 1);
    }
}
