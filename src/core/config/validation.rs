use super::Settings;
use crate::core::errors::ApiError;

/// Startup validation: every serving and build path assumes these hold.
pub fn validate(settings: &Settings) -> Result<(), ApiError> {
    ensure_range(
        "chunking.max_chars",
        settings.chunking.max_chars as u64,
        1,
        1_000_000,
    )?;
    if settings.chunking.overlap_chars >= settings.chunking.max_chars {
        return Err(invalid(
            "chunking.overlap_chars",
            "must be smaller than chunking.max_chars",
        ));
    }
    if settings.chunking.separators.is_empty() {
        return Err(invalid("chunking.separators", "must not be empty"));
    }

    ensure_range("retrieval.top_k", settings.retrieval.top_k as u64, 1, 1_000)?;

    if settings.embedding.model.trim().is_empty() {
        return Err(invalid("embedding.model", "must not be empty"));
    }
    if settings.embedding.base_url.trim().is_empty() {
        return Err(invalid("embedding.base_url", "must not be empty"));
    }
    ensure_range(
        "embedding.timeout_secs",
        settings.embedding.timeout_secs,
        1,
        3_600,
    )?;

    if settings.generation.models.is_empty() {
        return Err(invalid("generation.models", "must list at least one model"));
    }
    if !(0.0..=2.0).contains(&settings.generation.temperature) {
        return Err(invalid("generation.temperature", "must be between 0 and 2"));
    }
    ensure_range(
        "generation.max_output_tokens",
        settings.generation.max_output_tokens as u64,
        1,
        65_536,
    )?;
    ensure_range(
        "generation.timeout_secs",
        settings.generation.timeout_secs,
        1,
        3_600,
    )?;

    Ok(())
}

fn ensure_range(field: &str, value: u64, min: u64, max: u64) -> Result<(), ApiError> {
    if value < min || value > max {
        return Err(invalid(
            field,
            &format!("must be between {} and {}", min, max),
        ));
    }
    Ok(())
}

fn invalid(field: &str, reason: &str) -> ApiError {
    ApiError::BadRequest(format!("{} {}", field, reason))
}
