pub mod validation;

use std::env;
use std::fs;
use std::path::PathBuf;

use serde::Deserialize;

use crate::core::errors::ApiError;
use validation::validate;

/// Application settings, loaded once at startup.
///
/// Resolution order: `CORPUSQA_CONFIG` env var, then `corpusqa.yml` in the
/// working directory, then built-in defaults. The generation API key is
/// taken from the environment only and never from the settings file.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub corpus_dir: PathBuf,
    pub index_dir: PathBuf,
    pub log_dir: PathBuf,
    pub chunking: ChunkingSettings,
    pub embedding: EmbeddingSettings,
    pub generation: GenerationSettings,
    pub retrieval: RetrievalSettings,
    pub server: ServerSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            corpus_dir: PathBuf::from("./corpus"),
            index_dir: PathBuf::from("./vectorstore"),
            log_dir: PathBuf::from("./logs"),
            chunking: ChunkingSettings::default(),
            embedding: EmbeddingSettings::default(),
            generation: GenerationSettings::default(),
            retrieval: RetrievalSettings::default(),
            server: ServerSettings::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ChunkingSettings {
    /// Maximum chunk length in characters.
    pub max_chars: usize,
    /// Characters shared between adjacent chunks.
    pub overlap_chars: usize,
    /// Separators tried from most- to least-preferred; the empty string is
    /// the character-level fallback.
    pub separators: Vec<String>,
}

impl Default for ChunkingSettings {
    fn default() -> Self {
        Self {
            max_chars: 500,
            overlap_chars: 20,
            separators: vec![
                "\n\n".to_string(),
                "\n".to_string(),
                " ".to_string(),
                String::new(),
            ],
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EmbeddingSettings {
    /// Base URL of an OpenAI-compatible embedding server.
    pub base_url: String,
    /// Embedding model name. The index records this at build time and load
    /// refuses an index built with a different model.
    pub model: String,
    pub timeout_secs: u64,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8090".to_string(),
            model: "bge-small-en-v1.5".to_string(),
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GenerationSettings {
    /// Filled from `GEMINI_API_KEY`; never read from the settings file.
    #[serde(skip)]
    pub api_key: String,
    pub base_url: String,
    /// Models tried in order until one answers.
    pub models: Vec<String>,
    pub temperature: f64,
    pub max_output_tokens: u32,
    /// Timeout per model attempt; a timeout counts as a failed attempt.
    pub timeout_secs: u64,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: "https://generativelanguage.googleapis.com".to_string(),
            models: vec![
                "gemini-2.0-flash".to_string(),
                "gemini-2.0-pro".to_string(),
            ],
            temperature: 0.1,
            max_output_tokens: 512,
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RetrievalSettings {
    pub top_k: usize,
}

impl Default for RetrievalSettings {
    fn default() -> Self {
        Self { top_k: 3 }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    pub allowed_origins: Vec<String>,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8000,
            allowed_origins: vec![
                "http://localhost".to_string(),
                "http://localhost:3000".to_string(),
                "http://localhost:5173".to_string(),
                "http://127.0.0.1".to_string(),
                "http://127.0.0.1:8000".to_string(),
            ],
        }
    }
}

impl Settings {
    pub fn load() -> Result<Self, ApiError> {
        let path = config_path();
        let mut settings = if path.exists() {
            let contents = fs::read_to_string(&path).map_err(|err| {
                ApiError::Internal(format!("failed to read {}: {}", path.display(), err))
            })?;
            serde_yaml::from_str::<Settings>(&contents).map_err(|err| {
                ApiError::Internal(format!("invalid settings file {}: {}", path.display(), err))
            })?
        } else {
            Settings::default()
        };

        if let Ok(dir) = env::var("CORPUSQA_CORPUS_DIR") {
            settings.corpus_dir = PathBuf::from(dir);
        }
        if let Ok(dir) = env::var("CORPUSQA_INDEX_DIR") {
            settings.index_dir = PathBuf::from(dir);
        }
        if let Ok(key) = env::var("GEMINI_API_KEY") {
            settings.generation.api_key = key;
        }

        validate(&settings)?;
        Ok(settings)
    }
}

fn config_path() -> PathBuf {
    if let Ok(path) = env::var("CORPUSQA_CONFIG") {
        return PathBuf::from(path);
    }
    PathBuf::from("corpusqa.yml")
}
