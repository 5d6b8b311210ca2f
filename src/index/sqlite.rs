//! SQLite persistence for the vector index.
//!
//! One database file inside the index directory; embeddings are stored as
//! little-endian f32 blobs, and a key/value meta table records the embedding
//! model and dimension the index was built with.

use std::path::{Path, PathBuf};

use sqlx::sqlite::{
    SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous,
};
use sqlx::{Row, SqlitePool};

use super::{IndexEntry, VectorIndex};
use crate::core::errors::ApiError;
use crate::ingest::Chunk;

const DB_FILE: &str = "index.db";

const META_MODEL: &str = "embedding_model";
const META_DIMENSION: &str = "dimension";

pub struct IndexStore {
    pool: SqlitePool,
}

impl IndexStore {
    /// Opens the store for building, creating the directory and database if
    /// missing.
    pub async fn create(index_dir: &Path) -> Result<Self, ApiError> {
        std::fs::create_dir_all(index_dir).map_err(|err| {
            ApiError::Internal(format!(
                "failed to create index directory {}: {}",
                index_dir.display(),
                err
            ))
        })?;
        Self::connect(index_dir.join(DB_FILE), true).await
    }

    /// Opens the store for serving. The database must already exist.
    pub async fn open(index_dir: &Path) -> Result<Self, ApiError> {
        let db_path = index_dir.join(DB_FILE);
        if !db_path.exists() {
            return Err(ApiError::Internal(format!(
                "vector index not found at {}",
                db_path.display()
            )));
        }
        Self::connect(db_path, false).await
    }

    async fn connect(db_path: PathBuf, create: bool) -> Result<Self, ApiError> {
        let options = SqliteConnectOptions::new()
            .filename(&db_path)
            .create_if_missing(create)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal);

        let pool = SqlitePoolOptions::new()
            .min_connections(1)
            .max_connections(4)
            .connect_with(options)
            .await
            .map_err(ApiError::internal)?;

        let store = Self { pool };
        store.init_schema().await?;
        Ok(store)
    }

    async fn init_schema(&self) -> Result<(), ApiError> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS chunks (
                chunk_id TEXT PRIMARY KEY,
                position INTEGER NOT NULL,
                content TEXT NOT NULL,
                source TEXT NOT NULL,
                page INTEGER,
                embedding BLOB NOT NULL
            )",
        )
        .execute(&self.pool)
        .await
        .map_err(ApiError::internal)?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS index_meta (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            )",
        )
        .execute(&self.pool)
        .await
        .map_err(ApiError::internal)?;

        Ok(())
    }

    /// Replaces the persisted entry set wholesale and records the embedding
    /// model and dimension. All entries must share one dimension.
    pub async fn save(&self, entries: &[IndexEntry], model: &str) -> Result<(), ApiError> {
        let dimension = entries.first().map(|e| e.embedding.len()).unwrap_or(0);
        for entry in entries {
            if entry.embedding.len() != dimension {
                return Err(ApiError::Internal(format!(
                    "embedding dimension mismatch: expected {}, got {} for chunk {}",
                    dimension,
                    entry.embedding.len(),
                    entry.chunk.id
                )));
            }
        }

        let mut tx = self.pool.begin().await.map_err(ApiError::internal)?;

        sqlx::query("DELETE FROM chunks")
            .execute(&mut *tx)
            .await
            .map_err(ApiError::internal)?;

        for (position, entry) in entries.iter().enumerate() {
            sqlx::query(
                "INSERT INTO chunks (chunk_id, position, content, source, page, embedding)
                 VALUES (?, ?, ?, ?, ?, ?)",
            )
            .bind(&entry.chunk.id)
            .bind(position as i64)
            .bind(&entry.chunk.text)
            .bind(&entry.chunk.source)
            .bind(entry.chunk.page.map(|p| p as i64))
            .bind(serialize_embedding(&entry.embedding))
            .execute(&mut *tx)
            .await
            .map_err(ApiError::internal)?;
        }

        for (key, value) in [
            (META_MODEL, model.to_string()),
            (META_DIMENSION, dimension.to_string()),
        ] {
            sqlx::query("INSERT OR REPLACE INTO index_meta (key, value) VALUES (?, ?)")
                .bind(key)
                .bind(value)
                .execute(&mut *tx)
                .await
                .map_err(ApiError::internal)?;
        }

        tx.commit().await.map_err(ApiError::internal)?;
        Ok(())
    }

    /// Loads the full entry set in insertion order.
    ///
    /// Fails wholesale: a missing meta record, a model different from the
    /// configured one, or any malformed row aborts the load.
    pub async fn load(&self, configured_model: &str) -> Result<VectorIndex, ApiError> {
        let model = self.get_meta(META_MODEL).await?.ok_or_else(|| {
            ApiError::Internal("index metadata is missing the embedding model".to_string())
        })?;
        if model != configured_model {
            return Err(ApiError::Internal(format!(
                "index was built with embedding model '{}' but '{}' is configured",
                model, configured_model
            )));
        }

        let dimension: usize = self
            .get_meta(META_DIMENSION)
            .await?
            .and_then(|value| value.parse().ok())
            .ok_or_else(|| {
                ApiError::Internal("index metadata is missing the embedding dimension".to_string())
            })?;

        let rows = sqlx::query(
            "SELECT chunk_id, position, content, source, page, embedding
             FROM chunks ORDER BY position",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(ApiError::internal)?;

        let mut entries = Vec::with_capacity(rows.len());
        for row in rows {
            let blob: Vec<u8> = row.try_get("embedding").map_err(ApiError::internal)?;
            if blob.len() != dimension * 4 {
                return Err(ApiError::Internal(format!(
                    "corrupt index entry: embedding blob of {} bytes for dimension {}",
                    blob.len(),
                    dimension
                )));
            }
            let position: i64 = row.try_get("position").map_err(ApiError::internal)?;
            let page: Option<i64> = row.try_get("page").map_err(ApiError::internal)?;

            entries.push(IndexEntry {
                chunk: Chunk {
                    id: row.try_get("chunk_id").map_err(ApiError::internal)?,
                    text: row.try_get("content").map_err(ApiError::internal)?,
                    source: row.try_get("source").map_err(ApiError::internal)?,
                    page: page.map(|p| p as u32),
                    position: position as usize,
                },
                embedding: deserialize_embedding(&blob),
            });
        }

        Ok(VectorIndex::new(entries, dimension, model))
    }

    async fn get_meta(&self, key: &str) -> Result<Option<String>, ApiError> {
        let row = sqlx::query("SELECT value FROM index_meta WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .map_err(ApiError::internal)?;
        match row {
            Some(row) => Ok(Some(row.try_get("value").map_err(ApiError::internal)?)),
            None => Ok(None),
        }
    }
}

fn serialize_embedding(embedding: &[f32]) -> Vec<u8> {
    embedding.iter().flat_map(|f| f.to_le_bytes()).collect()
}

fn deserialize_embedding(bytes: &[u8]) -> Vec<f32> {
    bytes
        .chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect()
}
