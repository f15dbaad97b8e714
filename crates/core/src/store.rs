use crate::traits::VectorIndex;
use crate::{ChunkRecord, SearchHit, StoreError};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_INDEX_DIR: &str = "faiss_index";

const INDEX_FILE: &str = "index.json";

#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredEntry {
    chunk: ChunkRecord,
    vector: Vec<f32>,
}

/// Flat cosine-similarity index persisted as a single JSON file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocalVectorStore {
    model: String,
    dimensions: usize,
    built_at: DateTime<Utc>,
    entries: Vec<StoredEntry>,
}

impl LocalVectorStore {
    pub fn new(model: impl Into<String>, dimensions: usize) -> Self {
        Self {
            model: model.into(),
            dimensions,
            built_at: Utc::now(),
            entries: Vec::new(),
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    pub fn built_at(&self) -> DateTime<Utc> {
        self.built_at
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn index_path(dir: &Path) -> PathBuf {
        dir.join(INDEX_FILE)
    }

    /// Writes `index.json` under `dir`, replacing any previous index in one rename.
    pub async fn save(&self, dir: &Path) -> Result<PathBuf, StoreError> {
        tokio::fs::create_dir_all(dir).await?;

        let target = Self::index_path(dir);
        let staging = dir.join(format!("{INDEX_FILE}.tmp"));
        let bytes = serde_json::to_vec_pretty(self)?;
        tokio::fs::write(&staging, bytes).await?;
        tokio::fs::rename(&staging, &target).await?;
        Ok(target)
    }

    pub async fn load(dir: &Path) -> Result<Self, StoreError> {
        let path = Self::index_path(dir);
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => {
                return Err(StoreError::NotReady(format!(
                    "no vector index at {}; run the build command first",
                    path.display()
                )));
            }
            Err(error) => return Err(error.into()),
        };

        let store: Self = serde_json::from_slice(&bytes)?;
        if let Some(entry) = store
            .entries
            .iter()
            .find(|entry| entry.vector.len() != store.dimensions)
        {
            return Err(StoreError::DimensionMismatch {
                expected: store.dimensions,
                actual: entry.vector.len(),
            });
        }
        Ok(store)
    }

    fn check_dimensions(&self, vector: &[f32]) -> Result<(), StoreError> {
        if vector.len() != self.dimensions {
            return Err(StoreError::DimensionMismatch {
                expected: self.dimensions,
                actual: vector.len(),
            });
        }
        Ok(())
    }
}

fn cosine_similarity(left: &[f32], right: &[f32]) -> f32 {
    let dot = left.iter().zip(right).map(|(a, b)| a * b).sum::<f32>();
    let left_norm = left.iter().map(|value| value * value).sum::<f32>().sqrt();
    let right_norm = right.iter().map(|value| value * value).sum::<f32>().sqrt();
    if left_norm == 0.0 || right_norm == 0.0 {
        return 0.0;
    }
    dot / (left_norm * right_norm)
}

#[async_trait]
impl VectorIndex for LocalVectorStore {
    async fn index_vector_chunks(
        &mut self,
        chunks: &[ChunkRecord],
        embeddings: &[Vec<f32>],
    ) -> Result<(), StoreError> {
        if chunks.len() != embeddings.len() {
            return Err(StoreError::Request(format!(
                "embedding count {} doesn't match chunk count {}",
                embeddings.len(),
                chunks.len()
            )));
        }

        for embedding in embeddings {
            self.check_dimensions(embedding)?;
        }

        self.entries.extend(
            chunks
                .iter()
                .zip(embeddings)
                .map(|(chunk, vector)| StoredEntry {
                    chunk: chunk.clone(),
                    vector: vector.clone(),
                }),
        );
        Ok(())
    }

    async fn search_vector(
        &self,
        query_vector: &[f32],
        top_k: usize,
    ) -> Result<Vec<SearchHit>, StoreError> {
        self.check_dimensions(query_vector)?;

        let mut scored = self
            .entries
            .iter()
            .map(|entry| (cosine_similarity(query_vector, &entry.vector), entry))
            .collect::<Vec<_>>();

        // Stable sort keeps insertion order among equal scores.
        scored.sort_by(|left, right| right.0.total_cmp(&left.0));

        Ok(scored
            .into_iter()
            .take(top_k)
            .map(|(score, entry)| SearchHit {
                chunk: entry.chunk.clone(),
                score,
            })
            .collect())
    }
}
