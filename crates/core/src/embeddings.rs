use crate::error::StoreError;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

pub const DEFAULT_EMBEDDING_DIMENSIONS: usize = 128;

pub const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com";
pub const GEMINI_EMBEDDING_MODEL: &str = "models/embedding-001";
pub const GEMINI_EMBEDDING_DIMENSIONS: usize = 768;
pub const GOOGLE_API_KEY_VAR: &str = "GOOGLE_API_KEY";

/// The API rejects batch requests with more entries than this.
const GEMINI_MAX_BATCH: usize = 100;

#[async_trait]
pub trait Embedder: Send + Sync {
    fn model_name(&self) -> &str;

    fn dimensions(&self) -> usize;

    async fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, StoreError>;

    async fn embed_query(&self, text: &str) -> Result<Vec<f32>, StoreError>;
}

/// Hashed character trigrams, L2-normalized. Offline and deterministic.
#[derive(Debug, Clone, Copy)]
pub struct CharacterNgramEmbedder {
    pub dimensions: usize,
}

impl Default for CharacterNgramEmbedder {
    fn default() -> Self {
        Self {
            dimensions: DEFAULT_EMBEDDING_DIMENSIONS,
        }
    }
}

impl CharacterNgramEmbedder {
    pub fn embed(&self, text: &str) -> Vec<f32> {
        let buckets = self.dimensions.max(1);
        let chars = text.to_lowercase().chars().collect::<Vec<_>>();

        let mut vector = vec![0f32; buckets];
        for window in chars.windows(3) {
            vector[trigram_bucket(window, buckets)] += 1.0;
        }

        let norm = vector.iter().map(|value| value * value).sum::<f32>().sqrt();
        if norm > 0.0 {
            vector.iter_mut().for_each(|value| *value /= norm);
        }
        vector
    }
}

const FNV_OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0100_0000_01b3;

/// FNV-1a over the UTF-8 bytes of a character window.
fn trigram_bucket(window: &[char], buckets: usize) -> usize {
    let mut utf8 = [0u8; 4];
    let hash = window.iter().fold(FNV_OFFSET_BASIS, |hash, ch| {
        ch.encode_utf8(&mut utf8)
            .bytes()
            .fold(hash, |hash, byte| (hash ^ u64::from(byte)).wrapping_mul(FNV_PRIME))
    });
    (hash % buckets as u64) as usize
}

#[async_trait]
impl Embedder for CharacterNgramEmbedder {
    fn model_name(&self) -> &str {
        "character-trigram"
    }

    fn dimensions(&self) -> usize {
        self.dimensions.max(1)
    }

    async fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, StoreError> {
        Ok(texts.iter().map(|text| self.embed(text)).collect())
    }

    async fn embed_query(&self, text: &str) -> Result<Vec<f32>, StoreError> {
        Ok(self.embed(text))
    }
}

#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
enum TaskType {
    RetrievalDocument,
    RetrievalQuery,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct EmbedContentRequest<'a> {
    model: &'a str,
    content: Content<'a>,
    task_type: TaskType,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    parts: [Part<'a>; 1],
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
struct BatchEmbedRequest<'a> {
    requests: Vec<EmbedContentRequest<'a>>,
}

#[derive(Debug, Deserialize)]
struct BatchEmbedResponse {
    #[serde(default)]
    embeddings: Vec<ContentEmbedding>,
}

#[derive(Debug, Deserialize)]
struct ContentEmbedding {
    values: Vec<f32>,
}

/// Google Generative Language embeddings (`batchEmbedContents`).
pub struct GeminiEmbedder {
    client: Client,
    base_url: String,
    model: String,
    api_key: String,
    dimensions: usize,
}

impl GeminiEmbedder {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Result<Self, StoreError> {
        let api_key = api_key.into().trim().to_string();
        if api_key.is_empty() {
            return Err(StoreError::MissingCredential(GOOGLE_API_KEY_VAR.to_string()));
        }

        Ok(Self {
            client: Client::new(),
            base_url: GEMINI_API_BASE.to_string(),
            model: model.into(),
            api_key,
            dimensions: GEMINI_EMBEDDING_DIMENSIONS,
        })
    }

    pub fn from_env(model: impl Into<String>) -> Result<Self, StoreError> {
        let api_key = std::env::var(GOOGLE_API_KEY_VAR)
            .map_err(|_| StoreError::MissingCredential(GOOGLE_API_KEY_VAR.to_string()))?;
        Self::new(api_key, model)
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_dimensions(mut self, dimensions: usize) -> Self {
        self.dimensions = dimensions;
        self
    }

    fn endpoint(&self) -> String {
        format!("{}/v1beta/{}:batchEmbedContents", self.base_url, self.model)
    }

    async fn embed_batch(
        &self,
        texts: &[&str],
        task_type: TaskType,
    ) -> Result<Vec<Vec<f32>>, StoreError> {
        let payload = BatchEmbedRequest {
            requests: texts
                .iter()
                .map(|&text| EmbedContentRequest {
                    model: &self.model,
                    content: Content {
                        parts: [Part { text }],
                    },
                    task_type,
                })
                .collect(),
        };

        let response = self
            .client
            .post(self.endpoint())
            .query(&[("key", self.api_key.as_str())])
            .json(&payload)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(StoreError::BackendResponse {
                backend: "gemini".to_string(),
                details: format!("{status}: {body}"),
            });
        }

        let parsed: BatchEmbedResponse = response.json().await?;
        if parsed.embeddings.len() != texts.len() {
            return Err(StoreError::BackendResponse {
                backend: "gemini".to_string(),
                details: format!(
                    "requested {} embeddings, received {}",
                    texts.len(),
                    parsed.embeddings.len()
                ),
            });
        }

        parsed
            .embeddings
            .into_iter()
            .map(|embedding| {
                if embedding.values.len() != self.dimensions {
                    return Err(StoreError::DimensionMismatch {
                        expected: self.dimensions,
                        actual: embedding.values.len(),
                    });
                }
                Ok(embedding.values)
            })
            .collect()
    }
}

#[async_trait]
impl Embedder for GeminiEmbedder {
    fn model_name(&self) -> &str {
        &self.model
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, StoreError> {
        let mut vectors = Vec::with_capacity(texts.len());
        for batch in texts.chunks(GEMINI_MAX_BATCH) {
            let batch = batch.iter().map(String::as_str).collect::<Vec<_>>();
            vectors.extend(self.embed_batch(&batch, TaskType::RetrievalDocument).await?);
        }
        Ok(vectors)
    }

    async fn embed_query(&self, text: &str) -> Result<Vec<f32>, StoreError> {
        let mut vectors = self.embed_batch(&[text], TaskType::RetrievalQuery).await?;
        vectors
            .pop()
            .ok_or_else(|| StoreError::Request("empty embedding response".to_string()))
    }
}
