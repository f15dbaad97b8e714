use crate::chunking::ChunkingConfig;
use crate::error::IngestError;
use crate::extractor::FileKind;
use serde::{Deserialize, Serialize};

/// Target chunk length, in characters.
pub const DEFAULT_CHUNK_SIZE: usize = 1_000;

/// Characters shared between consecutive chunks of one document.
pub const DEFAULT_CHUNK_OVERLAP: usize = 200;

/// A bounded slice of one source document's extracted text.
///
/// `start_offset..end_offset` is the byte range of `content` within the
/// extracted text; ranges of consecutive chunks overlap but never leave gaps.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkRecord {
    pub chunk_id: String,
    pub source_path: String,
    pub file_kind: FileKind,
    pub chunk_index: u64,
    pub content: String,
    pub start_offset: usize,
    pub end_offset: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchHit {
    pub chunk: ChunkRecord,
    pub score: f32,
}

/// Hits for one question, along with the corrected query that was embedded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Retrieval {
    pub query: String,
    pub hits: Vec<SearchHit>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestionOptions {
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub recursive: bool,
}

impl Default for IngestionOptions {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            chunk_overlap: DEFAULT_CHUNK_OVERLAP,
            recursive: true,
        }
    }
}

impl IngestionOptions {
    pub fn validate(&self) -> Result<(), IngestError> {
        ChunkingConfig::from(self).validate()
    }
}
