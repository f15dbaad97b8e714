use crate::extractor::FileKind;
use std::path::PathBuf;
use thiserror::Error;

/// Why a single file produced no text. Terminal for that file only.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExtractError {
    #[error("file not found: {}", .path.display())]
    NotFound { path: PathBuf },

    #[error("unsupported file type '{extension}': {}", .path.display())]
    UnsupportedType { path: PathBuf, extension: String },

    #[error(
        "no text could be extracted from {}; it is likely an image-only file (a scan)",
        .path.display()
    )]
    NoExtractableText { path: PathBuf },

    #[error("error reading {}: {message}", .kind.label())]
    ReadError { kind: FileKind, message: String },
}

impl ExtractError {
    pub(crate) fn read(kind: FileKind, error: impl ToString) -> Self {
        Self::ReadError {
            kind,
            message: error.to_string(),
        }
    }
}

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("regex error: {0}")]
    RegexError(#[from] regex::Error),

    #[error("invalid chunking config: {0}")]
    InvalidChunkConfig(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("no pdf or docx files found in {}", display_folders(.folders))]
    NoSupportedFiles { folders: Vec<PathBuf> },

    #[error("no documents were processed ({} file(s) skipped); nothing to embed", .skipped.len())]
    NothingToEmbed { skipped: Vec<PathBuf> },
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("invalid response from {backend}: {details}")]
    BackendResponse { backend: String, details: String },

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialize error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("missing credential: set {0}")]
    MissingCredential(String),

    #[error("embedding dimension {actual} does not match expected {expected}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("vector store request failed: {0}")]
    Request(String),

    #[error("vector store not available yet: {0}")]
    NotReady(String),
}

fn display_folders(folders: &[PathBuf]) -> String {
    folders
        .iter()
        .map(|folder| folder.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

pub type Result<T, E = IngestError> = std::result::Result<T, E>;
