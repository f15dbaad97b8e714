pub mod chunking;
pub mod embeddings;
pub mod error;
pub mod extractor;
pub mod ingest;
pub mod models;
pub mod normalizer;
pub mod orchestrator;
pub mod store;
pub mod traits;

pub use chunking::{build_chunk_records, stitch_chunks, ChunkingConfig, TextSpan, TextSplitter};
pub use embeddings::{
    CharacterNgramEmbedder, Embedder, GeminiEmbedder, DEFAULT_EMBEDDING_DIMENSIONS,
    GEMINI_EMBEDDING_MODEL, GOOGLE_API_KEY_VAR,
};
pub use error::{ExtractError, IngestError, StoreError};
pub use extractor::{
    extract_text_from_file, extract_text_or_message, DocxTextExtractor, FileKind,
    PdfTextExtractor, TextExtractor,
};
pub use ingest::{discover_documents, ingest_folders, DiscoveredFiles, IngestionReport, SkippedFile};
pub use models::{
    ChunkRecord, IngestionOptions, Retrieval, SearchHit, DEFAULT_CHUNK_OVERLAP, DEFAULT_CHUNK_SIZE,
};
pub use normalizer::{normalize_user_input, CorrectionTable};
pub use orchestrator::{Retriever, VectorStoreBuilder};
pub use store::{LocalVectorStore, DEFAULT_INDEX_DIR};
pub use traits::VectorIndex;
