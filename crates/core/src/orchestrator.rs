use crate::embeddings::Embedder;
use crate::normalizer::CorrectionTable;
use crate::store::LocalVectorStore;
use crate::traits::VectorIndex;
use crate::{ChunkRecord, Retrieval, StoreError};
use tracing::{debug, info};

/// Embeds chunk records and indexes them into a fresh [`LocalVectorStore`].
pub struct VectorStoreBuilder<E>
where
    E: Embedder,
{
    embedder: E,
}

impl<E> VectorStoreBuilder<E>
where
    E: Embedder,
{
    pub fn new(embedder: E) -> Self {
        Self { embedder }
    }

    pub async fn build(&self, chunks: &[ChunkRecord]) -> Result<LocalVectorStore, StoreError> {
        if chunks.is_empty() {
            return Err(StoreError::Request(
                "refusing to build a vector store from zero chunks".to_string(),
            ));
        }

        let texts = chunks
            .iter()
            .map(|chunk| chunk.content.clone())
            .collect::<Vec<_>>();

        info!(
            model = self.embedder.model_name(),
            chunk_count = chunks.len(),
            "embedding chunks"
        );
        let embeddings = self.embedder.embed_documents(&texts).await?;

        let mut store =
            LocalVectorStore::new(self.embedder.model_name(), self.embedder.dimensions());
        store.index_vector_chunks(chunks, &embeddings).await?;
        Ok(store)
    }
}

/// Answers free-form questions against a built store.
pub struct Retriever<'a, E>
where
    E: Embedder,
{
    embedder: E,
    corrections: &'a CorrectionTable,
}

impl<'a, E> Retriever<'a, E>
where
    E: Embedder,
{
    pub fn new(embedder: E, corrections: &'a CorrectionTable) -> Self {
        Self {
            embedder,
            corrections,
        }
    }

    pub async fn search(
        &self,
        store: &LocalVectorStore,
        raw_query: &str,
        top_k: usize,
    ) -> Result<Retrieval, StoreError> {
        let query = self.corrections.normalize(raw_query);
        if query.is_empty() {
            return Err(StoreError::Request("query is empty".to_string()));
        }

        if store.model() != self.embedder.model_name() {
            return Err(StoreError::Request(format!(
                "index was built with '{}' but the query embedder is '{}'",
                store.model(),
                self.embedder.model_name()
            )));
        }
        if store.dimensions() != self.embedder.dimensions() {
            return Err(StoreError::DimensionMismatch {
                expected: store.dimensions(),
                actual: self.embedder.dimensions(),
            });
        }

        debug!(query = %query, top_k, "searching vector store");
        let query_vector = self.embedder.embed_query(&query).await?;
        let hits = store.search_vector(&query_vector, top_k).await?;
        Ok(Retrieval { query, hits })
    }
}
