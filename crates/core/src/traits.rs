use crate::{ChunkRecord, SearchHit, StoreError};
use async_trait::async_trait;

#[async_trait]
pub trait VectorIndex {
    async fn index_vector_chunks(
        &mut self,
        chunks: &[ChunkRecord],
        embeddings: &[Vec<f32>],
    ) -> Result<(), StoreError>;

    async fn search_vector(
        &self,
        query_vector: &[f32],
        top_k: usize,
    ) -> Result<Vec<SearchHit>, StoreError>;
}
