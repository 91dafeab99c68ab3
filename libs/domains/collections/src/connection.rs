use async_trait::async_trait;

use crate::error::CollectionResult;
use crate::models::{CollectionDescriptor, SearchHit, SearchRequest};

/// Name of the primary-key field in every collection this crate creates
pub const ID_FIELD: &str = "id";

/// Name of the vector field in every collection this crate creates
pub const VECTOR_FIELD: &str = "embedding";

/// Session with a remote vector database.
///
/// Each method maps to one request against the service. Implementations
/// classify failures: transport problems as `Connection`, rejected
/// collection/index creation as `Schema`, rejected searches as `Query`
/// and rejected writes as `Service`.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait VectorConnection: Send + Sync {
    async fn has_collection(&self, name: &str) -> CollectionResult<bool>;

    /// Dimension of the vector field of an existing collection
    async fn describe_collection(&self, name: &str) -> CollectionResult<Option<usize>>;

    async fn create_collection(&self, descriptor: &CollectionDescriptor) -> CollectionResult<()>;

    /// Whether the index built by `create_index` exists
    async fn has_index(&self, name: &str) -> CollectionResult<bool>;

    /// Build `descriptor.index` over the vector field
    async fn create_index(&self, descriptor: &CollectionDescriptor) -> CollectionResult<()>;

    /// Make the collection searchable; a no-op for services that need no load step
    async fn load_collection(&self, name: &str) -> CollectionResult<()>;

    /// Insert parallel id/vector sequences; returns the number stored
    async fn insert(
        &self,
        name: &str,
        ids: Vec<String>,
        vectors: Vec<Vec<f32>>,
    ) -> CollectionResult<u64>;

    /// Insert or replace by id; returns the number written
    async fn upsert(
        &self,
        name: &str,
        ids: Vec<String>,
        vectors: Vec<Vec<f32>>,
    ) -> CollectionResult<u64>;

    async fn search(&self, name: &str, request: &SearchRequest)
    -> CollectionResult<Vec<SearchHit>>;

    async fn drop_collection(&self, name: &str) -> CollectionResult<()>;
}
