use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::connection::VectorConnection;
use crate::error::{CollectionError, CollectionResult};
use crate::models::{CollectionDescriptor, DistanceMetric, SearchHit, SearchRequest};

#[derive(Debug, Clone)]
struct StoredCollection {
    descriptor: CollectionDescriptor,
    indexed: bool,
    loaded: bool,
    rows: Vec<(String, Vec<f32>)>,
}

/// In-memory implementation of VectorConnection (for development/testing).
///
/// Scores by exhaustive scan and mirrors the remote services closely enough
/// for client tests: `insert` appends (duplicate ids are kept), `upsert`
/// replaces, and searches require an index and a load first. L2 scores are
/// squared distances, as Milvus reports them. Filter expressions are not
/// evaluated.
#[derive(Debug, Default, Clone)]
pub struct InMemoryConnection {
    collections: Arc<RwLock<HashMap<String, StoredCollection>>>,
}

impl InMemoryConnection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored rows, duplicates included
    pub async fn row_count(&self, name: &str) -> Option<usize> {
        self.collections.read().await.get(name).map(|c| c.rows.len())
    }

    fn score(metric: DistanceMetric, a: &[f32], b: &[f32]) -> f32 {
        match metric {
            DistanceMetric::L2 => a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum(),
            DistanceMetric::InnerProduct => a.iter().zip(b).map(|(x, y)| x * y).sum(),
            DistanceMetric::Cosine => {
                let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
                let norm_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
                let norm_b = b.iter().map(|x| x * x).sum::<f32>().sqrt();
                if norm_a == 0.0 || norm_b == 0.0 {
                    0.0
                } else {
                    dot / (norm_a * norm_b)
                }
            }
        }
    }

    fn not_found(name: &str) -> CollectionError {
        CollectionError::Service {
            code: 100,
            message: format!("collection not found[collection={}]", name),
        }
    }

    fn check_rows(
        collection: &StoredCollection,
        ids: &[String],
        vectors: &[Vec<f32>],
    ) -> CollectionResult<()> {
        if ids.len() != vectors.len() {
            return Err(CollectionError::Service {
                code: 1100,
                message: format!("{} ids for {} vectors", ids.len(), vectors.len()),
            });
        }
        let expected = collection.descriptor.dimension;
        if let Some((id, v)) = ids
            .iter()
            .zip(vectors)
            .find(|(_, v)| v.len() != expected)
        {
            return Err(CollectionError::DimensionMismatch {
                id: id.clone(),
                expected,
                got: v.len(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl VectorConnection for InMemoryConnection {
    async fn has_collection(&self, name: &str) -> CollectionResult<bool> {
        Ok(self.collections.read().await.contains_key(name))
    }

    async fn describe_collection(&self, name: &str) -> CollectionResult<Option<usize>> {
        Ok(self
            .collections
            .read()
            .await
            .get(name)
            .map(|c| c.descriptor.dimension))
    }

    async fn create_collection(&self, descriptor: &CollectionDescriptor) -> CollectionResult<()> {
        let mut collections = self.collections.write().await;

        if collections.contains_key(&descriptor.name) {
            return Err(CollectionError::Schema(format!(
                "collection already exists: {}",
                descriptor.name
            )));
        }
        if descriptor.dimension == 0 {
            return Err(CollectionError::Schema(
                "dimension must be positive".to_string(),
            ));
        }

        collections.insert(
            descriptor.name.clone(),
            StoredCollection {
                descriptor: descriptor.clone(),
                indexed: false,
                loaded: false,
                rows: Vec::new(),
            },
        );
        Ok(())
    }

    async fn has_index(&self, name: &str) -> CollectionResult<bool> {
        self.collections
            .read()
            .await
            .get(name)
            .map(|c| c.indexed)
            .ok_or_else(|| Self::not_found(name))
    }

    async fn create_index(&self, descriptor: &CollectionDescriptor) -> CollectionResult<()> {
        let mut collections = self.collections.write().await;
        let collection = collections
            .get_mut(&descriptor.name)
            .ok_or_else(|| Self::not_found(&descriptor.name).into_schema())?;
        collection.indexed = true;
        Ok(())
    }

    async fn load_collection(&self, name: &str) -> CollectionResult<()> {
        let mut collections = self.collections.write().await;
        let collection = collections
            .get_mut(name)
            .ok_or_else(|| Self::not_found(name).into_schema())?;
        if !collection.indexed {
            return Err(CollectionError::Schema(format!(
                "index not found[collection={}]",
                name
            )));
        }
        collection.loaded = true;
        Ok(())
    }

    async fn insert(
        &self,
        name: &str,
        ids: Vec<String>,
        vectors: Vec<Vec<f32>>,
    ) -> CollectionResult<u64> {
        let mut collections = self.collections.write().await;
        let collection = collections.get_mut(name).ok_or_else(|| Self::not_found(name))?;
        Self::check_rows(collection, &ids, &vectors)?;

        let count = ids.len() as u64;
        collection.rows.extend(ids.into_iter().zip(vectors));
        Ok(count)
    }

    async fn upsert(
        &self,
        name: &str,
        ids: Vec<String>,
        vectors: Vec<Vec<f32>>,
    ) -> CollectionResult<u64> {
        let mut collections = self.collections.write().await;
        let collection = collections.get_mut(name).ok_or_else(|| Self::not_found(name))?;
        Self::check_rows(collection, &ids, &vectors)?;

        let count = ids.len() as u64;
        for (id, vector) in ids.into_iter().zip(vectors) {
            collection.rows.retain(|(existing, _)| existing != &id);
            collection.rows.push((id, vector));
        }
        Ok(count)
    }

    async fn search(&self, name: &str, request: &SearchRequest) -> CollectionResult<Vec<SearchHit>> {
        let collections = self.collections.read().await;
        let collection = collections
            .get(name)
            .ok_or_else(|| Self::not_found(name).into_query())?;

        if !collection.loaded {
            return Err(CollectionError::Query(format!(
                "collection not loaded[collection={}]",
                name
            )));
        }
        if request.filter.is_some() {
            return Err(CollectionError::Query(
                "Filter expressions are not supported by the in-memory connection".to_string(),
            ));
        }
        if request.vector.len() != collection.descriptor.dimension {
            return Err(CollectionError::Query(format!(
                "vector dimension {} does not match collection dimension {}",
                request.vector.len(),
                collection.descriptor.dimension
            )));
        }

        let metric = collection.descriptor.metric;
        let mut hits: Vec<SearchHit> = collection
            .rows
            .iter()
            .map(|(id, v)| SearchHit::new(id.clone(), Self::score(metric, &request.vector, v)))
            .collect();

        if metric.ascending() {
            hits.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        } else {
            hits.sort_by(|a, b| b.distance.total_cmp(&a.distance));
        }
        hits.truncate(request.top_k);

        Ok(hits)
    }

    async fn drop_collection(&self, name: &str) -> CollectionResult<()> {
        self.collections
            .write()
            .await
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| Self::not_found(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{IndexSpec, SearchParams};

    fn descriptor(dimension: usize) -> CollectionDescriptor {
        CollectionDescriptor {
            name: "c".to_string(),
            dimension,
            metric: DistanceMetric::L2,
            index: IndexSpec::default(),
        }
    }

    fn request(vector: Vec<f32>, top_k: usize) -> SearchRequest {
        SearchRequest {
            vector,
            top_k,
            filter: None,
            metric: DistanceMetric::L2,
            params: SearchParams::default(),
        }
    }

    async fn ready(dimension: usize) -> InMemoryConnection {
        let connection = InMemoryConnection::new();
        let descriptor = descriptor(dimension);
        connection.create_collection(&descriptor).await.unwrap();
        connection.create_index(&descriptor).await.unwrap();
        connection.load_collection("c").await.unwrap();
        connection
    }

    #[tokio::test]
    async fn test_search_requires_load() {
        let connection = InMemoryConnection::new();
        connection.create_collection(&descriptor(2)).await.unwrap();

        let result = connection.search("c", &request(vec![1.0, 0.0], 1)).await;
        assert!(matches!(result, Err(CollectionError::Query(_))));
    }

    #[tokio::test]
    async fn test_load_requires_index() {
        let connection = InMemoryConnection::new();
        connection.create_collection(&descriptor(2)).await.unwrap();
        assert!(!connection.has_index("c").await.unwrap());

        let result = connection.load_collection("c").await;
        assert!(matches!(result, Err(CollectionError::Schema(_))));

        connection.create_index(&descriptor(2)).await.unwrap();
        assert!(connection.has_index("c").await.unwrap());
        connection.load_collection("c").await.unwrap();
    }

    #[tokio::test]
    async fn test_insert_keeps_duplicates_upsert_replaces() {
        let connection = ready(2).await;

        connection
            .insert("c", vec!["a".to_string()], vec![vec![1.0, 0.0]])
            .await
            .unwrap();
        connection
            .insert("c", vec!["a".to_string()], vec![vec![0.0, 1.0]])
            .await
            .unwrap();
        assert_eq!(connection.row_count("c").await, Some(2));

        connection
            .upsert("c", vec!["a".to_string()], vec![vec![0.5, 0.5]])
            .await
            .unwrap();
        assert_eq!(connection.row_count("c").await, Some(1));
    }

    #[tokio::test]
    async fn test_search_orders_by_squared_l2() {
        let connection = ready(2).await;
        connection
            .insert(
                "c",
                vec!["far".to_string(), "near".to_string(), "mid".to_string()],
                vec![vec![3.0, 0.0], vec![1.0, 0.0], vec![2.0, 0.0]],
            )
            .await
            .unwrap();

        let hits = connection.search("c", &request(vec![0.0, 0.0], 2)).await.unwrap();
        assert_eq!(hits, vec![SearchHit::new("near", 1.0), SearchHit::new("mid", 4.0)]);
    }

    #[tokio::test]
    async fn test_create_existing_collection_rejected() {
        let connection = ready(2).await;
        let result = connection.create_collection(&descriptor(2)).await;
        assert!(matches!(result, Err(CollectionError::Schema(_))));
    }

    #[tokio::test]
    async fn test_drop_missing_collection() {
        let connection = InMemoryConnection::new();
        let result = connection.drop_collection("missing").await;
        assert!(matches!(result, Err(CollectionError::Service { code: 100, .. })));
    }

    #[test]
    fn test_cosine_of_zero_vector() {
        assert_eq!(
            InMemoryConnection::score(DistanceMetric::Cosine, &[0.0, 0.0], &[1.0, 0.0]),
            0.0
        );
    }
}
