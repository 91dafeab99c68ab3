use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use qdrant_client::Qdrant;
use qdrant_client::qdrant::{
    self, CreateCollectionBuilder, CreateFieldIndexCollectionBuilder, Distance, FieldType,
    HnswConfigDiff, PointId, PointStruct, SearchPointsBuilder, UpsertPointsBuilder,
    Value as QdrantValue, VectorParamsBuilder,
};
use tracing::{debug, instrument};
use uuid::Uuid;

use super::QdrantConfig;
use crate::connection::{ID_FIELD, VectorConnection};
use crate::error::{CollectionError, CollectionResult};
use crate::models::{
    CollectionDescriptor, DistanceMetric, IndexKind, IndexSpec, SearchHit, SearchRequest,
};

/// Qdrant session over gRPC.
///
/// Qdrant point ids must be integers or UUIDs, so each record id is mapped
/// to a UUIDv5 and the original id is kept in the payload under `id`.
/// Qdrant has no insert-without-replace; `insert` and `upsert` both
/// overwrite points with the same id.
pub struct QdrantConnection {
    client: Qdrant,
}

impl QdrantConnection {
    pub fn new(config: QdrantConfig) -> CollectionResult<Self> {
        let mut builder = Qdrant::from_url(&config.url);

        if let Some(api_key) = config.api_key {
            builder = builder.api_key(api_key);
        }

        builder = builder.timeout(Duration::from_secs(config.timeout_secs));

        let client = builder
            .build()
            .map_err(|e| CollectionError::Config(format!("Failed to build client: {}", e)))?;

        Ok(Self { client })
    }

    fn to_qdrant_distance(metric: DistanceMetric) -> Distance {
        match metric {
            DistanceMetric::L2 => Distance::Euclid,
            DistanceMetric::InnerProduct => Distance::Dot,
            DistanceMetric::Cosine => Distance::Cosine,
        }
    }

    /// Qdrant always builds HNSW; `m = 0` disables the graph for exact scans
    fn to_hnsw_config(index: &IndexSpec) -> CollectionResult<HnswConfigDiff> {
        match index.kind {
            IndexKind::Hnsw => Ok(HnswConfigDiff {
                m: index.param_u64("M"),
                ef_construct: index.param_u64("efConstruction"),
                ..Default::default()
            }),
            IndexKind::Flat => Ok(HnswConfigDiff {
                m: Some(0),
                ..Default::default()
            }),
            IndexKind::IvfFlat => Err(CollectionError::Schema(
                "IVF_FLAT is not available on Qdrant; use an HNSW or FLAT index".to_string(),
            )),
        }
    }

    pub(crate) fn point_id(record_id: &str) -> PointId {
        PointId::from(Uuid::new_v5(&Uuid::NAMESPACE_OID, record_id.as_bytes()).to_string())
    }

    fn points(ids: Vec<String>, vectors: Vec<Vec<f32>>) -> Vec<PointStruct> {
        ids.into_iter()
            .zip(vectors)
            .map(|(id, vector)| {
                let point_id = Self::point_id(&id);
                let payload: HashMap<String, QdrantValue> =
                    HashMap::from([(ID_FIELD.to_string(), QdrantValue::from(id))]);
                PointStruct::new(point_id, vector, payload)
            })
            .collect()
    }

    fn record_id(payload: &HashMap<String, QdrantValue>) -> CollectionResult<String> {
        use qdrant::value::Kind;

        match payload.get(ID_FIELD).and_then(|v| v.kind.as_ref()) {
            Some(Kind::StringValue(s)) => Ok(s.clone()),
            _ => Err(CollectionError::Internal(
                "Point payload missing record id".to_string(),
            )),
        }
    }

    fn extract_dimension(config: &Option<qdrant::CollectionConfig>) -> Option<usize> {
        let vectors_config = config.as_ref()?.params.as_ref()?.vectors_config.as_ref()?;
        match vectors_config.config.as_ref()? {
            qdrant::vectors_config::Config::Params(p) => Some(p.size as usize),
            qdrant::vectors_config::Config::ParamsMap(map) => {
                map.map.values().next().map(|p| p.size as usize)
            }
        }
    }

    async fn write(
        &self,
        name: &str,
        ids: Vec<String>,
        vectors: Vec<Vec<f32>>,
    ) -> CollectionResult<u64> {
        let points = Self::points(ids, vectors);
        let count = points.len() as u64;

        self.client
            .upsert_points(UpsertPointsBuilder::new(name, points).wait(true))
            .await?;

        Ok(count)
    }
}

#[async_trait]
impl VectorConnection for QdrantConnection {
    async fn has_collection(&self, name: &str) -> CollectionResult<bool> {
        Ok(self.client.collection_exists(name).await?)
    }

    async fn describe_collection(&self, name: &str) -> CollectionResult<Option<usize>> {
        let info = self.client.collection_info(name).await?;
        Ok(info
            .result
            .and_then(|result| Self::extract_dimension(&result.config)))
    }

    #[instrument(skip(self, descriptor), fields(collection = %descriptor.name))]
    async fn create_collection(&self, descriptor: &CollectionDescriptor) -> CollectionResult<()> {
        let hnsw = Self::to_hnsw_config(&descriptor.index)?;

        let builder = CreateCollectionBuilder::new(&descriptor.name)
            .vectors_config(VectorParamsBuilder::new(
                descriptor.dimension as u64,
                Self::to_qdrant_distance(descriptor.metric),
            ))
            .hnsw_config(hnsw);

        self.client
            .create_collection(builder)
            .await
            .map_err(|e| CollectionError::from(e).into_schema())?;
        Ok(())
    }

    /// The vector index always exists; this checks the payload index on `id`
    async fn has_index(&self, name: &str) -> CollectionResult<bool> {
        let info = self.client.collection_info(name).await?;
        Ok(info
            .result
            .is_some_and(|result| result.payload_schema.contains_key(ID_FIELD)))
    }

    /// The vector index is part of the collection config on Qdrant; the
    /// separate index call builds a keyword index over the record id.
    async fn create_index(&self, descriptor: &CollectionDescriptor) -> CollectionResult<()> {
        Self::to_hnsw_config(&descriptor.index)?;

        let builder =
            CreateFieldIndexCollectionBuilder::new(&descriptor.name, ID_FIELD, FieldType::Keyword)
                .wait(true);

        self.client
            .create_field_index(builder)
            .await
            .map_err(|e| CollectionError::from(e).into_schema())?;
        Ok(())
    }

    async fn load_collection(&self, name: &str) -> CollectionResult<()> {
        debug!(collection = name, "Qdrant collections need no load step");
        Ok(())
    }

    async fn insert(
        &self,
        name: &str,
        ids: Vec<String>,
        vectors: Vec<Vec<f32>>,
    ) -> CollectionResult<u64> {
        self.write(name, ids, vectors).await
    }

    async fn upsert(
        &self,
        name: &str,
        ids: Vec<String>,
        vectors: Vec<Vec<f32>>,
    ) -> CollectionResult<u64> {
        self.write(name, ids, vectors).await
    }

    async fn search(&self, name: &str, request: &SearchRequest) -> CollectionResult<Vec<SearchHit>> {
        if request.filter.is_some() {
            return Err(CollectionError::Query(
                "Filter expressions are not supported by the Qdrant connection".to_string(),
            ));
        }

        let builder =
            SearchPointsBuilder::new(name, request.vector.clone(), request.top_k as u64)
                .with_payload(true);

        let results = self
            .client
            .search_points(builder)
            .await
            .map_err(|e| CollectionError::from(e).into_query())?;

        results
            .result
            .into_iter()
            .map(|point| Ok(SearchHit::new(Self::record_id(&point.payload)?, point.score)))
            .collect()
    }

    async fn drop_collection(&self, name: &str) -> CollectionResult<()> {
        self.client.delete_collection(name).await?;
        Ok(())
    }
}
