use tracing::{debug, info, instrument};

use crate::config::{CollectionConfig, MilvusConfig};
use crate::connection::VectorConnection;
use crate::error::{CollectionError, CollectionResult};
use crate::milvus::MilvusConnection;
use crate::models::{
    CollectionDescriptor, MAX_ID_LENGTH, MAX_TOP_K, Query, Record, SearchHit, SearchParams,
    SearchRequest,
};

/// Typed façade over one remote collection.
///
/// Holds the connection and the collection settings; every operation is a
/// single request against the service and errors surface unchanged.
pub struct CollectionClient<C: VectorConnection> {
    connection: C,
    descriptor: CollectionDescriptor,
    search: SearchParams,
    filter: Option<String>,
}

impl CollectionClient<MilvusConnection> {
    /// Connect to Milvus and make sure the configured collection exists
    pub async fn connect(
        milvus: MilvusConfig,
        collection: CollectionConfig,
    ) -> CollectionResult<Self> {
        let connection = MilvusConnection::new(&milvus)?
            .with_consistency_level(collection.consistency_level.clone());
        Self::initialize(connection, collection).await
    }
}

impl<C: VectorConnection> CollectionClient<C> {
    /// Bind to a collection, creating and indexing it if it does not exist.
    ///
    /// An existing collection is never recreated; its dimension must match
    /// the configured one.
    #[instrument(
        skip(connection, config),
        fields(collection = %config.name, dimension = config.dimension)
    )]
    pub async fn initialize(connection: C, config: CollectionConfig) -> CollectionResult<Self> {
        if config.dimension == 0 {
            return Err(CollectionError::Config(
                "dimension must be positive".to_string(),
            ));
        }

        let descriptor = config.descriptor();

        if connection.has_collection(&descriptor.name).await? {
            match connection.describe_collection(&descriptor.name).await? {
                Some(existing) if existing != descriptor.dimension => {
                    return Err(CollectionError::Schema(format!(
                        "collection '{}' exists with dimension {}, configured {}",
                        descriptor.name, existing, descriptor.dimension
                    )));
                }
                Some(_) => {}
                None => debug!("Existing collection did not report a dimension"),
            }
            if connection.has_index(&descriptor.name).await? {
                debug!("Using existing collection");
            } else {
                // Left over from an earlier run whose index creation failed
                connection.create_index(&descriptor).await?;
                info!(
                    index = descriptor.index.kind.as_str(),
                    "Created missing index on existing collection"
                );
            }
        } else {
            connection.create_collection(&descriptor).await?;
            connection.create_index(&descriptor).await?;
            info!(
                index = descriptor.index.kind.as_str(),
                metric = descriptor.metric.as_str(),
                "Created collection"
            );
        }

        connection.load_collection(&descriptor.name).await?;

        Ok(Self {
            connection,
            descriptor,
            search: config.search,
            filter: config.filter,
        })
    }

    pub fn descriptor(&self) -> &CollectionDescriptor {
        &self.descriptor
    }

    /// Insert records. An empty batch is a no-op and returns 0.
    #[instrument(
        skip(self, records),
        fields(collection = %self.descriptor.name, count = records.len())
    )]
    pub async fn insert(&self, records: Vec<Record>) -> CollectionResult<u64> {
        let Some((ids, vectors)) = self.split(records)? else {
            debug!("Empty insert, nothing sent");
            return Ok(0);
        };
        self.connection
            .insert(&self.descriptor.name, ids, vectors)
            .await
    }

    /// Insert records, replacing any stored under the same id
    #[instrument(
        skip(self, records),
        fields(collection = %self.descriptor.name, count = records.len())
    )]
    pub async fn upsert(&self, records: Vec<Record>) -> CollectionResult<u64> {
        let Some((ids, vectors)) = self.split(records)? else {
            debug!("Empty upsert, nothing sent");
            return Ok(0);
        };
        self.connection
            .upsert(&self.descriptor.name, ids, vectors)
            .await
    }

    /// Nearest neighbours of `vector` using the configured filter
    pub async fn query(
        &self,
        vector: Vec<f32>,
        top_k: usize,
    ) -> CollectionResult<Vec<SearchHit>> {
        let query = Query {
            vector,
            top_k,
            filter: self.filter.clone(),
        };
        self.query_with(query).await
    }

    /// Nearest neighbours with an explicit per-call filter
    #[instrument(
        skip(self, query),
        fields(collection = %self.descriptor.name, top_k = query.top_k)
    )]
    pub async fn query_with(&self, query: Query) -> CollectionResult<Vec<SearchHit>> {
        self.validate_query(&query)?;

        let request = SearchRequest {
            vector: query.vector,
            top_k: query.top_k,
            filter: query.filter,
            metric: self.descriptor.metric,
            params: self.search,
        };

        let hits = self
            .connection
            .search(&self.descriptor.name, &request)
            .await?;
        debug!(hits = hits.len(), "Search complete");
        Ok(hits)
    }

    /// Drop the remote collection, consuming the client
    #[instrument(skip(self), fields(collection = %self.descriptor.name))]
    pub async fn drop_collection(self) -> CollectionResult<()> {
        self.connection
            .drop_collection(&self.descriptor.name)
            .await?;
        info!("Dropped collection");
        Ok(())
    }

    /// Validate and split records into parallel id and vector sequences
    fn split(
        &self,
        records: Vec<Record>,
    ) -> CollectionResult<Option<(Vec<String>, Vec<Vec<f32>>)>> {
        if records.is_empty() {
            return Ok(None);
        }

        let expected = self.descriptor.dimension;
        let mut ids = Vec::with_capacity(records.len());
        let mut vectors = Vec::with_capacity(records.len());

        for record in records {
            if record.id.is_empty() {
                return Err(CollectionError::InvalidRecord(
                    "record id must not be empty".to_string(),
                ));
            }
            if record.id.len() > MAX_ID_LENGTH {
                return Err(CollectionError::InvalidRecord(format!(
                    "record id longer than {} bytes",
                    MAX_ID_LENGTH
                )));
            }
            if record.embedding.len() != expected {
                return Err(CollectionError::DimensionMismatch {
                    id: record.id,
                    expected,
                    got: record.embedding.len(),
                });
            }
            if record.embedding.iter().any(|v| !v.is_finite()) {
                return Err(CollectionError::InvalidRecord(format!(
                    "record '{}' has non-finite values",
                    record.id
                )));
            }
            ids.push(record.id);
            vectors.push(record.embedding);
        }

        Ok(Some((ids, vectors)))
    }

    fn validate_query(&self, query: &Query) -> CollectionResult<()> {
        if query.top_k == 0 {
            return Err(CollectionError::Query("top_k must be positive".to_string()));
        }
        if query.top_k > MAX_TOP_K {
            return Err(CollectionError::Query(format!(
                "top_k {} exceeds the maximum of {}",
                query.top_k, MAX_TOP_K
            )));
        }
        if query.vector.len() != self.descriptor.dimension {
            return Err(CollectionError::Query(format!(
                "query vector has dimension {}, collection expects {}",
                query.vector.len(),
                self.descriptor.dimension
            )));
        }
        if query.vector.iter().any(|v| !v.is_finite()) {
            return Err(CollectionError::Query(
                "query vector has non-finite values".to_string(),
            ));
        }
        Ok(())
    }
}
