use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

/// Largest `top_k` the remote engines accept for a single search.
pub const MAX_TOP_K: usize = 16_384;

/// Longest record identifier stored in the primary-key field.
pub const MAX_ID_LENGTH: usize = 512;

/// A single item to store: an opaque identifier and its embedding
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub id: String,
    pub embedding: Vec<f32>,
}

impl Record {
    pub fn new(id: impl Into<String>, embedding: Vec<f32>) -> Self {
        Self {
            id: id.into(),
            embedding,
        }
    }
}

impl<S: Into<String>> From<(S, Vec<f32>)> for Record {
    fn from((id, embedding): (S, Vec<f32>)) -> Self {
        Self::new(id, embedding)
    }
}

/// Distance metric used to rank search results
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DistanceMetric {
    /// Euclidean distance; smaller is closer
    #[default]
    L2,
    /// Inner product; larger is closer
    InnerProduct,
    /// Cosine similarity; larger is closer
    Cosine,
}

impl DistanceMetric {
    /// Name of the metric on the Milvus wire
    pub fn as_str(&self) -> &'static str {
        match self {
            DistanceMetric::L2 => "L2",
            DistanceMetric::InnerProduct => "IP",
            DistanceMetric::Cosine => "COSINE",
        }
    }

    /// Whether smaller values rank first
    pub fn ascending(&self) -> bool {
        matches!(self, DistanceMetric::L2)
    }
}

/// Kind of index the remote engine builds over the vector field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum IndexKind {
    #[default]
    IvfFlat,
    Flat,
    Hnsw,
}

impl IndexKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            IndexKind::IvfFlat => "IVF_FLAT",
            IndexKind::Flat => "FLAT",
            IndexKind::Hnsw => "HNSW",
        }
    }
}

/// Index request passed through to the remote engine.
///
/// `params` is forwarded verbatim (e.g. `{"nlist": 1024}` for IVF_FLAT,
/// `{"M": 16, "efConstruction": 200}` for HNSW).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexSpec {
    pub kind: IndexKind,
    pub params: Map<String, Value>,
}

impl IndexSpec {
    pub fn new(kind: IndexKind) -> Self {
        Self {
            kind,
            params: Map::new(),
        }
    }

    pub fn ivf_flat(nlist: u32) -> Self {
        Self::new(IndexKind::IvfFlat).with_param("nlist", json!(nlist))
    }

    pub fn hnsw(m: u32, ef_construction: u32) -> Self {
        Self::new(IndexKind::Hnsw)
            .with_param("M", json!(m))
            .with_param("efConstruction", json!(ef_construction))
    }

    pub fn flat() -> Self {
        Self::new(IndexKind::Flat)
    }

    pub fn with_param(mut self, key: &str, value: Value) -> Self {
        self.params.insert(key.to_string(), value);
        self
    }

    /// Integer parameter lookup, for backends that need typed values
    pub fn param_u64(&self, key: &str) -> Option<u64> {
        self.params.get(key).and_then(Value::as_u64)
    }
}

impl Default for IndexSpec {
    fn default() -> Self {
        Self::ivf_flat(1024)
    }
}

/// Everything needed to create a collection remotely
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionDescriptor {
    pub name: String,
    pub dimension: usize,
    pub metric: DistanceMetric,
    pub index: IndexSpec,
}

/// Per-search index parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchParams {
    /// Number of IVF clusters probed
    pub nprobe: u32,
}

impl Default for SearchParams {
    fn default() -> Self {
        Self { nprobe: 10 }
    }
}

/// A similarity query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Query {
    pub vector: Vec<f32>,
    pub top_k: usize,
    /// Scalar filter expression in the service's own syntax
    pub filter: Option<String>,
}

impl Query {
    pub fn new(vector: Vec<f32>, top_k: usize) -> Self {
        Self {
            vector,
            top_k,
            filter: None,
        }
    }

    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = Some(filter.into());
        self
    }
}

/// Fully-resolved search request handed to a connection
#[derive(Debug, Clone, PartialEq)]
pub struct SearchRequest {
    pub vector: Vec<f32>,
    pub top_k: usize,
    pub filter: Option<String>,
    pub metric: DistanceMetric,
    pub params: SearchParams,
}

/// One search result, in the order the service ranked it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub id: String,
    pub distance: f32,
}

impl SearchHit {
    pub fn new(id: impl Into<String>, distance: f32) -> Self {
        Self {
            id: id.into(),
            distance,
        }
    }
}
