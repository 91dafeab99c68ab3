//! Vector Collections Library
//!
//! A thin, typed client over a remote vector database. The client binds to
//! one collection, creates it (with its vector index) on first use, and
//! forwards inserts, upserts and similarity queries to the service. Index
//! construction, distance computation and storage all stay server-side.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────┐
//! │  CollectionClient<C> │  ← validation, collection bootstrap
//! └──────────┬───────────┘
//!            │
//! ┌──────────▼───────────┐
//! │   VectorConnection   │
//! │       (trait)        │
//! └──────────┬───────────┘
//!            │
//!   ┌────────┼─────────────────┐
//!   │        │                 │
//! Milvus   Qdrant          InMemory
//! (REST)   (gRPC)        (dev/testing)
//! ```
//!
//! # Usage
//!
//! ```rust,no_run
//! use domain_collections::{CollectionClient, CollectionConfig, MilvusConfig, Record};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = CollectionClient::connect(
//!     MilvusConfig::default(),
//!     CollectionConfig::new("raven-mvp", 3),
//! )
//! .await?;
//!
//! client
//!     .insert(vec![
//!         Record::new("a", vec![1.0, 0.0, 0.0]),
//!         Record::new("b", vec![0.0, 1.0, 0.0]),
//!     ])
//!     .await?;
//!
//! let hits = client.query(vec![1.0, 0.0, 0.0], 1).await?;
//! assert_eq!(hits[0].id, "a");
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod config;
pub mod connection;
pub mod error;
pub mod memory;
pub mod milvus;
pub mod models;
pub mod qdrant;

pub use client::CollectionClient;
pub use config::{CollectionConfig, MilvusConfig};
pub use connection::{ID_FIELD, VECTOR_FIELD, VectorConnection};
pub use error::{CollectionError, CollectionResult};
pub use memory::InMemoryConnection;
pub use milvus::MilvusConnection;
pub use models::{
    CollectionDescriptor, DistanceMetric, IndexKind, IndexSpec, MAX_TOP_K, Query, Record,
    SearchHit, SearchParams, SearchRequest,
};
pub use qdrant::{QdrantConfig, QdrantConnection};
