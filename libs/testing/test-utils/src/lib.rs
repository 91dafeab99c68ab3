//! Shared test utilities for the vector collection crates
//!
//! This crate provides reusable test infrastructure:
//! - `TestMilvus`: Milvus standalone container with automatic cleanup (feature: "milvus")
//! - `TestQdrant`: Qdrant container with automatic cleanup (feature: "qdrant")
//! - `TestDataBuilder`: Deterministic collection names and embeddings (always available)
//! - `assertions`: Custom assertion helpers (always available)
//! - `init_test_tracing`: Tracing for test output (always available)
//!
//! # Usage
//!
//! Add the backends you need to your dev-dependencies:
//!
//! ```toml
//! [dev-dependencies]
//! test-utils = { workspace = true, features = ["milvus"] }
//! ```
//!
//! ```rust,ignore
//! use test_utils::{TestMilvus, TestDataBuilder};
//!
//! #[tokio::test]
//! #[ignore] // Requires Docker
//! async fn my_milvus_test() {
//!     let milvus = TestMilvus::new().await;
//!     let builder = TestDataBuilder::from_test_name("my_milvus_test");
//!
//!     let collection = builder.collection_name("main");
//!     let embedding = builder.embedding(768, 0);
//! }
//! ```

use core_config::Environment;

#[cfg(feature = "milvus")]
mod milvus;

#[cfg(feature = "qdrant")]
mod qdrant;

#[cfg(feature = "milvus")]
pub use milvus::TestMilvus;

#[cfg(feature = "qdrant")]
pub use qdrant::TestQdrant;

/// Install the workspace tracing subscriber; safe to call from every test
pub fn init_test_tracing() {
    core_config::tracing::init_tracing(&Environment::Development);
}

/// Builder for test data with deterministic randomization
///
/// This ensures tests are reproducible by using seeded data.
pub struct TestDataBuilder {
    seed: u64,
}

impl TestDataBuilder {
    /// Create a new builder with a seed (for deterministic tests)
    pub fn new(seed: u64) -> Self {
        Self { seed }
    }

    /// Create from test name (generates seed from test name hash)
    ///
    /// # Example
    ///
    /// ```
    /// use test_utils::TestDataBuilder;
    ///
    /// let builder = TestDataBuilder::from_test_name("test_round_trip");
    /// ```
    pub fn from_test_name(name: &str) -> Self {
        use std::collections::hash_map::DefaultHasher;
        use std::hash::{Hash, Hasher};

        let mut hasher = DefaultHasher::new();
        name.hash(&mut hasher);
        Self::new(hasher.finish())
    }

    /// Collection name unique to this test, valid for Milvus and Qdrant
    ///
    /// Milvus names allow only letters, digits and underscores.
    ///
    /// ```
    /// use test_utils::TestDataBuilder;
    ///
    /// let name = TestDataBuilder::new(42).collection_name("main");
    /// assert_eq!(name, "test_42_main");
    /// ```
    pub fn collection_name(&self, suffix: &str) -> String {
        format!("test_{}_{}", self.seed, suffix)
    }

    /// Record id unique within this test
    pub fn record_id(&self, index: usize) -> String {
        format!("rec-{}-{}", self.seed, index)
    }

    /// Deterministic embedding with components in `[-1, 1)`
    ///
    /// The same `(seed, index)` always yields the same vector.
    pub fn embedding(&self, dimension: usize, index: usize) -> Vec<f32> {
        let mut state = self
            .seed
            .wrapping_add((index as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15))
            | 1;

        (0..dimension)
            .map(|_| {
                // xorshift64
                state ^= state << 13;
                state ^= state >> 7;
                state ^= state << 17;
                ((state >> 40) as f32 / (1u64 << 24) as f32) * 2.0 - 1.0
            })
            .collect()
    }
}

/// Test assertion helpers
pub mod assertions {
    /// Assert that distances never decrease
    pub fn assert_non_decreasing(distances: &[f32], context: &str) {
        for pair in distances.windows(2) {
            assert!(
                pair[0] <= pair[1],
                "{}: distances not sorted ascending: {:?}",
                context,
                distances
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_builder_deterministic() {
        let builder1 = TestDataBuilder::new(42);
        let builder2 = TestDataBuilder::new(42);

        assert_eq!(builder1.embedding(8, 3), builder2.embedding(8, 3));
        assert_eq!(builder1.collection_name("a"), builder2.collection_name("a"));
    }

    #[test]
    fn test_data_builder_different_names() {
        let builder1 = TestDataBuilder::from_test_name("test1");
        let builder2 = TestDataBuilder::from_test_name("test2");

        assert_ne!(builder1.embedding(8, 0), builder2.embedding(8, 0));
    }

    #[test]
    fn test_embeddings_differ_by_index_and_stay_in_range() {
        let builder = TestDataBuilder::new(7);
        let a = builder.embedding(16, 0);
        let b = builder.embedding(16, 1);

        assert_eq!(a.len(), 16);
        assert_ne!(a, b);
        assert!(a.iter().chain(&b).all(|v| (-1.0..1.0).contains(v)));
    }

    #[test]
    fn test_assert_non_decreasing_accepts_ties() {
        assertions::assert_non_decreasing(&[0.0, 0.0, 1.5], "ties");
    }

    #[test]
    #[should_panic(expected = "not sorted")]
    fn test_assert_non_decreasing_rejects_unsorted() {
        assertions::assert_non_decreasing(&[1.0, 0.5], "unsorted");
    }
}
