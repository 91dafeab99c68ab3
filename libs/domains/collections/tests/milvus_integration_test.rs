//! Integration tests against a real Milvus
//!
//! These start Milvus standalone via testcontainers and need Docker:
//!
//! ```text
//! cargo test -p domain_collections --test milvus_integration_test -- --ignored
//! ```

use domain_collections::*;
use test_utils::{TestDataBuilder, TestMilvus, assertions::*, init_test_tracing};

fn milvus_config(milvus: &TestMilvus) -> MilvusConfig {
    MilvusConfig::new(milvus.host(), milvus.port())
}

#[tokio::test]
#[ignore] // Requires Docker
async fn test_milvus_example_round_trip() {
    init_test_tracing();
    let milvus = TestMilvus::new().await;
    let builder = TestDataBuilder::from_test_name("milvus_example");

    let client = CollectionClient::connect(
        milvus_config(&milvus),
        CollectionConfig::new(builder.collection_name("example"), 3),
    )
    .await
    .unwrap();

    let inserted = client
        .insert(vec![
            Record::new("a", vec![1.0, 0.0, 0.0]),
            Record::new("b", vec![0.0, 1.0, 0.0]),
        ])
        .await
        .unwrap();
    assert_eq!(inserted, 2);

    let hits = client.query(vec![1.0, 0.0, 0.0], 1).await.unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].id, "a");
    assert!(hits[0].distance.abs() < 1e-6);

    client.drop_collection().await.unwrap();
}

#[tokio::test]
#[ignore] // Requires Docker
async fn test_milvus_results_sorted_and_idempotent_init() {
    let milvus = TestMilvus::new().await;
    let builder = TestDataBuilder::from_test_name("milvus_sorted");
    let config = CollectionConfig::new(builder.collection_name("sorted"), 32);

    let client = CollectionClient::connect(milvus_config(&milvus), config.clone())
        .await
        .unwrap();

    let records: Vec<Record> = (0..50)
        .map(|i| Record::new(builder.record_id(i), builder.embedding(32, i)))
        .collect();
    client.insert(records.clone()).await.unwrap();

    // Second client binds to the existing collection and sees the data.
    let second = CollectionClient::connect(milvus_config(&milvus), config)
        .await
        .unwrap();

    let hits = second.query(records[7].embedding.clone(), 5).await.unwrap();
    assert!(hits.len() <= 5);
    assert!(hits.iter().any(|h| h.id == records[7].id));
    let distances: Vec<f32> = hits.iter().map(|h| h.distance).collect();
    assert_non_decreasing(&distances, "milvus L2 results");

    second.drop_collection().await.unwrap();
}

#[tokio::test]
#[ignore] // Requires Docker
async fn test_milvus_upsert_replaces() {
    let milvus = TestMilvus::new().await;
    let builder = TestDataBuilder::from_test_name("milvus_upsert");

    let client = CollectionClient::connect(
        milvus_config(&milvus),
        CollectionConfig::new(builder.collection_name("upsert"), 2),
    )
    .await
    .unwrap();

    client
        .insert(vec![Record::new("a", vec![1.0, 0.0])])
        .await
        .unwrap();
    client
        .upsert(vec![Record::new("a", vec![0.0, 1.0])])
        .await
        .unwrap();

    let hits = client.query(vec![0.0, 1.0], 10).await.unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].id, "a");

    client.drop_collection().await.unwrap();
}

#[tokio::test]
#[ignore] // Requires Docker
async fn test_milvus_dimension_mismatch_on_existing_collection() {
    let milvus = TestMilvus::new().await;
    let builder = TestDataBuilder::from_test_name("milvus_dims");
    let name = builder.collection_name("dims");

    let client = CollectionClient::connect(milvus_config(&milvus), CollectionConfig::new(&name, 4))
        .await
        .unwrap();

    let result =
        CollectionClient::connect(milvus_config(&milvus), CollectionConfig::new(&name, 8)).await;
    assert!(matches!(result, Err(CollectionError::Schema(_))));

    client.drop_collection().await.unwrap();
}

#[tokio::test]
#[ignore] // Requires Docker
async fn test_milvus_rejected_filter_is_query_error() {
    let milvus = TestMilvus::new().await;
    let builder = TestDataBuilder::from_test_name("milvus_filter");

    let client = CollectionClient::connect(
        milvus_config(&milvus),
        CollectionConfig::new(builder.collection_name("filter"), 2),
    )
    .await
    .unwrap();

    // The vector field is not a scalar, so this filter is rejected server-side.
    let result = client
        .query_with(Query::new(vec![1.0, 0.0], 1).with_filter("embedding > 0.5"))
        .await;
    assert!(matches!(result, Err(CollectionError::Query(_))));

    client.drop_collection().await.unwrap();
}
