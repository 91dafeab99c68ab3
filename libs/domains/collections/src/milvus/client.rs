use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, instrument, warn};

use super::wire::{self, Envelope, HasData, InsertData, LoadState, UpsertData};
use crate::config::MilvusConfig;
use crate::connection::VectorConnection;
use crate::error::{CollectionError, CollectionResult};
use crate::models::{CollectionDescriptor, SearchHit, SearchRequest};

const LOAD_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Milvus session over the RESTful v2 API
pub struct MilvusConnection {
    client: Client,
    base_url: String,
    token: Option<String>,
    consistency_level: String,
    /// Bound on a single request and on waiting for a load to finish
    timeout: Duration,
}

impl MilvusConnection {
    pub fn new(config: &MilvusConfig) -> CollectionResult<Self> {
        let timeout = Duration::from_secs(config.timeout_secs);
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| CollectionError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.base_url(),
            token: config.token.clone(),
            consistency_level: "Strong".to_string(),
            timeout,
        })
    }

    /// Consistency level requested for collections this connection creates
    pub fn with_consistency_level(mut self, level: impl Into<String>) -> Self {
        self.consistency_level = level.into();
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn call(&self, path: &str, body: &Value) -> CollectionResult<Value> {
        let mut request = self
            .client
            .post(format!("{}{}", self.base_url, path))
            .json(body);

        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(status_error(status, path, &error_text));
        }

        let envelope: Envelope = response.json().await?;
        debug!(path, code = envelope.code, "Milvus response");

        if envelope.code != 0 {
            return Err(CollectionError::Service {
                code: envelope.code,
                message: envelope.message.unwrap_or_default(),
            });
        }

        Ok(envelope.data)
    }

    async fn call_as<T: DeserializeOwned>(&self, path: &str, body: &Value) -> CollectionResult<T> {
        let data = self.call(path, body).await?;
        Ok(serde_json::from_value(data)?)
    }

    /// Poll until the submitted load job reports `Loaded`
    async fn wait_loaded(&self, name: &str) -> CollectionResult<()> {
        let deadline = tokio::time::Instant::now() + self.timeout;

        loop {
            let data = self
                .call(wire::GET_LOAD_STATE, &wire::collection_name(name))
                .await?;

            match wire::parse_load_state(&data) {
                Some(LoadState::Loaded) => return Ok(()),
                Some(LoadState::NotExist) => {
                    return Err(CollectionError::Schema(format!(
                        "collection '{}' does not exist",
                        name
                    )));
                }
                Some(state) => debug!(collection = name, ?state, "Waiting for load"),
                None => warn!(collection = name, %data, "Unrecognised load state"),
            }

            if tokio::time::Instant::now() >= deadline {
                return Err(CollectionError::Schema(format!(
                    "collection '{}' not loaded within {:?}",
                    name, self.timeout
                )));
            }
            tokio::time::sleep(LOAD_POLL_INTERVAL).await;
        }
    }
}

/// Client errors (4xx) are service rejections the caller re-labels per
/// operation; anything else means the service could not be reached properly.
fn status_error(status: StatusCode, path: &str, body: &str) -> CollectionError {
    if status.is_client_error() {
        CollectionError::Service {
            code: i64::from(status.as_u16()),
            message: format!("HTTP {} on {}: {}", status, path, body),
        }
    } else {
        CollectionError::Connection(format!(
            "Milvus HTTP error ({}) on {}: {}",
            status, path, body
        ))
    }
}

#[async_trait]
impl VectorConnection for MilvusConnection {
    async fn has_collection(&self, name: &str) -> CollectionResult<bool> {
        let data: HasData = self
            .call_as(wire::HAS_COLLECTION, &wire::collection_name(name))
            .await?;
        Ok(data.has)
    }

    async fn describe_collection(&self, name: &str) -> CollectionResult<Option<usize>> {
        let data = self
            .call(wire::DESCRIBE_COLLECTION, &wire::collection_name(name))
            .await?;
        Ok(wire::parse_dimension(&data))
    }

    #[instrument(skip(self, descriptor), fields(collection = %descriptor.name))]
    async fn create_collection(&self, descriptor: &CollectionDescriptor) -> CollectionResult<()> {
        let body = wire::create_collection(descriptor, &self.consistency_level);
        self.call(wire::CREATE_COLLECTION, &body)
            .await
            .map_err(CollectionError::into_schema)?;
        Ok(())
    }

    #[instrument(
        skip(self, descriptor),
        fields(collection = %descriptor.name, index = descriptor.index.kind.as_str())
    )]
    async fn create_index(&self, descriptor: &CollectionDescriptor) -> CollectionResult<()> {
        self.call(wire::CREATE_INDEX, &wire::create_index(descriptor))
            .await
            .map_err(CollectionError::into_schema)?;
        Ok(())
    }

    async fn has_index(&self, name: &str) -> CollectionResult<bool> {
        match self.call(wire::LIST_INDEXES, &wire::list_indexes(name)).await {
            Ok(data) => Ok(!wire::parse_index_names(&data).is_empty()),
            Err(CollectionError::Service { code, .. }) if code == wire::INDEX_NOT_FOUND => {
                Ok(false)
            }
            Err(err) => Err(err),
        }
    }

    /// Submits the load job, then waits for it; Milvus rejects searches on
    /// a collection that is still loading.
    #[instrument(skip(self))]
    async fn load_collection(&self, name: &str) -> CollectionResult<()> {
        self.call(wire::LOAD_COLLECTION, &wire::collection_name(name))
            .await
            .map_err(CollectionError::into_schema)?;
        self.wait_loaded(name)
            .await
            .map_err(CollectionError::into_schema)
    }

    async fn insert(
        &self,
        name: &str,
        ids: Vec<String>,
        vectors: Vec<Vec<f32>>,
    ) -> CollectionResult<u64> {
        let body = wire::entities(name, ids, vectors);
        let data: InsertData = self.call_as(wire::INSERT, &body).await?;
        Ok(data.insert_count)
    }

    async fn upsert(
        &self,
        name: &str,
        ids: Vec<String>,
        vectors: Vec<Vec<f32>>,
    ) -> CollectionResult<u64> {
        let body = wire::entities(name, ids, vectors);
        let data: UpsertData = self.call_as(wire::UPSERT, &body).await?;
        Ok(data.upsert_count)
    }

    async fn search(&self, name: &str, request: &SearchRequest) -> CollectionResult<Vec<SearchHit>> {
        let data = self
            .call(wire::SEARCH, &wire::search(name, request))
            .await
            .map_err(CollectionError::into_query)?;

        wire::parse_hits(data)
            .map_err(|e| CollectionError::Internal(format!("Malformed search response: {}", e)))
    }

    async fn drop_collection(&self, name: &str) -> CollectionResult<()> {
        self.call(wire::DROP_COLLECTION, &wire::collection_name(name)).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_uses_config_url() {
        let config = MilvusConfig::new("milvus.svc", 19530).with_token("root:Milvus".to_string());
        let connection = MilvusConnection::new(&config).unwrap();
        assert_eq!(connection.base_url(), "http://milvus.svc:19530");
        assert_eq!(connection.token.as_deref(), Some("root:Milvus"));
        assert_eq!(connection.consistency_level, "Strong");
        assert_eq!(connection.timeout, Duration::from_secs(30));
    }

    #[test]
    fn test_client_errors_are_service_rejections() {
        let err = status_error(StatusCode::UNAUTHORIZED, wire::CREATE_COLLECTION, "denied");
        assert!(matches!(err, CollectionError::Service { code: 401, .. }));
        assert!(matches!(err.into_schema(), CollectionError::Schema(msg) if msg.contains("401")));

        let err = status_error(StatusCode::NOT_FOUND, wire::SEARCH, "no route");
        assert!(matches!(err.into_query(), CollectionError::Query(_)));
    }

    #[test]
    fn test_server_errors_are_connection_errors() {
        let err = status_error(StatusCode::BAD_GATEWAY, wire::SEARCH, "upstream down");
        assert!(matches!(err.into_query(), CollectionError::Connection(msg) if msg.contains("502")));
    }

    #[tokio::test]
    async fn test_unreachable_service_is_connection_error() {
        // Port 9 (discard) is closed on test hosts.
        let config = MilvusConfig::new("127.0.0.1", 9).with_timeout(2);
        let connection = MilvusConnection::new(&config).unwrap();

        let result = connection.has_collection("raven-mvp").await;
        assert!(
            matches!(result, Err(CollectionError::Connection(_))),
            "expected connection error, got {:?}",
            result
        );
    }
}
