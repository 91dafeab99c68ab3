//! Qdrant test infrastructure
//!
//! Provides a `TestQdrant` helper that creates a Qdrant container for testing.

use testcontainers::runners::AsyncRunner;
use testcontainers::ContainerAsync;
use testcontainers_modules::qdrant::Qdrant;

const GRPC_PORT: u16 = 6334;

/// Test Qdrant wrapper that ensures proper cleanup
///
/// The container is automatically stopped and removed when this struct is dropped.
pub struct TestQdrant {
    #[allow(dead_code)]
    container: ContainerAsync<Qdrant>,
    pub url: String,
}

impl TestQdrant {
    pub async fn new() -> Self {
        let container = Qdrant::default()
            .start()
            .await
            .expect("Failed to start Qdrant container");

        let host_port = container
            .get_host_port_ipv4(GRPC_PORT)
            .await
            .expect("Failed to get Qdrant gRPC port");

        let url = format!("http://127.0.0.1:{}", host_port);

        tracing::info!(port = host_port, "Test Qdrant ready");

        Self { container, url }
    }

    /// gRPC URL for building a client
    pub fn url(&self) -> &str {
        &self.url
    }
}

impl Drop for TestQdrant {
    fn drop(&mut self) {
        tracing::debug!("Cleaning up test Qdrant container");
    }
}
