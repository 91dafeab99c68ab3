//! Milvus test infrastructure
//!
//! Provides a `TestMilvus` helper that runs Milvus standalone (embedded etcd,
//! local storage) in a container.

use std::time::Duration;

use testcontainers::core::{CopyDataSource, IntoContainerPort};
use testcontainers::runners::AsyncRunner;
use testcontainers::{ContainerAsync, GenericImage, ImageExt};

const MILVUS_IMAGE: &str = "milvusdb/milvus";
const MILVUS_TAG: &str = "v2.4.15";
const API_PORT: u16 = 19530;
const HEALTH_PORT: u16 = 9091;
const STARTUP_TIMEOUT: Duration = Duration::from_secs(180);

const EMBED_ETCD_CONFIG: &str = "\
listen-client-urls: http://0.0.0.0:2379
advertise-client-urls: http://0.0.0.0:2379
quota-backend-bytes: 4294967296
auto-compaction-mode: revision
auto-compaction-retention: '1000'
";

/// Test Milvus wrapper that ensures proper cleanup
///
/// The container is automatically stopped and removed when this struct is dropped.
///
/// # Example
///
/// ```no_run
/// use test_utils::TestMilvus;
///
/// # async fn example() {
/// let milvus = TestMilvus::new().await;
/// let (host, port) = (milvus.host(), milvus.port());
/// // Build a MilvusConfig from host/port
/// # }
/// ```
pub struct TestMilvus {
    #[allow(dead_code)]
    container: ContainerAsync<GenericImage>,
    port: u16,
}

impl TestMilvus {
    /// Start Milvus standalone and wait until `/healthz` reports ready
    pub async fn new() -> Self {
        let image = GenericImage::new(MILVUS_IMAGE, MILVUS_TAG)
            .with_exposed_port(API_PORT.tcp())
            .with_exposed_port(HEALTH_PORT.tcp())
            .with_env_var("ETCD_USE_EMBED", "true")
            .with_env_var("ETCD_DATA_DIR", "/var/lib/milvus/etcd")
            .with_env_var("ETCD_CONFIG_PATH", "/milvus/configs/embedEtcd.yaml")
            .with_env_var("COMMON_STORAGETYPE", "local")
            .with_copy_to(
                "/milvus/configs/embedEtcd.yaml",
                CopyDataSource::Data(EMBED_ETCD_CONFIG.as_bytes().to_vec()),
            )
            .with_cmd(["milvus", "run", "standalone"]);

        let container = image
            .start()
            .await
            .expect("Failed to start Milvus container");

        let port = container
            .get_host_port_ipv4(API_PORT)
            .await
            .expect("Failed to get Milvus port");
        let health_port = container
            .get_host_port_ipv4(HEALTH_PORT)
            .await
            .expect("Failed to get Milvus health port");

        Self::wait_healthy(health_port).await;

        tracing::info!(port, "Test Milvus ready ({}:{})", MILVUS_IMAGE, MILVUS_TAG);

        Self { container, port }
    }

    async fn wait_healthy(health_port: u16) {
        let url = format!("http://127.0.0.1:{}/healthz", health_port);
        let client = reqwest::Client::new();
        let deadline = tokio::time::Instant::now() + STARTUP_TIMEOUT;

        loop {
            if let Ok(response) = client.get(&url).send().await {
                if response.status().is_success() {
                    return;
                }
            }
            if tokio::time::Instant::now() >= deadline {
                panic!("Milvus did not become healthy within {:?}", STARTUP_TIMEOUT);
            }
            tokio::time::sleep(Duration::from_secs(2)).await;
        }
    }

    pub fn host(&self) -> &str {
        "127.0.0.1"
    }

    /// Host port mapped to the Milvus API (gRPC and REST share it)
    pub fn port(&self) -> u16 {
        self.port
    }
}

impl Drop for TestMilvus {
    fn drop(&mut self) {
        tracing::debug!("Cleaning up test Milvus container");
    }
}
