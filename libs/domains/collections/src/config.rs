use core_config::{ConfigError, FromEnv, env_optional, env_or_default, env_parse};
use reqwest::Url;

use crate::models::{CollectionDescriptor, DistanceMetric, IndexSpec, SearchParams};

/// Milvus connection configuration
#[derive(Debug, Clone)]
pub struct MilvusConfig {
    pub host: String,
    pub port: u16,
    /// Sent as a bearer token; either `user:password` or an API key
    pub token: Option<String>,
    pub timeout_secs: u64,
}

impl MilvusConfig {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            ..Self::default()
        }
    }

    pub fn with_token(mut self, token: String) -> Self {
        self.token = Some(token);
        self
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    /// Base URL of the RESTful API.
    ///
    /// `host` may be a bare host name or a full URL; a port already in the
    /// URL wins over `port`.
    pub fn base_url(&self) -> String {
        if !(self.host.starts_with("http://") || self.host.starts_with("https://")) {
            return format!("http://{}:{}", self.host, self.port);
        }

        match Url::parse(&self.host) {
            Ok(mut url) => {
                if url.port().is_none() {
                    // Only fails for URLs that cannot carry a port
                    let _ = url.set_port(Some(self.port));
                }
                url.as_str().trim_end_matches('/').to_string()
            }
            Err(_) => format!("{}:{}", self.host.trim_end_matches('/'), self.port),
        }
    }
}

impl Default for MilvusConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 19530,
            token: None,
            timeout_secs: 30,
        }
    }
}

impl FromEnv for MilvusConfig {
    /// Reads `MILVUS_HOST`, `MILVUS_PORT`, `MILVUS_TOKEN` and
    /// `MILVUS_TIMEOUT_SECS`, each falling back to the defaults
    fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        Ok(Self {
            host: env_or_default("MILVUS_HOST", &defaults.host),
            port: env_parse("MILVUS_PORT", defaults.port)?,
            token: env_optional("MILVUS_TOKEN"),
            timeout_secs: env_parse("MILVUS_TIMEOUT_SECS", defaults.timeout_secs)?,
        })
    }
}

/// Collection the client binds to, plus how it searches it
#[derive(Debug, Clone)]
pub struct CollectionConfig {
    pub name: String,
    pub dimension: usize,
    pub metric: DistanceMetric,
    pub index: IndexSpec,
    pub search: SearchParams,
    /// Filter expression applied to every `query` call
    pub filter: Option<String>,
    /// Read consistency requested at creation time (Milvus only)
    pub consistency_level: String,
}

impl CollectionConfig {
    pub fn new(name: impl Into<String>, dimension: usize) -> Self {
        Self {
            name: name.into(),
            dimension,
            ..Self::default()
        }
    }

    pub fn with_metric(mut self, metric: DistanceMetric) -> Self {
        self.metric = metric;
        self
    }

    pub fn with_index(mut self, index: IndexSpec) -> Self {
        self.index = index;
        self
    }

    pub fn with_search(mut self, search: SearchParams) -> Self {
        self.search = search;
        self
    }

    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = Some(filter.into());
        self
    }

    pub fn with_consistency_level(mut self, level: impl Into<String>) -> Self {
        self.consistency_level = level.into();
        self
    }

    pub fn descriptor(&self) -> CollectionDescriptor {
        CollectionDescriptor {
            name: self.name.clone(),
            dimension: self.dimension,
            metric: self.metric,
            index: self.index.clone(),
        }
    }
}

impl Default for CollectionConfig {
    fn default() -> Self {
        Self {
            name: "raven-mvp".to_string(),
            dimension: 768,
            metric: DistanceMetric::L2,
            index: IndexSpec::default(),
            search: SearchParams::default(),
            filter: None,
            consistency_level: "Strong".to_string(),
        }
    }
}

impl FromEnv for CollectionConfig {
    /// Reads `RAVEN_COLLECTION`, `RAVEN_DIMENSION`, `RAVEN_NPROBE` and
    /// `RAVEN_FILTER`; metric and index stay at their defaults
    fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        Ok(Self {
            name: env_or_default("RAVEN_COLLECTION", &defaults.name),
            dimension: env_parse("RAVEN_DIMENSION", defaults.dimension)?,
            search: SearchParams {
                nprobe: env_parse("RAVEN_NPROBE", defaults.search.nprobe)?,
            },
            filter: env_optional("RAVEN_FILTER"),
            ..defaults
        })
    }
}
