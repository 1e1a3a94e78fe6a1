use crate::humanize::ByteSize;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::PathBuf;

/// Top-level configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub indexes: IndexesConfig,
    #[serde(default)]
    pub wal: WalConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: SocketAddr,
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    #[serde(default)]
    pub api: ApiLimits,
}

/// API request limits
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ApiLimits {
    #[serde(default = "default_max_batch_bytes")]
    pub max_batch_bytes: ByteSize,
    #[serde(default = "default_max_changes_per_batch")]
    pub max_changes_per_batch: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            data_dir: default_data_dir(),
            api: ApiLimits::default(),
        }
    }
}

impl Default for ApiLimits {
    fn default() -> Self {
        Self {
            max_batch_bytes: default_max_batch_bytes(),
            max_changes_per_batch: default_max_changes_per_batch(),
        }
    }
}

fn default_bind_addr() -> SocketAddr {
    "0.0.0.0:8080".parse().unwrap()
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("data/wal")
}

fn default_max_batch_bytes() -> ByteSize {
    ByteSize(10 * 1024 * 1024) // 10 MB
}

fn default_max_changes_per_batch() -> usize {
    1000
}

/// Downstream index endpoints
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct IndexesConfig {
    #[serde(default)]
    pub vector: VectorIndexConfig,
    #[serde(default)]
    pub graph: GraphIndexConfig,
}

/// Vector index service configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct VectorIndexConfig {
    #[serde(default = "default_vector_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_collection")]
    pub collection: String,
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Default for VectorIndexConfig {
    fn default() -> Self {
        Self {
            endpoint: default_vector_endpoint(),
            collection: default_collection(),
            connect_timeout_secs: default_connect_timeout_secs(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

/// Graph index service configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GraphIndexConfig {
    #[serde(default = "default_graph_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Default for GraphIndexConfig {
    fn default() -> Self {
        Self {
            endpoint: default_graph_endpoint(),
            connect_timeout_secs: default_connect_timeout_secs(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

fn default_vector_endpoint() -> String {
    "http://localhost:6333".to_string()
}

fn default_collection() -> String {
    "code_embeddings".to_string()
}

fn default_graph_endpoint() -> String {
    "http://localhost:7474".to_string()
}

fn default_connect_timeout_secs() -> u64 {
    10
}

fn default_request_timeout_secs() -> u64 {
    30
}

/// WAL job timing and retention
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WalConfig {
    #[serde(default = "default_recovery_interval_secs")]
    pub recovery_interval_secs: u64,
    #[serde(default = "default_cleanup_interval_secs")]
    pub cleanup_interval_secs: u64,
    #[serde(default = "default_retention_days")]
    pub retention_days: u32,
}

impl Default for WalConfig {
    fn default() -> Self {
        Self {
            recovery_interval_secs: default_recovery_interval_secs(),
            cleanup_interval_secs: default_cleanup_interval_secs(),
            retention_days: default_retention_days(),
        }
    }
}

fn default_recovery_interval_secs() -> u64 {
    300 // 5 minutes
}

fn default_cleanup_interval_secs() -> u64 {
    86400 // daily
}

fn default_retention_days() -> u32 {
    7
}
