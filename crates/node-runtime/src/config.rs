//! Node configuration (§6 "Configuration", expanded in SPEC_FULL.md §10):
//! every knob the core enumerates, plus the deployment-only settings (bind
//! address, data directory, reconciler cadence) a runnable node needs on
//! top of them. Loaded from an optional TOML file and overridable by CLI
//! flags, mirroring the `NodeConfig` pattern the original node runtime used
//! for its own (unrelated) subsystem settings.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use nimbus_block_store::{BlockStoreConfig, HashAlgorithm};
use nimbus_node_tree::NodeTreeConfig;
use nimbus_policy::{PolicyDefaults, VersioningMode};
use nimbus_storage::FacadeConfig;
use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Everything a running node needs to know. Every field here corresponds to
/// a named knob in §6/§10 of the specification, except `bind_addr`,
/// `data_dir`, `metrics_addr`, and `reconciler_interval_secs`, which are
/// deployment concerns the distilled spec leaves to "implementation".
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    /// Address the HTTP surface (§6) listens on.
    pub bind_addr: SocketAddr,
    /// Address the Prometheus exporter listens on.
    pub metrics_addr: SocketAddr,
    /// Directory backing the RocksDB store when the `rocksdb` feature is
    /// enabled; ignored by the in-memory store.
    pub data_dir: PathBuf,
    /// Use the RocksDB-backed `KeyValueStore` instead of the in-memory one.
    /// Only meaningful when the crate is built with the `rocksdb` feature.
    pub use_rocksdb: bool,

    /// §4.1: block size in bytes. Must be a power of two; changing this
    /// after a deployment already has data is unsupported (§6).
    pub block_size: usize,
    /// §4.1: content-addressing digest. SHA-256 is the only implementation
    /// today; the field exists so the config shape matches the spec's
    /// enumeration even though there is nothing else to select.
    pub hash_algorithm: String,

    pub default_account_quota: u64,
    pub default_container_quota: u64,
    /// `"auto"` or `"none"` (§4.5).
    pub default_container_versioning: String,
    pub free_versioning: bool,
    pub map_check_interval: i64,
    pub public_url_security: usize,
    pub public_url_alphabet: String,
    pub listing_limit: usize,
    /// §4.3: how many ancestors get their `Statistics` updated synchronously
    /// on every version mutation. `0` here is treated as "disabled"; there
    /// is no sentinel for "unlimited" at the config layer because an
    /// unbounded walk on every write is not something this implementation
    /// offers (see DESIGN.md Open Question).
    pub update_statistics_ancestors_depth: u32,
    /// The Quotaholder resource name object bytes are accounted under.
    pub resource_name: String,

    /// How often the background reconciler sweeps pending commissions
    /// (§4.8 "Reconciliation").
    pub reconciler_interval_secs: u64,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:8080".parse().unwrap(),
            metrics_addr: "0.0.0.0:9090".parse().unwrap(),
            data_dir: PathBuf::from("./data"),
            use_rocksdb: false,
            block_size: nimbus_block_store::config::DEFAULT_BLOCK_SIZE,
            hash_algorithm: "sha256".to_string(),
            default_account_quota: 0,
            default_container_quota: 0,
            default_container_versioning: "auto".to_string(),
            free_versioning: false,
            map_check_interval: 5,
            public_url_security: 16,
            public_url_alphabet:
                "0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz".to_string(),
            listing_limit: 10_000,
            update_statistics_ancestors_depth: 8,
            resource_name: "diskspace".to_string(),
            reconciler_interval_secs: 30,
        }
    }
}

impl NodeConfig {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.block_size == 0 || !self.block_size.is_power_of_two() {
            return Err(ConfigError::Invalid(format!(
                "block_size {} must be a non-zero power of two",
                self.block_size
            )));
        }
        if self.hash_algorithm != "sha256" {
            return Err(ConfigError::Invalid(format!(
                "unsupported hash_algorithm {:?}: only \"sha256\" is implemented",
                self.hash_algorithm
            )));
        }
        if VersioningMode::parse(&self.default_container_versioning).is_none() {
            return Err(ConfigError::Invalid(format!(
                "default_container_versioning must be \"auto\" or \"none\", got {:?}",
                self.default_container_versioning
            )));
        }
        if self.listing_limit == 0 || self.listing_limit > nimbus_node_tree::config::LISTING_MAX_LIMIT {
            return Err(ConfigError::Invalid(format!(
                "listing_limit must be in 1..={}",
                nimbus_node_tree::config::LISTING_MAX_LIMIT
            )));
        }
        Ok(())
    }

    pub fn block_store_config(&self) -> BlockStoreConfig {
        BlockStoreConfig {
            block_size: self.block_size,
            hash_algorithm: HashAlgorithm::Sha256,
        }
    }

    pub fn node_tree_config(&self) -> NodeTreeConfig {
        NodeTreeConfig {
            update_statistics_ancestors_depth: self.update_statistics_ancestors_depth,
        }
    }

    pub fn policy_defaults(&self) -> PolicyDefaults {
        PolicyDefaults {
            default_quota: self.default_container_quota,
            default_versioning: self.default_container_versioning(),
        }
    }

    pub fn default_container_versioning(&self) -> VersioningMode {
        VersioningMode::parse(&self.default_container_versioning).unwrap_or(VersioningMode::Auto)
    }

    pub fn facade_config(&self) -> FacadeConfig {
        FacadeConfig {
            default_account_quota: self.default_account_quota,
            default_container_quota: self.default_container_quota,
            default_container_versioning: self.default_container_versioning(),
            free_versioning: self.free_versioning,
            map_check_interval: self.map_check_interval,
            public_url_security: self.public_url_security,
            public_url_alphabet: self.public_url_alphabet.clone(),
            listing_limit: self.listing_limit.min(nimbus_node_tree::config::LISTING_MAX_LIMIT),
            resource_name: self.resource_name.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        NodeConfig::default().validate().unwrap();
    }

    #[test]
    fn rejects_non_power_of_two_block_size() {
        let mut cfg = NodeConfig::default();
        cfg.block_size = 3_000_000;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn rejects_unknown_versioning_default() {
        let mut cfg = NodeConfig::default();
        cfg.default_container_versioning = "sometimes".to_string();
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn rejects_listing_limit_above_server_cap() {
        let mut cfg = NodeConfig::default();
        cfg.listing_limit = 50_000;
        assert!(cfg.validate().is_err());
    }
}
