use serde::{Deserialize, Serialize};

/// Default block size: 4 MiB, matching the teacher deployment's chunking.
pub const DEFAULT_BLOCK_SIZE: usize = 4 * 1024 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HashAlgorithm {
    Sha256,
}

impl Default for HashAlgorithm {
    fn default() -> Self {
        HashAlgorithm::Sha256
    }
}

/// Tunables for the block store, loaded from `NodeConfig` at startup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlockStoreConfig {
    /// Maximum size of a single block. Must be a power of two (§4.1).
    pub block_size: usize,
    /// Hash used for content addressing. SHA-256 is the only implementation
    /// today; the field exists so a deployment can plug another digest
    /// without touching callers.
    pub hash_algorithm: HashAlgorithm,
}

impl Default for BlockStoreConfig {
    fn default() -> Self {
        Self {
            block_size: DEFAULT_BLOCK_SIZE,
            hash_algorithm: HashAlgorithm::default(),
        }
    }
}

impl BlockStoreConfig {
    pub fn is_valid(&self) -> bool {
        self.block_size > 0 && self.block_size.is_power_of_two()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_block_size_is_power_of_two() {
        assert!(BlockStoreConfig::default().is_valid());
    }

    #[test]
    fn rejects_non_power_of_two() {
        let cfg = BlockStoreConfig {
            block_size: 3_000_000,
            hash_algorithm: HashAlgorithm::Sha256,
        };
        assert!(!cfg.is_valid());
    }
}
