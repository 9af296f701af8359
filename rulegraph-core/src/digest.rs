use crate::error::Result;
use crate::types::Group;
use serde::Serialize;
use sha2::{Digest, Sha256};

/// SHA-256 of a value's JSON serialization, hex encoded.
///
/// Two runs with equal config and equal input must produce equal digests, so
/// any map serialized here has to be ordered (`BTreeMap`, never `HashMap`).
pub fn calculate_config_hash<T: Serialize>(config: &T) -> Result<String> {
    let config_json = serde_json::to_string(config)?;
    Ok(sha256_hex(config_json.as_bytes()))
}

/// Digest of an emitted group list; equal lists give equal digests.
pub fn calculate_groups_hash(groups: &[Group]) -> Result<String> {
    let groups_json = serde_json::to_string(groups)?;
    Ok(sha256_hex(groups_json.as_bytes()))
}

fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::HierarchyConfig;

    #[test]
    fn test_config_hash_tracks_changes() {
        let config = HierarchyConfig::default();
        let mut tweaked = HierarchyConfig::default();
        tweaked.sequence.forward_tolerance = 4;

        let hash = calculate_config_hash(&config).unwrap();
        assert_eq!(hash.len(), 64);
        assert_eq!(hash, calculate_config_hash(&HierarchyConfig::default()).unwrap());
        assert_ne!(hash, calculate_config_hash(&tweaked).unwrap());
    }

    #[test]
    fn test_groups_hash_is_order_sensitive() {
        let a = vec![Group::new("4", 0, false), Group::new("4_1", 0, false)];
        let b = vec![Group::new("4_1", 0, false), Group::new("4", 0, false)];
        assert_eq!(
            calculate_groups_hash(&a).unwrap(),
            calculate_groups_hash(&a.clone()).unwrap()
        );
        assert_ne!(
            calculate_groups_hash(&a).unwrap(),
            calculate_groups_hash(&b).unwrap()
        );
    }
}
