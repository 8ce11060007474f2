//! Registry of well-known networks.
//!
//! x402 V1 challenges name networks (`"base"`, `"base-sepolia"`) instead of
//! CAIP-2 ids. This registry maps between the two. Only EVM networks are
//! listed: `exact-evm` is the single payment scheme this workspace pays.
//!
//! ```
//! use x402_feed_types::networks::chain_id_by_network_name;
//!
//! let base = chain_id_by_network_name("base").unwrap();
//! assert_eq!(base.to_string(), "eip155:8453");
//! ```

use std::collections::HashMap;
use std::sync::LazyLock;

use crate::chain::{ChainId, EIP155_NAMESPACE};

/// A known network and its CAIP-2 coordinates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkInfo {
    /// Name used by x402 V1, e.g. `base-sepolia`.
    pub name: &'static str,
    pub namespace: &'static str,
    pub reference: &'static str,
}

impl NetworkInfo {
    pub fn chain_id(&self) -> ChainId {
        ChainId::new(self.namespace, self.reference)
    }
}

const fn evm(name: &'static str, reference: &'static str) -> NetworkInfo {
    NetworkInfo {
        name,
        namespace: EIP155_NAMESPACE,
        reference,
    }
}

pub static KNOWN_NETWORKS: &[NetworkInfo] = &[
    evm("base", "8453"),
    evm("base-sepolia", "84532"),
    evm("polygon", "137"),
    evm("polygon-amoy", "80002"),
    evm("avalanche", "43114"),
    evm("avalanche-fuji", "43113"),
    evm("sei", "1329"),
    evm("sei-testnet", "1328"),
    evm("celo", "42220"),
    evm("celo-sepolia", "11142220"),
];

static NAME_TO_CHAIN_ID: LazyLock<HashMap<&'static str, ChainId>> = LazyLock::new(|| {
    KNOWN_NETWORKS
        .iter()
        .map(|n| (n.name, n.chain_id()))
        .collect()
});

static CHAIN_ID_TO_NAME: LazyLock<HashMap<ChainId, &'static str>> = LazyLock::new(|| {
    KNOWN_NETWORKS
        .iter()
        .map(|n| (n.chain_id(), n.name))
        .collect()
});

/// Case-sensitive lookup of a network name.
pub fn chain_id_by_network_name(name: &str) -> Option<&'static ChainId> {
    NAME_TO_CHAIN_ID.get(name)
}

/// Reverse of [`chain_id_by_network_name`].
pub fn network_name_by_chain_id(chain_id: &ChainId) -> Option<&'static str> {
    CHAIN_ID_TO_NAME.get(chain_id).copied()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chain_id_by_network_name() {
        let base = chain_id_by_network_name("base").unwrap();
        assert_eq!(base.namespace, "eip155");
        assert_eq!(base.reference, "8453");

        let base_sepolia = chain_id_by_network_name("base-sepolia").unwrap();
        assert_eq!(base_sepolia.reference, "84532");

        assert!(chain_id_by_network_name("Base").is_none());
        assert!(chain_id_by_network_name("unknown").is_none());
    }

    #[test]
    fn test_network_name_by_chain_id() {
        assert_eq!(
            network_name_by_chain_id(&ChainId::new("eip155", "42220")),
            Some("celo")
        );
        assert!(network_name_by_chain_id(&ChainId::new("eip155", "999999")).is_none());
    }

    #[test]
    fn test_registry_has_unique_entries() {
        assert_eq!(NAME_TO_CHAIN_ID.len(), KNOWN_NETWORKS.len());
        assert_eq!(CHAIN_ID_TO_NAME.len(), KNOWN_NETWORKS.len());
    }
}
