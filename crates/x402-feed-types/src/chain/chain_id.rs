//! CAIP-2 chain identifiers.
//!
//! A CAIP-2 chain id is `namespace:reference`, for example `eip155:8453` for
//! Base mainnet. See <https://standards.chainagnostic.org/CAIPs/caip-2>.
//!
//! ```
//! use x402_feed_types::chain::ChainId;
//!
//! let base: ChainId = "eip155:8453".parse().unwrap();
//! assert_eq!(base.namespace(), "eip155");
//! assert_eq!(base.as_network_name(), Some("base"));
//!
//! let same = ChainId::resolve("base").unwrap();
//! assert_eq!(base, same);
//! ```

use serde::{Deserialize, Deserializer, Serialize, Serializer, de};
use std::fmt;
use std::str::FromStr;

use crate::networks;

/// Namespace of EVM chains, whose reference is the decimal EIP-155 chain id.
pub const EIP155_NAMESPACE: &str = "eip155";

/// A CAIP-2 compliant chain identifier.
///
/// Serializes to and from the colon-separated string form, `"eip155:8453"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ChainId {
    /// Chain family, e.g. `eip155`.
    pub namespace: String,
    /// Chain within the family, e.g. `8453`.
    pub reference: String,
}

impl ChainId {
    pub fn new<N: Into<String>, R: Into<String>>(namespace: N, reference: R) -> Self {
        Self {
            namespace: namespace.into(),
            reference: reference.into(),
        }
    }

    /// EVM chain id for a numeric EIP-155 chain id.
    pub fn eip155(chain_id: u64) -> Self {
        Self::new(EIP155_NAMESPACE, chain_id.to_string())
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn reference(&self) -> &str {
        &self.reference
    }

    /// Looks the name up in the registry of [known networks](crate::networks).
    pub fn from_network_name(network_name: &str) -> Option<Self> {
        networks::chain_id_by_network_name(network_name).cloned()
    }

    /// Reverse of [`ChainId::from_network_name`].
    pub fn as_network_name(&self) -> Option<&'static str> {
        networks::network_name_by_chain_id(self)
    }

    /// Resolves either a known network name or a CAIP-2 string.
    ///
    /// Network names win: `"base"` is looked up in the registry, anything with a
    /// colon is parsed as CAIP-2. Anything else is an error.
    pub fn resolve(value: &str) -> Result<Self, ChainIdFormatError> {
        if let Some(chain_id) = Self::from_network_name(value) {
            return Ok(chain_id);
        }
        value.parse()
    }

    /// Whether this is an EVM chain.
    pub fn is_eip155(&self) -> bool {
        self.namespace == EIP155_NAMESPACE
    }

    /// Numeric EIP-155 chain id, when this is an EVM chain with a decimal reference.
    pub fn eip155_chain_id(&self) -> Option<u64> {
        if !self.is_eip155() {
            return None;
        }
        self.reference.parse().ok()
    }

    /// Name used on the wire for x402 V1 payloads: the network name when known,
    /// CAIP-2 otherwise.
    pub fn wire_name(&self) -> String {
        match self.as_network_name() {
            Some(name) => name.to_string(),
            None => self.to_string(),
        }
    }
}

impl fmt::Display for ChainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.namespace, self.reference)
    }
}

impl From<ChainId> for String {
    fn from(value: ChainId) -> Self {
        value.to_string()
    }
}

/// The string is neither a known network name nor `namespace:reference`.
#[derive(Debug, thiserror::Error)]
#[error("Invalid chain id format {0}")]
pub struct ChainIdFormatError(String);

impl FromStr for ChainId {
    type Err = ChainIdFormatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once(':') {
            Some((namespace, reference)) if !namespace.is_empty() && !reference.is_empty() => {
                Ok(ChainId::new(namespace, reference))
            }
            _ => Err(ChainIdFormatError(s.into())),
        }
    }
}

impl Serialize for ChainId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for ChainId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        ChainId::resolve(&s).map_err(de::Error::custom)
    }
}
