//! Payment challenges and the parser that derives them from 402 responses.
//!
//! [`ChallengeParser::parse`] turns the status, headers and body of a response
//! into a [`PaymentChallenge`], or explains why it cannot. Parsing is pure: it
//! never touches the network or the wallet.

use alloy_primitives::{Address, Bytes, U256, hex};
use http::{HeaderMap, StatusCode};
use serde::Deserialize;
use serde_json::Value;
use serde_json::value::RawValue;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tracing::instrument;

use crate::chain::ChainId;
use crate::proto::{PAYMENT_REQUIRED_HEADER, PaymentRequired, PaymentRequirements, X402Version};
use crate::timestamp::UnixTimestamp;
use crate::util::Base64Bytes;

/// Validity window assumed when a requirement names neither `expiresAt` nor
/// `maxTimeoutSeconds`.
pub const DEFAULT_MAX_TIMEOUT_SECONDS: u64 = 60;

/// Payment schemes this client knows how to pay.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum PaymentScheme {
    /// EIP-3009 `transferWithAuthorization` of an ERC-20 token on an EVM chain.
    ExactEvm,
}

impl PaymentScheme {
    /// Maps a wire scheme name. `network` is `None` when the requirement's
    /// network could not be resolved.
    ///
    /// `"exact-evm"` always maps; plain `"exact"` maps only on `eip155` chains.
    pub fn from_wire(scheme: &str, network: Option<&ChainId>) -> Option<Self> {
        match scheme {
            "exact-evm" => Some(PaymentScheme::ExactEvm),
            "exact" if network.is_some_and(ChainId::is_eip155) => Some(PaymentScheme::ExactEvm),
            _ => None,
        }
    }

    /// Scheme name as written into the payment payload.
    pub fn wire_name(&self) -> &'static str {
        match self {
            PaymentScheme::ExactEvm => "exact",
        }
    }
}

impl fmt::Display for PaymentScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PaymentScheme::ExactEvm => write!(f, "exact-evm"),
        }
    }
}

/// EIP-712 domain hints a server may put into `extra`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Eip712Extra {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
}

/// A validated demand for payment.
///
/// Built once per 402 response and shared behind an `Arc` with the proof that
/// answers it.
#[derive(Debug, Clone, PartialEq)]
pub struct PaymentChallenge {
    pub version: X402Version,
    pub scheme: PaymentScheme,
    pub network: ChainId,
    /// Token contract the payment is made in.
    pub asset: Address,
    /// Minor units of `asset`.
    pub amount: U256,
    pub pay_to: Address,
    pub nonce: Bytes,
    pub expires_at: UnixTimestamp,
    pub max_timeout_seconds: u64,
    pub resource: Option<String>,
    pub description: Option<String>,
    pub extra: Option<Eip712Extra>,
    /// The selected requirement exactly as the server sent it. V2 payloads echo it back.
    pub requirement: Value,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ChallengeError {
    #[error("Malformed payment challenge: {reason}")]
    MalformedChallenge { reason: String },
    #[error("No supported payment scheme offered; offered {offered:?}")]
    UnsupportedScheme { offered: Vec<String> },
}

fn malformed<R: Into<String>>(reason: R) -> ChallengeError {
    ChallengeError::MalformedChallenge {
        reason: reason.into(),
    }
}

/// Supplies the default asset of a network when a requirement omits `asset`.
pub type AssetResolver = Arc<dyn Fn(&ChainId) -> Option<Address> + Send + Sync>;

/// Derives [`PaymentChallenge`]s from 402 responses.
///
/// The parser is chain-agnostic; the default network and, optionally, a
/// per-network default asset are supplied by the caller.
#[derive(Clone)]
pub struct ChallengeParser {
    default_network: ChainId,
    asset_resolver: Option<AssetResolver>,
}

impl fmt::Debug for ChallengeParser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChallengeParser")
            .field("default_network", &self.default_network)
            .field("asset_resolver", &self.asset_resolver.is_some())
            .finish()
    }
}

impl ChallengeParser {
    pub fn new(default_network: ChainId) -> Self {
        Self {
            default_network,
            asset_resolver: None,
        }
    }

    pub fn with_asset_resolver<F>(mut self, resolver: F) -> Self
    where
        F: Fn(&ChainId) -> Option<Address> + Send + Sync + 'static,
    {
        self.asset_resolver = Some(Arc::new(resolver));
        self
    }

    pub fn default_network(&self) -> &ChainId {
        &self.default_network
    }

    pub fn parse(
        &self,
        status: StatusCode,
        headers: &HeaderMap,
        body: &[u8],
    ) -> Result<PaymentChallenge, ChallengeError> {
        self.parse_at(status, headers, body, UnixTimestamp::now())
    }

    /// [`parse`](Self::parse) with an explicit clock, used for the default expiry.
    #[instrument(name = "x402_feed.challenge.parse", skip_all, fields(status = %status))]
    pub fn parse_at(
        &self,
        status: StatusCode,
        headers: &HeaderMap,
        body: &[u8],
        now: UnixTimestamp,
    ) -> Result<PaymentChallenge, ChallengeError> {
        if status != StatusCode::PAYMENT_REQUIRED {
            return Err(malformed(format!("expected status 402, got {status}")));
        }
        let (version, entries) = locate_requirements(headers, body)?;
        if entries.is_empty() {
            return Err(malformed("challenge lists no payment requirements"));
        }

        let mut offered = Vec::with_capacity(entries.len());
        for entry in entries {
            // Only the scheme and network are read before an entry is chosen, so
            // an entry this client cannot pay never fails the whole challenge.
            let requirement: Value = serde_json::from_str(entry.get())
                .map_err(|e| malformed(format!("invalid payment requirement: {e}")))?;
            let scheme_name = requirement
                .get("scheme")
                .and_then(Value::as_str)
                .ok_or_else(|| malformed("missing field `scheme`"))?
                .to_string();
            let network = self.network_of(requirement.get("network"));
            let Some(scheme) = PaymentScheme::from_wire(&scheme_name, network.as_ref().ok()) else {
                offered.push(scheme_name);
                continue;
            };
            let wire: PaymentRequirements = serde_json::from_str(entry.get())
                .map_err(|e| malformed(format!("invalid payment requirement: {e}")))?;
            let challenge = self.build(version, scheme, network?, wire, requirement, now)?;
            tracing::debug!(
                scheme = %challenge.scheme,
                network = %challenge.network,
                amount = %challenge.amount,
                "parsed payment challenge"
            );
            return Ok(challenge);
        }
        Err(ChallengeError::UnsupportedScheme { offered })
    }

    fn network_of(&self, network: Option<&Value>) -> Result<ChainId, ChallengeError> {
        match network {
            None | Some(Value::Null) => Ok(self.default_network.clone()),
            Some(Value::String(network)) => ChainId::resolve(network)
                .map_err(|_| malformed(format!("unknown network `{network}`"))),
            Some(other) => Err(malformed(format!("network {other} is not a string"))),
        }
    }

    fn build(
        &self,
        version: X402Version,
        scheme: PaymentScheme,
        network: ChainId,
        wire: PaymentRequirements,
        requirement: Value,
        now: UnixTimestamp,
    ) -> Result<PaymentChallenge, ChallengeError> {
        if scheme == PaymentScheme::ExactEvm && network.eip155_chain_id().is_none() {
            return Err(malformed(format!(
                "exact-evm challenge on non-EVM network {network}"
            )));
        }
        let amount = wire
            .max_amount_required
            .as_deref()
            .ok_or_else(|| malformed("missing field `maxAmountRequired`"))
            .and_then(parse_amount)?;
        let pay_to = wire
            .pay_to
            .as_deref()
            .ok_or_else(|| malformed("missing field `payTo`"))
            .and_then(|s| parse_address("payTo", s))?;
        let nonce = wire
            .nonce
            .as_deref()
            .ok_or_else(|| malformed("missing field `nonce`"))
            .and_then(parse_nonce)?;
        let asset = match wire.asset.as_deref() {
            Some(asset) => parse_address("asset", asset)?,
            None => self
                .asset_resolver
                .as_ref()
                .and_then(|resolve| resolve(&network))
                .ok_or_else(|| {
                    malformed(format!("missing field `asset` and no default asset on {network}"))
                })?,
        };
        let max_timeout_seconds = wire
            .max_timeout_seconds
            .unwrap_or(DEFAULT_MAX_TIMEOUT_SECONDS);
        let expires_at = match wire.expires_at {
            Some(value) => serde_json::from_value::<UnixTimestamp>(value)
                .map_err(|e| malformed(format!("invalid `expiresAt`: {e}")))?,
            None => now + max_timeout_seconds,
        };
        let extra = wire
            .extra
            .and_then(|extra| serde_json::from_value::<Eip712Extra>(extra).ok());

        Ok(PaymentChallenge {
            version,
            scheme,
            network,
            asset,
            amount,
            pay_to,
            nonce,
            expires_at,
            max_timeout_seconds,
            resource: wire.resource,
            description: wire.description,
            extra,
            requirement,
        })
    }
}

/// Finds the challenge document: the V2 header first, then the V1 body.
///
/// Entries stay raw so amounts keep every digit the server sent.
fn locate_requirements(
    headers: &HeaderMap,
    body: &[u8],
) -> Result<(X402Version, Vec<Box<RawValue>>), ChallengeError> {
    let from_header = headers.get(PAYMENT_REQUIRED_HEADER).and_then(|value| {
        Base64Bytes::from(value.as_bytes())
            .decode_json::<Box<RawValue>>()
            .inspect_err(|e| tracing::debug!(error = %e, "ignoring undecodable Payment-Required header"))
            .ok()
    });
    let (implied_version, document) = match from_header {
        Some(document) => (X402Version::V2, document),
        None => {
            if body.iter().all(u8::is_ascii_whitespace) {
                return Err(malformed("402 response carries no payment challenge"));
            }
            let document = serde_json::from_slice::<Box<RawValue>>(body)
                .map_err(|e| malformed(format!("402 body is not JSON: {e}")))?;
            (X402Version::V1, document)
        }
    };

    if !document.get().trim_start().starts_with('{') {
        return Err(malformed("payment challenge is not a JSON object"));
    }
    let required: PaymentRequired = serde_json::from_str(document.get())
        .map_err(|e| malformed(format!("invalid payment challenge: {e}")))?;
    let version = match required.x402_version {
        None => implied_version,
        Some(v) => X402Version::from_u8(v)
            .ok_or_else(|| malformed(format!("unsupported x402Version {v}")))?,
    };
    let entries = match required.accepts {
        Some(entries) => entries,
        None if required.scheme.is_some() => vec![document],
        None => {
            let reason = match required.error {
                Some(error) => format!("no `accepts` list ({error})"),
                None => "no `accepts` list".to_string(),
            };
            return Err(malformed(reason));
        }
    };
    Ok((version, entries))
}

/// Exact integer amount from a JSON integer or decimal string, read from the
/// raw text so values past `u64::MAX` lose nothing.
fn parse_amount(raw: &RawValue) -> Result<U256, ChallengeError> {
    let text = raw.get().trim();
    let digits = match serde_json::from_str::<Value>(text) {
        Ok(Value::String(s)) => s,
        Ok(Value::Number(_)) => text.to_string(),
        Ok(other) => return Err(malformed(format!("amount {other} is not a number"))),
        Err(e) => return Err(malformed(format!("invalid amount: {e}"))),
    };
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(malformed(format!("amount `{digits}` is not a non-negative integer")));
    }
    U256::from_str_radix(&digits, 10).map_err(|_| malformed(format!("amount `{digits}` overflows")))
}

fn parse_address(field: &str, value: &str) -> Result<Address, ChallengeError> {
    Address::from_str(value)
        .map_err(|_| malformed(format!("`{field}` is not a 20-byte hex address: `{value}`")))
}

/// `0x`-prefixed hex decodes to bytes; anything else is taken verbatim.
fn parse_nonce(value: &str) -> Result<Bytes, ChallengeError> {
    if value.is_empty() {
        return Err(malformed("empty `nonce`"));
    }
    if let Some(digits) = value.strip_prefix("0x") {
        if let Ok(bytes) = hex::decode(digits) {
            if !bytes.is_empty() {
                return Ok(Bytes::from(bytes));
            }
        }
    }
    Ok(Bytes::copy_from_slice(value.as_bytes()))
}
