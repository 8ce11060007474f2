//! x402 wire format.
//!
//! A server asks for payment by answering `402 Payment Required` with a
//! [`PaymentRequired`] document: in the JSON body for protocol V1, or base64
//! JSON in the `Payment-Required` header for V2. The client pays by retrying
//! with a signed payload in `X-Payment` (V1) or `Payment-Signature` (V2). The
//! server may report settlement in `X-Payment-Response` / `Payment-Response`.
//!
//! Types here mirror the wire loosely: every requirement field is optional so
//! that [`ChallengeParser`](crate::challenge::ChallengeParser) can report
//! exactly which field is missing.

use http::{HeaderMap, HeaderName};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::value::RawValue;
use std::fmt;

use crate::util::{Base64Bytes, Base64JsonError};

/// V2 challenge header.
pub const PAYMENT_REQUIRED_HEADER: HeaderName = HeaderName::from_static("payment-required");
/// V1 payment header.
pub const X_PAYMENT_HEADER: HeaderName = HeaderName::from_static("x-payment");
/// V2 payment header.
pub const PAYMENT_SIGNATURE_HEADER: HeaderName = HeaderName::from_static("payment-signature");
/// V1 settlement receipt header.
pub const X_PAYMENT_RESPONSE_HEADER: HeaderName = HeaderName::from_static("x-payment-response");
/// V2 settlement receipt header.
pub const PAYMENT_RESPONSE_HEADER: HeaderName = HeaderName::from_static("payment-response");

/// x402 protocol version. Serializes as the bare integer.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum X402Version {
    V1,
    V2,
}

impl X402Version {
    pub fn as_u8(&self) -> u8 {
        match self {
            X402Version::V1 => 1,
            X402Version::V2 => 2,
        }
    }

    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            1 => Some(X402Version::V1),
            2 => Some(X402Version::V2),
            _ => None,
        }
    }

    /// Header the paid retry carries its proof in.
    pub fn payment_header(&self) -> HeaderName {
        match self {
            X402Version::V1 => X_PAYMENT_HEADER,
            X402Version::V2 => PAYMENT_SIGNATURE_HEADER,
        }
    }
}

impl fmt::Display for X402Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_u8())
    }
}

impl Serialize for X402Version {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(self.as_u8())
    }
}

impl<'de> Deserialize<'de> for X402Version {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let num = u8::deserialize(deserializer)?;
        X402Version::from_u8(num)
            .ok_or_else(|| serde::de::Error::custom(format!("unsupported x402 version {num}")))
    }
}

/// The 402 challenge document.
///
/// Requirements stay raw until one is chosen. Some V1 servers send a single
/// requirement as the whole document, in which case `accepts` is absent and
/// `scheme` is set.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRequired {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x402_version: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accepts: Option<Vec<Box<RawValue>>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scheme: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// One entry of `accepts`, every field optional.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRequirements {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scheme: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network: Option<String>,
    /// `amount` in V2.
    /// Raw so integers wider than 64 bits survive.
    #[serde(default, alias = "amount", skip_serializing_if = "Option::is_none")]
    pub max_amount_required: Option<Box<RawValue>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pay_to: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub asset: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nonce: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_timeout_seconds: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extra: Option<serde_json::Value>,
}

/// Settlement result reported by the server alongside a paid response.
///
/// Informational: the client does not verify settlement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentReceipt {
    pub success: bool,
    #[serde(default, alias = "error_reason", skip_serializing_if = "Option::is_none")]
    pub error_reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transaction: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payer: Option<String>,
}

impl PaymentReceipt {
    /// Decodes the receipt from `X-Payment-Response`, or `Payment-Response` failing that.
    ///
    /// `Ok(None)` when the response carries neither header.
    pub fn from_headers(headers: &HeaderMap) -> Result<Option<Self>, Base64JsonError> {
        let value = headers
            .get(X_PAYMENT_RESPONSE_HEADER)
            .or_else(|| headers.get(PAYMENT_RESPONSE_HEADER));
        match value {
            Some(value) => Base64Bytes::from(value.as_bytes()).decode_json().map(Some),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::HeaderValue;
    use serde_json::json;

    #[test]
    fn test_version_serializes_as_integer() {
        assert_eq!(serde_json::to_string(&X402Version::V2).unwrap(), "2");
        let v1: X402Version = serde_json::from_str("1").unwrap();
        assert_eq!(v1, X402Version::V1);
        assert!(serde_json::from_str::<X402Version>("3").is_err());
    }

    #[test]
    fn test_payment_header_by_version() {
        assert_eq!(X402Version::V1.payment_header(), "x-payment");
        assert_eq!(X402Version::V2.payment_header(), "payment-signature");
    }

    #[test]
    fn test_requirements_accept_amount_alias() {
        let wire: PaymentRequirements =
            serde_json::from_str(r#"{"scheme": "exact", "amount": "10"}"#).unwrap();
        assert_eq!(wire.max_amount_required.unwrap().get(), r#""10""#);
    }

    #[test]
    fn test_challenge_keeps_requirements_raw() {
        let required: PaymentRequired = serde_json::from_str(
            r#"{"x402Version": 1, "accepts": [{"scheme": "exact", "maxAmountRequired": 18446744073709551616}]}"#,
        )
        .unwrap();
        assert_eq!(required.x402_version, Some(1));
        let accepts = required.accepts.unwrap();
        assert_eq!(accepts.len(), 1);
        assert!(accepts[0].get().contains("18446744073709551616"));
        assert!(required.scheme.is_none());
    }

    #[test]
    fn test_receipt_from_headers() {
        let receipt = json!({
            "success": true,
            "transaction": "0xabc",
            "network": "base",
            "payer": "0x0000000000000000000000000000000000000001"
        });
        let encoded = Base64Bytes::encode_json(&receipt).unwrap();
        let mut headers = HeaderMap::new();
        headers.insert(
            X_PAYMENT_RESPONSE_HEADER,
            HeaderValue::from_str(&encoded.to_string()).unwrap(),
        );
        let decoded = PaymentReceipt::from_headers(&headers).unwrap().unwrap();
        assert!(decoded.success);
        assert_eq!(decoded.transaction.as_deref(), Some("0xabc"));
        assert_eq!(decoded.network.as_deref(), Some("base"));
    }

    #[test]
    fn test_receipt_absent() {
        assert!(PaymentReceipt::from_headers(&HeaderMap::new()).unwrap().is_none());
    }
}
