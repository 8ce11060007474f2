//! Wire types for `exact-evm` payment payloads.

use alloy_primitives::{Address, B256, Bytes, U256};
use alloy_sol_types::sol;
use serde::{Deserialize, Serialize};
use serde_with::{DisplayFromStr, serde_as};
use x402_feed_types::proto::X402Version;
use x402_feed_types::timestamp::UnixTimestamp;

/// Signature plus the authorization it signs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExactEvmPayload {
    pub signature: Bytes,
    pub authorization: ExactEvmAuthorization,
}

/// EIP-3009 authorization: `from` lets `to` pull `value` tokens between
/// `valid_after` and `valid_before`, once per `nonce`.
#[serde_as]
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExactEvmAuthorization {
    pub from: Address,
    pub to: Address,
    /// Decimal string on the wire.
    #[serde_as(as = "DisplayFromStr")]
    pub value: U256,
    pub valid_after: UnixTimestamp,
    pub valid_before: UnixTimestamp,
    pub nonce: B256,
}

impl ExactEvmAuthorization {
    /// The EIP-712 struct the signature covers. Must mirror `self` field for field.
    pub fn as_typed_data(&self) -> TransferWithAuthorization {
        TransferWithAuthorization {
            from: self.from,
            to: self.to,
            value: self.value,
            validAfter: U256::from(self.valid_after.as_secs()),
            validBefore: U256::from(self.valid_before.as_secs()),
            nonce: self.nonce,
        }
    }
}

/// x402 V1 payment payload, sent base64 encoded in `X-Payment`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentPayloadV1<'a> {
    pub x402_version: X402Version,
    pub scheme: &'static str,
    /// Network name when known, CAIP-2 otherwise.
    pub network: String,
    pub payload: &'a ExactEvmPayload,
}

/// x402 V2 payment payload, sent base64 encoded in `Payment-Signature`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentPayloadV2<'a> {
    pub x402_version: X402Version,
    /// The requirement being paid, echoed back verbatim.
    pub accepted: &'a serde_json::Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource: Option<&'a str>,
    pub payload: &'a ExactEvmPayload,
}

sol!(
    /// EIP-712 typed data for ERC-3009 `transferWithAuthorization`.
    struct TransferWithAuthorization {
        address from;
        address to;
        uint256 value;
        uint256 validAfter;
        uint256 validBefore;
        bytes32 nonce;
    }
);
