//! Proof building for `exact-evm` challenges.
//!
//! A challenge becomes an EIP-3009 `TransferWithAuthorization` signed under the
//! token's EIP-712 domain:
//!
//! | authorization | taken from |
//! |---|---|
//! | `from` | the wallet |
//! | `to`, `value` | `payTo`, `amount` |
//! | `validAfter` | `0` |
//! | `validBefore` | the challenge's `expires_at` |
//! | `nonce` | `keccak256(challenge nonce)` |
//!
//! Every input is taken from the challenge or the wallet, so building twice
//! yields byte-identical proofs.

use alloy_primitives::keccak256;
use alloy_sol_types::{Eip712Domain, SolStruct, eip712_domain};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::instrument;
use x402_feed_types::challenge::PaymentChallenge;
use x402_feed_types::proof::{PaymentProof, PaymentProver, ProofError};
use x402_feed_types::proto::X402Version;
use x402_feed_types::timestamp::UnixTimestamp;
use x402_feed_types::util::Base64Bytes;

use crate::networks::usdc_deployment_at;
use crate::signer::{WalletIdentity, WalletSigner};
use crate::types::{ExactEvmAuthorization, ExactEvmPayload, PaymentPayloadV1, PaymentPayloadV2};

/// Signs `exact-evm` challenges with one wallet.
pub struct ExactEvmProofBuilder<S> {
    identity: Arc<WalletIdentity<S>>,
}

impl<S> Clone for ExactEvmProofBuilder<S> {
    fn clone(&self) -> Self {
        Self {
            identity: self.identity.clone(),
        }
    }
}

impl<S> std::fmt::Debug for ExactEvmProofBuilder<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExactEvmProofBuilder")
            .field("identity", &self.identity)
            .finish()
    }
}

impl<S: WalletSigner> ExactEvmProofBuilder<S> {
    pub fn new(identity: Arc<WalletIdentity<S>>) -> Self {
        Self { identity }
    }

    pub fn identity(&self) -> &WalletIdentity<S> {
        &self.identity
    }

    #[instrument(
        name = "x402_feed.proof.build",
        skip_all,
        fields(network = %challenge.network, payer = %self.identity.address())
    )]
    pub async fn build(
        &self,
        challenge: Arc<PaymentChallenge>,
        now: UnixTimestamp,
    ) -> Result<PaymentProof, ProofError> {
        if challenge.expires_at.has_passed(now) {
            return Err(ProofError::ChallengeExpired {
                expires_at: challenge.expires_at,
                now,
            });
        }
        if &challenge.network != self.identity.network() {
            tracing::debug!(
                wallet_network = %self.identity.network(),
                "signing for a network other than the wallet's configured one"
            );
        }

        let domain = eip712_domain_for(&challenge)?;
        let authorization = ExactEvmAuthorization {
            from: self.identity.address(),
            to: challenge.pay_to,
            value: challenge.amount,
            valid_after: UnixTimestamp::from_secs(0),
            valid_before: challenge.expires_at,
            nonce: keccak256(&challenge.nonce),
        };
        let digest = authorization.as_typed_data().eip712_signing_hash(&domain);
        let signature = self
            .identity
            .signer()
            .sign_hash(&digest)
            .await
            .map_err(|e| ProofError::SigningError(e.to_string()))?;

        let payload = ExactEvmPayload {
            signature: signature.as_bytes().into(),
            authorization,
        };
        let header_value = match challenge.version {
            X402Version::V1 => Base64Bytes::encode_json(&PaymentPayloadV1 {
                x402_version: X402Version::V1,
                scheme: challenge.scheme.wire_name(),
                network: challenge.network.wire_name(),
                payload: &payload,
            })?,
            X402Version::V2 => Base64Bytes::encode_json(&PaymentPayloadV2 {
                x402_version: X402Version::V2,
                accepted: &challenge.requirement,
                resource: challenge.resource.as_deref(),
                payload: &payload,
            })?,
        };
        tracing::debug!(amount = %challenge.amount, pay_to = %challenge.pay_to, "signed payment");

        Ok(PaymentProof {
            signature: payload.signature,
            signer: self.identity.address(),
            created_at: now,
            header_value: header_value.to_string(),
            challenge,
        })
    }
}

/// EIP-712 domain of the challenge's token.
///
/// Name and version come from the challenge's `extra`, then from the known USDC
/// deployment at `asset`, then default to empty strings.
pub fn eip712_domain_for(challenge: &PaymentChallenge) -> Result<Eip712Domain, ProofError> {
    let chain_id = challenge.network.eip155_chain_id().ok_or_else(|| {
        ProofError::Unsignable(format!("{} is not an EVM network", challenge.network))
    })?;
    let deployment = usdc_deployment_at(&challenge.network, challenge.asset);
    let extra = challenge.extra.as_ref();
    let name = extra
        .and_then(|e| e.name.clone())
        .or_else(|| deployment.map(|d| d.eip712_name.to_string()))
        .unwrap_or_default();
    let version = extra
        .and_then(|e| e.version.clone())
        .or_else(|| deployment.map(|d| d.eip712_version.to_string()))
        .unwrap_or_default();
    Ok(eip712_domain! {
        name: name,
        version: version,
        chain_id: chain_id,
        verifying_contract: challenge.asset,
    })
}

#[async_trait]
impl<S: WalletSigner> PaymentProver for ExactEvmProofBuilder<S> {
    async fn prove(
        &self,
        challenge: Arc<PaymentChallenge>,
        now: UnixTimestamp,
    ) -> Result<PaymentProof, ProofError> {
        self.build(challenge, now).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::{Address, B256, Bytes, Signature, U256, address};
    use alloy_signer_local::PrivateKeySigner;
    use serde_json::{Value, json};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use x402_feed_types::chain::ChainId;
    use x402_feed_types::challenge::{Eip712Extra, PaymentScheme};

    const USDC_BASE: Address = address!("0x833589fCD6eDb6E08f4c7C32D4f71b54bdA02913");
    const PAY_TO: Address = address!("0x209693Bc6afc0C5328bA36FaF03C514EF312287C");
    const NOW: u64 = 1_700_000_000;

    /// Counts sign calls; fails them all when `fail` is set.
    struct CountingSigner {
        inner: PrivateKeySigner,
        calls: AtomicUsize,
        fail: bool,
    }

    impl CountingSigner {
        fn new(fail: bool) -> Self {
            Self {
                inner: PrivateKeySigner::random(),
                calls: AtomicUsize::new(0),
                fail,
            }
        }
    }

    #[async_trait]
    impl WalletSigner for CountingSigner {
        fn address(&self) -> Address {
            self.inner.address()
        }

        async fn sign_hash(&self, hash: &B256) -> Result<Signature, alloy_signer::Error> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(alloy_signer::Error::other("device unplugged"));
            }
            WalletSigner::sign_hash(&self.inner, hash).await
        }
    }

    fn builder(fail: bool) -> (ExactEvmProofBuilder<Arc<CountingSigner>>, Arc<CountingSigner>) {
        let signer = Arc::new(CountingSigner::new(fail));
        let identity = WalletIdentity::new(signer.clone(), ChainId::eip155(8453));
        (ExactEvmProofBuilder::new(Arc::new(identity)), signer)
    }

    fn challenge(version: X402Version) -> PaymentChallenge {
        PaymentChallenge {
            version,
            scheme: PaymentScheme::ExactEvm,
            network: ChainId::eip155(8453),
            asset: USDC_BASE,
            amount: U256::from(1000u64),
            pay_to: PAY_TO,
            nonce: Bytes::from_static(b"n1"),
            expires_at: UnixTimestamp::from_secs(NOW + 60),
            max_timeout_seconds: 60,
            resource: Some("https://api.neynar.com/v2/farcaster/user?fid=3".into()),
            description: None,
            extra: None,
            requirement: json!({"scheme": "exact", "network": "eip155:8453", "amount": "1000"}),
        }
    }

    fn decode_header(proof: &PaymentProof) -> Value {
        Base64Bytes::from(proof.header_value.as_bytes())
            .decode_json()
            .unwrap()
    }

    #[tokio::test]
    async fn test_proof_references_challenge_nonce() {
        let (builder, signer) = builder(false);
        let challenge = Arc::new(challenge(X402Version::V1));
        let proof = builder
            .build(challenge.clone(), UnixTimestamp::from_secs(NOW))
            .await
            .unwrap();

        assert_eq!(proof.challenge.nonce, Bytes::from_static(b"n1"));
        assert!(Arc::ptr_eq(&proof.challenge, &challenge));
        assert_eq!(proof.signer, signer.address());
        assert_eq!(proof.header_name(), "x-payment");
        assert_eq!(signer.calls.load(Ordering::SeqCst), 1);

        let header = decode_header(&proof);
        assert_eq!(header["x402Version"], json!(1));
        assert_eq!(header["scheme"], json!("exact"));
        assert_eq!(header["network"], json!("base"));
        let authorization = &header["payload"]["authorization"];
        assert_eq!(authorization["value"], json!("1000"));
        assert_eq!(authorization["validAfter"], json!("0"));
        assert_eq!(authorization["validBefore"], json!((NOW + 60).to_string()));
        let nonce: B256 = serde_json::from_value(authorization["nonce"].clone()).unwrap();
        assert_eq!(nonce, keccak256(b"n1"));
    }

    #[tokio::test]
    async fn test_signature_recovers_to_wallet() {
        let (builder, signer) = builder(false);
        let challenge = Arc::new(challenge(X402Version::V1));
        let proof = builder
            .build(challenge.clone(), UnixTimestamp::from_secs(NOW))
            .await
            .unwrap();

        let payload: ExactEvmPayload =
            serde_json::from_value(decode_header(&proof)["payload"].clone()).unwrap();
        let domain = eip712_domain_for(&challenge).unwrap();
        let digest = payload.authorization.as_typed_data().eip712_signing_hash(&domain);
        let signature = Signature::try_from(payload.signature.as_ref()).unwrap();
        assert_eq!(
            signature.recover_address_from_prehash(&digest).unwrap(),
            signer.address()
        );
    }

    #[tokio::test]
    async fn test_expired_challenge_is_never_signed() {
        let (builder, signer) = builder(false);
        for now in [NOW + 60, NOW + 3600] {
            let result = builder
                .build(Arc::new(challenge(X402Version::V1)), UnixTimestamp::from_secs(now))
                .await;
            assert!(matches!(result, Err(ProofError::ChallengeExpired { .. })));
        }
        assert_eq!(signer.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_signer_failure_is_signing_error() {
        let (builder, signer) = builder(true);
        let result = builder
            .build(Arc::new(challenge(X402Version::V1)), UnixTimestamp::from_secs(NOW))
            .await;
        match result {
            Err(ProofError::SigningError(reason)) => assert!(reason.contains("device unplugged")),
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(signer.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_building_is_deterministic() {
        let (builder, _) = builder(false);
        let challenge = Arc::new(challenge(X402Version::V1));
        let now = UnixTimestamp::from_secs(NOW);
        let first = builder.build(challenge.clone(), now).await.unwrap();
        let second = builder.build(challenge, now).await.unwrap();
        assert_eq!(first.header_value, second.header_value);
        assert_eq!(first.signature, second.signature);
    }

    #[tokio::test]
    async fn test_distinct_nonces_give_distinct_authorizations() {
        let (builder, _) = builder(false);
        let now = UnixTimestamp::from_secs(NOW);
        let first = builder.build(Arc::new(challenge(X402Version::V1)), now).await.unwrap();
        let mut other = challenge(X402Version::V1);
        other.nonce = Bytes::from_static(b"n2");
        let second = builder.build(Arc::new(other), now).await.unwrap();
        assert_ne!(
            decode_header(&first)["payload"]["authorization"]["nonce"],
            decode_header(&second)["payload"]["authorization"]["nonce"]
        );
    }

    #[tokio::test]
    async fn test_v2_payload_echoes_requirement() {
        let (builder, _) = builder(false);
        let challenge = Arc::new(challenge(X402Version::V2));
        let proof = builder
            .build(challenge.clone(), UnixTimestamp::from_secs(NOW))
            .await
            .unwrap();
        assert_eq!(proof.header_name(), "payment-signature");
        let header = decode_header(&proof);
        assert_eq!(header["x402Version"], json!(2));
        assert_eq!(header["accepted"], challenge.requirement);
        assert!(header["payload"]["signature"].is_string());
    }

    #[test]
    fn test_domain_prefers_extra_then_deployment() {
        let mut c = challenge(X402Version::V1);
        let domain = eip712_domain_for(&c).unwrap();
        assert_eq!(domain.name.as_deref(), Some("USD Coin"));
        assert_eq!(domain.version.as_deref(), Some("2"));
        assert_eq!(domain.chain_id, Some(U256::from(8453u64)));
        assert_eq!(domain.verifying_contract, Some(USDC_BASE));

        c.extra = Some(Eip712Extra {
            name: Some("Custom".into()),
            version: None,
        });
        let domain = eip712_domain_for(&c).unwrap();
        assert_eq!(domain.name.as_deref(), Some("Custom"));
        assert_eq!(domain.version.as_deref(), Some("2"));

        c.extra = None;
        c.asset = Address::repeat_byte(0x42);
        let domain = eip712_domain_for(&c).unwrap();
        assert_eq!(domain.name.as_deref(), Some(""));
        assert_eq!(domain.version.as_deref(), Some(""));
    }
}
