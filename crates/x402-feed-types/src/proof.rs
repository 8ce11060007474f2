//! Payment proofs and the seam that produces them.

use alloy_primitives::{Address, Bytes};
use async_trait::async_trait;
use http::HeaderName;
use std::sync::Arc;

use crate::challenge::PaymentChallenge;
use crate::timestamp::UnixTimestamp;

/// A signed answer to exactly one [`PaymentChallenge`].
///
/// Never reused: a second challenge needs a second proof.
#[derive(Debug, Clone)]
pub struct PaymentProof {
    pub challenge: Arc<PaymentChallenge>,
    pub signature: Bytes,
    pub signer: Address,
    pub created_at: UnixTimestamp,
    /// Base64 JSON payment payload, ready to be sent as a header value.
    pub header_value: String,
}

impl PaymentProof {
    /// `X-Payment` for V1 challenges, `Payment-Signature` for V2.
    pub fn header_name(&self) -> HeaderName {
        self.challenge.version.payment_header()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ProofError {
    #[error("Payment challenge expired at {expires_at} (now {now})")]
    ChallengeExpired {
        expires_at: UnixTimestamp,
        now: UnixTimestamp,
    },
    #[error("Signing failed: {0}")]
    SigningError(String),
    #[error("Challenge cannot be signed: {0}")]
    Unsignable(String),
    #[error("Failed to encode payment payload: {0}")]
    Encoding(#[from] serde_json::Error),
}

/// Produces a [`PaymentProof`] for a challenge.
///
/// Implemented per payment scheme; the retry client only sees this trait.
#[async_trait]
pub trait PaymentProver: Send + Sync {
    /// Signs `challenge` as of `now`.
    ///
    /// Implementations must fail with [`ProofError::ChallengeExpired`] before
    /// signing anything once `now >= challenge.expires_at`.
    async fn prove(
        &self,
        challenge: Arc<PaymentChallenge>,
        now: UnixTimestamp,
    ) -> Result<PaymentProof, ProofError>;
}

#[async_trait]
impl<T: PaymentProver + ?Sized> PaymentProver for Arc<T> {
    async fn prove(
        &self,
        challenge: Arc<PaymentChallenge>,
        now: UnixTimestamp,
    ) -> Result<PaymentProof, ProofError> {
        (**self).prove(challenge, now).await
    }
}
