use reqwest_middleware as rqm;
use x402_feed_types::challenge::ChallengeError;
use x402_feed_types::proof::ProofError;
use x402_feed_types::timestamp::UnixTimestamp;

/// Why a logical request produced no upstream response.
///
/// Every variant is terminal: nothing here is retried.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("Malformed payment challenge: {reason}")]
    MalformedChallenge { reason: String },
    #[error("No supported payment scheme offered; offered {offered:?}")]
    UnsupportedScheme { offered: Vec<String> },
    #[error("Payment challenge expired at {expires_at} (now {now})")]
    ChallengeExpired {
        expires_at: UnixTimestamp,
        now: UnixTimestamp,
    },
    #[error("Failed to sign payment: {reason}")]
    SigningError { reason: String },
    /// The prover returned a payload that cannot travel in an HTTP header.
    #[error("Payment payload cannot be sent as a header: {reason}")]
    InvalidPaymentHeader { reason: String },
    /// The upstream answered the paid retry with another 402.
    #[error("Payment rejected by upstream: {body}")]
    PaymentRejected { body: String },
    #[error("Transport error: {0}")]
    Transport(#[source] rqm::Error),
    #[error("Request cancelled")]
    Cancelled,
    #[error("Request deadline exceeded")]
    DeadlineExceeded,
    #[error("Invalid request URL: {0}")]
    InvalidUrl(#[source] url::ParseError),
    #[error("Failed to build HTTP client: {0}")]
    HttpClient(#[source] reqwest::Error),
}

impl From<ChallengeError> for ClientError {
    fn from(error: ChallengeError) -> Self {
        match error {
            ChallengeError::MalformedChallenge { reason } => ClientError::MalformedChallenge { reason },
            ChallengeError::UnsupportedScheme { offered } => ClientError::UnsupportedScheme { offered },
        }
    }
}

impl From<ProofError> for ClientError {
    fn from(error: ProofError) -> Self {
        match error {
            ProofError::ChallengeExpired { expires_at, now } => {
                ClientError::ChallengeExpired { expires_at, now }
            }
            ProofError::SigningError(reason) | ProofError::Unsignable(reason) => {
                ClientError::SigningError { reason }
            }
            ProofError::Encoding(e) => ClientError::SigningError {
                reason: e.to_string(),
            },
        }
    }
}

impl From<rqm::Error> for ClientError {
    fn from(error: rqm::Error) -> Self {
        ClientError::Transport(error)
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(error: reqwest::Error) -> Self {
        ClientError::Transport(rqm::Error::Reqwest(error))
    }
}
