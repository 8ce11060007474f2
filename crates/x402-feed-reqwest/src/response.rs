use http::{HeaderMap, StatusCode};
use serde::de::DeserializeOwned;
use std::borrow::Cow;
use x402_feed_types::proto::PaymentReceipt;

use crate::attempt::AttemptNumber;

/// What the upstream finally answered, verbatim.
///
/// Any status is possible here except a 402 to the paid retry, which surfaces
/// as [`ClientError::PaymentRejected`](crate::ClientError::PaymentRejected).
#[derive(Debug, Clone)]
pub struct UpstreamResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
    /// The attempt that produced this response.
    pub attempt: AttemptNumber,
    /// Settlement receipt, when the paid response carried one.
    pub receipt: Option<PaymentReceipt>,
}

impl UpstreamResponse {
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// Whether this response answered a paid retry.
    pub fn was_paid(&self) -> bool {
        self.attempt == AttemptNumber::Second
    }

    pub fn json<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_slice(&self.body)
    }

    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }
}
