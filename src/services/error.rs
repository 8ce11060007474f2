use serde::Serialize;
use std::fmt;
use x402_feed_reqwest::{ClientError, UpstreamResponse};

use crate::dispatcher::DispatchError;

/// Error category reported to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    MissingRequiredField,
    UnsupportedFeedKind,
    InvalidParameter,
    MalformedChallenge,
    UnsupportedScheme,
    ChallengeExpired,
    SigningError,
    PaymentRejected,
    Transport,
    Cancelled,
    DeadlineExceeded,
    /// The upstream answered with a non-2xx status other than 402.
    UpstreamError,
    /// A 2xx payload did not have the expected shape.
    Decode,
    /// The client could not be built or addressed.
    Internal,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::MissingRequiredField => "missing_required_field",
            ErrorKind::UnsupportedFeedKind => "unsupported_feed_kind",
            ErrorKind::InvalidParameter => "invalid_parameter",
            ErrorKind::MalformedChallenge => "malformed_challenge",
            ErrorKind::UnsupportedScheme => "unsupported_scheme",
            ErrorKind::ChallengeExpired => "challenge_expired",
            ErrorKind::SigningError => "signing_error",
            ErrorKind::PaymentRejected => "payment_rejected",
            ErrorKind::Transport => "transport",
            ErrorKind::Cancelled => "cancelled",
            ErrorKind::DeadlineExceeded => "deadline_exceeded",
            ErrorKind::UpstreamError => "upstream_error",
            ErrorKind::Decode => "decode",
            ErrorKind::Internal => "internal",
        }
    }

    /// The caller sent something unusable. Everything else is on our side or
    /// the upstream's.
    pub fn is_bad_input(&self) -> bool {
        matches!(
            self,
            ErrorKind::MissingRequiredField
                | ErrorKind::UnsupportedFeedKind
                | ErrorKind::InvalidParameter
        )
    }

    /// Suggested HTTP status for surfacing this error.
    pub fn http_status(&self) -> http::StatusCode {
        use http::StatusCode;
        match self {
            kind if kind.is_bad_input() => StatusCode::BAD_REQUEST,
            ErrorKind::PaymentRejected => StatusCode::PAYMENT_REQUIRED,
            ErrorKind::MalformedChallenge
            | ErrorKind::UnsupportedScheme
            | ErrorKind::Transport
            | ErrorKind::UpstreamError
            | ErrorKind::Decode => StatusCode::BAD_GATEWAY,
            ErrorKind::DeadlineExceeded => StatusCode::GATEWAY_TIMEOUT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A failed service operation, serialized as `{"kind": ..., "message": ...}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct ServiceError {
    pub kind: ErrorKind,
    pub message: String,
    /// Upstream status for [`ErrorKind::UpstreamError`].
    #[serde(skip_serializing_if = "Option::is_none")]
    pub upstream_status: Option<u16>,
}

impl ServiceError {
    pub fn new<S: Into<String>>(kind: ErrorKind, message: S) -> Self {
        Self {
            kind,
            message: message.into(),
            upstream_status: None,
        }
    }

    pub fn is_bad_input(&self) -> bool {
        self.kind.is_bad_input()
    }

    pub fn http_status(&self) -> http::StatusCode {
        self.kind.http_status()
    }

    /// A non-2xx upstream answer. Uses the upstream's `message` field when it
    /// sent one.
    pub fn upstream(response: &UpstreamResponse) -> Self {
        #[derive(serde::Deserialize)]
        struct UpstreamMessage {
            message: String,
        }
        let status = response.status;
        let message = match response.json::<UpstreamMessage>() {
            Ok(body) => body.message,
            Err(_) => format!("upstream responded with {status}"),
        };
        Self {
            kind: ErrorKind::UpstreamError,
            message,
            upstream_status: Some(status.as_u16()),
        }
    }

    pub fn decode(error: serde_json::Error) -> Self {
        Self::new(
            ErrorKind::Decode,
            format!("unexpected upstream payload: {error}"),
        )
    }
}

impl From<DispatchError> for ServiceError {
    fn from(error: DispatchError) -> Self {
        let kind = match &error {
            DispatchError::MissingRequiredField { .. } => ErrorKind::MissingRequiredField,
            DispatchError::UnsupportedFeedKind { .. } => ErrorKind::UnsupportedFeedKind,
            DispatchError::InvalidParameter { .. } => ErrorKind::InvalidParameter,
        };
        Self::new(kind, error.to_string())
    }
}

impl From<ClientError> for ServiceError {
    fn from(error: ClientError) -> Self {
        let kind = match &error {
            ClientError::MalformedChallenge { .. } => ErrorKind::MalformedChallenge,
            ClientError::UnsupportedScheme { .. } => ErrorKind::UnsupportedScheme,
            ClientError::ChallengeExpired { .. } => ErrorKind::ChallengeExpired,
            ClientError::SigningError { .. } => ErrorKind::SigningError,
            ClientError::PaymentRejected { .. } => ErrorKind::PaymentRejected,
            ClientError::Transport(_) => ErrorKind::Transport,
            ClientError::Cancelled => ErrorKind::Cancelled,
            ClientError::DeadlineExceeded => ErrorKind::DeadlineExceeded,
            ClientError::InvalidPaymentHeader { .. }
            | ClientError::InvalidUrl(_)
            | ClientError::HttpClient(_) => ErrorKind::Internal,
        };
        Self::new(kind, error.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::{HeaderMap, StatusCode};
    use serde_json::json;
    use x402_feed_reqwest::AttemptNumber;

    fn response(status: u16, body: &str) -> UpstreamResponse {
        UpstreamResponse {
            status: StatusCode::from_u16(status).unwrap(),
            headers: HeaderMap::new(),
            body: body.as_bytes().to_vec(),
            attempt: AttemptNumber::Second,
            receipt: None,
        }
    }

    #[test]
    fn test_bad_input_kinds() {
        let bad: Vec<_> = [
            ErrorKind::MissingRequiredField,
            ErrorKind::UnsupportedFeedKind,
            ErrorKind::InvalidParameter,
        ]
        .into_iter()
        .map(|k| (k.is_bad_input(), k.http_status()))
        .collect();
        assert!(bad.iter().all(|(b, s)| *b && *s == StatusCode::BAD_REQUEST));
        assert!(!ErrorKind::Transport.is_bad_input());
        assert!(!ErrorKind::PaymentRejected.is_bad_input());
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(ErrorKind::PaymentRejected.http_status(), StatusCode::PAYMENT_REQUIRED);
        assert_eq!(ErrorKind::UpstreamError.http_status(), StatusCode::BAD_GATEWAY);
        assert_eq!(ErrorKind::DeadlineExceeded.http_status(), StatusCode::GATEWAY_TIMEOUT);
        assert_eq!(ErrorKind::SigningError.http_status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_upstream_message_is_used() {
        let error = ServiceError::upstream(&response(404, r#"{"message":"User not found"}"#));
        assert_eq!(error.kind, ErrorKind::UpstreamError);
        assert_eq!(error.message, "User not found");
        assert_eq!(error.upstream_status, Some(404));

        let error = ServiceError::upstream(&response(500, "oops"));
        assert_eq!(error.message, "upstream responded with 500 Internal Server Error");
    }

    #[test]
    fn test_serializes_kind_and_message() {
        let error: ServiceError = DispatchError::MissingRequiredField { field: "fid" }.into();
        assert_eq!(
            serde_json::to_value(&error).unwrap(),
            json!({"kind": "missing_required_field", "message": "fid is required for this feed"})
        );
    }

    #[test]
    fn test_client_errors_keep_their_kind() {
        let error: ServiceError = ClientError::PaymentRejected {
            body: "nope".into(),
        }
        .into();
        assert_eq!(error.kind, ErrorKind::PaymentRejected);
        assert!(error.message.contains("nope"));
        let error: ServiceError = ClientError::Cancelled.into();
        assert_eq!(error.kind, ErrorKind::Cancelled);
        let error: ServiceError = ClientError::InvalidPaymentHeader {
            reason: "invalid HTTP header value".into(),
        }
        .into();
        assert_eq!(error.kind, ErrorKind::Internal);
    }
}
