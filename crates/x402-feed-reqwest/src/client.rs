//! The payment-gated request protocol.
//!
//! [`PaymentRetryClient::execute`] sends a request; if the upstream answers
//! `402 Payment Required`, it parses the challenge, has the
//! [`PaymentProver`] sign it, and resends the same request once with the proof
//! attached. A logical request never makes more than two network attempts.

use http::{HeaderMap, HeaderName, HeaderValue, StatusCode, header};
use reqwest_middleware as rqm;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::instrument;
use url::Url;
use x402_feed_types::challenge::ChallengeParser;
use x402_feed_types::proof::{PaymentProof, PaymentProver};
use x402_feed_types::proto::PaymentReceipt;
use x402_feed_types::timestamp::UnixTimestamp;

use crate::attempt::{AttemptNumber, RequestAttempt};
use crate::error::ClientError;
use crate::observer::{ProtocolEvent, ProtocolObserver, ProtocolState, TracingObserver};
use crate::response::UpstreamResponse;

/// Per-request timeout applied by the underlying `reqwest` client.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Per-call limits. Either one aborts the network attempt or signing step in
/// flight; a half-built proof is dropped.
#[derive(Debug, Clone, Default)]
pub struct CallOptions {
    pub deadline: Option<Instant>,
    pub cancellation: CancellationToken,
}

impl CallOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    pub fn with_cancellation(mut self, cancellation: CancellationToken) -> Self {
        self.cancellation = cancellation;
        self
    }
}

/// Sends requests to one upstream and pays its 402 challenges.
///
/// `Send + Sync`; share one instance behind an `Arc` across concurrent calls.
pub struct PaymentRetryClient<P> {
    http: rqm::ClientWithMiddleware,
    base_url: Url,
    default_headers: HeaderMap,
    parser: ChallengeParser,
    prover: P,
    observer: Arc<dyn ProtocolObserver>,
}

impl<P> fmt::Debug for PaymentRetryClient<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PaymentRetryClient")
            .field("base_url", &self.base_url.as_str())
            .field("parser", &self.parser)
            .finish_non_exhaustive()
    }
}

struct Received {
    status: StatusCode,
    headers: HeaderMap,
    body: Vec<u8>,
}

impl Received {
    fn into_response(
        self,
        attempt: AttemptNumber,
        receipt: Option<PaymentReceipt>,
    ) -> UpstreamResponse {
        UpstreamResponse {
            status: self.status,
            headers: self.headers,
            body: self.body,
            attempt,
            receipt,
        }
    }

    fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

impl<P: PaymentProver> PaymentRetryClient<P> {
    pub fn builder(
        base_url: Url,
        parser: ChallengeParser,
        prover: P,
    ) -> PaymentRetryClientBuilder<P> {
        PaymentRetryClientBuilder::new(base_url, parser, prover)
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Runs one logical request: at most one original and one paid attempt.
    ///
    /// Non-402 responses to the first attempt are returned as they are, any
    /// status included. A 402 to the paid retry is [`ClientError::PaymentRejected`].
    #[instrument(
        name = "x402_feed.execute",
        skip_all,
        fields(
            method = %attempt.method(),
            path = %attempt.path(),
            correlation_id = %attempt.correlation_id(),
        )
    )]
    pub async fn execute(
        &self,
        attempt: RequestAttempt,
        options: &CallOptions,
    ) -> Result<UpstreamResponse, ClientError> {
        self.observe(&attempt, ProtocolState::Idle);
        let url = self
            .url_for(attempt.path())
            .map_err(|e| self.fail(&attempt, e))?;

        let first = guard(options, self.send(&attempt, &url, None))
            .await
            .map_err(|e| self.fail(&attempt, e))?;
        self.observe(&attempt, ProtocolState::Sent { status: first.status.as_u16() });
        if first.status != StatusCode::PAYMENT_REQUIRED {
            self.observe(&attempt, ProtocolState::Success { status: first.status.as_u16() });
            return Ok(first.into_response(attempt.attempt(), None));
        }

        self.observe(&attempt, ProtocolState::ChallengeReceived);
        let Some(retry) = attempt.retry() else {
            let body = first.body_text();
            return Err(self.fail(&attempt, ClientError::PaymentRejected { body }));
        };
        let challenge = self
            .parser
            .parse(first.status, &first.headers, &first.body)
            .map_err(|e| self.fail(&attempt, e.into()))?;
        let challenge = Arc::new(challenge);
        tracing::info!(
            amount = %challenge.amount,
            asset = %challenge.asset,
            network = %challenge.network,
            "payment required"
        );

        self.observe(&attempt, ProtocolState::Proving);
        let proof = guard(options, async {
            self.prover
                .prove(challenge, UnixTimestamp::now())
                .await
                .map_err(ClientError::from)
        })
        .await
        .map_err(|e| self.fail(&attempt, e))?;

        self.observe(&retry, ProtocolState::Submitting);
        let second = guard(options, self.send(&retry, &url, Some(&proof)))
            .await
            .map_err(|e| self.fail(&retry, e))?;
        self.observe(&retry, ProtocolState::Retried { status: second.status.as_u16() });
        if second.status == StatusCode::PAYMENT_REQUIRED {
            let body = second.body_text();
            return Err(self.fail(&retry, ClientError::PaymentRejected { body }));
        }

        let receipt = match PaymentReceipt::from_headers(&second.headers) {
            Ok(receipt) => receipt,
            Err(e) => {
                tracing::debug!(error = %e, "ignoring undecodable payment receipt");
                None
            }
        };
        if let Some(receipt) = &receipt {
            tracing::info!(
                success = receipt.success,
                transaction = receipt.transaction.as_deref().unwrap_or_default(),
                "payment settled"
            );
        }
        self.observe(&retry, ProtocolState::Success { status: second.status.as_u16() });
        Ok(second.into_response(retry.attempt(), receipt))
    }

    async fn send(
        &self,
        attempt: &RequestAttempt,
        url: &Url,
        proof: Option<&PaymentProof>,
    ) -> Result<Received, ClientError> {
        let mut request = self
            .http
            .request(attempt.method().clone(), url.clone())
            .headers(self.default_headers.clone())
            .query(attempt.query());
        if let Some(proof) = proof {
            let value = HeaderValue::from_str(&proof.header_value).map_err(|e| {
                ClientError::InvalidPaymentHeader {
                    reason: e.to_string(),
                }
            })?;
            request = request.header(proof.header_name(), value);
        }
        let response = request.send().await?;
        let status = response.status();
        let headers = response.headers().clone();
        let body = response.bytes().await?.to_vec();
        Ok(Received {
            status,
            headers,
            body,
        })
    }

    fn url_for(&self, path: &str) -> Result<Url, ClientError> {
        self.base_url
            .join(path.trim_start_matches('/'))
            .map_err(ClientError::InvalidUrl)
    }

    fn observe(&self, attempt: &RequestAttempt, state: ProtocolState) {
        let event = ProtocolEvent {
            correlation_id: attempt.correlation_id(),
            attempt: attempt.attempt(),
            path: attempt.path().to_string(),
            state,
        };
        if let Err(e) = self.observer.observe(&event) {
            tracing::debug!(error = %e, state = %event.state, "protocol observer failed");
        }
    }

    fn fail(&self, attempt: &RequestAttempt, error: ClientError) -> ClientError {
        self.observe(
            attempt,
            ProtocolState::Failed {
                reason: error.to_string(),
            },
        );
        error
    }
}

/// Runs `work` unless the call is cancelled or past its deadline first.
async fn guard<T, F>(options: &CallOptions, work: F) -> Result<T, ClientError>
where
    F: Future<Output = Result<T, ClientError>>,
{
    if options.cancellation.is_cancelled() {
        return Err(ClientError::Cancelled);
    }
    let deadline = options.deadline;
    if deadline.is_some_and(|d| d <= Instant::now()) {
        return Err(ClientError::DeadlineExceeded);
    }
    let expiry = async move {
        match deadline {
            Some(deadline) => tokio::time::sleep_until(deadline).await,
            None => std::future::pending::<()>().await,
        }
    };
    tokio::select! {
        biased;
        _ = options.cancellation.cancelled() => Err(ClientError::Cancelled),
        _ = expiry => Err(ClientError::DeadlineExceeded),
        result = work => result,
    }
}

pub struct PaymentRetryClientBuilder<P> {
    base_url: Url,
    parser: ChallengeParser,
    prover: P,
    timeout: Duration,
    default_headers: HeaderMap,
    observer: Arc<dyn ProtocolObserver>,
    http: Option<rqm::ClientWithMiddleware>,
}

impl<P> PaymentRetryClientBuilder<P> {
    fn new(base_url: Url, parser: ChallengeParser, prover: P) -> Self {
        let mut default_headers = HeaderMap::new();
        default_headers.insert(header::ACCEPT, HeaderValue::from_static("application/json"));
        Self {
            base_url,
            parser,
            prover,
            timeout: DEFAULT_TIMEOUT,
            default_headers,
            observer: Arc::new(TracingObserver),
            http: None,
        }
    }

    /// Per-attempt timeout. Ignored when an HTTP client is supplied.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Header sent with every attempt, e.g. `x-api-key`.
    pub fn default_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.default_headers.insert(name, value);
        self
    }

    pub fn observer<O: ProtocolObserver + 'static>(mut self, observer: O) -> Self {
        self.observer = Arc::new(observer);
        self
    }

    /// Uses `http` instead of a fresh client, so callers can stack their own
    /// middleware beneath the payment protocol.
    pub fn http_client(mut self, http: rqm::ClientWithMiddleware) -> Self {
        self.http = Some(http);
        self
    }

    pub fn build(self) -> Result<PaymentRetryClient<P>, ClientError> {
        let http = match self.http {
            Some(http) => http,
            None => {
                let client = reqwest::Client::builder()
                    .timeout(self.timeout)
                    .build()
                    .map_err(ClientError::HttpClient)?;
                rqm::ClientBuilder::new(client).build()
            }
        };
        let mut base_url = self.base_url;
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        Ok(PaymentRetryClient {
            http,
            base_url,
            default_headers: self.default_headers,
            parser: self.parser,
            prover: self.prover,
            observer: self.observer,
        })
    }
}
