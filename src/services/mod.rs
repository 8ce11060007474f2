//! Caller-facing operations over the paid upstream.
//!
//! [`ServiceFacade`] groups the user, channel and feed services. All three
//! share one [`PaymentRetryClient`], built at startup and injected here; there
//! is no global client.

mod channels;
mod error;
mod feeds;
mod users;

pub use channels::*;
pub use error::*;
pub use feeds::*;
pub use users::*;

pub use crate::dispatcher::parse_fid;

use serde::de::DeserializeOwned;
use std::sync::Arc;
use x402_feed_reqwest::{CallOptions, PaymentRetryClient, RequestAttempt};
use x402_feed_types::proof::PaymentProver;

pub struct ServiceFacade<P> {
    pub users: UserService<P>,
    pub channels: ChannelService<P>,
    pub feeds: FeedService<P>,
}

impl<P: PaymentProver> ServiceFacade<P> {
    pub fn new(client: Arc<PaymentRetryClient<P>>) -> Self {
        Self {
            users: UserService::new(client.clone()),
            channels: ChannelService::new(client.clone()),
            feeds: FeedService::new(client),
        }
    }
}

/// Executes `attempt` and decodes a 2xx JSON body into `T`.
async fn fetch_json<P, T>(
    client: &PaymentRetryClient<P>,
    attempt: RequestAttempt,
    options: &CallOptions,
) -> Result<T, ServiceError>
where
    P: PaymentProver,
    T: DeserializeOwned,
{
    let response = client.execute(attempt, options).await?;
    if !response.is_success() {
        let error = ServiceError::upstream(&response);
        tracing::warn!(status = %response.status, message = %error.message, "upstream error");
        return Err(error);
    }
    response.json::<T>().map_err(ServiceError::decode)
}

#[cfg(test)]
pub(crate) mod test_support {
    use alloy_signer_local::PrivateKeySigner;
    use serde_json::{Value, json};
    use std::sync::Arc;
    use wiremock::MockServer;
    use x402_feed_eip155::networks::usdc_address;
    use x402_feed_eip155::{ExactEvmProofBuilder, WalletIdentity};
    use x402_feed_reqwest::PaymentRetryClient;
    use x402_feed_types::chain::ChainId;
    use x402_feed_types::challenge::ChallengeParser;
    use x402_feed_types::timestamp::UnixTimestamp;

    pub type TestProver = ExactEvmProofBuilder<PrivateKeySigner>;

    /// A client paying from a fresh random wallet on Base Sepolia.
    pub fn client(server: &MockServer) -> Arc<PaymentRetryClient<TestProver>> {
        let network = ChainId::eip155(84532);
        let identity = WalletIdentity::new(PrivateKeySigner::random(), network.clone());
        let prover = ExactEvmProofBuilder::new(Arc::new(identity));
        let parser = ChallengeParser::new(network).with_asset_resolver(usdc_address);
        let client = PaymentRetryClient::builder(server.uri().parse().unwrap(), parser, prover)
            .build()
            .unwrap();
        Arc::new(client)
    }

    /// V1 challenge for 0.001 USDC, valid for a minute.
    pub fn challenge() -> Value {
        json!({
            "x402Version": 1,
            "error": "X-PAYMENT header is required",
            "accepts": [{
                "scheme": "exact",
                "network": "base-sepolia",
                "maxAmountRequired": "1000",
                "payTo": "0x209693Bc6afc0C5328bA36FaF03C514EF312287C",
                "nonce": "n1",
                "expiresAt": UnixTimestamp::now().as_secs() + 60,
                "resource": "https://api.neynar.com/v2/farcaster/user"
            }]
        })
    }
}
