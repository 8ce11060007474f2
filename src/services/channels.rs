use std::sync::Arc;
use tracing::instrument;
use x402_feed_reqwest::{CallOptions, PaymentRetryClient, RequestAttempt};
use x402_feed_types::proof::PaymentProver;

use super::{ServiceError, fetch_json};
use crate::model::{Channel, ChannelsResponse};

pub const USER_CHANNELS_PATH: &str = "/farcaster/user/channels";

pub struct ChannelService<P> {
    client: Arc<PaymentRetryClient<P>>,
}

impl<P: PaymentProver> ChannelService<P> {
    pub fn new(client: Arc<PaymentRetryClient<P>>) -> Self {
        Self { client }
    }

    /// Channels the user is active in.
    #[instrument(name = "x402_feed.channels.list_for_fid", skip(self, options))]
    pub async fn list_for_fid(
        &self,
        fid: u64,
        options: &CallOptions,
    ) -> Result<Vec<Channel>, ServiceError> {
        let attempt = RequestAttempt::get(USER_CHANNELS_PATH).with_query("fid", fid);
        let response: ChannelsResponse = fetch_json(&self.client, attempt, options).await?;
        tracing::debug!(count = response.channels.len(), "channels fetched");
        Ok(response.channels)
    }
}
