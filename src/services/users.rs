use std::sync::Arc;
use tracing::instrument;
use x402_feed_reqwest::{CallOptions, PaymentRetryClient, RequestAttempt};
use x402_feed_types::proof::PaymentProver;

use super::{ErrorKind, ServiceError, fetch_json};
use crate::model::{User, UserResponse};

pub const USER_BY_USERNAME_PATH: &str = "/farcaster/user/by_username";
pub const USER_BY_FID_PATH: &str = "/farcaster/user";

pub struct UserService<P> {
    client: Arc<PaymentRetryClient<P>>,
}

impl<P: PaymentProver> UserService<P> {
    pub fn new(client: Arc<PaymentRetryClient<P>>) -> Self {
        Self { client }
    }

    #[instrument(name = "x402_feed.users.lookup_by_username", skip(self, options))]
    pub async fn lookup_by_username(
        &self,
        username: &str,
        options: &CallOptions,
    ) -> Result<User, ServiceError> {
        let username = username.trim();
        if username.is_empty() {
            return Err(ServiceError::new(
                ErrorKind::MissingRequiredField,
                "username is required",
            ));
        }
        let attempt = RequestAttempt::get(USER_BY_USERNAME_PATH).with_query("username", username);
        let response: UserResponse = fetch_json(&self.client, attempt, options).await?;
        Ok(response.user)
    }

    #[instrument(name = "x402_feed.users.lookup_by_fid", skip(self, options))]
    pub async fn lookup_by_fid(&self, fid: u64, options: &CallOptions) -> Result<User, ServiceError> {
        let attempt = RequestAttempt::get(USER_BY_FID_PATH).with_query("fid", fid);
        let response: UserResponse = fetch_json(&self.client, attempt, options).await?;
        Ok(response.user)
    }
}
