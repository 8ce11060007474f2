use std::sync::Arc;
use tracing::instrument;
use x402_feed_reqwest::{CallOptions, PaymentRetryClient};
use x402_feed_types::proof::PaymentProver;

use super::{ServiceError, fetch_json};
use crate::dispatcher::{FeedDispatcher, FeedParams, FeedQuery};
use crate::model::FeedPage;

pub struct FeedService<P> {
    client: Arc<PaymentRetryClient<P>>,
    dispatcher: FeedDispatcher,
}

impl<P: PaymentProver> FeedService<P> {
    pub fn new(client: Arc<PaymentRetryClient<P>>) -> Self {
        Self {
            client,
            dispatcher: FeedDispatcher,
        }
    }

    /// One page of the requested feed. Invalid queries fail before any
    /// network call.
    #[instrument(
        name = "x402_feed.feeds.feed",
        skip_all,
        fields(kind = %query.kind, limit = query.limit)
    )]
    pub async fn feed(
        &self,
        query: &FeedQuery,
        options: &CallOptions,
    ) -> Result<FeedPage, ServiceError> {
        let call = self.dispatcher.resolve(query)?;
        let page: FeedPage = fetch_json(&self.client, call.into_attempt(), options).await?;
        tracing::debug!(
            casts = page.casts.len(),
            has_next = page.next_cursor().is_some(),
            "feed page fetched"
        );
        Ok(page)
    }

    pub async fn feed_from_params(
        &self,
        params: &FeedParams<'_>,
        options: &CallOptions,
    ) -> Result<FeedPage, ServiceError> {
        let query = FeedQuery::from_params(params)?;
        self.feed(&query, options).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::{ErrorKind, test_support};
    use serde_json::json;
    use wiremock::matchers::{header_exists, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn page() -> serde_json::Value {
        json!({
            "casts": [{
                "hash": "0xfe90f9de682273e05b201629ad2338bdcd89b6be",
                "author": {"fid": 3, "username": "dwr"},
                "text": "gm",
                "timestamp": "2024-05-01T12:00:00.000Z"
            }],
            "next": {"cursor": "next-page"}
        })
    }

    #[tokio::test]
    async fn test_trending_feed_pays_and_decodes() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/farcaster/feed/for_you"))
            .and(query_param("provider", "neynar"))
            .and(query_param("limit", "10"))
            .and(header_exists("x-payment"))
            .respond_with(ResponseTemplate::new(200).set_body_json(page()))
            .with_priority(1)
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/farcaster/feed/for_you"))
            .respond_with(ResponseTemplate::new(402).set_body_json(test_support::challenge()))
            .expect(1)
            .mount(&server)
            .await;

        let feeds = FeedService::new(test_support::client(&server));
        let page = feeds
            .feed(&FeedQuery::trending().with_limit(10), &CallOptions::new())
            .await
            .unwrap();
        assert_eq!(page.casts[0].author.username, "dwr");
        assert_eq!(page.next_cursor(), Some("next-page"));
    }

    #[tokio::test]
    async fn test_channel_feed_from_params() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/farcaster/feed"))
            .and(query_param("channel_id", "memes"))
            .and(query_param("viewer_fid", "3"))
            .respond_with(ResponseTemplate::new(200).set_body_json(page()))
            .expect(1)
            .mount(&server)
            .await;

        let feeds = FeedService::new(test_support::client(&server));
        let params = FeedParams {
            kind: "channel",
            channel_id: Some("memes"),
            viewer_fid: Some("3"),
            ..Default::default()
        };
        let page = feeds
            .feed_from_params(&params, &CallOptions::new())
            .await
            .unwrap();
        assert_eq!(page.casts.len(), 1);
    }

    #[tokio::test]
    async fn test_personalized_without_fid_makes_no_request() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(page()))
            .expect(0)
            .mount(&server)
            .await;

        let feeds = FeedService::new(test_support::client(&server));
        let params = FeedParams {
            kind: "personalized",
            ..Default::default()
        };
        let error = feeds
            .feed_from_params(&params, &CallOptions::new())
            .await
            .unwrap_err();
        assert_eq!(error.kind, ErrorKind::MissingRequiredField);
        assert_eq!(error.http_status(), http::StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_unknown_kind() {
        let server = MockServer::start().await;
        let feeds = FeedService::new(test_support::client(&server));
        let params = FeedParams {
            kind: "frames",
            ..Default::default()
        };
        let error = feeds
            .feed_from_params(&params, &CallOptions::new())
            .await
            .unwrap_err();
        assert_eq!(error.kind, ErrorKind::UnsupportedFeedKind);
    }
}
