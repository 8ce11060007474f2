//! Feed-source dispatch.
//!
//! A [`FeedQuery`] names a logical feed: a user's personalized feed, the
//! trending feed, or a channel. [`FeedDispatcher::resolve`] turns it into the
//! concrete upstream call, rejecting incomplete queries before anything goes
//! over the network.
//!
//! | kind | required | upstream |
//! |------|----------|----------|
//! | `personalized` (`for_you`, `following`) | `fid` | `GET /farcaster/feed/for_you?fid&limit&provider=neynar` |
//! | `trending` | | `GET /farcaster/feed/for_you?limit&provider=neynar` |
//! | `channel` | `channel_id` | `GET /farcaster/feed?channel_id&limit` |
//!
//! Trending has no endpoint of its own: it is the personalized endpoint
//! without a subject.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use x402_feed_reqwest::RequestAttempt;

pub const DEFAULT_FEED_LIMIT: u32 = 25;
pub const MAX_FEED_LIMIT: u32 = 100;
/// Ranking provider requested from the for-you endpoint.
pub const FEED_PROVIDER: &str = "neynar";

pub const FOR_YOU_FEED_PATH: &str = "/farcaster/feed/for_you";
pub const CHANNEL_FEED_PATH: &str = "/farcaster/feed";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DispatchError {
    #[error("{field} is required for this feed")]
    MissingRequiredField { field: &'static str },
    #[error("unsupported feed kind: {kind}")]
    UnsupportedFeedKind { kind: String },
    #[error("invalid {field}: {reason}")]
    InvalidParameter { field: &'static str, reason: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedKind {
    Personalized,
    Trending,
    Channel,
}

impl FeedKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FeedKind::Personalized => "personalized",
            FeedKind::Trending => "trending",
            FeedKind::Channel => "channel",
        }
    }
}

impl fmt::Display for FeedKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FeedKind {
    type Err = DispatchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "personalized" | "for_you" | "for-you" | "foryou" | "following" => {
                Ok(FeedKind::Personalized)
            }
            "trending" => Ok(FeedKind::Trending),
            "channel" => Ok(FeedKind::Channel),
            _ => Err(DispatchError::UnsupportedFeedKind {
                kind: s.to_string(),
            }),
        }
    }
}

/// Parses a Farcaster id given as text.
///
/// Only plain decimal digits are accepted. Prefixed input such as `abc3` or
/// `fid:3` is rejected, never stripped.
pub fn parse_fid(raw: &str) -> Result<u64, DispatchError> {
    parse_id("fid", raw)
}

fn parse_id(field: &'static str, raw: &str) -> Result<u64, DispatchError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(DispatchError::MissingRequiredField { field });
    }
    if !raw.bytes().all(|b| b.is_ascii_digit()) {
        return Err(DispatchError::InvalidParameter {
            field,
            reason: format!("'{raw}' is not a decimal number"),
        });
    }
    match raw.parse::<u64>() {
        Ok(0) => Err(DispatchError::InvalidParameter {
            field,
            reason: "must be positive".into(),
        }),
        Ok(id) => Ok(id),
        Err(e) => Err(DispatchError::InvalidParameter {
            field,
            reason: e.to_string(),
        }),
    }
}

/// Raw feed parameters, as a caller hands them over.
///
/// Empty strings count as absent.
#[derive(Debug, Clone, Copy, Default)]
pub struct FeedParams<'a> {
    pub kind: &'a str,
    pub fid: Option<&'a str>,
    pub channel_id: Option<&'a str>,
    pub viewer_fid: Option<&'a str>,
    pub limit: Option<&'a str>,
    pub cursor: Option<&'a str>,
}

fn present(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// A logical feed request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedQuery {
    pub kind: FeedKind,
    /// Whose personalized feed. Required for [`FeedKind::Personalized`].
    pub subject_fid: Option<u64>,
    /// Required for [`FeedKind::Channel`].
    pub channel_id: Option<String>,
    /// Viewer context for reaction flags. Ignored by the trending feed.
    pub viewer_fid: Option<u64>,
    pub limit: u32,
    pub cursor: Option<String>,
}

impl FeedQuery {
    fn new(kind: FeedKind) -> Self {
        Self {
            kind,
            subject_fid: None,
            channel_id: None,
            viewer_fid: None,
            limit: DEFAULT_FEED_LIMIT,
            cursor: None,
        }
    }

    pub fn personalized(fid: u64) -> Self {
        Self {
            subject_fid: Some(fid),
            ..Self::new(FeedKind::Personalized)
        }
    }

    pub fn trending() -> Self {
        Self::new(FeedKind::Trending)
    }

    pub fn channel<S: Into<String>>(channel_id: S) -> Self {
        Self {
            channel_id: Some(channel_id.into()),
            ..Self::new(FeedKind::Channel)
        }
    }

    pub fn with_limit(mut self, limit: u32) -> Self {
        self.limit = limit;
        self
    }

    pub fn with_cursor<S: Into<String>>(mut self, cursor: S) -> Self {
        self.cursor = Some(cursor.into());
        self
    }

    pub fn with_viewer_fid(mut self, viewer_fid: u64) -> Self {
        self.viewer_fid = Some(viewer_fid);
        self
    }

    /// Builds and validates a query from raw caller input.
    pub fn from_params(params: &FeedParams<'_>) -> Result<Self, DispatchError> {
        let kind: FeedKind = params.kind.parse()?;
        let limit = match present(params.limit) {
            Some(raw) => raw.parse::<u32>().map_err(|e| DispatchError::InvalidParameter {
                field: "limit",
                reason: format!("'{raw}': {e}"),
            })?,
            None => DEFAULT_FEED_LIMIT,
        };
        let query = Self {
            kind,
            subject_fid: present(params.fid).map(|raw| parse_id("fid", raw)).transpose()?,
            channel_id: present(params.channel_id).map(str::to_string),
            viewer_fid: present(params.viewer_fid)
                .map(|raw| parse_id("viewer_fid", raw))
                .transpose()?,
            limit,
            cursor: present(params.cursor).map(str::to_string),
        };
        query.validate()?;
        Ok(query)
    }

    /// Checks required fields for the kind and the limit range.
    pub fn validate(&self) -> Result<(), DispatchError> {
        if !(1..=MAX_FEED_LIMIT).contains(&self.limit) {
            return Err(DispatchError::InvalidParameter {
                field: "limit",
                reason: format!("{} is outside 1..={MAX_FEED_LIMIT}", self.limit),
            });
        }
        match self.kind {
            FeedKind::Personalized if self.subject_fid.is_none() => {
                Err(DispatchError::MissingRequiredField { field: "fid" })
            }
            FeedKind::Channel if self.channel_id.as_deref().is_none_or(|c| c.trim().is_empty()) => {
                Err(DispatchError::MissingRequiredField {
                    field: "channel_id",
                })
            }
            _ => Ok(()),
        }
    }
}

/// The upstream resource and query serving one feed request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpstreamCall {
    pub path: &'static str,
    pub query: Vec<(&'static str, String)>,
}

impl UpstreamCall {
    fn new(path: &'static str) -> Self {
        Self {
            path,
            query: Vec::new(),
        }
    }

    fn param<V: ToString>(mut self, key: &'static str, value: V) -> Self {
        self.query.push((key, value.to_string()));
        self
    }

    fn optional_param<V: ToString>(self, key: &'static str, value: Option<V>) -> Self {
        match value {
            Some(value) => self.param(key, value),
            None => self,
        }
    }

    pub fn query_value(&self, key: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn into_attempt(self) -> RequestAttempt {
        self.query
            .into_iter()
            .fold(RequestAttempt::get(self.path), |attempt, (key, value)| {
                attempt.with_query(key, value)
            })
    }
}

/// Stateless mapping from [`FeedQuery`] to [`UpstreamCall`].
#[derive(Debug, Clone, Copy, Default)]
pub struct FeedDispatcher;

impl FeedDispatcher {
    pub fn resolve(&self, query: &FeedQuery) -> Result<UpstreamCall, DispatchError> {
        query.validate()?;
        let call = match query.kind {
            FeedKind::Personalized => UpstreamCall::new(FOR_YOU_FEED_PATH)
                .optional_param("fid", query.subject_fid)
                .param("limit", query.limit)
                .param("provider", FEED_PROVIDER)
                .optional_param("cursor", query.cursor.as_deref())
                .optional_param("viewer_fid", query.viewer_fid),
            FeedKind::Trending => UpstreamCall::new(FOR_YOU_FEED_PATH)
                .param("limit", query.limit)
                .param("provider", FEED_PROVIDER)
                .optional_param("cursor", query.cursor.as_deref()),
            FeedKind::Channel => UpstreamCall::new(CHANNEL_FEED_PATH)
                .optional_param("channel_id", query.channel_id.as_deref().map(str::trim))
                .param("limit", query.limit)
                .optional_param("cursor", query.cursor.as_deref())
                .optional_param("viewer_fid", query.viewer_fid),
        };
        tracing::debug!(kind = %query.kind, path = call.path, "resolved feed");
        Ok(call)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keys(call: &UpstreamCall) -> Vec<&'static str> {
        call.query.iter().map(|(k, _)| *k).collect()
    }

    #[test]
    fn test_kind_aliases() {
        assert_eq!("for_you".parse::<FeedKind>().unwrap(), FeedKind::Personalized);
        assert_eq!("following".parse::<FeedKind>().unwrap(), FeedKind::Personalized);
        assert_eq!("Trending".parse::<FeedKind>().unwrap(), FeedKind::Trending);
        assert_eq!("channel".parse::<FeedKind>().unwrap(), FeedKind::Channel);
        assert!(matches!(
            "frames".parse::<FeedKind>(),
            Err(DispatchError::UnsupportedFeedKind { kind }) if kind == "frames"
        ));
    }

    #[test]
    fn test_personalized_call() {
        let query = FeedQuery::personalized(3)
            .with_limit(10)
            .with_cursor("abc")
            .with_viewer_fid(2);
        let call = FeedDispatcher.resolve(&query).unwrap();
        assert_eq!(call.path, FOR_YOU_FEED_PATH);
        assert_eq!(keys(&call), ["fid", "limit", "provider", "cursor", "viewer_fid"]);
        assert_eq!(call.query_value("fid"), Some("3"));
        assert_eq!(call.query_value("limit"), Some("10"));
        assert_eq!(call.query_value("provider"), Some("neynar"));
    }

    #[test]
    fn test_personalized_requires_subject() {
        let query = FeedQuery {
            subject_fid: None,
            ..FeedQuery::personalized(1)
        };
        assert_eq!(
            FeedDispatcher.resolve(&query),
            Err(DispatchError::MissingRequiredField { field: "fid" })
        );
    }

    #[test]
    fn test_trending_is_personalized_without_subject() {
        let trending = FeedDispatcher
            .resolve(&FeedQuery::trending().with_viewer_fid(9))
            .unwrap();
        let personalized = FeedDispatcher.resolve(&FeedQuery::personalized(3)).unwrap();
        assert_eq!(trending.path, personalized.path);
        let expected: Vec<_> = keys(&personalized)
            .into_iter()
            .filter(|k| *k != "fid")
            .collect();
        assert_eq!(keys(&trending), expected);
        assert_eq!(trending.query_value("limit"), Some("25"));
    }

    #[test]
    fn test_channel_call() {
        let call = FeedDispatcher
            .resolve(&FeedQuery::channel("memes").with_viewer_fid(3))
            .unwrap();
        assert_eq!(call.path, CHANNEL_FEED_PATH);
        assert_eq!(keys(&call), ["channel_id", "limit", "viewer_fid"]);
        assert_eq!(call.query_value("channel_id"), Some("memes"));
        assert_eq!(call.query_value("provider"), None);
    }

    #[test]
    fn test_channel_requires_channel_id() {
        for query in [FeedQuery::channel(""), FeedQuery::channel("  ")] {
            assert_eq!(
                FeedDispatcher.resolve(&query),
                Err(DispatchError::MissingRequiredField {
                    field: "channel_id"
                })
            );
        }
    }

    #[test]
    fn test_limit_range() {
        for limit in [0, 101] {
            let result = FeedDispatcher.resolve(&FeedQuery::trending().with_limit(limit));
            assert!(matches!(
                result,
                Err(DispatchError::InvalidParameter { field: "limit", .. })
            ));
        }
        assert!(FeedDispatcher.resolve(&FeedQuery::trending().with_limit(1)).is_ok());
        assert!(FeedDispatcher.resolve(&FeedQuery::trending().with_limit(100)).is_ok());
    }

    #[test]
    fn test_from_params() {
        let query = FeedQuery::from_params(&FeedParams {
            kind: "following",
            fid: Some("3"),
            viewer_fid: Some(""),
            limit: Some("50"),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(query, FeedQuery::personalized(3).with_limit(50));

        let query = FeedQuery::from_params(&FeedParams {
            kind: "trending",
            ..Default::default()
        })
        .unwrap();
        assert_eq!(query.limit, DEFAULT_FEED_LIMIT);
    }

    #[test]
    fn test_from_params_rejects_bad_input() {
        let missing = FeedQuery::from_params(&FeedParams {
            kind: "personalized",
            ..Default::default()
        });
        assert_eq!(missing, Err(DispatchError::MissingRequiredField { field: "fid" }));

        let bad_limit = FeedQuery::from_params(&FeedParams {
            kind: "trending",
            limit: Some("ten"),
            ..Default::default()
        });
        assert!(matches!(
            bad_limit,
            Err(DispatchError::InvalidParameter { field: "limit", .. })
        ));

        let bad_viewer = FeedQuery::from_params(&FeedParams {
            kind: "channel",
            channel_id: Some("memes"),
            viewer_fid: Some("-1"),
            ..Default::default()
        });
        assert!(matches!(
            bad_viewer,
            Err(DispatchError::InvalidParameter { field: "viewer_fid", .. })
        ));
    }

    #[test]
    fn test_parse_fid() {
        assert_eq!(parse_fid("3"), Ok(3));
        assert_eq!(parse_fid(" 42 "), Ok(42));
        assert_eq!(
            parse_fid(""),
            Err(DispatchError::MissingRequiredField { field: "fid" })
        );
        for raw in ["abc3", "fid:3", "3a", "+3", "0x3", "0", "99999999999999999999999"] {
            assert!(
                matches!(parse_fid(raw), Err(DispatchError::InvalidParameter { .. })),
                "{raw}"
            );
        }
    }

    #[test]
    fn test_into_attempt_keeps_query_order() {
        let attempt = FeedDispatcher
            .resolve(&FeedQuery::personalized(3))
            .unwrap()
            .into_attempt();
        assert_eq!(attempt.path(), FOR_YOU_FEED_PATH);
        assert_eq!(attempt.query_value("fid"), Some("3"));
        assert_eq!(attempt.query()[2], ("provider".to_string(), "neynar".to_string()));
    }
}
