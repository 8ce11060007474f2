//! Upstream domain model.
//!
//! Shapes follow Neynar's v2 responses. Fields the upstream may omit default
//! rather than fail, and unknown fields are ignored, so a richer upstream
//! payload still decodes.

use serde::{Deserialize, Serialize};

/// A Farcaster account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub fid: u64,
    #[serde(default)]
    pub username: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pfp_url: Option<String>,
    #[serde(default)]
    pub profile: Profile,
    #[serde(default)]
    pub follower_count: u64,
    #[serde(default)]
    pub following_count: u64,
    /// Verified custody addresses.
    #[serde(default)]
    pub verifications: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    #[serde(default)]
    pub bio: Bio,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bio {
    #[serde(default)]
    pub text: String,
}

/// A post.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cast {
    pub hash: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_hash: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root_parent_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_author: Option<Box<User>>,
    pub author: User,
    #[serde(default)]
    pub text: String,
    /// ISO 8601, as sent by the upstream.
    #[serde(default)]
    pub timestamp: String,
    /// Embeds vary by kind (urls, casts, frames) and are passed through as is.
    #[serde(default)]
    pub embeds: Vec<serde_json::Value>,
    #[serde(default)]
    pub reactions: Reactions,
    #[serde(default)]
    pub replies: Replies,
    #[serde(default)]
    pub mentioned_profiles: Vec<User>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reactions {
    #[serde(default)]
    pub likes_count: u64,
    #[serde(default)]
    pub recasts_count: u64,
    #[serde(default)]
    pub likes: Vec<Reactor>,
    #[serde(default)]
    pub recasts: Vec<Reactor>,
}

/// Who liked or recast.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reactor {
    pub fid: u64,
    #[serde(default)]
    pub fname: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Replies {
    #[serde(default)]
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Channel {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lead_fid: Option<u64>,
    #[serde(default)]
    pub follower_count: u64,
}

/// One page of casts.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeedPage {
    pub casts: Vec<Cast>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next: Option<NextCursor>,
}

impl FeedPage {
    /// Cursor for the following page, if there is one.
    pub fn next_cursor(&self) -> Option<&str> {
        self.next.as_ref()?.cursor.as_deref()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NextCursor {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cursor: Option<String>,
}

/// `{"user": {...}}`
#[derive(Debug, Clone, Deserialize)]
pub struct UserResponse {
    pub user: User,
}

/// `{"channels": [...]}`
#[derive(Debug, Clone, Deserialize)]
pub struct ChannelsResponse {
    pub channels: Vec<Channel>,
}
