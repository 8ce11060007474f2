//! Unix timestamps bounding a payment authorization.
//!
//! A challenge expires at a [`UnixTimestamp`]; the EIP-3009 authorization built
//! from it is valid before that same instant.

use serde::{Deserialize, Deserializer, Serialize, Serializer, de};
use std::fmt::{Display, Formatter};
use std::ops::Add;
use std::time::SystemTime;

/// Seconds since the Unix epoch.
///
/// Serialized as a stringified integer, since JavaScript numbers cannot hold
/// every `u64`:
///
/// ```json
/// "1699999999"
/// ```
///
/// Deserialization also accepts a bare JSON integer, which is how many servers
/// send `expiresAt`.
///
/// ```
/// use x402_feed_types::timestamp::UnixTimestamp;
///
/// let expires = UnixTimestamp::from_secs(1_700_000_000) + 60;
/// assert_eq!(expires.as_secs(), 1_700_000_060);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Ord, Eq, Hash)]
pub struct UnixTimestamp(u64);

impl Serialize for UnixTimestamp {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0.to_string())
    }
}

impl<'de> Deserialize<'de> for UnixTimestamp {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Wire {
            Secs(u64),
            Text(String),
        }
        match Wire::deserialize(deserializer)? {
            Wire::Secs(secs) => Ok(UnixTimestamp(secs)),
            Wire::Text(s) => s
                .parse::<u64>()
                .map(UnixTimestamp)
                .map_err(|_| de::Error::custom("timestamp must be a non-negative integer")),
        }
    }
}

impl Display for UnixTimestamp {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Add<u64> for UnixTimestamp {
    type Output = Self;

    fn add(self, rhs: u64) -> Self::Output {
        UnixTimestamp(self.0.saturating_add(rhs))
    }
}

impl UnixTimestamp {
    pub fn from_secs(secs: u64) -> Self {
        Self(secs)
    }

    /// Current system time.
    ///
    /// # Panics
    ///
    /// Panics if the system clock reads earlier than the Unix epoch.
    pub fn now() -> Self {
        let now = SystemTime::now()
            .duration_since(SystemTime::UNIX_EPOCH)
            .expect("SystemTime before UNIX epoch?!?")
            .as_secs();
        Self(now)
    }

    pub fn as_secs(&self) -> u64 {
        self.0
    }

    /// Whether `now` is at or past this instant.
    pub fn has_passed(&self, now: UnixTimestamp) -> bool {
        now >= *self
    }
}
