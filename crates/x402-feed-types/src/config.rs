//! Configuration values that may live in the environment.
//!
//! [`LiteralOrEnv`] lets a config file hold either the value itself or a
//! reference to an environment variable, which keeps secrets such as private
//! keys out of the file:
//!
//! ```json
//! {
//!   "network": "base-sepolia",
//!   "private_key": "$PRIVATE_KEY",
//!   "api_key": "${NEYNAR_API_KEY}"
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::ops::Deref;
use std::str::FromStr;

/// A value resolved from a literal string, `$VAR` or `${VAR}` at deserialization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiteralOrEnv<T>(T);

impl<T> LiteralOrEnv<T> {
    pub fn from_literal(value: T) -> Self {
        Self(value)
    }

    pub fn inner(&self) -> &T {
        &self.0
    }

    pub fn into_inner(self) -> T {
        self.0
    }

    /// Variable name if `s` is `$VAR` or `${VAR}`.
    fn env_var_name(s: &str) -> Option<&str> {
        if let Some(braced) = s.strip_prefix("${").and_then(|rest| rest.strip_suffix('}')) {
            return Some(braced);
        }
        let name = s.strip_prefix('$')?;
        let valid = !name.is_empty() && name.chars().all(|c| c.is_alphanumeric() || c == '_');
        valid.then_some(name)
    }
}

impl<T> LiteralOrEnv<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    /// Resolves `s` the same way deserialization does.
    pub fn resolve(s: &str) -> Result<Self, String> {
        let value = match Self::env_var_name(s) {
            Some(var_name) => std::env::var(var_name).map_err(|_| {
                format!("Environment variable '{var_name}' not found (referenced as '{s}')")
            })?,
            None => s.to_string(),
        };
        value
            .parse::<T>()
            .map(LiteralOrEnv)
            .map_err(|e| format!("Failed to parse value: {e}"))
    }
}

impl<T> Deref for LiteralOrEnv<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<'de, T> Deserialize<'de> for LiteralOrEnv<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Self::resolve(&s).map_err(serde::de::Error::custom)
    }
}

impl<T> Serialize for LiteralOrEnv<T>
where
    T: Serialize,
{
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        self.0.serialize(serializer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_literal_value() {
        let value: LiteralOrEnv<u64> = serde_json::from_str("\"30\"").unwrap();
        assert_eq!(*value, 30);
    }

    #[test]
    fn test_env_var_syntax() {
        unsafe { std::env::set_var("X402_FEED_TEST_TIMEOUT", "45") };
        let simple: LiteralOrEnv<u64> = serde_json::from_str("\"$X402_FEED_TEST_TIMEOUT\"").unwrap();
        let braced: LiteralOrEnv<u64> =
            serde_json::from_str("\"${X402_FEED_TEST_TIMEOUT}\"").unwrap();
        assert_eq!(simple.into_inner(), 45);
        assert_eq!(braced.into_inner(), 45);
    }

    #[test]
    fn test_missing_env_var() {
        let result: Result<LiteralOrEnv<String>, _> =
            serde_json::from_str("\"$X402_FEED_TEST_SURELY_UNSET\"");
        let err = result.unwrap_err().to_string();
        assert!(err.contains("X402_FEED_TEST_SURELY_UNSET"), "{err}");
    }

    #[test]
    fn test_dollar_inside_literal_is_not_a_reference() {
        let value: LiteralOrEnv<String> = serde_json::from_str("\"$not a var\"").unwrap();
        assert_eq!(value.inner(), "$not a var");
    }
}
