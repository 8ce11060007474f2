//! Configuration for the `x402-feed` binary.
//!
//! A JSON file is optional. Every field falls back to an environment variable,
//! then to a hard-coded default, so the binary runs from a `.env` alone:
//!
//! ```json
//! {
//!   "base_url": "https://api.neynar.com/v2/",
//!   "request_timeout_secs": 30,
//!   "network": "base",
//!   "private_key": "$PRIVATE_KEY",
//!   "api_key": "$NEYNAR_API_KEY"
//! }
//! ```

use alloy_primitives::B256;
use alloy_signer_local::PrivateKeySigner;
use clap::{Parser, Subcommand};
use serde::Deserialize;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use url::Url;
use x402_feed_types::chain::ChainId;
use x402_feed_types::config::LiteralOrEnv;

/// CLI arguments.
#[derive(Parser, Debug)]
#[command(name = "x402-feed", version)]
#[command(about = "Farcaster feeds and lookups, paid per request over HTTP 402")]
pub struct CliArgs {
    /// Path to an optional JSON configuration file
    #[arg(long, short, env = "CONFIG")]
    pub config: Option<PathBuf>,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Look up a user by username or fid
    User {
        #[arg(long, required_unless_present = "fid", conflicts_with = "fid")]
        username: Option<String>,
        #[arg(long)]
        fid: Option<String>,
    },
    /// List the channels a user is active in
    Channels {
        #[arg(long)]
        fid: String,
    },
    /// Fetch one page of a feed
    Feed {
        /// personalized (for_you, following), trending or channel
        #[arg(long, default_value = "trending")]
        kind: String,
        /// Whose personalized feed
        #[arg(long)]
        fid: Option<String>,
        #[arg(long)]
        channel_id: Option<String>,
        #[arg(long)]
        viewer_fid: Option<String>,
        #[arg(long)]
        limit: Option<String>,
        #[arg(long)]
        cursor: Option<String>,
    },
}

/// A validated 32-byte EVM private key, hex with or without `0x`.
///
/// `Debug` never prints the key.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct EvmPrivateKey(B256);

impl EvmPrivateKey {
    pub fn signer(&self) -> Result<PrivateKeySigner, ConfigError> {
        PrivateKeySigner::from_bytes(&self.0)
            .map_err(|e| ConfigError::InvalidPrivateKey(e.to_string()))
    }
}

impl FromStr for EvmPrivateKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        B256::from_str(s.trim())
            .map(Self)
            .map_err(|e| format!("Invalid evm private key: {e}"))
    }
}

impl fmt::Debug for EvmPrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("EvmPrivateKey(<redacted>)")
    }
}

/// Client configuration.
///
/// Fields use serde defaults that fall back to environment variables,
/// then to hardcoded defaults.
#[derive(Clone, Deserialize)]
pub struct Config {
    #[serde(default = "config_defaults::default_base_url")]
    base_url: Url,
    #[serde(default = "config_defaults::default_request_timeout_secs")]
    request_timeout_secs: u64,
    /// Network name (`base`) or CAIP-2 id (`eip155:8453`).
    #[serde(default = "config_defaults::default_network")]
    network: ChainId,
    #[serde(default = "config_defaults::default_private_key")]
    private_key: Option<LiteralOrEnv<EvmPrivateKey>>,
    #[serde(default = "config_defaults::default_api_key")]
    api_key: Option<LiteralOrEnv<String>>,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("base_url", &self.base_url.as_str())
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("network", &self.network)
            .field("private_key", &self.private_key.is_some())
            .field("api_key", &self.api_key.is_some())
            .finish()
    }
}

pub mod config_defaults {
    use std::env;
    use url::Url;
    use x402_feed_types::chain::ChainId;
    use x402_feed_types::config::LiteralOrEnv;

    use super::EvmPrivateKey;

    pub const DEFAULT_BASE_URL: &str = "https://api.neynar.com/v2/";
    pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
    pub const DEFAULT_NETWORK: u64 = 8453;
    pub const PRIVATE_KEY_REF: &str = "$PRIVATE_KEY";

    /// $UPSTREAM_BASE_URL env var -> https://api.neynar.com/v2/
    pub fn default_base_url() -> Url {
        env::var("UPSTREAM_BASE_URL")
            .ok()
            .and_then(|s| Url::parse(&s).ok())
            .unwrap_or_else(|| Url::parse(DEFAULT_BASE_URL).expect("DEFAULT_BASE_URL is a valid URL"))
    }

    /// $REQUEST_TIMEOUT_SECS env var -> 30
    pub fn default_request_timeout_secs() -> u64 {
        env::var("REQUEST_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS)
    }

    /// $PAYMENT_NETWORK env var -> base
    pub fn default_network() -> ChainId {
        env::var("PAYMENT_NETWORK")
            .ok()
            .and_then(|s| ChainId::resolve(&s).ok())
            .unwrap_or_else(|| ChainId::eip155(DEFAULT_NETWORK))
    }

    /// $PRIVATE_KEY env var, when set and valid.
    pub fn default_private_key() -> Option<LiteralOrEnv<EvmPrivateKey>> {
        match LiteralOrEnv::resolve(PRIVATE_KEY_REF) {
            Ok(key) => Some(key),
            Err(e) => {
                tracing::debug!(error = %e, "no private key from environment");
                None
            }
        }
    }

    /// $NEYNAR_API_KEY env var, if set.
    pub fn default_api_key() -> Option<LiteralOrEnv<String>> {
        env::var("NEYNAR_API_KEY")
            .ok()
            .filter(|s| !s.is_empty())
            .map(LiteralOrEnv::from_literal)
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {0}: {1}")]
    FileRead(PathBuf, std::io::Error),
    #[error("Failed to parse config file: {0}")]
    JsonParse(#[from] serde_json::Error),
    #[error("No private key configured; set PRIVATE_KEY or `private_key` in the config file")]
    MissingPrivateKey,
    #[error("Invalid private key: {0}")]
    InvalidPrivateKey(String),
}

impl Config {
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// The network payments are made on by default.
    pub fn network(&self) -> &ChainId {
        &self.network
    }

    pub fn private_key(&self) -> Result<&EvmPrivateKey, ConfigError> {
        self.private_key
            .as_deref()
            .ok_or(ConfigError::MissingPrivateKey)
    }

    pub fn api_key(&self) -> Option<&str> {
        self.api_key.as_deref().map(String::as_str)
    }

    /// Loads from `path` when given, otherwise from the environment alone.
    ///
    /// Values not present in the config file are resolved via environment
    /// variables or defaults during deserialization.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::load_from_path(path),
            None => Ok(serde_json::from_str("{}")?),
        }
    }

    fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
        let content =
            fs::read_to_string(path).map_err(|e| ConfigError::FileRead(path.to_path_buf(), e))?;
        let config: Config = serde_json::from_str(&content)?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const KEY: &str = "0x4c0883a69102937d6231471b5dbb6204fe5129617082792ae468d01a3f362318";

    #[test]
    fn test_private_key_prefix_is_optional() {
        let with: EvmPrivateKey = KEY.parse().unwrap();
        let without: EvmPrivateKey = KEY.trim_start_matches("0x").parse().unwrap();
        assert_eq!(with, without);
        assert_eq!(
            with.signer().unwrap().address(),
            without.signer().unwrap().address()
        );
    }

    #[test]
    fn test_private_key_is_redacted() {
        let key: EvmPrivateKey = KEY.parse().unwrap();
        let printed = format!("{key:?}");
        assert!(!printed.contains("4c0883a6"));
        assert!("0x1234".parse::<EvmPrivateKey>().is_err());
    }

    #[test]
    fn test_explicit_values() {
        let config: Config = serde_json::from_value(json!({
            "base_url": "http://localhost:8080/v2/",
            "request_timeout_secs": 5,
            "network": "base-sepolia",
            "private_key": KEY,
            "api_key": "NEYNAR_DEMO"
        }))
        .unwrap();
        assert_eq!(config.base_url().as_str(), "http://localhost:8080/v2/");
        assert_eq!(config.request_timeout(), Duration::from_secs(5));
        assert_eq!(config.network(), &ChainId::eip155(84532));
        assert!(config.private_key().is_ok());
        assert_eq!(config.api_key(), Some("NEYNAR_DEMO"));
        assert!(!format!("{config:?}").contains("NEYNAR_DEMO"));
    }

    #[test]
    fn test_caip2_network() {
        let config: Config = serde_json::from_value(json!({"network": "eip155:137"})).unwrap();
        assert_eq!(config.network(), &ChainId::eip155(137));
    }

    #[test]
    fn test_invalid_file_values() {
        let result = serde_json::from_value::<Config>(json!({"private_key": "not-a-key"}));
        assert!(result.is_err());
        let result = serde_json::from_value::<Config>(json!({"base_url": "not a url"}));
        assert!(result.is_err());
    }

    #[test]
    fn test_missing_file() {
        let path = std::env::temp_dir().join("x402-feed-missing-config.json");
        let result = Config::load(Some(&path));
        assert!(matches!(result, Err(ConfigError::FileRead(p, _)) if p == path));
    }

    #[test]
    fn test_load_from_file() {
        let path = std::env::temp_dir().join(format!("x402-feed-config-{}.json", std::process::id()));
        fs::write(&path, r#"{"request_timeout_secs": 7, "network": "polygon"}"#).unwrap();
        let config = Config::load(Some(&path)).unwrap();
        fs::remove_file(&path).unwrap();
        assert_eq!(config.request_timeout(), Duration::from_secs(7));
        assert_eq!(config.network(), &ChainId::eip155(137));
    }

    #[test]
    fn test_cli_subcommands() {
        let args = CliArgs::try_parse_from(["x402-feed", "user", "--username", "dwr"]).unwrap();
        assert_eq!(
            args.command,
            Command::User {
                username: Some("dwr".into()),
                fid: None
            }
        );
        let args =
            CliArgs::try_parse_from(["x402-feed", "feed", "--kind", "channel", "--channel-id", "memes"])
                .unwrap();
        assert!(matches!(args.command, Command::Feed { ref kind, .. } if kind == "channel"));
        assert!(CliArgs::try_parse_from(["x402-feed", "user"]).is_err());
        assert!(
            CliArgs::try_parse_from(["x402-feed", "user", "--username", "dwr", "--fid", "3"])
                .is_err()
        );
    }
}
