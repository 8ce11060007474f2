//! Farcaster feeds and lookups over a metered upstream, paid per request with
//! [x402](https://www.x402.org).
//!
//! The upstream (Neynar's Farcaster v2 API) answers unpaid requests with
//! `402 Payment Required`. Every call made here goes through a
//! [`PaymentRetryClient`](x402_feed_reqwest::PaymentRetryClient), which signs
//! an EIP-3009 USDC authorization for the challenge and retries once.
//!
//! # Modules
//!
//! - [`config`] - Configuration file, environment fallbacks and CLI arguments.
//! - [`dispatcher`] - Maps a logical feed request onto the upstream resource that serves it.
//! - [`model`] - Users, casts, channels and feed pages as the upstream returns them.
//! - [`services`] - The [`ServiceFacade`](services::ServiceFacade): user, channel and feed operations.
//! - [`util`] - Telemetry bootstrap and shutdown signal handling.
//!
//! The payment protocol itself lives in the workspace crates:
//! [`x402_feed_types`] (challenges, proofs), [`x402_feed_eip155`] (signing) and
//! [`x402_feed_reqwest`] (the retrying client).

pub mod config;
pub mod dispatcher;
pub mod model;
pub mod services;
pub mod util;
