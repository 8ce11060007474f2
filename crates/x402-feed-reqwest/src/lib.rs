//! x402 payment-gated requests for [`reqwest`].
//!
//! [`PaymentRetryClient`] wraps a [`reqwest_middleware::ClientWithMiddleware`]
//! and speaks the client half of the x402 protocol: on an HTTP 402 it parses
//! the challenge, asks its [`PaymentProver`](x402_feed_types::proof::PaymentProver)
//! for a proof and resends the request once with the proof attached.
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use alloy_signer_local::PrivateKeySigner;
//! use x402_feed_eip155::{ExactEvmProofBuilder, WalletIdentity};
//! use x402_feed_eip155::networks::usdc_address;
//! use x402_feed_reqwest::{CallOptions, PaymentRetryClient, RequestAttempt};
//! use x402_feed_types::chain::ChainId;
//! use x402_feed_types::challenge::ChallengeParser;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let network = ChainId::eip155(8453);
//! let identity = WalletIdentity::new(PrivateKeySigner::random(), network.clone());
//! let prover = ExactEvmProofBuilder::new(Arc::new(identity));
//! let parser = ChallengeParser::new(network).with_asset_resolver(usdc_address);
//! let client = PaymentRetryClient::builder("https://api.neynar.com/v2/".parse()?, parser, prover)
//!     .build()?;
//!
//! let attempt = RequestAttempt::get("farcaster/user").with_query("fid", 3);
//! let response = client.execute(attempt, &CallOptions::new()).await?;
//! println!("{}", response.text());
//! # Ok(())
//! # }
//! ```

mod attempt;
mod client;
mod error;
mod observer;
mod response;

pub use attempt::*;
pub use client::*;
pub use error::*;
pub use observer::*;
pub use response::*;
