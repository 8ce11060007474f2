#![cfg_attr(docsrs, feature(doc_auto_cfg))]

//! Core types for paying x402 challenges.
//!
//! A server that charges per request answers `402 Payment Required` with a
//! challenge. This crate models that exchange without committing to a chain
//! or an HTTP client:
//!
//! - [`challenge`] - [`PaymentChallenge`](challenge::PaymentChallenge) and the
//!   [`ChallengeParser`](challenge::ChallengeParser) deriving it from a 402 response
//! - [`proof`] - [`PaymentProof`](proof::PaymentProof) and the
//!   [`PaymentProver`](proof::PaymentProver) seam implemented per scheme
//! - [`proto`] - wire documents, header names and settlement receipts
//! - [`chain`] / [`networks`] - CAIP-2 chain ids and well-known network names
//! - [`timestamp`] - Unix timestamps bounding an authorization
//! - [`config`] - values resolved from literals or environment variables
//! - [`util`] - base64 framing

pub mod chain;
pub mod challenge;
pub mod config;
pub mod networks;
pub mod proof;
pub mod proto;
pub mod timestamp;
pub mod util;
