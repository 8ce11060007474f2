//! EVM payments for x402 challenges.
//!
//! The `exact-evm` scheme pays with an EIP-3009 `transferWithAuthorization`:
//! the wallet signs EIP-712 typed data authorizing the server to pull the
//! requested amount of a token (USDC by default) before the challenge expires.
//!
//! - [`signer`] - the [`WalletSigner`](signer::WalletSigner) seam and the
//!   immutable [`WalletIdentity`](signer::WalletIdentity)
//! - [`builder`] - [`ExactEvmProofBuilder`](builder::ExactEvmProofBuilder), the
//!   [`PaymentProver`](x402_feed_types::proof::PaymentProver) for `exact-evm`
//! - [`types`] - payment payload wire types and the EIP-712 struct
//! - [`networks`] - USDC deployments on well-known EVM networks

pub mod builder;
pub mod networks;
pub mod signer;
pub mod types;

pub use builder::ExactEvmProofBuilder;
pub use signer::{SerializedSigner, WalletIdentity, WalletSigner};
