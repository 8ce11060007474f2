//! Chain identification.
//!
//! Payment challenges name the chain they settle on either by a well-known
//! network name (`"base"`) or by a CAIP-2 identifier (`"eip155:8453"`). Both
//! forms resolve to a [`ChainId`].

mod chain_id;

pub use chain_id::*;
