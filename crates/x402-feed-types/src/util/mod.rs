//! Small helpers shared by the protocol types.

mod b64;

pub use b64::*;
