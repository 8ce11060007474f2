//! `x402-feed` command-line entrypoint.
//!
//! Looks up Farcaster users, channels and feeds from a metered upstream,
//! paying each request's HTTP 402 challenge from the configured wallet.
//!
//! ```text
//! x402-feed user --username dwr
//! x402-feed user --fid 3
//! x402-feed channels --fid 3
//! x402-feed feed --kind trending --limit 10
//! x402-feed feed --kind channel --channel-id memes
//! ```
//!
//! Results are printed to stdout as JSON. A failed command prints a JSON
//! `{"kind", "message"}` object to stdout, so scripts reading stdout always get
//! JSON, and the same error as plain text to stderr, then exits with status 1.
//! Startup failures (configuration, wallet) only reach stderr.
//!
//! Environment:
//! - `.env` values loaded at startup
//! - `PRIVATE_KEY`, `PAYMENT_NETWORK`, `UPSTREAM_BASE_URL`, `NEYNAR_API_KEY`, `REQUEST_TIMEOUT_SECS`
//! - `RUST_LOG` filters logs (stderr); `OTEL_*` enables export with the `telemetry` feature

mod run;

use std::process;

use crate::run::run;

#[tokio::main]
async fn main() {
    let result = run().await;
    if let Err(e) = result {
        eprintln!("{e}");
        process::exit(1)
    }
}
