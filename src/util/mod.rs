//! Process-level helpers for the binary.
//!
//! | Module | Description | Feature |
//! |--------|-------------|---------|
//! | [`sig_down`] | SIGTERM/SIGINT to a cancellation token | - |
//! | [`telemetry`] | Log subscriber, plus OpenTelemetry export | OTLP export needs `telemetry` |

pub mod sig_down;
pub mod telemetry;

pub use sig_down::*;
pub use telemetry::*;
