//! Observation hooks for the payment protocol state machine.
//!
//! ```text
//! Idle -> Sent -> Success | ChallengeReceived | Failed
//! ChallengeReceived -> Proving -> Submitting -> Retried -> Success | Failed
//! ```
//!
//! Every transition of every logical request is reported to a
//! [`ProtocolObserver`]. Observers must not block; their failures are logged
//! and otherwise ignored.

use std::fmt;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::attempt::AttemptNumber;

/// State of one logical request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProtocolState {
    Idle,
    /// An attempt went out and its response came back.
    Sent { status: u16 },
    ChallengeReceived,
    Proving,
    Submitting,
    /// The paid retry came back.
    Retried { status: u16 },
    Success { status: u16 },
    Failed { reason: String },
}

impl ProtocolState {
    pub fn name(&self) -> &'static str {
        match self {
            ProtocolState::Idle => "idle",
            ProtocolState::Sent { .. } => "sent",
            ProtocolState::ChallengeReceived => "challenge_received",
            ProtocolState::Proving => "proving",
            ProtocolState::Submitting => "submitting",
            ProtocolState::Retried { .. } => "retried",
            ProtocolState::Success { .. } => "success",
            ProtocolState::Failed { .. } => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, ProtocolState::Success { .. } | ProtocolState::Failed { .. })
    }
}

impl fmt::Display for ProtocolState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A transition, tagged with the logical request it belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProtocolEvent {
    pub correlation_id: Uuid,
    pub attempt: AttemptNumber,
    pub path: String,
    pub state: ProtocolState,
}

#[derive(Debug, thiserror::Error)]
pub enum ObserverError {
    #[error("Observer channel is full")]
    ChannelFull,
    #[error("Observer channel is closed")]
    ChannelClosed,
}

pub trait ProtocolObserver: Send + Sync {
    fn observe(&self, event: &ProtocolEvent) -> Result<(), ObserverError>;
}

/// Logs every transition: terminal failures at `warn`, the rest at `debug`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

impl ProtocolObserver for TracingObserver {
    fn observe(&self, event: &ProtocolEvent) -> Result<(), ObserverError> {
        match &event.state {
            ProtocolState::Failed { reason } => tracing::warn!(
                correlation_id = %event.correlation_id,
                attempt = %event.attempt,
                path = %event.path,
                reason = %reason,
                "x402 request failed"
            ),
            state => tracing::debug!(
                correlation_id = %event.correlation_id,
                attempt = %event.attempt,
                path = %event.path,
                state = %state,
                "x402 protocol transition"
            ),
        }
        Ok(())
    }
}

/// Forwards events into a bounded channel without waiting for capacity.
#[derive(Debug, Clone)]
pub struct ChannelObserver {
    sender: mpsc::Sender<ProtocolEvent>,
}

impl ChannelObserver {
    pub fn new(sender: mpsc::Sender<ProtocolEvent>) -> Self {
        Self { sender }
    }

    /// An observer together with the receiving end of a channel of `capacity`.
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<ProtocolEvent>) {
        let (sender, receiver) = mpsc::channel(capacity);
        (Self::new(sender), receiver)
    }
}

impl ProtocolObserver for ChannelObserver {
    fn observe(&self, event: &ProtocolEvent) -> Result<(), ObserverError> {
        self.sender.try_send(event.clone()).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => ObserverError::ChannelFull,
            mpsc::error::TrySendError::Closed(_) => ObserverError::ChannelClosed,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(state: ProtocolState) -> ProtocolEvent {
        ProtocolEvent {
            correlation_id: Uuid::now_v7(),
            attempt: AttemptNumber::First,
            path: "/farcaster/feed".into(),
            state,
        }
    }

    #[test]
    fn test_channel_observer_reports_full_and_closed() {
        let (observer, mut receiver) = ChannelObserver::channel(1);
        observer.observe(&event(ProtocolState::Idle)).unwrap();
        assert!(matches!(
            observer.observe(&event(ProtocolState::Proving)),
            Err(ObserverError::ChannelFull)
        ));
        assert_eq!(receiver.try_recv().unwrap().state, ProtocolState::Idle);
        drop(receiver);
        assert!(matches!(
            observer.observe(&event(ProtocolState::Proving)),
            Err(ObserverError::ChannelClosed)
        ));
    }

    #[test]
    fn test_terminal_states() {
        assert!(ProtocolState::Success { status: 200 }.is_terminal());
        assert!(ProtocolState::Failed { reason: "x".into() }.is_terminal());
        assert!(!ProtocolState::Retried { status: 200 }.is_terminal());
        assert_eq!(ProtocolState::ChallengeReceived.to_string(), "challenge_received");
    }
}
