use tokio::signal::unix::{SignalKind, signal};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Turns the first SIGTERM or SIGINT into a cancelled [`CancellationToken`].
///
/// In-flight calls holding a child of the token abort with
/// `ClientError::Cancelled` instead of being killed mid-payment.
pub struct SigDown {
    listener: JoinHandle<()>,
    token: CancellationToken,
}

impl SigDown {
    /// Registers the signal handlers. Must be called inside a Tokio runtime.
    pub fn try_new() -> Result<Self, std::io::Error> {
        let mut terminate = signal(SignalKind::terminate())?;
        let mut interrupt = signal(SignalKind::interrupt())?;
        let token = CancellationToken::new();
        let trigger = token.clone();
        let listener = tokio::spawn(async move {
            let name = tokio::select! {
                _ = terminate.recv() => "SIGTERM",
                _ = interrupt.recv() => "SIGINT",
            };
            tracing::info!(signal = name, "shutting down");
            trigger.cancel();
        });
        Ok(Self { listener, token })
    }

    /// A token cancelled together with this one, for one call or subsystem.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.token.child_token()
    }

    pub fn is_triggered(&self) -> bool {
        self.token.is_cancelled()
    }
}

impl Drop for SigDown {
    fn drop(&mut self) {
        self.listener.abort();
    }
}
