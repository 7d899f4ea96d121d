use tokio::sync::watch;
use tracing::{info, warn};

/// Interrupt coordinator for a provisioning run
///
/// The coordinator owns the sending side; sessions hold a [`ShutdownSignal`]
/// and race their pipeline steps against it so an operator interrupt turns
/// into an ordinary failure (and therefore a rollback when one is due).
pub struct ShutdownCoordinator {
    sender: watch::Sender<bool>,
}

impl Default for ShutdownCoordinator {
    fn default() -> Self {
        Self::new()
    }
}

impl ShutdownCoordinator {
    pub fn new() -> Self {
        let (sender, _) = watch::channel(false);
        Self { sender }
    }

    pub fn signal(&self) -> ShutdownSignal {
        ShutdownSignal {
            receiver: self.sender.subscribe(),
        }
    }

    pub fn trigger(&self) {
        self.sender.send_replace(true);
    }

    /// Install a Ctrl-C handler that triggers shutdown.
    ///
    /// Must be called from within a tokio runtime.
    pub fn install_signal_handlers(self) -> ShutdownSignal {
        let signal = self.signal();
        tokio::spawn(async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => {
                    warn!("Interrupt received, stopping provisioning");
                    self.trigger();
                }
                Err(e) => warn!("Failed to listen for interrupt: {}", e),
            }
        });
        info!("Interrupt handler installed");
        signal
    }
}

#[derive(Debug, Clone)]
pub struct ShutdownSignal {
    receiver: watch::Receiver<bool>,
}

impl ShutdownSignal {
    /// A signal that never fires.
    pub fn never() -> Self {
        let (_, receiver) = watch::channel(false);
        Self { receiver }
    }

    pub fn is_triggered(&self) -> bool {
        *self.receiver.borrow()
    }

    /// Resolves once shutdown has been requested; pends forever if the
    /// coordinator goes away without triggering.
    pub async fn triggered(&mut self) {
        loop {
            if *self.receiver.borrow_and_update() {
                return;
            }
            if self.receiver.changed().await.is_err() {
                std::future::pending::<()>().await;
            }
        }
    }
}
