//! Shutdown signalling for long-running waits.

use tokio::sync::broadcast;

/// Receiving end of a process-wide shutdown broadcast.
///
/// Trackers `select!` on [`ShutdownSignal::recv`] next to their poll timer.
/// A dropped sender never fires, so a workflow without a shutdown source
/// runs until its own deadlines.
#[derive(Debug)]
pub struct ShutdownSignal {
    rx: broadcast::Receiver<()>,
}

impl ShutdownSignal {
    pub fn new(rx: broadcast::Receiver<()>) -> Self {
        Self { rx }
    }

    /// A sender and one signal subscribed to it.
    pub fn channel() -> (broadcast::Sender<()>, Self) {
        let (tx, rx) = broadcast::channel(1);
        (tx, Self::new(rx))
    }

    /// A signal that never fires.
    pub fn never() -> Self {
        let (_tx, signal) = Self::channel();
        signal
    }

    /// Resolve once shutdown has been requested.
    pub async fn recv(&mut self) {
        match self.rx.recv().await {
            Ok(()) | Err(broadcast::error::RecvError::Lagged(_)) => {}
            Err(broadcast::error::RecvError::Closed) => std::future::pending::<()>().await,
        }
    }
}

impl Clone for ShutdownSignal {
    fn clone(&self) -> Self {
        Self {
            rx: self.rx.resubscribe(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_fires_on_send() {
        let (tx, mut signal) = ShutdownSignal::channel();
        tx.send(()).unwrap();
        tokio::time::timeout(Duration::from_secs(1), signal.recv())
            .await
            .expect("signal should fire");
    }

    #[tokio::test(start_paused = true)]
    async fn test_never_does_not_fire() {
        let mut signal = ShutdownSignal::never();
        let fired = tokio::time::timeout(Duration::from_secs(60), signal.recv()).await;
        assert!(fired.is_err());
    }
}
