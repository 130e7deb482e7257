//! Shutdown signal handling for the record command

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::Notify;

/// Set once Ctrl+C (or SIGTERM on Unix) arrives
pub struct ShutdownSignal {
    shutdown: Arc<AtomicBool>,
    notify: Arc<Notify>,
}

impl ShutdownSignal {
    /// Create a new shutdown signal handler
    pub fn new() -> Self {
        Self {
            shutdown: Arc::new(AtomicBool::new(false)),
            notify: Arc::new(Notify::new()),
        }
    }

    /// Get a clone of the shutdown flag
    pub fn flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.shutdown)
    }

    /// Check if shutdown was requested
    pub fn is_shutdown(&self) -> bool {
        self.shutdown.load(Ordering::SeqCst)
    }

    /// Mark shutdown as requested and wake the waiter
    pub fn trigger(&self) {
        trigger(&self.shutdown, &self.notify);
    }

    /// Install the handlers. Must run inside a tokio runtime.
    pub fn setup(&self) -> Result<(), std::io::Error> {
        let shutdown = Arc::clone(&self.shutdown);
        let notify = Arc::clone(&self.notify);
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::debug!("Received Ctrl+C");
                trigger(&shutdown, &notify);
            }
        });

        #[cfg(unix)]
        {
            use tokio::signal::unix::{signal, SignalKind};

            let shutdown = Arc::clone(&self.shutdown);
            let notify = Arc::clone(&self.notify);
            let mut sigterm = signal(SignalKind::terminate())?;
            tokio::spawn(async move {
                sigterm.recv().await;
                tracing::debug!("Received SIGTERM");
                trigger(&shutdown, &notify);
            });
        }

        Ok(())
    }

    /// Resolve once shutdown has been requested
    pub async fn wait(&self) {
        while !self.is_shutdown() {
            self.notify.notified().await;
        }
    }
}

fn trigger(shutdown: &AtomicBool, notify: &Notify) {
    shutdown.store(true, Ordering::SeqCst);
    notify.notify_one();
}

impl Default for ShutdownSignal {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn shutdown_signal_default_is_false() {
        let signal = ShutdownSignal::new();
        assert!(!signal.is_shutdown());
    }

    #[test]
    fn shutdown_signal_flag_can_be_set() {
        let signal = ShutdownSignal::new();
        let flag = signal.flag();
        flag.store(true, Ordering::SeqCst);
        assert!(signal.is_shutdown());
    }

    #[tokio::test]
    async fn wait_returns_after_trigger() {
        let signal = Arc::new(ShutdownSignal::new());
        let waiter = Arc::clone(&signal);
        let task = tokio::spawn(async move { waiter.wait().await });

        signal.trigger();
        tokio::time::timeout(Duration::from_secs(1), task)
            .await
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn trigger_before_wait_is_not_lost() {
        let signal = ShutdownSignal::new();
        signal.trigger();
        tokio::time::timeout(Duration::from_secs(1), signal.wait())
            .await
            .unwrap();
    }
}
