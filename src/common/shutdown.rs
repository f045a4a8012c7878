//! One-shot termination signal shared between tasks.

use tokio::sync::watch;

/// A latch that flips once from "running" to "terminated".
///
/// Any number of tasks may wait on it; waiters that arrive after the latch
/// flipped return immediately.
pub struct Shutdown {
    sender: watch::Sender<bool>,
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

impl Shutdown {
    pub fn new() -> Self {
        let (sender, _) = watch::channel(false);
        Self {
            sender,
        }
    }

    /// Flip the latch and wake every waiter.
    pub fn shutdown(&self) {
        self.sender.send_replace(true);
    }

    pub fn is_terminated(&self) -> bool {
        *self.sender.borrow()
    }

    /// Wait until [`Shutdown::shutdown`] has been called.
    pub async fn wait(&self) {
        let mut receiver = self.sender.subscribe();
        // the sender lives as long as `self`, so the channel cannot close here
        let _ = receiver.wait_for(|terminated| *terminated).await;
    }
}

#[cfg(test)]
mod test {
    use std::{sync::Arc, time::Duration};

    use super::Shutdown;

    #[tokio::test]
    async fn test_wait_returns_after_shutdown() {
        let shutdown = Arc::new(Shutdown::new());
        let waiter = {
            let shutdown = shutdown.clone();
            tokio::spawn(async move { shutdown.wait().await })
        };

        assert!(!shutdown.is_terminated());
        shutdown.shutdown();
        tokio::time::timeout(Duration::from_secs(1), waiter).await.unwrap().unwrap();
        assert!(shutdown.is_terminated());
    }

    #[tokio::test]
    async fn test_late_waiter_returns_immediately() {
        let shutdown = Shutdown::new();
        shutdown.shutdown();
        tokio::time::timeout(Duration::from_millis(100), shutdown.wait()).await.unwrap();
    }
}
