//! Shutdown coordination.

use std::future::Future;
use std::sync::Arc;

use tokio::sync::watch;

/// One-way shutdown flag shared by the server task and its owner.
///
/// Unlike a broadcast, late subscribers still observe a trigger that already happened.
#[derive(Debug, Clone)]
pub struct Shutdown {
    tx: Arc<watch::Sender<bool>>,
}

impl Shutdown {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    pub fn trigger(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_triggered(&self) -> bool {
        *self.tx.borrow()
    }

    /// Resolves once [`Shutdown::trigger`] has been called.
    pub fn signalled(&self) -> impl Future<Output = ()> + Send + 'static {
        let mut rx = self.tx.subscribe();
        async move {
            // the sender lives in self; an error means it is gone, which is a shutdown too
            let _ = rx.wait_for(|triggered| *triggered).await;
        }
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn late_subscriber_sees_trigger() {
        let shutdown = Shutdown::new();
        shutdown.trigger();
        assert!(shutdown.is_triggered());

        tokio::time::timeout(Duration::from_millis(100), shutdown.signalled())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn waits_until_triggered() {
        let shutdown = Shutdown::new();
        let pending = shutdown.signalled();
        assert!(tokio::time::timeout(Duration::from_millis(20), pending).await.is_err());

        let waiter = tokio::spawn(shutdown.signalled());
        shutdown.clone().trigger();
        waiter.await.unwrap();
    }
}
