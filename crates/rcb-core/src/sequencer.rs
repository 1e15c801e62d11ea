//! Admission-ordered access to the printer.
//!
//! Each admitted message takes a [`Ticket`]; a ticket's turn comes once the
//! previous ticket has been dropped. Normalization for several messages can
//! run concurrently while their jobs still reach the printer in admission order.

use tokio::sync::{oneshot, Mutex};

#[derive(Debug, Default)]
pub struct PrintSequencer {
    tail: Mutex<Option<oneshot::Receiver<()>>>,
}

/// A place in the print order. Dropping it (printed or not) releases the next one.
#[derive(Debug)]
pub struct Ticket {
    previous: Option<oneshot::Receiver<()>>,
    release: Option<oneshot::Sender<()>>,
}

impl PrintSequencer {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn issue(&self) -> Ticket {
        let (tx, rx) = oneshot::channel();
        let previous = self.tail.lock().await.replace(rx);
        Ticket {
            previous,
            release: Some(tx),
        }
    }
}

impl Ticket {
    /// Wait until every earlier ticket has been dropped. Cancel-safe.
    pub async fn wait_turn(&mut self) {
        if let Some(prev) = self.previous.as_mut() {
            // The sender is never used; the channel closes when the holder drops it.
            let _ = prev.await;
            self.previous = None;
        }
    }
}

impl Drop for Ticket {
    // Dropped before its turn: the successor must still wait for our
    // predecessor, so keep our release pending until that one is gone.
    fn drop(&mut self) {
        let (Some(prev), Some(release)) = (self.previous.take(), self.release.take()) else {
            return;
        };
        match tokio::runtime::Handle::try_current() {
            Ok(rt) => {
                rt.spawn(async move {
                    let _ = prev.await;
                    drop(release);
                });
            }
            Err(_) => drop(release),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{sync::Arc, time::Duration};

    #[tokio::test]
    async fn turns_follow_issue_order() {
        let seq = PrintSequencer::new();
        let log = Arc::new(Mutex::new(Vec::new()));

        let mut handles = Vec::new();
        for (i, delay) in [30u64, 10, 0].into_iter().enumerate() {
            let mut ticket = seq.issue().await;
            let log = log.clone();
            handles.push(tokio::spawn(async move {
                // Later tickets finish their "normalization" first.
                tokio::time::sleep(Duration::from_millis(delay)).await;
                ticket.wait_turn().await;
                log.lock().await.push(i);
            }));
        }
        for h in handles {
            h.await.unwrap();
        }

        assert_eq!(*log.lock().await, vec![0, 1, 2]);
    }

    #[tokio::test]
    async fn dropped_ticket_releases_successor() {
        let seq = PrintSequencer::new();
        let first = seq.issue().await;
        let mut second = seq.issue().await;
        drop(first);
        tokio::time::timeout(Duration::from_secs(1), second.wait_turn())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn ticket_dropped_before_its_turn_keeps_order() {
        let seq = PrintSequencer::new();
        let first = seq.issue().await;
        let second = seq.issue().await;
        let mut third = seq.issue().await;

        drop(second);
        assert!(
            tokio::time::timeout(Duration::from_millis(50), third.wait_turn())
                .await
                .is_err(),
            "third ticket ran while the first was still held"
        );

        drop(first);
        tokio::time::timeout(Duration::from_secs(1), third.wait_turn())
            .await
            .unwrap();
    }
}
