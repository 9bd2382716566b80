// Copyright The OpenTelemetry Authors
// SPDX-License-Identifier: Apache-2.0

//! Latest-wins snapshot fan-out.
//!
//! Each subscriber holds a watch receiver: a bounded slot of depth one
//! where a newer snapshot overwrites an unread older one. A slow or stalled
//! subscriber therefore skips intermediate snapshots but always observes
//! the most recent one, and publishing never blocks the session worker.
//! Dropping a receiver frees its slot; the writer is unaffected.

use schedsim_engine::StateSnapshot;
use std::sync::Arc;
use tokio::sync::watch;

/// Fan-out of state snapshots to any number of subscribers.
#[derive(Debug)]
pub struct Publisher {
    tx: watch::Sender<Arc<StateSnapshot>>,
}

impl Publisher {
    /// Creates a publisher seeded with the initial state.
    #[must_use]
    pub fn new(initial: Arc<StateSnapshot>) -> Self {
        let (tx, _rx) = watch::channel(initial);
        Publisher { tx }
    }

    /// Publishes a snapshot to every subscriber, latest-wins.
    pub fn publish(&self, snapshot: Arc<StateSnapshot>) {
        let _ = self.tx.send_replace(snapshot);
    }

    /// Registers a new subscriber; it immediately observes the latest
    /// snapshot.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Arc<StateSnapshot>> {
        self.tx.subscribe()
    }

    /// Number of live subscribers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

#[cfg(test)]
mod tests {
    #![allow(missing_docs)]
    use super::*;
    use schedsim_engine::Scheduler;

    fn snapshot_at(time: u64) -> Arc<StateSnapshot> {
        let mut snap = Scheduler::new().snapshot();
        snap.time = time;
        Arc::new(snap)
    }

    #[tokio::test]
    async fn slow_subscriber_sees_latest_only() {
        let publisher = Publisher::new(snapshot_at(0));
        let mut rx = publisher.subscribe();
        for t in 1..=5 {
            publisher.publish(snapshot_at(t));
        }
        rx.changed().await.expect("publisher alive");
        assert_eq!(rx.borrow_and_update().time, 5);
        assert!(!rx.has_changed().expect("publisher alive"));
    }

    #[tokio::test]
    async fn dropped_subscriber_frees_its_slot() {
        let publisher = Publisher::new(snapshot_at(0));
        let rx = publisher.subscribe();
        assert_eq!(publisher.subscriber_count(), 1);
        drop(rx);
        assert_eq!(publisher.subscriber_count(), 0);
        // Publishing without subscribers must not fail.
        publisher.publish(snapshot_at(1));
    }

    #[tokio::test]
    async fn each_subscriber_observes_the_same_stream_head() {
        let publisher = Publisher::new(snapshot_at(0));
        let rx_a = publisher.subscribe();
        let rx_b = publisher.subscribe();
        publisher.publish(snapshot_at(3));
        assert_eq!(rx_a.borrow().time, 3);
        assert_eq!(rx_b.borrow().time, 3);
    }
}
