//! Aggregate progress across concurrent transfers.
//!
//! Each transfer reports through its own [`ProgressCallback`], which only
//! forwards a [`ProgressUpdate`] over a channel. A single owner drains the
//! channel into a [`ProgressAggregator`], so the running total is mutated
//! from one place only.

use std::sync::Arc;

use staticpub_transfer::{ProgressCallback, TransferProgress};
use tokio::sync::mpsc::UnboundedSender;

/// A progress notification tagged with the index of the file it belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressUpdate {
    pub index: usize,
    pub progress: TransferProgress,
}

/// Running byte count over a fixed set of transfers.
#[derive(Debug, Clone)]
pub struct ProgressAggregator {
    limits: Vec<u64>,
    sent: Vec<u64>,
    current: u64,
    total: u64,
}

impl ProgressAggregator {
    /// One slot per transfer, each capped at its declared length.
    pub fn new(lengths: impl IntoIterator<Item = u64>) -> Self {
        let limits: Vec<u64> = lengths.into_iter().collect();
        let total = limits.iter().sum();
        Self {
            sent: vec![0; limits.len()],
            limits,
            current: 0,
            total,
        }
    }

    pub fn current(&self) -> u64 {
        self.current
    }

    pub fn total(&self) -> u64 {
        self.total
    }

    /// Applies `update` and returns the new aggregate.
    ///
    /// A restart drops whatever that transfer had reported so far. Updates
    /// for unknown indices are ignored.
    pub fn apply(&mut self, update: ProgressUpdate) -> u64 {
        let (Some(sent), Some(&limit)) = (
            self.sent.get_mut(update.index),
            self.limits.get(update.index),
        ) else {
            return self.current;
        };

        match update.progress {
            TransferProgress::Restarted => {
                self.current -= *sent;
                *sent = 0;
            }
            TransferProgress::Sent(n) => {
                let delta = n.min(limit - *sent);
                *sent += delta;
                self.current += delta;
            }
        }
        self.current
    }
}

/// Callback that forwards every notification for transfer `index` to `tx`.
pub(crate) fn forward_to(tx: UnboundedSender<ProgressUpdate>, index: usize) -> ProgressCallback {
    Arc::new(move |progress| {
        // The receiver only goes away once the upload has settled.
        let _ = tx.send(ProgressUpdate { index, progress });
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sent(index: usize, n: u64) -> ProgressUpdate {
        ProgressUpdate {
            index,
            progress: TransferProgress::Sent(n),
        }
    }

    fn restarted(index: usize) -> ProgressUpdate {
        ProgressUpdate {
            index,
            progress: TransferProgress::Restarted,
        }
    }

    #[test]
    fn sums_interleaved_updates() {
        let mut agg = ProgressAggregator::new([100, 200, 300]);
        assert_eq!(agg.total(), 600);

        agg.apply(sent(2, 150));
        agg.apply(sent(0, 100));
        agg.apply(sent(1, 200));
        assert_eq!(agg.apply(sent(2, 150)), 600);
    }

    #[test]
    fn restart_removes_only_that_files_bytes() {
        let mut agg = ProgressAggregator::new([100, 200]);
        agg.apply(sent(0, 100));
        agg.apply(sent(1, 120));

        assert_eq!(agg.apply(restarted(1)), 100);
        assert_eq!(agg.apply(sent(1, 200)), 300);
    }

    #[test]
    fn never_exceeds_declared_total() {
        let mut agg = ProgressAggregator::new([10]);
        agg.apply(sent(0, 8));
        assert_eq!(agg.apply(sent(0, 8)), 10);
        assert_eq!(agg.current(), agg.total());
    }

    #[test]
    fn unknown_index_is_ignored() {
        let mut agg = ProgressAggregator::new([10]);
        assert_eq!(agg.apply(sent(3, 5)), 0);
    }

    #[tokio::test]
    async fn forwarded_callbacks_arrive_tagged() {
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        let first = forward_to(tx.clone(), 0);
        let second = forward_to(tx, 1);

        second(TransferProgress::Sent(7));
        first(TransferProgress::Restarted);

        assert_eq!(rx.recv().await, Some(sent(1, 7)));
        assert_eq!(rx.recv().await, Some(restarted(0)));
    }
}
