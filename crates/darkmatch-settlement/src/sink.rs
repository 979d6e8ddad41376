//! Non-blocking error output.

use std::sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
};

use darkmatch_types::DarkmatchError;
use tokio::sync::mpsc::{self, error::TrySendError};

/// Sending half of a bounded error channel.
///
/// Reporting never waits: when the channel is full the error is logged,
/// dropped and counted. A closed channel means nobody is listening and the
/// error is only logged.
#[derive(Debug, Clone)]
pub struct ErrorSink {
    tx: mpsc::Sender<DarkmatchError>,
    dropped: Arc<AtomicU64>,
}

impl ErrorSink {
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<DarkmatchError>) {
        Self::with_counter(capacity, Arc::new(AtomicU64::new(0)))
    }

    /// Like [`ErrorSink::channel`], counting drops into `dropped`.
    pub fn with_counter(
        capacity: usize,
        dropped: Arc<AtomicU64>,
    ) -> (Self, mpsc::Receiver<DarkmatchError>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self { tx, dropped }, rx)
    }

    pub fn report(&self, err: DarkmatchError) {
        match self.tx.try_send(err) {
            Ok(()) => {}
            Err(TrySendError::Full(err)) => {
                let dropped = self.dropped.fetch_add(1, Ordering::Relaxed) + 1;
                tracing::warn!(error = %err, dropped, "Error output full, dropping error");
            }
            Err(TrySendError::Closed(err)) => {
                tracing::debug!(error = %err, "Error output closed");
            }
        }
    }

    /// Errors dropped because the channel was full.
    #[must_use]
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use darkmatch_types::ComputationId;

    use super::*;

    fn err(n: u8) -> DarkmatchError {
        DarkmatchError::ComputationNotFound(ComputationId([n; 32]))
    }

    #[test]
    fn full_channel_drops_and_counts() {
        let (sink, mut rx) = ErrorSink::channel(2);
        for n in 0..5 {
            sink.report(err(n));
        }
        assert_eq!(sink.dropped(), 3);
        assert!(matches!(rx.try_recv(), Ok(DarkmatchError::ComputationNotFound(id)) if id.0[0] == 0));
        assert!(rx.try_recv().is_ok());
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn closed_channel_is_not_counted() {
        let (sink, rx) = ErrorSink::channel(1);
        drop(rx);
        sink.report(err(0));
        assert_eq!(sink.dropped(), 0);
    }

    #[test]
    fn clones_share_the_counter() {
        let counter = Arc::new(AtomicU64::new(0));
        let (sink, _rx) = ErrorSink::with_counter(1, counter.clone());
        let other = sink.clone();
        sink.report(err(0));
        other.report(err(1));
        assert_eq!(counter.load(Ordering::Relaxed), 1);
        assert_eq!(sink.dropped(), 1);
    }
}
