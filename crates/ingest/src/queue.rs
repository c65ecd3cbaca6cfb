//! Bounded intake queue between the transport and the cycle driver.
//!
//! Producers validate on their own side of the queue, so a malformed request
//! is reported to the submitter immediately and never reaches the engine.
//! The consumer side only ever polls: [`IngestReceiver::drain`] takes
//! whatever is available right now and returns.
//!
//! ```rust
//! use ingest::{IngestConfig, IngestQueue, JoinRequest};
//!
//! let (tx, mut rx) = IngestQueue::bounded(&IngestConfig::default());
//! tx.try_submit(JoinRequest::new("U1", 1, 2, ["tree"])).unwrap();
//! let batch = rx.drain(10);
//! assert_eq!(batch.len(), 1);
//! assert!(rx.drain(10).is_empty());
//! ```
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc::{self, error::SendTimeoutError, error::TryRecvError, error::TrySendError};
use tracing::warn;

use crate::config::IngestConfig;
use crate::error::IngestError;
use crate::types::{JoinRequest, Profile};

/// Constructor namespace for the intake channel.
pub struct IngestQueue;

impl IngestQueue {
    /// Create a queue holding at most `cfg.queue_capacity` profiles.
    pub fn bounded(cfg: &IngestConfig) -> (IngestSender, IngestReceiver) {
        let (tx, rx) = mpsc::channel(cfg.queue_capacity.max(1));
        (
            IngestSender {
                tx,
                cfg: Arc::new(cfg.clone()),
            },
            IngestReceiver {
                rx,
                disconnected: false,
            },
        )
    }
}

/// Producer half. Cheap to clone; safe to share across threads and tasks.
#[derive(Clone)]
pub struct IngestSender {
    tx: mpsc::Sender<Profile>,
    cfg: Arc<IngestConfig>,
}

impl IngestSender {
    /// Validate and enqueue without waiting.
    pub fn try_submit(&self, request: JoinRequest) -> Result<(), IngestError> {
        let profile = crate::ingest(request, &self.cfg)?;
        match self.tx.try_send(profile) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(profile)) => Err(self.overflow(&profile)),
            Err(TrySendError::Closed(_)) => Err(IngestError::QueueClosed),
        }
    }

    /// Validate and enqueue, waiting up to `timeout` for space.
    pub async fn submit_timeout(
        &self,
        request: JoinRequest,
        timeout: Duration,
    ) -> Result<(), IngestError> {
        let profile = crate::ingest(request, &self.cfg)?;
        match self.tx.send_timeout(profile, timeout).await {
            Ok(()) => Ok(()),
            Err(SendTimeoutError::Timeout(profile)) => Err(self.overflow(&profile)),
            Err(SendTimeoutError::Closed(_)) => Err(IngestError::QueueClosed),
        }
    }

    /// [`submit_timeout`](Self::submit_timeout) with the configured wait.
    pub async fn submit(&self, request: JoinRequest) -> Result<(), IngestError> {
        let timeout = self.cfg.submit_timeout();
        self.submit_timeout(request, timeout).await
    }

    pub fn capacity(&self) -> usize {
        self.tx.max_capacity()
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    fn overflow(&self, profile: &Profile) -> IngestError {
        let capacity = self.capacity();
        warn!(identity = %profile.identity, capacity, "ingest_queue_full");
        IngestError::QueueOverflow { capacity }
    }
}

/// Consumer half, owned by the cycle driver.
pub struct IngestReceiver {
    rx: mpsc::Receiver<Profile>,
    disconnected: bool,
}

impl IngestReceiver {
    /// Take up to `max` queued profiles without blocking.
    pub fn drain(&mut self, max: usize) -> Vec<Profile> {
        let mut batch = Vec::new();
        while batch.len() < max {
            match self.rx.try_recv() {
                Ok(profile) => batch.push(profile),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    self.disconnected = true;
                    break;
                }
            }
        }
        batch
    }

    /// True once every sender has been dropped and the queue was observed
    /// empty by [`drain`](Self::drain).
    pub fn is_disconnected(&self) -> bool {
        self.disconnected
    }

    /// Stop accepting new submissions; queued profiles can still be drained.
    pub fn close(&mut self) {
        self.rx.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_queue(capacity: usize) -> (IngestSender, IngestReceiver) {
        IngestQueue::bounded(&IngestConfig {
            queue_capacity: capacity,
            ..Default::default()
        })
    }

    #[test]
    fn full_queue_reports_overflow() {
        let (tx, mut rx) = small_queue(2);
        tx.try_submit(JoinRequest::new("a", 1, 2, ["tree"])).unwrap();
        tx.try_submit(JoinRequest::new("b", 1, 2, ["tree"])).unwrap();

        let err = tx.try_submit(JoinRequest::new("c", 1, 2, ["tree"])).unwrap_err();
        assert_eq!(err, IngestError::QueueOverflow { capacity: 2 });

        // The rejected request never entered the queue.
        let ids: Vec<_> = rx.drain(10).into_iter().map(|p| p.identity).collect();
        assert_eq!(ids, vec!["a", "b"]);
    }

    #[test]
    fn invalid_request_never_enqueued() {
        let (tx, mut rx) = small_queue(4);
        let err = tx.try_submit(JoinRequest::new("", 1, 2, ["tree"])).unwrap_err();
        assert_eq!(err, IngestError::EmptyIdentity);
        assert!(rx.drain(4).is_empty());
    }

    #[test]
    fn drain_respects_batch_limit() {
        let (tx, mut rx) = small_queue(8);
        for i in 0..5 {
            tx.try_submit(JoinRequest::new(format!("u{i}"), 1, 2, ["tree"]))
                .unwrap();
        }
        assert_eq!(rx.drain(3).len(), 3);
        assert_eq!(rx.drain(3).len(), 2);
        assert!(!rx.is_disconnected());
    }

    #[test]
    fn dropping_senders_marks_disconnected() {
        let (tx, mut rx) = small_queue(4);
        tx.try_submit(JoinRequest::new("a", 1, 2, ["tree"])).unwrap();
        drop(tx);
        assert_eq!(rx.drain(4).len(), 1);
        assert!(rx.is_disconnected());
    }

    #[test]
    fn closed_receiver_rejects_submissions() {
        let (tx, mut rx) = small_queue(4);
        rx.close();
        let err = tx.try_submit(JoinRequest::new("a", 1, 2, ["tree"])).unwrap_err();
        assert_eq!(err, IngestError::QueueClosed);
    }

    #[tokio::test]
    async fn submit_timeout_gives_up_when_full() {
        let (tx, _rx) = small_queue(1);
        tx.submit(JoinRequest::new("a", 1, 2, ["tree"])).await.unwrap();
        let err = tx
            .submit_timeout(
                JoinRequest::new("b", 1, 2, ["tree"]),
                Duration::from_millis(20),
            )
            .await
            .unwrap_err();
        assert!(err.is_retryable());
    }
}
