//! Terminal output of a group and the sinks that receive it.
use async_trait::async_trait;
use ingest::Attributes;
use matcher::Group;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::info;

/// Why a group left the pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExitReason {
    /// Reached the timeout threshold.
    Expired,
    /// Reached the group size cap before timing out.
    Full,
}

/// What the notifier should tell the members.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExitOutcome {
    Matched,
    TimedOut,
}

/// A group that has left the pool. Its members are free to resubmit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExitRecord {
    pub members: Vec<String>,
    pub merged_attributes: Attributes,
    pub final_age: u32,
    pub reason: ExitReason,
}

impl ExitRecord {
    pub(crate) fn from_group(group: Group, reason: ExitReason) -> Self {
        let (members, merged_attributes, final_age) = group.into_parts();
        Self {
            members,
            merged_attributes,
            final_age,
            reason,
        }
    }

    /// One member means nobody matched before the timeout.
    pub fn outcome(&self) -> ExitOutcome {
        if self.members.len() >= 2 {
            ExitOutcome::Matched
        } else {
            ExitOutcome::TimedOut
        }
    }
}

/// Error returned by an [`ExitNotifier`]. The cycle driver logs it and moves on.
#[derive(Debug, thiserror::Error)]
#[error("exit notification failed: {0}")]
pub struct NotifyError(pub String);

/// Receives every exit record produced by the cycle driver.
#[async_trait]
pub trait ExitNotifier: Send + Sync {
    async fn notify(&self, record: &ExitRecord) -> Result<(), NotifyError>;
}

/// Forwards exit records into an unbounded tokio channel.
#[derive(Debug, Clone)]
pub struct ChannelNotifier {
    tx: mpsc::UnboundedSender<ExitRecord>,
}

impl ChannelNotifier {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<ExitRecord>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

#[async_trait]
impl ExitNotifier for ChannelNotifier {
    async fn notify(&self, record: &ExitRecord) -> Result<(), NotifyError> {
        self.tx
            .send(record.clone())
            .map_err(|_| NotifyError("exit channel closed".into()))
    }
}

/// Writes each exit record as a structured `group_exit_notified` event.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

#[async_trait]
impl ExitNotifier for LogNotifier {
    async fn notify(&self, record: &ExitRecord) -> Result<(), NotifyError> {
        info!(
            members = ?record.members,
            final_age = record.final_age,
            reason = ?record.reason,
            outcome = ?record.outcome(),
            "group_exit_notified"
        );
        Ok(())
    }
}
