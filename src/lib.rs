//! Umbrella crate for the groupmatch study-group engine.
//!
//! Requests enter through the [`ingest`] stage, are matched into forming
//! groups by the [`matcher`] stage, and leave through an [`ExitNotifier`]
//! once they are complete or have waited too long. This crate wires the
//! stages together behind a [`Scheduler`] configured from one YAML file.
//!
//! ```rust
//! use groupmatch::{GroupMatchConfig, JoinRequest, Scheduler};
//!
//! let (tx, mut scheduler) = Scheduler::with_queue(GroupMatchConfig::default()).unwrap();
//! tx.try_submit(JoinRequest::new("alice", 1, 2, ["string", "array"])).unwrap();
//! tx.try_submit(JoinRequest::new("bob", 1, 2, ["string", "array"])).unwrap();
//!
//! // Both arrive as singletons, then pair up on the next cycle.
//! assert_eq!(scheduler.tick().report.created, 2);
//! scheduler.tick();
//! assert_eq!(scheduler.pool()[0].members(), ["alice", "bob"]);
//! ```

pub mod config;
pub mod exit;
pub mod scheduler;

pub use ingest::{
    AttributeValue, Attributes, IngestConfig, IngestError, IngestQueue, IngestReceiver,
    IngestSender, JoinRequest, Profile, ingest,
};
pub use matcher::{
    CycleMetrics, CycleReport, Group, INCOMPATIBLE_SCORE, MatchConfig, MatchEngine, MatchError,
    MembershipRegistry, Penalty, RegistryView, SizeFeasibility, Weights, compatibility,
    set_cycle_metrics,
};

pub use crate::config::{ConfigLoadError, GroupMatchConfig, LoggingConfig, SchedulerConfig};
pub use crate::exit::{
    ChannelNotifier, ExitNotifier, ExitOutcome, ExitReason, ExitRecord, LogNotifier, NotifyError,
};
pub use crate::scheduler::{EngineStatus, Scheduler, TickOutcome};
