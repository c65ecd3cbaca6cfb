//! # Group Matcher (`matcher`)
//!
//! ## Purpose
//!
//! `matcher` turns a stream of normalized [`ingest::Profile`]s into small,
//! compatible groups. It owns the pairwise scoring model, the penalty
//! pipeline, the forming [`Group`] type and the two-phase match cycle. It
//! does not schedule anything: the caller (usually the `groupmatch`
//! scheduler) owns the pool, ages it, and decides when a group leaves.
//!
//! ## Core Types
//!
//! - [`Weights`]: per-attribute importance used by [`compatibility`].
//! - [`MatchConfig`]: weights, acceptance threshold, forgiveness decay and
//!   group size cap. Validated by [`MatchEngine::new`].
//! - [`Group`]: members in join order, merged attributes, age in cycles.
//! - [`Penalty`]: multiplicative score modifier. [`SizeFeasibility`] is
//!   always installed; closures can be added with
//!   [`MatchEngine::with_penalty`].
//! - [`MembershipRegistry`]: one live group per identity, per engine.
//! - [`MatchEngine`]: runs [`MatchEngine::run_cycle`] and reports a
//!   [`CycleReport`].
//!
//! ## Example Usage
//!
//! ```rust
//! use std::collections::BTreeMap;
//!
//! use ingest::Profile;
//! use matcher::{Group, MatchConfig, MatchEngine, MembershipRegistry};
//!
//! let engine = MatchEngine::new(MatchConfig::default()).expect("valid config");
//! let registry = MembershipRegistry::new();
//!
//! let topics = BTreeMap::from([("tree".to_string(), 1.0)]);
//! let a = Profile::with_topic_weights("alice", 2, 3, topics.clone()).unwrap();
//! let b = Profile::with_topic_weights("bob", 2, 3, topics).unwrap();
//!
//! let mut pool = vec![Group::admit(a, &registry).unwrap()];
//! let report = engine.run_cycle(vec![Group::admit(b, &registry).unwrap()], &mut pool);
//!
//! assert_eq!(report.absorbed, 1);
//! assert_eq!(pool[0].members(), ["alice", "bob"]);
//! ```
//!
//! ## Observability
//!
//! Every cycle emits a `cycle_complete` debug event. Install a
//! [`CycleMetrics`] implementation via [`set_cycle_metrics`] to also record
//! per-cycle latency and counters in an external backend.

pub mod engine;
pub mod group;
pub mod metrics;
pub mod penalty;
pub mod registry;
pub mod score;
pub mod types;

pub use crate::engine::{compromise_coefficient, MatchEngine};
pub use crate::group::Group;
pub use crate::metrics::{set_cycle_metrics, CycleMetrics};
pub use crate::penalty::{Penalty, SizeFeasibility};
pub use crate::registry::{MembershipRegistry, RegistryView};
pub use crate::score::{compatibility, try_compatibility, ScoreError, INCOMPATIBLE_SCORE};
pub use crate::types::{CycleReport, MatchConfig, MatchError, Weights};
