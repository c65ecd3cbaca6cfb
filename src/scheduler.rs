//! The cycle driver: drain, match, age, evict, notify.
//!
//! A [`Scheduler`] owns the pool, the engine and the membership registry.
//! [`Scheduler::tick`] runs exactly one cycle synchronously, which is what
//! tests and embedders that bring their own clock use. [`Scheduler::run`]
//! wraps it in a tokio loop paced by `tick_interval_ms`.
use std::sync::Arc;
use std::time::Instant;

use ingest::{IngestQueue, IngestReceiver, IngestSender};
use matcher::{CycleReport, Group, MatchEngine, MembershipRegistry, Penalty, RegistryView};
use serde::Serialize;
use tokio::sync::watch;
use tracing::{debug, info, info_span, warn};

use crate::config::{ConfigLoadError, GroupMatchConfig, SchedulerConfig};
use crate::exit::{ExitNotifier, ExitReason, ExitRecord};

/// Snapshot published after every tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct EngineStatus {
    pub ticks: u64,
    /// Groups still forming.
    pub pool_groups: usize,
    /// Identities currently bound to a forming group.
    pub waiting_members: usize,
    /// Groups that have left the pool since start.
    pub exited_total: u64,
}

/// Everything one tick did.
#[derive(Debug, Clone, PartialEq)]
pub struct TickOutcome {
    /// 1-based index of this tick.
    pub tick: u64,
    /// Profiles admitted into the cycle.
    pub admitted: usize,
    /// Identities dropped because they already belong to a live group.
    pub rejected: Vec<String>,
    pub report: CycleReport,
    pub exits: Vec<ExitRecord>,
}

pub struct Scheduler {
    engine: MatchEngine,
    registry: MembershipRegistry,
    config: SchedulerConfig,
    receiver: IngestReceiver,
    pool: Vec<Group>,
    ticks: u64,
    exited_total: u64,
    status: watch::Sender<EngineStatus>,
}

impl Scheduler {
    /// Build a scheduler draining `receiver`. Fails on invalid configuration,
    /// in which case nothing is started.
    pub fn new(
        config: GroupMatchConfig,
        receiver: IngestReceiver,
    ) -> Result<Self, ConfigLoadError> {
        config.validate()?;
        let engine = MatchEngine::new(config.matcher.clone())?;
        let (status, _) = watch::channel(EngineStatus::default());

        info!(
            name = ?config.name,
            timeout_threshold = config.scheduler.timeout_threshold,
            tick_interval_ms = config.scheduler.tick_interval_ms,
            match_threshold = config.matcher.match_threshold,
            max_group_size = config.matcher.max_group_size,
            "scheduler_ready"
        );

        Ok(Self {
            engine,
            registry: MembershipRegistry::new(),
            config: config.scheduler,
            receiver,
            pool: Vec::new(),
            ticks: 0,
            exited_total: 0,
            status,
        })
    }

    /// Validate `config`, then create the intake queue and the scheduler
    /// that drains it.
    pub fn with_queue(
        config: GroupMatchConfig,
    ) -> Result<(IngestSender, Self), ConfigLoadError> {
        config.validate()?;
        let (sender, receiver) = IngestQueue::bounded(&config.ingest);
        let scheduler = Self::new(config, receiver)?;
        Ok((sender, scheduler))
    }

    /// Register an extra penalty on the underlying engine.
    pub fn with_penalty<P>(mut self, penalty: P) -> Self
    where
        P: Penalty + 'static,
    {
        self.engine = self.engine.with_penalty(penalty);
        self
    }

    /// Read-only handle on the membership set. Only [`Scheduler::tick`]
    /// binds or releases identities.
    pub fn registry(&self) -> RegistryView {
        self.registry.view()
    }

    pub fn pool(&self) -> &[Group] {
        &self.pool
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Subscribe to the status published after every tick.
    pub fn status(&self) -> watch::Receiver<EngineStatus> {
        self.status.subscribe()
    }

    /// Run one cycle: admit queued profiles, match, then age and evict.
    pub fn tick(&mut self) -> TickOutcome {
        let tick = self.ticks + 1;
        let span = info_span!("tick", tick);
        let _enter = span.enter();

        let batch = self.receiver.drain(self.config.max_drain_per_tick);
        let mut arrivals = Vec::with_capacity(batch.len());
        let mut rejected = Vec::new();
        for profile in batch {
            let identity = profile.identity.clone();
            match Group::admit(profile, &self.registry) {
                Ok(group) => arrivals.push(group),
                Err(err) => {
                    warn!(identity = %identity, error = %err, "duplicate_member");
                    rejected.push(identity);
                }
            }
        }
        let admitted = arrivals.len();

        let report = self.engine.run_cycle(arrivals, &mut self.pool);
        let exits = self.age_and_evict();

        self.ticks = tick;
        self.exited_total += exits.len() as u64;
        self.publish_status();

        TickOutcome {
            tick,
            admitted,
            rejected,
            report,
            exits,
        }
    }

    /// Expire groups at the timeout (and full groups, when enabled); age
    /// everything else by one.
    fn age_and_evict(&mut self) -> Vec<ExitRecord> {
        let threshold = self.config.timeout_threshold;
        let cap = self.engine.config().max_group_size;
        let release_full = self.config.release_full_groups;

        let mut exits = Vec::new();
        let mut kept = Vec::with_capacity(self.pool.len());
        for mut group in std::mem::take(&mut self.pool) {
            let reason = if group.age() >= threshold {
                Some(ExitReason::Expired)
            } else if release_full && group.len() >= cap {
                Some(ExitReason::Full)
            } else {
                None
            };

            match reason {
                Some(reason) => {
                    self.registry.release_all(group.members());
                    let record = ExitRecord::from_group(group, reason);
                    info!(
                        members = ?record.members,
                        final_age = record.final_age,
                        reason = ?reason,
                        outcome = ?record.outcome(),
                        "group_exit"
                    );
                    exits.push(record);
                }
                None => {
                    group.step();
                    kept.push(group);
                }
            }
        }
        self.pool = kept;
        exits
    }

    fn publish_status(&self) {
        let status = EngineStatus {
            ticks: self.ticks,
            pool_groups: self.pool.len(),
            waiting_members: self.pool.iter().map(Group::len).sum(),
            exited_total: self.exited_total,
        };
        self.status.send_replace(status);
    }

    /// Drive ticks until `shutdown` flips to `true` (or its sender is
    /// dropped), or until every sender is gone and the pool has drained.
    ///
    /// Exit records go to `notifier` in tick order. A notifier error is
    /// logged and does not stop the loop. Returns the final status.
    pub async fn run(
        mut self,
        notifier: Arc<dyn ExitNotifier>,
        mut shutdown: watch::Receiver<bool>,
    ) -> EngineStatus {
        let interval = self.config.tick_interval();

        loop {
            if *shutdown.borrow() {
                break;
            }

            let started = Instant::now();
            let outcome = self.tick();
            for record in &outcome.exits {
                if let Err(err) = notifier.notify(record).await {
                    warn!(error = %err, members = ?record.members, "exit_notify_failed");
                }
            }

            if self.receiver.is_disconnected() && self.pool.is_empty() {
                info!(ticks = self.ticks, "ingest_closed_pool_drained");
                break;
            }

            let elapsed = started.elapsed();
            if elapsed > interval {
                warn!(
                    elapsed_ms = elapsed.as_millis() as u64,
                    interval_ms = interval.as_millis() as u64,
                    "cycle_overrun"
                );
            }
            let pause = interval.saturating_sub(elapsed);
            debug!(pause_ms = pause.as_millis() as u64, "tick_sleep");

            tokio::select! {
                _ = tokio::time::sleep(pause) => {}
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        info!(
            ticks = self.ticks,
            pool_groups = self.pool.len(),
            exited_total = self.exited_total,
            "scheduler_stopped"
        );
        *self.status.borrow()
    }
}

impl std::fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scheduler")
            .field("config", &self.config)
            .field("pool_groups", &self.pool.len())
            .field("ticks", &self.ticks)
            .finish()
    }
}
