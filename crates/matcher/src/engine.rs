use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, trace};

use crate::group::Group;
use crate::metrics::metrics_recorder;
use crate::penalty::{Penalty, SizeFeasibility};
use crate::score::{compatibility, INCOMPATIBLE_SCORE};
use crate::types::{CycleReport, MatchConfig, MatchError};


/// Forgiveness multiplier for a group of the given age.
///
/// `min(1, 1 / log2(age / compromise_factor + 1))`, and `1` whenever the
/// logarithm is not positive. Non-increasing in `age` once it passes
/// `compromise_factor`, so older groups get more lenient scores.
pub fn compromise_coefficient(age: u32, compromise_factor: f64) -> f64 {
    let log = (f64::from(age) / compromise_factor + 1.0).log2();
    if !log.is_finite() || log <= 0.0 {
        1.0
    } else {
        (1.0 / log).min(1.0)
    }
}

/// Runs the two-phase match cycle over a pool of forming groups.
///
/// The engine is stateless between cycles: the caller owns the pool and
/// hands it in on every call. Penalties are applied in registration order;
/// [`SizeFeasibility`] is always registered first.
#[derive(Clone)]
pub struct MatchEngine {
    config: MatchConfig,
    penalties: Vec<Arc<dyn Penalty>>,
}

impl std::fmt::Debug for MatchEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MatchEngine")
            .field("config", &self.config)
            .field("penalties", &self.penalties.len())
            .finish()
    }
}

impl MatchEngine {
    /// Validate `config` and build an engine with the size feasibility
    /// penalty installed.
    pub fn new(config: MatchConfig) -> Result<Self, MatchError> {
        config.validate()?;
        let size = SizeFeasibility {
            max_group_size: config.max_group_size,
        };
        Ok(Self {
            config,
            penalties: vec![Arc::new(size)],
        })
    }

    /// Register an additional penalty.
    pub fn with_penalty<P>(mut self, penalty: P) -> Self
    where
        P: Penalty + 'static,
    {
        self.penalties.push(Arc::new(penalty));
        self
    }

    pub fn config(&self) -> &MatchConfig {
        &self.config
    }

    /// Base compatibility of two groups with every penalty applied.
    ///
    /// Returns [`INCOMPATIBLE_SCORE`] when the base score is the sentinel or
    /// when any penalty factor is non-finite or reaches the sentinel.
    pub fn pair_score(&self, a: &Group, b: &Group) -> f64 {
        let weights = &self.config.weights;
        let base = compatibility(a.attributes(), b.attributes(), weights);
        if base >= INCOMPATIBLE_SCORE {
            return INCOMPATIBLE_SCORE;
        }

        let mut score = base;
        for penalty in &self.penalties {
            let factor = penalty.factor(a, b, weights);
            if !factor.is_finite() || factor >= INCOMPATIBLE_SCORE {
                return INCOMPATIBLE_SCORE;
            }
            score *= factor;
        }
        score.max(0.0)
    }

    pub fn compromise_coefficient(&self, age: u32) -> f64 {
        compromise_coefficient(age, self.config.compromise_factor)
    }

    fn accepts(&self, score: f64) -> bool {
        score < INCOMPATIBLE_SCORE && score <= self.config.match_threshold
    }

    /// Fold `arrivals` into `pool`.
    ///
    /// Phase 1 walks the pool in order; each group absorbs, in arrival
    /// order, every pending arrival it accepts until it is full. Groups left
    /// with a single member are set aside, and arrivals nobody took join the
    /// pool as singletons.
    ///
    /// Phase 2 retries each set-aside group against the pool with its score
    /// scaled by [`compromise_coefficient`]. The first accepting partner
    /// absorbs it; otherwise it rejoins the pool and becomes a candidate for
    /// the groups retried after it.
    ///
    /// Ages are not advanced here.
    pub fn run_cycle(&self, arrivals: Vec<Group>, pool: &mut Vec<Group>) -> CycleReport {
        let started = Instant::now();
        let max = self.config.max_group_size;
        let mut report = CycleReport {
            arrivals: arrivals.len(),
            ..CycleReport::default()
        };

        let mut pending = arrivals;
        let mut settled: Vec<Group> = Vec::with_capacity(pool.len() + pending.len());
        let mut lonely: Vec<Group> = Vec::new();

        for mut group in pool.drain(..) {
            let mut idx = 0;
            while idx < pending.len() && group.len() < max {
                let score = self.pair_score(&group, &pending[idx]);
                if self.accepts(score) {
                    let arrival = pending.remove(idx);
                    trace!(
                        member = ?arrival.members(),
                        into = ?group.members(),
                        score,
                        "arrival_absorbed"
                    );
                    group.merge(arrival);
                    report.absorbed += 1;
                } else {
                    idx += 1;
                }
            }

            if group.len() == 1 {
                lonely.push(group);
            } else {
                settled.push(group);
            }
        }

        report.created = pending.len();
        settled.extend(pending);

        report.retried = lonely.len();
        for group in lonely {
            let coefficient = self.compromise_coefficient(group.age());
            let partner = settled.iter().position(|candidate| {
                let score = self.pair_score(candidate, &group);
                score < INCOMPATIBLE_SCORE && self.accepts(score * coefficient)
            });

            match partner {
                Some(idx) => {
                    trace!(
                        member = ?group.members(),
                        into = ?settled[idx].members(),
                        age = group.age(),
                        coefficient,
                        "lonely_forgiven"
                    );
                    settled[idx].merge(group);
                    report.forgiven += 1;
                }
                None => settled.push(group),
            }
        }

        *pool = settled;
        report.pool_size = pool.len();

        let elapsed = started.elapsed();
        debug!(
            arrivals = report.arrivals,
            absorbed = report.absorbed,
            created = report.created,
            retried = report.retried,
            forgiven = report.forgiven,
            pool_size = report.pool_size,
            elapsed_micros = elapsed.as_micros() as u64,
            "cycle_complete"
        );
        if let Some(metrics) = metrics_recorder() {
            metrics.record_cycle(elapsed, &report);
        }

        report
    }
}
