use std::collections::BTreeMap;

use ingest::{DIFFICULTY, SIZE, TOPICS};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Relative importance of each attribute in the compatibility score.
///
/// Weights are multiplied directly into each attribute's error term, so
/// `{difficulty: 3, size: 2}` makes a one-step difficulty gap cost more than
/// a one-seat size gap.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Weights(BTreeMap<String, f64>);

impl Weights {
    pub fn new(weights: BTreeMap<String, f64>) -> Self {
        Self(weights)
    }

    /// Builder-style insert.
    pub fn with(mut self, attr: impl Into<String>, weight: f64) -> Self {
        self.0.insert(attr.into(), weight);
        self
    }

    pub fn get(&self, attr: &str) -> Option<f64> {
        self.0.get(attr).copied()
    }

    /// Sum of all weights. Used to normalize penalty discounts.
    pub fn total(&self) -> f64 {
        self.0.values().sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.0.iter().map(|(k, v)| (k.as_str(), *v))
    }
}

impl Default for Weights {
    fn default() -> Self {
        Self::new(BTreeMap::new())
            .with(SIZE, 2.0)
            .with(DIFFICULTY, 3.0)
            .with(TOPICS, 1.0)
    }
}

impl<K: Into<String>> FromIterator<(K, f64)> for Weights {
    fn from_iter<I: IntoIterator<Item = (K, f64)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}

/// Tuning knobs for the match cycle.
///
/// `MatchConfig` is serde-friendly so it can be embedded in the service
/// YAML under `matcher:`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchConfig {
    pub weights: Weights,
    /// Acceptance cutoff; a pair merges when its score is at or below this.
    /// Lower is stricter.
    pub match_threshold: f64,
    /// Decay rate of the forgiveness pass. Smaller values relax lonely
    /// groups sooner.
    pub compromise_factor: f64,
    /// Hard cap on members per group.
    pub max_group_size: usize,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            weights: Weights::default(),
            match_threshold: 4.0,
            compromise_factor: 2.0,
            max_group_size: 4,
        }
    }
}

impl MatchConfig {
    /// Validate the configuration. An invalid config must stop the service
    /// from starting.
    pub fn validate(&self) -> Result<(), MatchError> {
        for attr in [SIZE, DIFFICULTY, TOPICS] {
            if self.weights.get(attr).is_none() {
                return Err(MatchError::InvalidConfig(format!(
                    "weights.{attr} is required"
                )));
            }
        }
        if let Some((attr, weight)) = self
            .weights
            .iter()
            .find(|(_, w)| !w.is_finite() || *w < 0.0)
        {
            return Err(MatchError::InvalidConfig(format!(
                "weights.{attr} must be a finite, non-negative number (got {weight})"
            )));
        }
        if self.weights.total() <= 0.0 {
            return Err(MatchError::InvalidConfig(
                "weights must not all be zero".into(),
            ));
        }
        if !self.match_threshold.is_finite() || self.match_threshold <= 0.0 {
            return Err(MatchError::InvalidConfig(format!(
                "match_threshold must be positive (got {})",
                self.match_threshold
            )));
        }
        if !self.compromise_factor.is_finite() || self.compromise_factor <= 0.0 {
            return Err(MatchError::InvalidConfig(format!(
                "compromise_factor must be positive (got {})",
                self.compromise_factor
            )));
        }
        if self.max_group_size < 2 {
            return Err(MatchError::InvalidConfig(format!(
                "max_group_size must be at least 2 (got {})",
                self.max_group_size
            )));
        }
        Ok(())
    }
}

/// Counters describing what one invocation of the match cycle did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CycleReport {
    /// New profiles offered to the cycle.
    pub arrivals: usize,
    /// Arrivals merged into an existing group during phase 1.
    pub absorbed: usize,
    /// Arrivals that became new singleton groups.
    pub created: usize,
    /// Lonely groups sent to the forgiveness pass.
    pub retried: usize,
    /// Lonely groups merged during the forgiveness pass.
    pub forgiven: usize,
    /// Groups in the pool once the cycle finished.
    pub pool_size: usize,
}

/// Errors surfaced by the matching layer.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MatchError {
    /// The identity already belongs to a live group.
    #[error("identity {0} already belongs to a live group")]
    DuplicateMember(String),
    #[error("invalid match configuration: {0}")]
    InvalidConfig(String),
}
