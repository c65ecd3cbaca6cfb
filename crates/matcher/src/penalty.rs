//! Multiplicative modifiers applied to the base compatibility score.
//!
//! Every registered penalty returns a factor; factors are multiplied into
//! the base score and the product is clamped at zero. A factor at or above
//! [`INCOMPATIBLE_SCORE`] rejects the pair outright, whatever the base score.
use ingest::SIZE;

use crate::group::Group;
use crate::score::INCOMPATIBLE_SCORE;
use crate::types::Weights;

/// A score modifier for a candidate pair.
///
/// Plain closures with the matching signature implement this trait, so
/// ad-hoc penalties can be registered without a new type:
///
/// ```rust
/// use matcher::{Group, MatchConfig, MatchEngine, Weights};
///
/// let engine = MatchEngine::new(MatchConfig::default())
///     .unwrap()
///     .with_penalty(|a: &Group, b: &Group, _: &Weights| {
///         if a.age() + b.age() > 20 { 0.5 } else { 1.0 }
///     });
/// # let _ = engine;
/// ```
pub trait Penalty: Send + Sync {
    fn factor(&self, a: &Group, b: &Group, weights: &Weights) -> f64;
}

impl<F> Penalty for F
where
    F: Fn(&Group, &Group, &Weights) -> f64 + Send + Sync,
{
    fn factor(&self, a: &Group, b: &Group, weights: &Weights) -> f64 {
        self(a, b, weights)
    }
}

/// Size feasibility of merging two candidates.
///
/// - Union larger than `max_group_size`: rejected.
/// - Union smaller than both desired sizes: discounted by
///   `1 - weight[size] / Σ weights`, since the group still has to grow.
/// - Otherwise neutral.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SizeFeasibility {
    pub max_group_size: usize,
}

impl Penalty for SizeFeasibility {
    fn factor(&self, a: &Group, b: &Group, weights: &Weights) -> f64 {
        let union = a.len() + b.len();
        if union > self.max_group_size {
            return INCOMPATIBLE_SCORE;
        }

        let (Some(want_a), Some(want_b)) = (a.desired_size(), b.desired_size()) else {
            return 1.0;
        };
        let total = weights.total();
        if (union as f64) < want_a.min(want_b) && total > 0.0 {
            1.0 - weights.get(SIZE).unwrap_or(0.0) / total
        } else {
            1.0
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use ingest::Profile;

    use super::*;

    fn group(id: &str, size: u32) -> Group {
        let mut topics = BTreeMap::new();
        topics.insert("tree".to_string(), 1.0);
        Group::unregistered(Profile::with_topic_weights(id, 1, size, topics).unwrap())
    }

    fn grown(ids: &[&str], size: u32) -> Group {
        let mut iter = ids.iter();
        let mut g = group(iter.next().unwrap(), size);
        for id in iter {
            g.merge(group(id, size));
        }
        g
    }

    const CAP: SizeFeasibility = SizeFeasibility { max_group_size: 4 };

    #[test]
    fn undersized_pair_is_discounted() {
        let w = Weights::default();
        // union 2 < min(4, 4); discount 1 - 2/6
        let f = CAP.factor(&group("a", 4), &group("b", 4), &w);
        assert!((f - 2.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn satisfied_pair_is_neutral() {
        let w = Weights::default();
        assert_eq!(CAP.factor(&group("a", 2), &group("b", 2), &w), 1.0);
        assert_eq!(CAP.factor(&group("a", 2), &group("b", 4), &w), 1.0);
    }

    #[test]
    fn wildcard_size_is_neutral() {
        let w = Weights::default();
        assert_eq!(CAP.factor(&group("a", 0), &group("b", 4), &w), 1.0);
    }

    #[test]
    fn oversized_union_rejected() {
        let w = Weights::default();
        let three = grown(&["a", "b", "c"], 4);
        let two = grown(&["d", "e"], 4);
        assert_eq!(CAP.factor(&three, &two, &w), INCOMPATIBLE_SCORE);
        assert!(CAP.factor(&three, &group("f", 4), &w) < INCOMPATIBLE_SCORE);
    }

    #[test]
    fn closures_are_penalties() {
        let halve = |_: &Group, _: &Group, _: &Weights| 0.5;
        let boxed: Box<dyn Penalty> = Box::new(halve);
        assert_eq!(
            boxed.factor(&group("a", 2), &group("b", 2), &Weights::default()),
            0.5
        );
    }
}
