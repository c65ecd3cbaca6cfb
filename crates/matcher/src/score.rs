//! Pairwise compatibility scoring.
//!
//! The score is a distance: `0.0` is a perfect match and larger is worse.
//! Only attributes present on both sides contribute.
//!
//! | Attribute kind | Contribution |
//! |----------------|--------------|
//! | Scalar | `w * |x - y|`, or `0` when either side is `0` (wildcard) |
//! | Distribution | `w * (2 - Σ shared (x[t] + y[t]))` over topics on both sides |
//!
//! Profiles that cannot be compared (kind mismatch, missing weight,
//! non-finite values) score [`INCOMPATIBLE_SCORE`] instead of failing, so a
//! single bad profile never aborts a cycle.
use ingest::{AttributeValue, Attributes};
use thiserror::Error;
use tracing::debug;

use crate::types::Weights;

/// Sentinel distance meaning "never matches".
pub const INCOMPATIBLE_SCORE: f64 = 2_000_000.0;

/// Why two attribute bags could not be compared.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ScoreError {
    #[error("attribute {attr} is a {left} on one side and a {right} on the other")]
    KindMismatch {
        attr: String,
        left: &'static str,
        right: &'static str,
    },
    #[error("no weight configured for attribute {0}")]
    MissingWeight(String),
    #[error("attribute {0} holds a non-finite value")]
    NonFinite(String),
}

/// Compatibility distance, falling back to [`INCOMPATIBLE_SCORE`] on error.
pub fn compatibility(x: &Attributes, y: &Attributes, weights: &Weights) -> f64 {
    match try_compatibility(x, y, weights) {
        Ok(score) => score,
        Err(err) => {
            debug!(error = %err, "score_incompatible");
            INCOMPATIBLE_SCORE
        }
    }
}

/// Compatibility distance, reporting why a pair is not comparable.
pub fn try_compatibility(
    x: &Attributes,
    y: &Attributes,
    weights: &Weights,
) -> Result<f64, ScoreError> {
    let mut score = 0.0;
    for (attr, left) in x {
        let Some(right) = y.get(attr) else {
            continue;
        };
        let weight = weights
            .get(attr)
            .ok_or_else(|| ScoreError::MissingWeight(attr.clone()))?;

        let error = match (left, right) {
            (AttributeValue::Scalar(a), AttributeValue::Scalar(b)) => {
                if !a.is_finite() || !b.is_finite() {
                    return Err(ScoreError::NonFinite(attr.clone()));
                }
                if *a == 0.0 || *b == 0.0 {
                    0.0
                } else {
                    (a - b).abs()
                }
            }
            (AttributeValue::Distribution(a), AttributeValue::Distribution(b)) => {
                let shared: f64 = a
                    .iter()
                    .filter_map(|(topic, wa)| b.get(topic).map(|wb| wa + wb))
                    .sum();
                if !shared.is_finite() {
                    return Err(ScoreError::NonFinite(attr.clone()));
                }
                (2.0 - shared).max(0.0)
            }
            _ => {
                return Err(ScoreError::KindMismatch {
                    attr: attr.clone(),
                    left: left.kind(),
                    right: right.kind(),
                })
            }
        };
        score += weight * error;
    }
    Ok(score)
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use ingest::{DIFFICULTY, SIZE, TOPICS};

    use super::*;

    fn attrs(difficulty: f64, size: f64, topics: &[(&str, f64)]) -> Attributes {
        let mut out = Attributes::new();
        out.insert(DIFFICULTY.into(), AttributeValue::Scalar(difficulty));
        out.insert(SIZE.into(), AttributeValue::Scalar(size));
        out.insert(
            TOPICS.into(),
            AttributeValue::Distribution(
                topics.iter().map(|(t, w)| (t.to_string(), *w)).collect(),
            ),
        );
        out
    }

    #[test]
    fn identical_profiles_score_zero() {
        let a = attrs(1.0, 2.0, &[("string", 0.5), ("array", 0.5)]);
        assert_eq!(compatibility(&a, &a.clone(), &Weights::default()), 0.0);
    }

    #[test]
    fn wildcard_difficulty_is_neutral() {
        let weights = Weights::default();
        let wildcard = attrs(0.0, 2.0, &[("tree", 1.0)]);
        for difficulty in [1.0, 2.0, 3.0] {
            let other = attrs(difficulty, 2.0, &[("tree", 1.0)]);
            assert_eq!(compatibility(&wildcard, &other, &weights), 0.0);
            assert_eq!(compatibility(&other, &wildcard, &weights), 0.0);
        }
    }

    #[test]
    fn scalar_gap_scaled_by_weight() {
        let weights = Weights::default();
        let a = attrs(1.0, 2.0, &[("tree", 1.0)]);
        let b = attrs(3.0, 2.0, &[("tree", 1.0)]);
        // difficulty gap 2 * weight 3
        assert_eq!(compatibility(&a, &b, &weights), 6.0);
    }

    #[test]
    fn disjoint_topics_cost_twice_the_weight() {
        let weights = Weights::default();
        let a = attrs(1.0, 2.0, &[("tree", 1.0)]);
        let b = attrs(1.0, 2.0, &[("math", 1.0)]);
        assert_eq!(compatibility(&a, &b, &weights), 2.0);

        let c = attrs(1.0, 2.0, &[("tree", 0.5), ("math", 0.5)]);
        // shared mass: tree 1.0 + 0.5
        assert!((compatibility(&a, &c, &weights) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn maximally_divergent_profiles() {
        let weights = Weights::default();
        let a = attrs(1.0, 2.0, &[("string", 0.5), ("array", 0.5)]);
        let b = attrs(3.0, 4.0, &[("tree", 0.5), ("recursion", 0.5)]);
        assert_eq!(compatibility(&a, &b, &weights), 12.0);
    }

    #[test]
    fn only_shared_attributes_count() {
        let weights = Weights::default().with("pace", 100.0);
        let mut a = attrs(1.0, 2.0, &[("tree", 1.0)]);
        a.insert("pace".into(), AttributeValue::Scalar(9.0));
        let b = attrs(1.0, 2.0, &[("tree", 1.0)]);
        assert_eq!(compatibility(&a, &b, &weights), 0.0);
    }

    #[test]
    fn kind_mismatch_is_incompatible() {
        let weights = Weights::default();
        let a = attrs(1.0, 2.0, &[("tree", 1.0)]);
        let mut b = a.clone();
        b.insert(TOPICS.into(), AttributeValue::Scalar(1.0));

        assert!(matches!(
            try_compatibility(&a, &b, &weights),
            Err(ScoreError::KindMismatch { .. })
        ));
        assert_eq!(compatibility(&a, &b, &weights), INCOMPATIBLE_SCORE);
    }

    #[test]
    fn missing_weight_and_nan_are_incompatible() {
        let a = attrs(1.0, 2.0, &[("tree", 1.0)]);
        let no_topics: Weights = Weights::new(BTreeMap::new())
            .with(SIZE, 1.0)
            .with(DIFFICULTY, 1.0);
        assert_eq!(
            try_compatibility(&a, &a, &no_topics),
            Err(ScoreError::MissingWeight(TOPICS.into()))
        );

        let nan = attrs(f64::NAN, 2.0, &[("tree", 1.0)]);
        assert_eq!(
            compatibility(&a, &nan, &Weights::default()),
            INCOMPATIBLE_SCORE
        );
    }
}
