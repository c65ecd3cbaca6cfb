//! Core data model types for the ingest crate.
//!
//! These types represent the shape of join requests as the transport hands
//! them over, and the normalized [`Profile`] records that flow into the
//! matching engine.
//!
//! # Type Hierarchy
//!
//! ```text
//! JoinRequest
//! ├── identity: String
//! ├── difficulty: u32        (0 = any)
//! ├── desired_size: u32      (0 = any)
//! └── topics: BTreeSet<String>
//!
//!         ↓ ingest()
//!
//! Profile
//! ├── identity: String (sanitized)
//! ├── received_at: DateTime<Utc>
//! └── attributes: Attributes
//!     ├── "size"       → Scalar(f64)
//!     ├── "difficulty" → Scalar(f64)
//!     └── "topics"     → Distribution({topic → 1/|topics|})
//! ```
use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::IngestError;
use crate::labels::{decode_difficulty, decode_meeting_size, decode_topic};

/// Attribute key holding the desired group size.
pub const SIZE: &str = "size";
/// Attribute key holding the ordinal difficulty.
pub const DIFFICULTY: &str = "difficulty";
/// Attribute key holding the topic-interest distribution.
pub const TOPICS: &str = "topics";

/// A join request as produced by the transport layer.
///
/// Scalars use `0` as a wildcard ("no preference"). `topics` is expanded into
/// an even weight distribution during [`ingest`](crate::ingest).
///
/// # Examples
///
/// ```rust
/// use ingest::JoinRequest;
///
/// let req = JoinRequest::new("U024BE7LH", 1, 2, ["string", "array"]);
/// assert_eq!(req.topics.len(), 2);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinRequest {
    pub identity: String,
    #[serde(default)]
    pub difficulty: u32,
    #[serde(default, alias = "desiredSize", alias = "meeting_size")]
    pub desired_size: u32,
    #[serde(default)]
    pub topics: BTreeSet<String>,
}

impl JoinRequest {
    pub fn new<I, T>(identity: impl Into<String>, difficulty: u32, desired_size: u32, topics: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        Self {
            identity: identity.into(),
            difficulty,
            desired_size,
            topics: topics.into_iter().map(Into::into).collect(),
        }
    }

    /// Build a request from the option codes submitted by the chat form
    /// (`dif-easy`, `siz-small`, `top-string`, ...).
    ///
    /// ```rust
    /// use ingest::JoinRequest;
    ///
    /// let req = JoinRequest::from_form("U1", "dif-hard", "siz-any", ["top-divide_and_conquer"]).unwrap();
    /// assert_eq!(req.difficulty, 3);
    /// assert_eq!(req.desired_size, 0);
    /// assert!(req.topics.contains("divide-and-conquer"));
    /// ```
    pub fn from_form<'a, I>(
        identity: impl Into<String>,
        difficulty: &str,
        meeting_size: &str,
        topics: I,
    ) -> Result<Self, IngestError>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let topics = topics
            .into_iter()
            .map(decode_topic)
            .collect::<Result<BTreeSet<_>, _>>()?;
        Ok(Self {
            identity: identity.into(),
            difficulty: decode_difficulty(difficulty)?,
            desired_size: decode_meeting_size(meeting_size)?,
            topics,
        })
    }

    /// Parse a request from a single JSON document.
    pub fn from_json(raw: &str) -> Result<Self, IngestError> {
        serde_json::from_str(raw).map_err(|err| IngestError::MalformedRequest(err.to_string()))
    }
}

/// A single attribute value inside an [`Attributes`] bag.
///
/// Scalars are compared by absolute difference; distributions by shared mass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    Scalar(f64),
    Distribution(BTreeMap<String, f64>),
}

impl AttributeValue {
    pub fn as_scalar(&self) -> Option<f64> {
        match self {
            AttributeValue::Scalar(v) => Some(*v),
            AttributeValue::Distribution(_) => None,
        }
    }

    pub fn as_distribution(&self) -> Option<&BTreeMap<String, f64>> {
        match self {
            AttributeValue::Distribution(map) => Some(map),
            AttributeValue::Scalar(_) => None,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            AttributeValue::Scalar(_) => "scalar",
            AttributeValue::Distribution(_) => "distribution",
        }
    }
}

/// Named attribute bag shared by profiles and forming groups.
pub type Attributes = BTreeMap<String, AttributeValue>;

/// A validated, normalized participant profile ready for matching.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub identity: String,
    pub received_at: DateTime<Utc>,
    pub attributes: Attributes,
}

impl Profile {
    /// Build a profile from an explicit topic distribution.
    ///
    /// Weights must be finite, non-negative and sum to 1.0 (within 1e-6).
    pub fn with_topic_weights(
        identity: impl Into<String>,
        difficulty: u32,
        desired_size: u32,
        topic_weights: BTreeMap<String, f64>,
    ) -> Result<Self, IngestError> {
        let identity = identity.into();
        if identity.trim().is_empty() {
            return Err(IngestError::EmptyIdentity);
        }
        if topic_weights.is_empty() {
            return Err(IngestError::EmptyTopics);
        }
        if topic_weights.values().any(|w| !w.is_finite() || *w < 0.0) {
            return Err(IngestError::InvalidTopicWeights(
                "weights must be finite and non-negative".into(),
            ));
        }
        let total: f64 = topic_weights.values().sum();
        if (total - 1.0).abs() > 1e-6 {
            return Err(IngestError::InvalidTopicWeights(format!(
                "weights sum to {total}, expected 1.0"
            )));
        }
        Ok(Self {
            identity,
            received_at: Utc::now(),
            attributes: standard_attributes(difficulty, desired_size, topic_weights),
        })
    }

    pub fn difficulty(&self) -> Option<f64> {
        self.attributes.get(DIFFICULTY).and_then(AttributeValue::as_scalar)
    }

    pub fn desired_size(&self) -> Option<f64> {
        self.attributes.get(SIZE).and_then(AttributeValue::as_scalar)
    }

    pub fn topics(&self) -> Option<&BTreeMap<String, f64>> {
        self.attributes.get(TOPICS).and_then(AttributeValue::as_distribution)
    }
}

pub(crate) fn standard_attributes(
    difficulty: u32,
    desired_size: u32,
    topic_weights: BTreeMap<String, f64>,
) -> Attributes {
    let mut attributes = Attributes::new();
    attributes.insert(SIZE.to_string(), AttributeValue::Scalar(f64::from(desired_size)));
    attributes.insert(
        DIFFICULTY.to_string(),
        AttributeValue::Scalar(f64::from(difficulty)),
    );
    attributes.insert(
        TOPICS.to_string(),
        AttributeValue::Distribution(topic_weights),
    );
    attributes
}
