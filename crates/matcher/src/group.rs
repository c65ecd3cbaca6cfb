//! The forming group: members, merged attributes, and age.
use ingest::{AttributeValue, Attributes, Profile, SIZE};
use serde::Serialize;
use tracing::warn;

use crate::registry::MembershipRegistry;
use crate::types::MatchError;

/// A forming (or finished) cluster of one or more members.
///
/// `members` keeps join order. `attributes` is a running average of every
/// member's profile, held by value so no two groups ever share a map.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Group {
    members: Vec<String>,
    attributes: Attributes,
    age: u32,
}

impl Group {
    /// Register the profile's identity and wrap it as a singleton group.
    pub fn admit(profile: Profile, registry: &MembershipRegistry) -> Result<Self, MatchError> {
        registry.register(&profile.identity)?;
        Ok(Self::unregistered(profile))
    }

    /// Wrap a profile without touching any registry. Scoring experiments and
    /// benchmarks use this; live pools should go through [`Group::admit`].
    pub fn unregistered(profile: Profile) -> Self {
        Self {
            members: vec![profile.identity],
            attributes: profile.attributes,
            age: 1,
        }
    }

    pub fn members(&self) -> &[String] {
        &self.members
    }

    pub fn attributes(&self) -> &Attributes {
        &self.attributes
    }

    pub fn age(&self) -> u32 {
        self.age
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Merged desired size, if the profile carried one.
    pub fn desired_size(&self) -> Option<f64> {
        self.attributes.get(SIZE).and_then(AttributeValue::as_scalar)
    }

    /// Advance the age by one scheduling cycle.
    pub fn step(&mut self) {
        self.age = self.age.saturating_add(1);
    }

    /// Override the age. Intended for replaying pools and for tests.
    pub fn with_age(mut self, age: u32) -> Self {
        self.age = age;
        self
    }

    /// Consume the group, yielding `(members, attributes, age)`.
    pub fn into_parts(self) -> (Vec<String>, Attributes, u32) {
        (self.members, self.attributes, self.age)
    }

    /// Absorb `other`: append its members, average scalar attributes,
    /// halve-and-add topic distributions, and floor-average the ages.
    ///
    /// Attributes present only on `other` are not carried over.
    pub fn merge(&mut self, other: Group) {
        let Group {
            members,
            attributes,
            age,
        } = other;

        self.members.extend(members);
        self.age = ((u64::from(self.age) + u64::from(age)) / 2) as u32;

        for (attr, value) in self.attributes.iter_mut() {
            let Some(incoming) = attributes.get(attr) else {
                continue;
            };
            match (value, incoming) {
                (AttributeValue::Scalar(mine), AttributeValue::Scalar(theirs)) => {
                    *mine = (*mine + theirs) / 2.0;
                }
                (AttributeValue::Distribution(mine), AttributeValue::Distribution(theirs)) => {
                    for weight in mine.values_mut() {
                        *weight /= 2.0;
                    }
                    for (topic, weight) in theirs {
                        *mine.entry(topic.clone()).or_insert(0.0) += weight / 2.0;
                    }
                }
                (mine, theirs) => {
                    warn!(
                        attr = %attr,
                        kept = mine.kind(),
                        dropped = theirs.kind(),
                        "merge_kind_mismatch"
                    );
                }
            }
        }
    }
}
