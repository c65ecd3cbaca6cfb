//! Groupmatch Ingest Layer
//!
//! This is where study-partner requests enter the engine. We take a
//! [`JoinRequest`] from the transport, validate it, and turn it into a
//! [`Profile`] whose attribute bag the matcher can score.
//!
//! ## What we do here
//!
//! - **Sanitize** - Strip control characters and padding from identities and
//!   topic names before they become registry or distribution keys
//! - **Bound** - Reject difficulty and size values outside the configured range
//! - **Expand topics** - A topic set becomes an even distribution, `1/|topics|`
//! - **Queue** - [`IngestQueue`] hands validated profiles to the cycle driver
//!   through a bounded channel; a full queue is an error, never a crash
//! - **Log** - Structured logs via tracing for every accepted or rejected request
//!
//! Duplicate detection is *not* done here: only the cycle driver knows which
//! identities are currently in a live group.
//!
//! ## Example
//!
//! ```
//! use ingest::{ingest, IngestConfig, JoinRequest};
//!
//! let profile = ingest(
//!     JoinRequest::new("U024BE7LH", 1, 2, ["string", "array"]),
//!     &IngestConfig::default(),
//! )
//! .unwrap();
//!
//! assert_eq!(profile.identity, "U024BE7LH");
//! assert_eq!(profile.topics().unwrap()["array"], 0.5);
//! ```
use std::time::Instant;

use chrono::Utc;
use tracing::{debug, warn};

mod config;
mod error;
mod labels;
mod normalize;
mod queue;
mod types;

pub use crate::config::{ConfigError, IngestConfig};
pub use crate::error::IngestError;
pub use crate::queue::{IngestQueue, IngestReceiver, IngestSender};
pub use crate::types::{
    AttributeValue, Attributes, JoinRequest, Profile, DIFFICULTY, SIZE, TOPICS,
};

/// Validate a join request and convert it into a matchable profile.
pub fn ingest(request: JoinRequest, cfg: &IngestConfig) -> Result<Profile, IngestError> {
    let start = Instant::now();
    let identity_hint = request.identity.clone();

    match ingest_inner(request, cfg) {
        Ok(profile) => {
            debug!(
                identity = %profile.identity,
                topics = profile.topics().map_or(0, |t| t.len()),
                elapsed_micros = start.elapsed().as_micros(),
                "ingest_success"
            );
            Ok(profile)
        }
        Err(err) => {
            warn!(
                identity = ?identity_hint,
                error = %err,
                elapsed_micros = start.elapsed().as_micros(),
                "ingest_failure"
            );
            Err(err)
        }
    }
}

fn ingest_inner(request: JoinRequest, cfg: &IngestConfig) -> Result<Profile, IngestError> {
    let JoinRequest {
        identity,
        difficulty,
        desired_size,
        topics,
    } = request;

    let identity = normalize::sanitize_identity(&identity)?;

    if difficulty > cfg.max_difficulty {
        return Err(IngestError::DifficultyOutOfRange {
            value: difficulty,
            max: cfg.max_difficulty,
        });
    }
    if desired_size > cfg.max_desired_size {
        return Err(IngestError::SizeOutOfRange {
            value: desired_size,
            max: cfg.max_desired_size,
        });
    }

    let topic_weights = normalize::expand_topics(&topics)?;

    Ok(Profile {
        identity,
        received_at: Utc::now(),
        attributes: types::standard_attributes(difficulty, desired_size, topic_weights),
    })
}
