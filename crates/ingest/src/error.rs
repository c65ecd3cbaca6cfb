//! Error types produced by the ingest crate.
//!
//! All errors are typed, cloneable, and comparable so the transport can map
//! them onto whatever reply it sends back to the requester.
//!
//! | Error | Category | Description |
//! |-------|----------|-------------|
//! | [`EmptyIdentity`](IngestError::EmptyIdentity) | Validation | Identity empty after sanitization |
//! | [`EmptyTopics`](IngestError::EmptyTopics) | Validation | No usable topic supplied |
//! | [`InvalidTopic`](IngestError::InvalidTopic) | Validation | Topic name empty after sanitization |
//! | [`DifficultyOutOfRange`](IngestError::DifficultyOutOfRange) | Validation | Difficulty above the configured maximum |
//! | [`SizeOutOfRange`](IngestError::SizeOutOfRange) | Validation | Desired size above the configured maximum |
//! | [`UnknownOption`](IngestError::UnknownOption) | Validation | Unrecognised form option code |
//! | [`InvalidTopicWeights`](IngestError::InvalidTopicWeights) | Validation | Explicit distribution malformed |
//! | [`MalformedRequest`](IngestError::MalformedRequest) | Decoding | Request body could not be parsed |
//! | [`QueueOverflow`](IngestError::QueueOverflow) | Backpressure | Intake queue is at capacity |
//! | [`QueueClosed`](IngestError::QueueClosed) | Lifecycle | The cycle driver has shut down |
//!
//! # Examples
//!
//! ```rust
//! use ingest::{ingest, IngestConfig, IngestError, JoinRequest};
//!
//! let req = JoinRequest::new("U1", 9, 2, ["tree"]);
//! match ingest(req, &IngestConfig::default()) {
//!     Err(IngestError::DifficultyOutOfRange { value, max }) => {
//!         assert_eq!((value, max), (9, 3));
//!     }
//!     other => panic!("unexpected: {other:?}"),
//! }
//! ```
use thiserror::Error;

/// Errors that can occur while validating or enqueueing a join request.
///
/// The enum is `#[non_exhaustive]`; callers should keep a catch-all arm.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum IngestError {
    #[error("identity is empty")]
    EmptyIdentity,

    #[error("request carries no topics")]
    EmptyTopics,

    #[error("invalid topic name: {0:?}")]
    InvalidTopic(String),

    #[error("difficulty {value} exceeds maximum {max}")]
    DifficultyOutOfRange { value: u32, max: u32 },

    #[error("desired size {value} exceeds maximum {max}")]
    SizeOutOfRange { value: u32, max: u32 },

    #[error("unknown form option: {0}")]
    UnknownOption(String),

    #[error("invalid topic weights: {0}")]
    InvalidTopicWeights(String),

    #[error("malformed request: {0}")]
    MalformedRequest(String),

    /// The queue stayed full for the whole submission window.
    ///
    /// Engine state is unaffected; the caller decides whether to retry or
    /// reject upstream.
    #[error("ingest queue is full (capacity {capacity})")]
    QueueOverflow { capacity: usize },

    #[error("ingest queue is closed")]
    QueueClosed,
}

impl IngestError {
    /// Whether resubmitting the same request later could succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, IngestError::QueueOverflow { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_carry_context() {
        let err = IngestError::SizeOutOfRange { value: 7, max: 4 };
        assert_eq!(err.to_string(), "desired size 7 exceeds maximum 4");

        let err = IngestError::QueueOverflow { capacity: 100 };
        assert!(err.to_string().contains("capacity 100"));
    }

    #[test]
    fn only_overflow_is_retryable() {
        assert!(IngestError::QueueOverflow { capacity: 1 }.is_retryable());
        assert!(!IngestError::QueueClosed.is_retryable());
        assert!(!IngestError::EmptyIdentity.is_retryable());
    }
}
