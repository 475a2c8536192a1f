//! Standard envelope wrapped around every signal the engine publishes.
//!
//! Consumers rely on the envelope for idempotent handling (`event_id`),
//! tenant scoping, and causality tracking; the payload type carries the
//! signal-specific data.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Envelope wrapped around every published signal.
///
/// `T` is the signal payload, e.g. a repair-completed notice.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventEnvelope<T> {
    /// Unique identifier, usable as an idempotency key by consumers.
    pub event_id: Uuid,

    /// Instant the signal was generated.
    pub occurred_at: DateTime<Utc>,

    /// Tenant the signal belongs to.
    pub tenant_id: String,

    /// Component that produced the signal (e.g. "timeline").
    pub source_module: String,

    /// Semantic version of the producing component.
    pub source_version: String,

    /// Links related signals in one business transaction.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub correlation_id: Option<String>,

    pub payload: T,
}

impl<T> EventEnvelope<T> {
    /// Build an envelope stamped `occurred_at`.
    ///
    /// The timestamp is passed in rather than read from the wall clock so
    /// the producing engine stays clock-injectable.
    pub fn new(
        occurred_at: DateTime<Utc>,
        tenant_id: String,
        source_module: String,
        payload: T,
    ) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            occurred_at,
            tenant_id,
            source_module,
            source_version: env!("CARGO_PKG_VERSION").to_string(),
            correlation_id: None,
            payload,
        }
    }

    pub fn with_source_version(mut self, version: String) -> Self {
        self.source_version = version;
        self
    }

    pub fn with_correlation_id(mut self, correlation_id: Option<String>) -> Self {
        self.correlation_id = correlation_id;
        self
    }
}

/// Envelope validation failures.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum EnvelopeError {
    #[error("missing or invalid field: {0}")]
    MissingField(&'static str),

    #[error("field {0} cannot be empty")]
    EmptyField(&'static str),
}

/// Validate the envelope portion of a raw JSON signal.
///
/// Used by consumers before they attempt to deserialize the payload, so a
/// malformed signal is rejected with a field-level error instead of a
/// generic serde failure.
pub fn validate_envelope_fields(envelope: &serde_json::Value) -> Result<(), EnvelopeError> {
    for field in ["event_id", "occurred_at"] {
        envelope
            .get(field)
            .and_then(|v| v.as_str())
            .ok_or(EnvelopeError::MissingField(field))?;
    }

    for field in ["tenant_id", "source_module", "source_version"] {
        let value = envelope
            .get(field)
            .and_then(|v| v.as_str())
            .ok_or(EnvelopeError::MissingField(field))?;
        if value.is_empty() {
            return Err(EnvelopeError::EmptyField(field));
        }
    }

    // correlation_id is optional
    Ok(())
}
