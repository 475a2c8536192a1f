//! # EventBus Abstraction
//!
//! Publish/subscribe seam between the timeline engine and its external
//! consumers (invoicing, notification).
//!
//! The engine never calls a transport directly: it publishes signals such as
//! `timeline.events.repair.completed` through the [`EventBus`] trait, and the
//! hosting process decides what sits behind it. This crate ships
//! [`InMemoryBus`], a broadcast-channel implementation used by tests and by
//! single-process deployments; a networked implementation plugs in behind the
//! same trait.
//!
//! Subjects are dot-separated tokens and subscriptions accept NATS-style
//! wildcards (`*` for one token, `>` for the rest).

mod envelope;
mod inmemory_bus;

pub use envelope::{EnvelopeError, EventEnvelope};
pub use inmemory_bus::InMemoryBus;

use async_trait::async_trait;
use futures::stream::BoxStream;
use std::fmt;

/// A message delivered to a subscriber.
#[derive(Debug, Clone)]
pub struct BusMessage {
    /// Subject the message was published under.
    pub subject: String,
    /// Raw payload bytes (engine signals are JSON-encoded envelopes).
    pub payload: Vec<u8>,
}

impl BusMessage {
    pub fn new(subject: impl Into<String>, payload: Vec<u8>) -> Self {
        Self {
            subject: subject.into(),
            payload,
        }
    }
}

/// Errors surfaced by bus implementations.
#[derive(Debug, thiserror::Error)]
pub enum BusError {
    #[error("failed to publish message: {0}")]
    Publish(String),

    #[error("failed to subscribe to subject: {0}")]
    Subscribe(String),

    #[error("invalid subject pattern: {0}")]
    InvalidSubject(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type BusResult<T> = Result<T, BusError>;

/// Publish/subscribe contract all bus implementations satisfy.
#[async_trait]
pub trait EventBus: Send + Sync {
    /// Publish `payload` under `subject`.
    ///
    /// Publishing to a subject with no subscribers is not an error.
    async fn publish(&self, subject: &str, payload: Vec<u8>) -> BusResult<()>;

    /// Subscribe to messages whose subject matches `pattern`.
    ///
    /// `pattern` may use `*` to match a single token and `>` to match every
    /// remaining token, e.g. `timeline.events.>`.
    async fn subscribe(&self, pattern: &str) -> BusResult<BoxStream<'static, BusMessage>>;
}

impl fmt::Debug for dyn EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EventBus")
    }
}
