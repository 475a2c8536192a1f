//! Broadcast-channel implementation of [`EventBus`] for tests and
//! single-process deployments.

use crate::{BusMessage, BusResult, EventBus};
use async_trait::async_trait;
use futures::stream::{BoxStream, StreamExt};
use std::sync::Arc;
use tokio::sync::broadcast;

/// In-memory bus backed by a single tokio broadcast channel.
///
/// Every subscriber sees every message whose subject matches its pattern.
/// Slow subscribers that fall more than the channel capacity behind lose the
/// oldest messages; the engine treats its signals as best-effort
/// notifications, so consumers that must not miss a repair re-read the
/// authoritative event stream instead.
#[derive(Clone)]
pub struct InMemoryBus {
    sender: Arc<broadcast::Sender<BusMessage>>,
}

impl InMemoryBus {
    pub fn new() -> Self {
        Self::with_capacity(1024)
    }

    /// Bus with an explicit channel capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender: Arc::new(sender),
        }
    }

    /// Match a concrete subject against a subscription pattern.
    ///
    /// `*` consumes exactly one token, `>` consumes all remaining tokens.
    fn subject_matches(subject: &str, pattern: &str) -> bool {
        let mut subject_tokens = subject.split('.');
        let mut pattern_tokens = pattern.split('.').peekable();

        loop {
            match (subject_tokens.next(), pattern_tokens.next()) {
                (_, Some(">")) => return true,
                (Some(_), Some("*")) => continue,
                (Some(s), Some(p)) if s == p => continue,
                (None, None) => return true,
                _ => return false,
            }
        }
    }
}

impl Default for InMemoryBus {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EventBus for InMemoryBus {
    async fn publish(&self, subject: &str, payload: Vec<u8>) -> BusResult<()> {
        // A send error only means there are no subscribers right now.
        let _ = self.sender.send(BusMessage::new(subject, payload));
        Ok(())
    }

    async fn subscribe(&self, pattern: &str) -> BusResult<BoxStream<'static, BusMessage>> {
        let mut receiver = self.sender.subscribe();
        let pattern = pattern.to_string();

        let stream = async_stream::stream! {
            loop {
                match receiver.recv().await {
                    Ok(msg) => {
                        if Self::subject_matches(&msg.subject, &pattern) {
                            yield msg;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "bus subscriber lagged, messages dropped");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        };

        Ok(stream.boxed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;
    use std::time::Duration;

    #[test]
    fn subject_matching() {
        assert!(InMemoryBus::subject_matches(
            "timeline.events.repair.completed",
            "timeline.events.repair.completed"
        ));
        assert!(InMemoryBus::subject_matches(
            "timeline.events.repair.completed",
            "timeline.events.>"
        ));
        assert!(InMemoryBus::subject_matches(
            "timeline.events.repair.completed",
            "timeline.*.repair.completed"
        ));
        assert!(!InMemoryBus::subject_matches(
            "timeline.events.repair.completed",
            "timeline.events.*"
        ));
        assert!(!InMemoryBus::subject_matches(
            "timeline.events.repair.completed",
            "invoicing.>"
        ));
        assert!(InMemoryBus::subject_matches("single", "*"));
        assert!(InMemoryBus::subject_matches("single", ">"));
        assert!(!InMemoryBus::subject_matches("one.two", "one"));
    }

    #[tokio::test]
    async fn publish_reaches_matching_subscriber() {
        let bus = InMemoryBus::new();
        let mut stream = bus.subscribe("timeline.events.>").await.unwrap();

        bus.publish("timeline.events.repair.completed", b"sig".to_vec())
            .await
            .unwrap();

        let msg = tokio::time::timeout(Duration::from_secs(1), stream.next())
            .await
            .expect("timeout")
            .expect("stream ended");
        assert_eq!(msg.subject, "timeline.events.repair.completed");
        assert_eq!(msg.payload, b"sig");
    }

    #[tokio::test]
    async fn non_matching_subjects_are_filtered() {
        let bus = InMemoryBus::new();
        let mut stream = bus.subscribe("timeline.events.*").await.unwrap();

        bus.publish("timeline.events.deep.subject", b"no".to_vec())
            .await
            .unwrap();
        bus.publish("timeline.events.shallow", b"yes".to_vec())
            .await
            .unwrap();

        let msg = tokio::time::timeout(Duration::from_secs(1), stream.next())
            .await
            .expect("timeout")
            .expect("stream ended");
        assert_eq!(msg.subject, "timeline.events.shallow");
    }

    #[tokio::test]
    async fn messages_are_delivered_in_publish_order() {
        let bus = InMemoryBus::new();
        let mut stream = bus.subscribe("t.>").await.unwrap();

        for i in 0..5u8 {
            bus.publish(&format!("t.msg.{i}"), vec![i]).await.unwrap();
        }
        for i in 0..5u8 {
            let msg = tokio::time::timeout(Duration::from_secs(1), stream.next())
                .await
                .expect("timeout")
                .expect("stream ended");
            assert_eq!(msg.payload, vec![i]);
        }
    }

    #[tokio::test]
    async fn every_subscriber_receives_the_message() {
        let bus = InMemoryBus::new();
        let mut a = bus.subscribe("t.>").await.unwrap();
        let mut b = bus.subscribe("t.>").await.unwrap();

        bus.publish("t.msg", b"broadcast".to_vec()).await.unwrap();

        for stream in [&mut a, &mut b] {
            let msg = tokio::time::timeout(Duration::from_secs(1), stream.next())
                .await
                .expect("timeout")
                .expect("stream ended");
            assert_eq!(msg.payload, b"broadcast");
        }
    }
}
