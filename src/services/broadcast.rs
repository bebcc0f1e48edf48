// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Fan-out of counter changes to every connected viewer.
//!
//! Only delta events travel over the channel. A viewer that connects late
//! loads the current active list first and then follows the stream; past
//! events are never replayed.

use crate::error::Result;
use crate::models::BroadcastEvent;
use async_trait::async_trait;
use futures_util::stream::BoxStream;
use futures_util::StreamExt;
use tokio::sync::broadcast;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tokio_stream::wrappers::BroadcastStream;

/// Endless stream of events for one subscriber.
pub type EventStream = BoxStream<'static, BroadcastEvent>;

/// Publish/subscribe transport for [`BroadcastEvent`]s.
#[async_trait]
pub trait BroadcastChannel: Send + Sync {
    /// Deliver `event` to every current subscriber.
    async fn publish(&self, event: BroadcastEvent) -> Result<()>;

    /// Start a new subscription. Only events published after this call are seen.
    fn subscribe(&self) -> EventStream;
}

/// Single-process broadcast over a `tokio::sync::broadcast` channel.
pub struct InProcessBroadcast {
    sender: broadcast::Sender<BroadcastEvent>,
}

impl InProcessBroadcast {
    /// `capacity` is the number of events buffered per subscriber before it lags.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

#[async_trait]
impl BroadcastChannel for InProcessBroadcast {
    async fn publish(&self, event: BroadcastEvent) -> Result<()> {
        // A send error only means nobody is listening right now.
        match self.sender.send(event) {
            Ok(receivers) => tracing::debug!(receivers, "Event broadcast"),
            Err(_) => tracing::debug!("Event dropped, no subscribers"),
        }
        Ok(())
    }

    fn subscribe(&self) -> EventStream {
        BroadcastStream::new(self.sender.subscribe())
            .filter_map(|item| async move {
                match item {
                    Ok(event) => Some(event),
                    Err(BroadcastStreamRecvError::Lagged(missed)) => {
                        tracing::warn!(missed, "Subscriber lagged, events skipped");
                        None
                    }
                }
            })
            .boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ActivityAction;
    use std::time::Duration;

    fn event(name: &str, count: u32) -> BroadcastEvent {
        BroadcastEvent {
            id: name.to_string(),
            name: name.to_string(),
            count,
            locations: vec![],
            action: ActivityAction::Start,
        }
    }

    #[tokio::test]
    async fn test_publish_without_subscribers_is_ok() {
        let channel = InProcessBroadcast::new(4);
        assert!(channel.publish(event("coffee", 1)).await.is_ok());
    }

    #[tokio::test]
    async fn test_every_subscriber_receives_event() {
        let channel = InProcessBroadcast::new(4);
        let mut first = channel.subscribe();
        let mut second = channel.subscribe();
        assert_eq!(channel.subscriber_count(), 2);

        channel.publish(event("coffee", 1)).await.unwrap();

        assert_eq!(first.next().await.unwrap().name, "coffee");
        assert_eq!(second.next().await.unwrap().name, "coffee");
    }

    #[tokio::test]
    async fn test_late_subscriber_gets_no_replay() {
        let channel = InProcessBroadcast::new(4);
        let _early = channel.subscribe();
        channel.publish(event("coffee", 1)).await.unwrap();

        let mut late = channel.subscribe();
        let next = tokio::time::timeout(Duration::from_millis(50), late.next()).await;
        assert!(next.is_err(), "late subscriber should see nothing");
    }

    #[tokio::test]
    async fn test_lagged_subscriber_skips_to_newest() {
        let channel = InProcessBroadcast::new(2);
        let mut slow = channel.subscribe();

        for count in 1..=5 {
            channel.publish(event("coffee", count)).await.unwrap();
        }

        // Oldest events were overwritten; the stream resumes with what remains.
        assert_eq!(slow.next().await.unwrap().count, 4);
        assert_eq!(slow.next().await.unwrap().count, 5);
    }

    #[tokio::test]
    async fn test_dropped_subscription_unregisters() {
        let channel = InProcessBroadcast::new(4);
        let stream = channel.subscribe();
        assert_eq!(channel.subscriber_count(), 1);

        drop(stream);
        assert_eq!(channel.subscriber_count(), 0);
    }
}
