//! Live feed of ingestion events.
//!
//! Registrations and merges are published after their writes commit.
//! Dashboards subscribe with an optional build filter. A subscriber that
//! falls behind loses its oldest events instead of slowing ingestion.

use tokio::sync::broadcast::{self, error::RecvError};
use tracing::debug;

use crate::models::{SpecResultUpdatedPayload, WsEvent, WsEventMessage};
use crate::services::merger::MergeOutcome;
use crate::services::registrar::Registration;

const FEED_CAPACITY: usize = 1024;

#[derive(Clone)]
pub struct EventBroadcaster {
    sender: broadcast::Sender<WsEventMessage>,
}

impl EventBroadcaster {
    pub fn new() -> Self {
        Self::with_capacity(FEED_CAPACITY)
    }

    /// `capacity` is how many events a subscriber may lag before it misses some.
    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Open a feed, optionally limited to one build.
    pub fn subscribe(&self, build_id: Option<i32>) -> EventFeed {
        EventFeed {
            receiver: self.sender.subscribe(),
            build_id,
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    /// Announce a created or rejoined build. Returns how many feeds got it.
    pub fn build_registered(&self, registration: &Registration) -> usize {
        let build = &registration.build;
        self.publish(WsEvent::build_registered(
            build.id,
            build.project_id,
            registration.created,
        ))
    }

    /// Announce a committed merge. Returns how many feeds got it.
    pub fn spec_result_updated(&self, outcome: &MergeOutcome) -> usize {
        self.publish(WsEvent::SpecResultUpdated(SpecResultUpdatedPayload {
            build_id: outcome.build_id,
            spec_file: outcome.spec_file.clone(),
            title: outcome.title.clone(),
            project: outcome.project.clone(),
            run_number: outcome.run_number,
            status: outcome.status,
            test_count: outcome.test_count,
        }))
    }

    fn publish(&self, event: WsEvent) -> usize {
        let build_id = event.build_id();
        let kind = event.kind();
        // No subscribers is not an error for ingestion.
        let delivered = self.sender.send(WsEventMessage::new(event)).unwrap_or(0);
        debug!(build_id, event = kind, delivered, "Live event published");
        delivered
    }
}

impl Default for EventBroadcaster {
    fn default() -> Self {
        Self::new()
    }
}

/// What a feed yields next.
#[derive(Debug)]
pub enum FeedItem {
    Event(WsEventMessage),
    /// The subscriber fell behind and this many events were dropped
    Missed(u64),
}

/// One subscriber's view of the live feed.
pub struct EventFeed {
    receiver: broadcast::Receiver<WsEventMessage>,
    build_id: Option<i32>,
}

impl EventFeed {
    /// Wait for the next event that passes the build filter.
    ///
    /// Returns `None` once the broadcaster is gone. Cancel-safe.
    pub async fn next(&mut self) -> Option<FeedItem> {
        loop {
            match self.receiver.recv().await {
                Ok(message) if self.accepts(&message.event) => {
                    return Some(FeedItem::Event(message));
                }
                Ok(_) => continue,
                Err(RecvError::Lagged(missed)) => return Some(FeedItem::Missed(missed)),
                Err(RecvError::Closed) => return None,
            }
        }
    }

    fn accepts(&self, event: &WsEvent) -> bool {
        self.build_id.is_none_or(|id| event.build_id() == id)
    }
}
