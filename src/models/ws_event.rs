//! WebSocket event types for live dashboard updates.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::status::CanonicalStatus;

/// WebSocket event sent to connected clients.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
#[serde(rename_all = "snake_case")]
pub enum WsEvent {
    /// A build was registered or rejoined by a worker.
    BuildRegistered(BuildRegisteredPayload),
    /// A test result was merged into a spec aggregate.
    SpecResultUpdated(SpecResultUpdatedPayload),
}

/// Payload for build_registered event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildRegisteredPayload {
    pub build_id: i32,
    pub project_id: Uuid,
    pub created: bool,
}

/// Payload for spec_result_updated event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpecResultUpdatedPayload {
    pub build_id: i32,
    pub spec_file: String,
    pub title: String,
    pub project: String,
    pub run_number: i32,
    pub status: CanonicalStatus,
    pub test_count: usize,
}

/// Wrapper that includes timestamp with every event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WsEventMessage {
    #[serde(flatten)]
    pub event: WsEvent,
    pub timestamp: DateTime<Utc>,
}

impl WsEventMessage {
    /// Create a new event message with the current timestamp.
    pub fn new(event: WsEvent) -> Self {
        Self {
            event,
            timestamp: Utc::now(),
        }
    }
}

impl WsEvent {
    pub fn build_registered(build_id: i32, project_id: Uuid, created: bool) -> Self {
        WsEvent::BuildRegistered(BuildRegisteredPayload {
            build_id,
            project_id,
            created,
        })
    }

    /// The build this event belongs to.
    pub fn build_id(&self) -> i32 {
        match self {
            WsEvent::BuildRegistered(payload) => payload.build_id,
            WsEvent::SpecResultUpdated(payload) => payload.build_id,
        }
    }

    /// Wire name of the event type.
    pub fn kind(&self) -> &'static str {
        match self {
            WsEvent::BuildRegistered(_) => "build_registered",
            WsEvent::SpecResultUpdated(_) => "spec_result_updated",
        }
    }
}
