//! Ingestion engine services.

pub mod event_broadcaster;
pub mod merger;
pub mod registrar;
pub mod spec_lock;

pub use event_broadcaster::{EventBroadcaster, EventFeed, FeedItem};
pub use merger::{MergeOutcome, MergeRequest, merge_test_result, stage_merge};
pub use registrar::{Registration, register_build};
pub use spec_lock::{SpecLockGuard, SpecLocks, spec_lock_key};
