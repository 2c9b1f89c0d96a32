//! Domain models for the ingestion server.

pub mod ansi;
pub mod build;
pub mod spec_result;
pub mod status;
pub mod test_entry;
pub mod ws_event;

// Re-export commonly used types
pub use ansi::strip_ansi;
pub use build::{
    BuildDetailResponse, BuildResponse, BuildStatus, DEFAULT_ENVIRONMENT, Framework, NewBuild,
    RegisterBuildRequest, RegisterBuildResponse,
};
pub use spec_result::{
    SpecFileQuery, SpecResultResponse, SpecSummary, SubmitResultRequest, SubmitResultResponse,
};
pub use status::{CanonicalStatus, normalize_status};
pub use test_entry::{
    IncomingTest, MergeKind, TestEntry, TestError, TestResultInput, merge_entry, parse_tests,
    unique_key,
};
pub use ws_event::{SpecResultUpdatedPayload, WsEvent, WsEventMessage};
