pub mod orchestrator;
pub mod report;
pub mod retry;

pub use orchestrator::{SyncOptions, SyncOrchestrator};
pub use report::{FileFailure, RegistrySummary, SyncReport, SyncState};
pub use retry::RetryPolicy;
