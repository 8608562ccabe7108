//! Mailbox synchronization — reconciliation, orchestration, the
//! post-sync recency pass, and the background scheduler.

pub mod orchestrator;
pub mod reconcile;
pub mod recency;
pub mod scheduler;

pub use orchestrator::{SyncEngine, SyncOutcome};
