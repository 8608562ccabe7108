//! Action queue — the ranked, capped worklist derived on demand from
//! lead/thread/message state. Nothing here is persisted.

pub mod generator;
pub mod model;

pub use generator::tasks_for_user;
pub use model::{ActionTask, TaskKind, TaskPriority};
