pub mod core;
pub mod logging;

pub use crate::core::error::{UpdaterError, UpdaterResult};
pub use crate::core::sync::{run_update, SyncOrchestrator, SyncReport};
