pub mod models;
pub mod services;
pub mod utils;

// Re-export commonly used types
pub use models::{CopiedFile, CopyTask, EntryKind, SourceEntry, WalkError, WalkReport};
pub use services::{
    classify_and_copy, walk_and_dispatch, worker_limit, CopyOutcome, TransferConfig,
    TransferError, WalkerConfig,
};
pub use utils::{extension_bucket, target_paths, DEFAULT_CHUNK_SIZE, NO_EXTENSION_BUCKET};

// Application configuration
#[derive(Debug, Clone)]
pub struct SorterConfig {
    pub transfer: TransferConfig,
    pub walker: WalkerConfig,
    pub log_level: String,
}

impl Default for SorterConfig {
    fn default() -> Self {
        Self {
            transfer: TransferConfig::default(),
            walker: WalkerConfig::default(),
            log_level: "info".to_string(),
        }
    }
}
