pub mod transfer;
pub mod walker;

pub use transfer::{classify_and_copy, CopyOutcome, TransferConfig, TransferError};
pub use walker::{walk_and_dispatch, worker_limit, WalkerConfig};
