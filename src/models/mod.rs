pub mod report;
pub mod source_entry;

pub use report::{CopiedFile, WalkError, WalkReport};
pub use source_entry::{CopyTask, EntryKind, SourceEntry};
