pub mod path_ops;
pub mod stream_copy;

pub use path_ops::{extension_bucket, target_paths, NO_EXTENSION_BUCKET};
pub use stream_copy::{stream_copy, DEFAULT_CHUNK_SIZE};
