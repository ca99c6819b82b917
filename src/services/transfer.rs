use std::io;
use std::path::PathBuf;

use thiserror::Error;
use tokio::fs;
use tracing::{debug, info, warn};

use crate::models::CopyTask;
use crate::utils::{stream_copy, DEFAULT_CHUNK_SIZE};

/// Configuration for single-file transfers.
#[derive(Debug, Clone)]
pub struct TransferConfig {
    /// Bytes read and written per chunk.
    pub chunk_size: usize,
    /// When false, an existing target file is left untouched and the
    /// transfer reports a skip instead of truncating it.
    pub overwrite: bool,
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            overwrite: true,
        }
    }
}

/// Failure stages of one transfer. Each variant names the path it failed on
/// so callers can log and skip without losing context.
#[derive(Debug, Error)]
pub enum TransferError {
    #[error("failed to create category folder {path}: {source}")]
    CategoryDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to open source file {path}: {source}")]
    OpenSource {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to create destination file {path}: {source}")]
    CreateTarget {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("copy of {path} aborted mid-stream (partial file removed: {partial_removed}): {source}")]
    Stream {
        path: PathBuf,
        /// Whether the truncated destination file was cleaned up. When this
        /// is false the partial file is still on disk and the warning log
        /// names it.
        partial_removed: bool,
        #[source]
        source: io::Error,
    },
}

/// Outcome of one transfer that did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CopyOutcome {
    Copied { bytes: u64 },
    SkippedExisting,
}

/// Copy one file into its category folder under the destination root.
///
/// The category folder is created idempotently before the stream opens;
/// concurrent creation of the same folder from several workers is safe.
/// By default an existing target of the same name is overwritten. If the
/// stream fails partway, the truncated target is removed (best effort)
/// before the error returns, so a present destination file is never a
/// half-written one.
pub async fn classify_and_copy(
    task: &CopyTask,
    config: &TransferConfig,
) -> Result<CopyOutcome, TransferError> {
    fs::create_dir_all(&task.category_dir)
        .await
        .map_err(|source| TransferError::CategoryDir {
            path: task.category_dir.clone(),
            source,
        })?;

    if !config.overwrite && fs::metadata(&task.target).await.is_ok() {
        debug!(
            "Destination already exists, skipping: {}",
            task.target.display()
        );
        return Ok(CopyOutcome::SkippedExisting);
    }

    let mut source = fs::File::open(&task.source)
        .await
        .map_err(|source| TransferError::OpenSource {
            path: task.source.clone(),
            source,
        })?;

    let mut target = fs::File::create(&task.target)
        .await
        .map_err(|source| TransferError::CreateTarget {
            path: task.target.clone(),
            source,
        })?;

    match stream_copy(&mut source, &mut target, config.chunk_size).await {
        Ok(bytes) => {
            info!(
                "Copied {} -> {} ({} bytes)",
                task.source.display(),
                task.target.display(),
                bytes
            );
            Ok(CopyOutcome::Copied { bytes })
        }
        Err(err) => {
            drop(target);
            let partial_removed = fs::remove_file(&task.target).await.is_ok();
            if !partial_removed {
                warn!(
                    "Could not remove partial destination file: {}",
                    task.target.display()
                );
            }
            Err(TransferError::Stream {
                path: task.source.clone(),
                partial_removed,
                source: err,
            })
        }
    }
}
