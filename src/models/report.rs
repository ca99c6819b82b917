use serde::{Deserialize, Serialize};

/// One successfully copied file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CopiedFile {
    pub source: String,
    pub destination: String,
    pub bytes: u64,
}

/// One per-item failure, with enough context to diagnose from the report
/// alone.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalkError {
    pub path: String,
    pub operation: String,
    pub error: String,
}

/// Accumulated outcome of one walk. A run that skipped items completes like
/// a clean one; callers needing a hard pass/fail signal inspect `errors`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WalkReport {
    pub dirs_walked: usize,
    pub files_copied: usize,
    pub files_skipped: usize,
    pub entries_ignored: usize,
    pub cancelled: bool,
    pub copied_files: Vec<CopiedFile>,
    pub errors: Vec<WalkError>,
}

impl WalkReport {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn total_processed(&self) -> usize {
        self.files_copied + self.files_skipped + self.errors.len()
    }

    pub fn success_rate(&self) -> f64 {
        let total = self.total_processed();
        if total == 0 {
            0.0
        } else {
            self.files_copied as f64 / total as f64
        }
    }

    /// Fold another worker's partial report into this one.
    pub fn merge(&mut self, other: WalkReport) {
        self.dirs_walked += other.dirs_walked;
        self.files_copied += other.files_copied;
        self.files_skipped += other.files_skipped;
        self.entries_ignored += other.entries_ignored;
        self.cancelled |= other.cancelled;
        self.copied_files.extend(other.copied_files);
        self.errors.extend(other.errors);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_accumulates() {
        let mut left = WalkReport {
            dirs_walked: 1,
            files_copied: 2,
            ..WalkReport::empty()
        };
        let right = WalkReport {
            dirs_walked: 3,
            files_skipped: 1,
            cancelled: true,
            errors: vec![WalkError {
                path: "/src/x".to_string(),
                operation: "copy".to_string(),
                error: "permission denied".to_string(),
            }],
            ..WalkReport::empty()
        };

        left.merge(right);

        assert_eq!(left.dirs_walked, 4);
        assert_eq!(left.files_copied, 2);
        assert_eq!(left.files_skipped, 1);
        assert_eq!(left.errors.len(), 1);
        assert!(left.cancelled);
        assert_eq!(left.total_processed(), 4);
    }

    #[test]
    fn test_success_rate_empty_run() {
        assert_eq!(WalkReport::empty().success_rate(), 0.0);
    }
}
