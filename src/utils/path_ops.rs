use std::path::{Path, PathBuf};

/// Category folder used for files whose name carries no extension.
///
/// The leading underscore keeps the bucket from colliding with files that
/// really end in `.noext`.
pub const NO_EXTENSION_BUCKET: &str = "_noext";

/// Derive the category bucket for a file path.
/// Pure function: looks only at the final path segment, never at content.
pub fn extension_bucket(path: &Path) -> String {
    path.extension()
        .map(|ext| ext.to_string_lossy().into_owned())
        .filter(|ext| !ext.is_empty())
        .unwrap_or_else(|| NO_EXTENSION_BUCKET.to_string())
}

/// Compute the category folder and target file path for one source file.
/// The destination tree is flat: one bucket level, then the original name.
pub fn target_paths(destination_root: &Path, source_file: &Path) -> (PathBuf, PathBuf) {
    let category_dir = destination_root.join(extension_bucket(source_file));
    let file_name = source_file.file_name().unwrap_or_default();
    let target = category_dir.join(file_name);
    (category_dir, target)
}
