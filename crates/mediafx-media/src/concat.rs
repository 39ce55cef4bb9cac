//! Concat demuxer manifest construction.
//!
//! The manifest is a plain line-oriented reference list: one `file '<path>'`
//! directive per segment per line. Single quotes inside a path are escaped
//! as `'\''` so each line remains a single quoted token.

use std::path::{Path, PathBuf};
use tokio::fs;

use crate::error::MediaResult;

/// Escape a path for use inside a single-quoted concat manifest token.
pub fn escape_manifest_path(path: &str) -> String {
    path.replace('\'', r"'\''")
}

/// Build the manifest contents for an ordered list of segment paths.
pub fn manifest_contents(segments: &[PathBuf]) -> String {
    let mut contents = String::new();
    for segment in segments {
        let escaped = escape_manifest_path(&segment.to_string_lossy());
        contents.push_str(&format!("file '{}'\n", escaped));
    }
    contents
}

/// Write the manifest for `segments` (already in output order) to `dest`.
pub async fn write_manifest(segments: &[PathBuf], dest: impl AsRef<Path>) -> MediaResult<PathBuf> {
    let dest = dest.as_ref();
    fs::write(dest, manifest_contents(segments)).await?;
    Ok(dest.to_path_buf())
}
