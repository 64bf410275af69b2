//! On-disk size of a directory tree

use crate::error::{BackupError, Result};
use std::io;
use std::path::Path;
use walkdir::WalkDir;

/// Sum the sizes of every non-directory entry below `path`
///
/// Symlinks are counted by their own size and never followed.
pub fn directory_size(path: &Path) -> Result<u64> {
    let to_error = |e: walkdir::Error| {
        BackupError::io(
            format!("Failed to calculate directory size of {}", path.display()),
            io::Error::from(e),
        )
    };

    let mut total = 0u64;
    for entry in WalkDir::new(path).follow_links(false) {
        let entry = entry.map_err(to_error)?;
        if entry.file_type().is_dir() {
            continue;
        }
        total += entry.metadata().map_err(to_error)?.len();
    }

    Ok(total)
}
