//! Modified headers overlaid onto the original header tree.
//!
//! A modified header replaces the original header at the same relative path
//! without touching the original tree on disk: the front-end receives its
//! contents as an unsaved file registered under the original path.

use std::path::{Path, PathBuf};

use tracing::{debug, info};
use walkdir::WalkDir;

use crate::error::{BuildError, Result};

/// In-memory replacement for a header on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VirtualFile {
    /// Path the front-end sees, rooted at the original header directory
    pub path: PathBuf,
    pub contents: String,
}

/// Collect every `*.h` below `modified`, re-based onto `original`.
///
/// A missing `modified` directory yields no overlays.
pub fn collect_overlays(modified: &Path, original: &Path) -> Result<Vec<VirtualFile>> {
    if !modified.is_dir() {
        debug!(path = %modified.display(), "no modified header directory");
        return Ok(Vec::new());
    }

    let mut overlays = Vec::new();
    for entry in WalkDir::new(modified).sort_by_file_name() {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        if !path.extension().is_some_and(|ext| ext == "h") {
            continue;
        }
        let Ok(relative) = path.strip_prefix(modified) else {
            continue;
        };

        let contents = std::fs::read_to_string(path).map_err(|source| BuildError::ReadHeader {
            path: path.to_path_buf(),
            source,
        })?;
        let target = original.join(relative);
        debug!(from = %path.display(), to = %target.display(), "overlay");
        overlays.push(VirtualFile {
            path: target,
            contents,
        });
    }

    info!(count = overlays.len(), "collected header overlays");
    Ok(overlays)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_collect_rebases_paths() {
        let modified = tempfile::tempdir().unwrap();
        fs::create_dir_all(modified.path().join("linux")).unwrap();
        fs::create_dir_all(modified.path().join("asm")).unwrap();
        fs::write(modified.path().join("linux/types.h"), "typedef int __s32;\n").unwrap();
        fs::write(modified.path().join("asm/posix_types.h"), "/* empty */\n").unwrap();
        fs::write(modified.path().join("linux/README"), "not a header").unwrap();

        let original = Path::new("/headers/linux-4.3.5");
        let overlays = collect_overlays(modified.path(), original).unwrap();

        assert_eq!(overlays.len(), 2);
        assert_eq!(overlays[0].path, original.join("asm/posix_types.h"));
        assert_eq!(overlays[1].path, original.join("linux/types.h"));
        assert_eq!(overlays[1].contents, "typedef int __s32;\n");
    }

    #[test]
    fn test_missing_directory_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let overlays = collect_overlays(&dir.path().join("absent"), dir.path()).unwrap();
        assert!(overlays.is_empty());
    }
}
