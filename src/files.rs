//! Directory scanning helpers for the file browser.

use crate::Result;
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;

/// Files directly inside `dir`, sorted by path.
pub fn child_files(dir: impl AsRef<Path>) -> Result<Vec<PathBuf>> {
    collect(dir.as_ref(), Some(1))
}

/// Every file under `dir`, recursively, sorted by path.
pub fn all_files(dir: impl AsRef<Path>) -> Result<Vec<PathBuf>> {
    collect(dir.as_ref(), None)
}

fn collect(dir: &Path, max_depth: Option<usize>) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("not a directory: {}", dir.display()),
        )
        .into());
    }

    let mut walker = WalkDir::new(dir).min_depth(1);
    if let Some(depth) = max_depth {
        walker = walker.max_depth(depth);
    }

    let mut files = Vec::new();
    for entry in walker {
        match entry {
            Ok(entry) if entry.file_type().is_file() => files.push(entry.into_path()),
            Ok(_) => {}
            // Unreadable entries are skipped; a partial listing beats none.
            Err(err) => debug!(%err, "skipping unreadable directory entry"),
        }
    }
    files.sort();
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_child_files_is_shallow_and_sorted() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("b.zad"), b"").unwrap();
        std::fs::write(dir.path().join("a.Z_flat"), b"").unwrap();
        std::fs::create_dir(dir.path().join("nested")).unwrap();
        std::fs::write(dir.path().join("nested/c.txt"), b"").unwrap();

        let files = child_files(dir.path()).unwrap();
        let names: Vec<_> = files
            .iter()
            .filter_map(|p| p.file_name().map(|n| n.to_string_lossy().into_owned()))
            .collect();
        assert_eq!(names, vec!["a.Z_flat", "b.zad"]);
    }

    #[test]
    fn test_all_files_recurses() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("x/y")).unwrap();
        std::fs::write(dir.path().join("x/y/deep.txt"), b"").unwrap();
        std::fs::write(dir.path().join("top.txt"), b"").unwrap();

        let files = all_files(dir.path()).unwrap();
        assert_eq!(files.len(), 2);
        assert!(files.iter().any(|p| p.ends_with("x/y/deep.txt")));
    }
}
