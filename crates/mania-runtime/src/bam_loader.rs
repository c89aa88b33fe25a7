//! Recursive `.bam` directory walk for §6.3's boot paths.
//!
//! A hand-rolled walker rather than the `walkdir` crate, grounded on the
//! teacher's own `crates/compiler/src/main.rs::walkdir` — itself a plain
//! recursive `std::fs::read_dir` descent, not the crates.io crate of the
//! same name.

use std::fs;
use std::path::{Path, PathBuf};

/// Recursively collects every file under `dir` whose extension is `bam`.
/// Unreadable directories/entries are logged and skipped rather than
/// aborting the whole walk, matching the teacher's `walkdir`.
pub fn find_bam_files(dir: &Path) -> Vec<PathBuf> {
    let mut files = Vec::new();
    walk(dir, &mut files);
    files
}

fn walk(dir: &Path, out: &mut Vec<PathBuf>) {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            tracing::warn!(path = %dir.display(), error = %e, "could not read boot directory");
            return;
        }
    };

    for entry in entries {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                tracing::warn!(path = %dir.display(), error = %e, "could not read directory entry");
                continue;
            }
        };
        let path = entry.path();
        if path.is_dir() {
            walk(&path, out);
        } else if path.extension().is_some_and(|ext| ext == "bam") {
            out.push(path);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::Write;

    #[test]
    fn finds_bam_files_recursively_and_skips_other_extensions() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("nested");
        fs::create_dir(&nested).unwrap();

        File::create(dir.path().join("top.bam")).unwrap().write_all(b"x").unwrap();
        File::create(nested.join("inner.bam")).unwrap().write_all(b"x").unwrap();
        File::create(nested.join("ignore.txt")).unwrap().write_all(b"x").unwrap();

        let mut found: Vec<String> = find_bam_files(dir.path())
            .into_iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        found.sort();
        assert_eq!(found, vec!["inner.bam".to_string(), "top.bam".to_string()]);
    }

    #[test]
    fn missing_directory_yields_no_files() {
        let missing = Path::new("/nonexistent/mania/boot/path");
        assert_eq!(find_bam_files(missing), Vec::<PathBuf>::new());
    }
}
