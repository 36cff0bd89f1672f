use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

use crate::shared::constants;
use crate::utils::logger;

/// Lists every clip (by extension) in `dir`, sorted by name so batch runs
/// are deterministic. A directory without clips is a valid empty batch, not
/// an error; it is only worth a warning.
pub fn list_clips(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files: Vec<PathBuf> = fs::read_dir(dir)
        .with_context(|| format!("Failed to read directory: {}", dir.display()))?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| {
            path.is_file()
                && path
                    .extension()
                    .map_or(false, |ext| ext == constants::CLIP_EXTENSION)
        })
        .collect();

    files.sort();

    if files.is_empty() {
        logger::warn(&format!(
            "No .{} files found in '{}'",
            constants::CLIP_EXTENSION,
            dir.display()
        ));
    }

    Ok(files)
}

/// Idempotent directory creation with a readable error.
pub fn ensure_dir(dir: &Path) -> Result<()> {
    fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create directory: {}", dir.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;

    #[test]
    fn test_list_clips_filters_and_sorts() {
        let tmp = tempfile::tempdir().unwrap();
        for name in ["b.mp4", "a.mp4", "notes.txt", "c.avi"] {
            File::create(tmp.path().join(name)).unwrap();
        }

        let clips = list_clips(tmp.path()).unwrap();
        let names: Vec<_> = clips
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec!["a.mp4", "b.mp4"]);
    }

    #[test]
    fn test_list_clips_empty_dir_is_empty_batch() {
        let tmp = tempfile::tempdir().unwrap();
        assert!(list_clips(tmp.path()).unwrap().is_empty());
    }

    #[test]
    fn test_list_clips_missing_dir_errors() {
        let tmp = tempfile::tempdir().unwrap();
        assert!(list_clips(&tmp.path().join("nope")).is_err());
    }
}
