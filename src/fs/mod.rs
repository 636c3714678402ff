//! Local mirror layout and startup filesystem work.

pub mod walker;

use std::path::{Path, PathBuf};

/// Name of the verbatim folder body stored inside every mirrored folder.
pub const FOLDER_DESCRIPTION_FILE: &str = "000_folder-description.json";

/// Move an existing backup directory aside to a timestamped sibling under
/// the system temp area before a fresh backup starts. A missing directory
/// is fine; any other rename failure is fatal for the run.
pub fn stash_previous(backup_dir: &Path) -> std::io::Result<Option<PathBuf>> {
    let name = backup_dir
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("backup");
    let stamp = chrono::Local::now().format("%Y%m%dT%H%M%S%.3f");
    let target = std::env::temp_dir().join(format!("{name}-{stamp}"));

    match std::fs::rename(backup_dir, &target) {
        Ok(()) => Ok(Some(target)),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(err) => Err(err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn missing_directory_is_not_an_error() {
        let workdir = TempDir::new().unwrap();
        let absent = workdir.path().join("never-created");

        assert!(stash_previous(&absent).unwrap().is_none());
    }

    #[test]
    fn existing_directory_is_moved_aside() {
        let workdir = TempDir::new().unwrap();
        let backup_dir = workdir.path().join("mirror");
        std::fs::create_dir(&backup_dir).unwrap();
        std::fs::write(backup_dir.join("keep.txt"), b"data").unwrap();

        let stashed = stash_previous(&backup_dir).unwrap().unwrap();

        assert!(!backup_dir.exists());
        assert!(stashed.join("keep.txt").exists());

        std::fs::remove_dir_all(stashed).unwrap();
    }
}
