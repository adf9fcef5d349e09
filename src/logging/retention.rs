//! Backup generation naming and retention
//!
//! A rotated family is `<name>.log` plus `<name>.log.1` ... `<name>.log.N`,
//! newest backup first.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Path of backup generation `generation` for the active file `path`
pub fn backup_path(path: &Path, generation: usize) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(format!(".{}", generation));
    PathBuf::from(name)
}

/// Delete backup generations numbered above `backup_count`
///
/// Leftovers appear when a previous run used a larger backup count.
/// Returns the number of files deleted.
pub fn prune_generations(path: &Path, backup_count: usize) -> io::Result<usize> {
    let (Some(dir), Some(file_name)) = (path.parent(), path.file_name().and_then(|n| n.to_str()))
    else {
        return Ok(0);
    };
    let dir = if dir.as_os_str().is_empty() {
        Path::new(".")
    } else {
        dir
    };
    if !dir.exists() {
        return Ok(0);
    }

    let prefix = format!("{}.", file_name);
    let mut deleted_count = 0;

    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let entry_path = entry.path();

        // Only process numbered generations of this family
        let Some(generation) = entry_path
            .file_name()
            .and_then(|n| n.to_str())
            .and_then(|n| n.strip_prefix(&prefix))
            .and_then(|suffix| suffix.parse::<usize>().ok())
        else {
            continue;
        };

        if generation > backup_count && fs::remove_file(&entry_path).is_ok() {
            deleted_count += 1;
        }
    }

    Ok(deleted_count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::Write;
    use tempfile::TempDir;

    fn touch(path: &Path) {
        File::create(path).unwrap().write_all(b"test").unwrap();
    }

    #[test]
    fn test_backup_path() {
        let path = Path::new("/var/log/drive/sensor.log");
        assert_eq!(
            backup_path(path, 3),
            PathBuf::from("/var/log/drive/sensor.log.3")
        );
    }

    #[test]
    fn test_prune_nonexistent_dir() {
        let path = Path::new("/nonexistent/path/for/testing/main.log");
        assert_eq!(prune_generations(path, 2).unwrap(), 0);
    }

    #[test]
    fn test_prune_removes_excess_generations() {
        let temp_dir = TempDir::new().unwrap();
        let active = temp_dir.path().join("sync.log");
        touch(&active);
        for generation in 1..=5 {
            touch(&backup_path(&active, generation));
        }

        let count = prune_generations(&active, 2).unwrap();
        assert_eq!(count, 3);
        assert!(active.exists());
        assert!(backup_path(&active, 1).exists());
        assert!(backup_path(&active, 2).exists());
        assert!(!backup_path(&active, 3).exists());
        assert!(!backup_path(&active, 5).exists());
    }

    #[test]
    fn test_prune_ignores_other_files() {
        let temp_dir = TempDir::new().unwrap();
        let active = temp_dir.path().join("sync.log");

        let other_family = temp_dir.path().join("sensor.log.9");
        let not_numbered = temp_dir.path().join("sync.log.old");
        touch(&other_family);
        touch(&not_numbered);

        assert_eq!(prune_generations(&active, 0).unwrap(), 0);
        assert!(other_family.exists());
        assert!(not_numbered.exists());
    }
}
