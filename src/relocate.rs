//! One-to-one file relocation with a single-level `.bak` collision backup.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info};

use crate::template::sanitize_filename;

pub const BACKUP_SUFFIX: &str = ".bak";

#[derive(Error, Debug)]
pub enum MoveError {
    #[error("Selected {files} files but {destinations} destinations; select one destination per file")]
    SelectionMismatch { files: usize, destinations: usize },

    #[error("Source file not found: {0}")]
    SourceNotFound(PathBuf),

    #[error("Failed to move '{from}' to '{to}': {source}")]
    FilesystemError {
        from: String,
        to: String,
        #[source]
        source: io::Error,
    },
}

/// Path an existing file is moved aside to: `<name>.bak`
pub fn backup_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(BACKUP_SUFFIX);
    PathBuf::from(name)
}

/// Move any file at `target` to its backup path
///
/// Only one backup is kept: an older `.bak` is replaced.
pub fn backup_existing(target: &Path) -> io::Result<Option<PathBuf>> {
    if !target.exists() {
        return Ok(None);
    }

    let backup = backup_path(target);
    if backup.exists() {
        fs::remove_file(&backup)?;
    }
    fs::rename(target, &backup)?;

    debug!(from = ?target, to = ?backup, "Backed up existing file");
    Ok(Some(backup))
}

/// Pair sources with destinations strictly by selection order
pub fn pair_by_selection(
    files: &[PathBuf],
    destinations: &[PathBuf],
) -> Result<Vec<(PathBuf, PathBuf)>, MoveError> {
    if files.len() != destinations.len() {
        return Err(MoveError::SelectionMismatch {
            files: files.len(),
            destinations: destinations.len(),
        });
    }

    Ok(files
        .iter()
        .cloned()
        .zip(destinations.iter().cloned())
        .collect())
}

/// `dest_dir/(override or original stem).ext`
pub fn planned_destination(file: &Path, dest_dir: &Path, override_name: Option<&str>) -> PathBuf {
    let stem = override_name
        .map(sanitize_filename)
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| {
            file.file_stem()
                .map(|s| s.to_string_lossy().to_string())
                .unwrap_or_default()
        });

    let name = match file.extension() {
        Some(ext) => format!("{}.{}", stem, ext.to_string_lossy()),
        None => stem,
    };

    dest_dir.join(name)
}

/// Result of a completed move
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MoveOutcome {
    pub destination: PathBuf,
    pub backup: Option<PathBuf>,
}

/// Move `file` into `dest_dir`, backing up a same-named file already there
pub fn move_file(
    file: &Path,
    dest_dir: &Path,
    override_name: Option<&str>,
) -> Result<MoveOutcome, MoveError> {
    if !file.is_file() {
        return Err(MoveError::SourceNotFound(file.to_path_buf()));
    }

    let destination = planned_destination(file, dest_dir, override_name);
    let fs_error = |source: io::Error| MoveError::FilesystemError {
        from: file.display().to_string(),
        to: destination.display().to_string(),
        source,
    };

    fs::create_dir_all(dest_dir).map_err(fs_error)?;
    let backup = backup_existing(&destination).map_err(fs_error)?;

    if fs::rename(file, &destination).is_err() {
        // Cross-device moves cannot rename; copy then remove
        fs::copy(file, &destination).map_err(fs_error)?;
        fs::remove_file(file).map_err(fs_error)?;
    }

    info!("Moved: {} -> {}", file.display(), destination.display());
    Ok(MoveOutcome {
        destination,
        backup,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_backup_path() {
        assert_eq!(
            backup_path(Path::new("/dest/f.pdf")),
            PathBuf::from("/dest/f.pdf.bak")
        );
    }

    #[test]
    fn test_move_into_empty_destination() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("f.pdf");
        let dest = dir.path().join("dest");
        fs::write(&file, "content").unwrap();

        let outcome = move_file(&file, &dest, None).unwrap();

        assert_eq!(outcome.destination, dest.join("f.pdf"));
        assert!(outcome.backup.is_none());
        assert!(!file.exists());
        assert_eq!(fs::read_to_string(dest.join("f.pdf")).unwrap(), "content");
    }

    #[test]
    fn test_move_collision_creates_backup() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("f.pdf");
        let dest = dir.path().join("dest");
        fs::create_dir(&dest).unwrap();
        fs::write(&file, "new").unwrap();
        fs::write(dest.join("f.pdf"), "old").unwrap();

        let outcome = move_file(&file, &dest, None).unwrap();

        assert_eq!(outcome.backup, Some(dest.join("f.pdf.bak")));
        assert_eq!(fs::read_to_string(dest.join("f.pdf")).unwrap(), "new");
        assert_eq!(fs::read_to_string(dest.join("f.pdf.bak")).unwrap(), "old");
    }

    #[test]
    fn test_second_collision_replaces_backup() {
        let dir = tempdir().unwrap();
        let dest = dir.path().join("dest");
        fs::create_dir(&dest).unwrap();
        fs::write(dest.join("f.pdf"), "first").unwrap();
        fs::write(dest.join("f.pdf.bak"), "stale").unwrap();

        let file = dir.path().join("f.pdf");
        fs::write(&file, "second").unwrap();
        move_file(&file, &dest, None).unwrap();

        assert_eq!(fs::read_to_string(dest.join("f.pdf")).unwrap(), "second");
        assert_eq!(fs::read_to_string(dest.join("f.pdf.bak")).unwrap(), "first");
        assert!(!dest.join("f.pdf.bak.bak").exists());
    }

    #[test]
    fn test_override_name_keeps_extension() {
        let dest =
            planned_destination(Path::new("/in/scan.pdf"), Path::new("/out"), Some("起诉状"));
        assert_eq!(dest, PathBuf::from("/out/起诉状.pdf"));

        let dest = planned_destination(Path::new("/in/scan.pdf"), Path::new("/out"), Some(""));
        assert_eq!(dest, PathBuf::from("/out/scan.pdf"));
    }

    #[test]
    fn test_pair_by_selection() {
        let files = vec![PathBuf::from("a.pdf"), PathBuf::from("b.pdf")];
        let dests = vec![PathBuf::from("x"), PathBuf::from("y")];

        let pairs = pair_by_selection(&files, &dests).unwrap();
        assert_eq!(pairs[1], (PathBuf::from("b.pdf"), PathBuf::from("y")));

        let result = pair_by_selection(&files, &dests[..1]);
        assert!(matches!(
            result,
            Err(MoveError::SelectionMismatch {
                files: 2,
                destinations: 1
            })
        ));
    }

    #[test]
    fn test_missing_source() {
        let dir = tempdir().unwrap();
        let result = move_file(&dir.path().join("gone.pdf"), dir.path(), None);
        assert!(matches!(result, Err(MoveError::SourceNotFound(_))));
    }
}
