use std::collections::HashSet;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, trace};
use walkdir::WalkDir;

#[derive(Error, Debug)]
pub enum ScannerError {
    #[error("Path does not exist: {0}")]
    PathNotFound(PathBuf),

    #[error("Path is not a directory: {0}")]
    NotADirectory(PathBuf),

    #[error("Permission denied: {0}")]
    PermissionDenied(PathBuf),

    #[error("Failed to read directory: {0}")]
    IoError(#[from] std::io::Error),
}

/// Expand a list of files and folders into the input files of a job
///
/// Files given directly are kept in the order given. Folders are walked
/// (recursively unless `recursive` is false) and their files appended in
/// sorted order. Hidden entries are skipped and duplicates dropped. An empty
/// `extensions` list accepts every file; otherwise the match is
/// case-insensitive.
pub fn collect_files(
    sources: &[PathBuf],
    extensions: &[&str],
    recursive: bool,
) -> Result<Vec<PathBuf>, ScannerError> {
    let mut seen = HashSet::new();
    let mut files = Vec::new();

    for source in sources {
        debug!(path = ?source, "Collecting input files");

        if !source.exists() {
            return Err(ScannerError::PathNotFound(source.clone()));
        }

        if source.is_file() {
            if has_extension(source, extensions) && seen.insert(source.clone()) {
                files.push(source.clone());
            } else {
                trace!(path = ?source, "Skipping file with unwanted extension");
            }
            continue;
        }

        for path in walk_directory(source, extensions, recursive)? {
            if seen.insert(path.clone()) {
                files.push(path);
            }
        }
    }

    debug!(count = files.len(), "Collection complete");
    Ok(files)
}

/// All matching files below one directory, sorted
pub fn walk_directory(
    target: &Path,
    extensions: &[&str],
    recursive: bool,
) -> Result<Vec<PathBuf>, ScannerError> {
    if !target.exists() {
        return Err(ScannerError::PathNotFound(target.to_path_buf()));
    }

    if !target.is_dir() {
        return Err(ScannerError::NotADirectory(target.to_path_buf()));
    }

    let max_depth = if recursive { usize::MAX } else { 1 };
    let walker = WalkDir::new(target)
        .max_depth(max_depth)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| entry.depth() == 0 || !is_hidden(entry.path()));

    let mut files = Vec::new();
    for entry in walker {
        let entry = entry.map_err(|e| {
            let path = e.path().unwrap_or(target).to_path_buf();
            match e.into_io_error() {
                Some(io) if io.kind() == std::io::ErrorKind::PermissionDenied => {
                    ScannerError::PermissionDenied(path)
                }
                Some(io) => ScannerError::IoError(io),
                None => ScannerError::IoError(std::io::Error::other("filesystem loop detected")),
            }
        })?;

        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.into_path();
        if has_extension(&path, extensions) {
            trace!(path = ?path, "Found file");
            files.push(path);
        }
    }

    Ok(files)
}

fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .map(|n| n.to_string_lossy().starts_with('.'))
        .unwrap_or(false)
}

fn has_extension(path: &Path, extensions: &[&str]) -> bool {
    if extensions.is_empty() {
        return true;
    }

    path.extension()
        .map(|ext| {
            let ext = ext.to_string_lossy();
            extensions.iter().any(|wanted| ext.eq_ignore_ascii_case(wanted))
        })
        .unwrap_or(false)
}
