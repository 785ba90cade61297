//! Glob-driven classification of files under a root into named buckets.
//!
//! Rules are written one per line as `<bucket> <glob> [<glob>...]`, with globs
//! relative to the classification root. Every matched file is copied into
//! `<out root>/<bucket>/<parent dir>-<file name>`.

mod types;

pub use types::{BucketPlan, ClassificationRule, ClassifiedFile, RuleError};

use std::collections::BTreeSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use glob::{MatchOptions, Pattern};
use tracing::{debug, warn};

/// Parse the rule list; blank lines and `#` comments are skipped
pub fn parse_rules(text: &str) -> Result<Vec<ClassificationRule>, RuleError> {
    let mut rules = Vec::new();

    for (index, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let mut parts = line.split_whitespace();
        let bucket = parts.next().unwrap_or_default().to_string();
        let globs: Vec<String> = parts.map(str::to_string).collect();

        if globs.is_empty() {
            return Err(RuleError::MissingGlobs {
                line: index + 1,
                text: line.to_string(),
            });
        }

        for glob in &globs {
            Pattern::new(glob).map_err(|e| RuleError::InvalidGlob {
                pattern: glob.clone(),
                reason: e.to_string(),
            })?;
        }

        rules.push(ClassificationRule { bucket, globs });
    }

    Ok(rules)
}

/// Resolve every rule against `root` into a copy plan
///
/// An empty root, output root or rule list yields an empty plan. A root that
/// does not exist is an error.
pub fn resolve(
    root: &Path,
    out_root: &Path,
    rules: &[ClassificationRule],
) -> Result<Vec<BucketPlan>, RuleError> {
    if root.as_os_str().is_empty() || out_root.as_os_str().is_empty() || rules.is_empty() {
        return Ok(Vec::new());
    }
    if !root.is_dir() {
        return Err(RuleError::RootNotFound(root.to_path_buf()));
    }

    let escaped_root = Pattern::escape(&root.to_string_lossy());
    let options = MatchOptions {
        case_sensitive: true,
        require_literal_separator: false,
        require_literal_leading_dot: true,
    };

    let mut plans = Vec::with_capacity(rules.len());
    for rule in rules {
        let mut matched = BTreeSet::new();

        for glob in &rule.globs {
            let full = format!("{}/{}", escaped_root, glob.trim_start_matches('/'));
            let paths = glob::glob_with(&full, options).map_err(|e| RuleError::InvalidGlob {
                pattern: glob.clone(),
                reason: e.to_string(),
            })?;

            for entry in paths {
                match entry {
                    Ok(path) if path.is_file() => {
                        matched.insert(path);
                    }
                    Ok(_) => {}
                    Err(e) => warn!("Skipping unreadable path: {}", e),
                }
            }
        }

        debug!(bucket = %rule.bucket, files = matched.len(), "Resolved rule");
        plans.push(BucketPlan {
            bucket: rule.bucket.clone(),
            out_path: out_root.join(&rule.bucket),
            files: matched
                .into_iter()
                .map(|source| ClassifiedFile {
                    display_name: display_name(&source),
                    source,
                })
                .collect(),
        });
    }

    Ok(plans)
}

/// `<parent dir name>-<file name>`
pub fn display_name(path: &Path) -> String {
    let file = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();

    match path.parent().and_then(Path::file_name) {
        Some(parent) => format!("{}-{}", parent.to_string_lossy(), file),
        None => file,
    }
}

/// Copy one classified file, creating the bucket directory on demand
pub fn copy_into_bucket(source: &Path, destination: &Path) -> io::Result<u64> {
    if let Some(parent) = destination.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::copy(source, destination)
}

/// Flatten the plan into (bucket, source, destination) triples in plan order
pub fn copy_list(plans: &[BucketPlan]) -> Vec<(String, PathBuf, PathBuf)> {
    plans
        .iter()
        .flat_map(|plan| {
            plan.files
                .iter()
                .map(move |file| (plan.bucket.clone(), file.source.clone(), plan.destination(file)))
        })
        .collect()
}
