use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::ocr::TextRecognizer;
use crate::relocate::backup_existing;
use crate::template::{sanitize_filename, NamingTemplate};

use super::matcher::find_match;
use super::types::{MatchResult, RenameConfig, RenameError, RenameState};

/// Drives one file through text extraction, matching and renaming
pub struct MatchRenameEngine<'a> {
    recognizer: &'a dyn TextRecognizer,
    config: &'a RenameConfig,
}

impl<'a> MatchRenameEngine<'a> {
    pub fn new(recognizer: &'a dyn TextRecognizer, config: &'a RenameConfig) -> Self {
        Self { recognizer, config }
    }

    /// Run `file` to a terminal state; with `dry_run` the rename is only planned
    pub fn process(&self, file: &Path, dry_run: bool) -> RenameState {
        let mut state = RenameState::Pending;
        while !state.is_terminal() {
            state = self.step(file, state, dry_run);
        }
        state
    }

    /// Advance one transition
    pub fn step(&self, file: &Path, state: RenameState, dry_run: bool) -> RenameState {
        match state {
            RenameState::Pending => match self.recognizer.recognize(file, self.config.page) {
                Ok(text) => RenameState::TextExtracted(text),
                Err(e) => {
                    warn!(path = ?file, error = %e, "Text extraction failed");
                    RenameState::Unmatched(format!("text extraction failed: {}", e))
                }
            },

            RenameState::TextExtracted(text) => {
                match find_match(&text, &self.config.rule, &self.config.table) {
                    MatchResult::Matched { row, matched_text } => {
                        debug!(path = ?file, matched = %matched_text, "Matched table row");
                        RenameState::Matched {
                            row: row.to_vec(),
                            matched_text,
                        }
                    }
                    MatchResult::NoMatch(reason) => {
                        info!(path = ?file, "No match");
                        RenameState::Unmatched(reason.describe())
                    }
                }
            }

            RenameState::Matched { row, .. } => {
                let fallback = row
                    .get(self.config.rule.match_column())
                    .cloned()
                    .unwrap_or_default();

                let result = if dry_run {
                    planned_target(file, &row, &self.config.template, &fallback)
                        .map(|to| RenameState::Planned { to })
                } else {
                    rename_file(file, &row, &self.config.template, &fallback)
                        .map(|(to, backup)| RenameState::Renamed { to, backup })
                };

                result.unwrap_or_else(|e| RenameState::RenameFailed(e.to_string()))
            }

            terminal => terminal,
        }
    }
}

/// Where `file` would be renamed to for `row`
///
/// The directory and extension of `file` are kept. An empty template, or one
/// rendering to nothing, falls back to `fallback` (the matched cell). A name
/// that already ends in the source extension does not get it twice.
pub fn planned_target(
    file: &Path,
    row: &[String],
    template: &NamingTemplate,
    fallback: &str,
) -> Result<PathBuf, RenameError> {
    let rendered = if template.is_empty() {
        String::new()
    } else {
        template.render(row)?
    };

    let name = sanitize_filename(&rendered);
    let name = if name.is_empty() {
        sanitize_filename(fallback)
    } else {
        name
    };

    if name.is_empty() {
        return Err(RenameError::EmptyName {
            path: file.to_path_buf(),
        });
    }

    let file_name = match file.extension() {
        Some(ext) => {
            let ext = ext.to_string_lossy();
            let stem = strip_extension(&name, &ext);
            format!("{}.{}", stem, ext)
        }
        None => name,
    };

    Ok(file
        .parent()
        .map(|p| p.join(&file_name))
        .unwrap_or_else(|| PathBuf::from(&file_name)))
}

/// `name` without a trailing `.ext`, compared case-insensitively
fn strip_extension<'n>(name: &'n str, ext: &str) -> &'n str {
    let suffix_len = ext.len() + 1;
    if name.len() <= suffix_len || !name.is_char_boundary(name.len() - suffix_len) {
        return name;
    }

    let (stem, suffix) = name.split_at(name.len() - suffix_len);
    if suffix.starts_with('.') && suffix[1..].eq_ignore_ascii_case(ext) {
        stem
    } else {
        name
    }
}

/// Rename `file` for `row`, backing up anything already at the target
///
/// Returns the new path and the backup path if one was made.
pub fn rename_file(
    file: &Path,
    row: &[String],
    template: &NamingTemplate,
    fallback: &str,
) -> Result<(PathBuf, Option<PathBuf>), RenameError> {
    let target = planned_target(file, row, template, fallback)?;
    if target == file {
        debug!(path = ?file, "Already has target name");
        return Ok((target, None));
    }

    let fs_error = |source: std::io::Error| RenameError::FilesystemError {
        from: file.display().to_string(),
        to: target.display().to_string(),
        source,
    };

    let backup = backup_existing(&target).map_err(fs_error)?;
    fs::rename(file, &target).map_err(fs_error)?;

    info!("Renamed: {} -> {}", file.display(), target.display());
    Ok((target, backup))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ocr::OcrError;
    use crate::rename::{MatchRule, ReferenceTable};
    use crate::template::parse_template;
    use std::collections::HashMap;
    use tempfile::tempdir;

    /// Recognizer returning canned text keyed by file name
    struct FakeRecognizer(HashMap<String, String>);

    impl TextRecognizer for FakeRecognizer {
        fn recognize(&self, pdf: &Path, _page_index: u32) -> Result<String, OcrError> {
            let name = pdf.file_name().unwrap().to_string_lossy().to_string();
            self.0.get(&name).cloned().ok_or(OcrError::Unreadable {
                path: pdf.to_path_buf(),
                page: 1,
                reason: "no text".to_string(),
            })
        }
    }

    fn recognizer(entries: &[(&str, &str)]) -> FakeRecognizer {
        FakeRecognizer(
            entries
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        )
    }

    fn config(template: &str) -> RenameConfig {
        RenameConfig {
            rule: MatchRule::new("被告:.*,", 0).unwrap(),
            table: ReferenceTable::parse("张三\t案号001\n李四\t案号002\n", false),
            template: parse_template(template).unwrap(),
            page: 0,
        }
    }

    #[test]
    fn test_process_renames_matched_file() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("scan01.pdf");
        fs::write(&file, "pdf").unwrap();

        let ocr = recognizer(&[("scan01.pdf", "本院认为 被告:张三, 应当")]);
        let config = config("2025-{1}-{0}-判决书");
        let state = MatchRenameEngine::new(&ocr, &config).process(&file, false);

        let expected = dir.path().join("2025-案号001-张三-判决书.pdf");
        assert_eq!(
            state,
            RenameState::Renamed {
                to: expected.clone(),
                backup: None
            }
        );
        assert!(expected.exists());
        assert!(!file.exists());
    }

    #[test]
    fn test_dry_run_only_plans() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("scan01.pdf");
        fs::write(&file, "pdf").unwrap();

        let ocr = recognizer(&[("scan01.pdf", "被告:李四,")]);
        let config = config("{1}");
        let state = MatchRenameEngine::new(&ocr, &config).process(&file, true);

        assert_eq!(
            state,
            RenameState::Planned {
                to: dir.path().join("案号002.pdf")
            }
        );
        assert!(file.exists());
    }

    #[test]
    fn test_unmatched_file_left_untouched() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("scan02.pdf");
        fs::write(&file, "pdf").unwrap();

        let ocr = recognizer(&[("scan02.pdf", "被告:王五,")]);
        let config = config("{1}");
        let state = MatchRenameEngine::new(&ocr, &config).process(&file, false);

        assert!(matches!(state, RenameState::Unmatched(_)));
        assert!(file.exists());
    }

    #[test]
    fn test_ocr_failure_downgrades_to_unmatched() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("unknown.pdf");
        fs::write(&file, "pdf").unwrap();

        let ocr = recognizer(&[]);
        let config = config("{1}");
        let state = MatchRenameEngine::new(&ocr, &config).process(&file, false);

        match state {
            RenameState::Unmatched(reason) => assert!(reason.contains("text extraction failed")),
            other => panic!("Expected Unmatched, got {:?}", other),
        }
    }

    #[test]
    fn test_step_sequence() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("scan01.pdf");

        let ocr = recognizer(&[("scan01.pdf", "被告:张三,")]);
        let config = config("{1}");
        let engine = MatchRenameEngine::new(&ocr, &config);

        let state = engine.step(&file, RenameState::Pending, true);
        assert_eq!(state, RenameState::TextExtracted("被告:张三,".to_string()));

        let state = engine.step(&file, state, true);
        assert!(matches!(state, RenameState::Matched { .. }));
    }

    #[test]
    fn test_empty_template_falls_back_to_matched_cell() {
        let target = planned_target(
            Path::new("/cases/scan.pdf"),
            &["张三".to_string(), "001".to_string()],
            &parse_template("").unwrap(),
            "张三",
        )
        .unwrap();

        assert_eq!(target, PathBuf::from("/cases/张三.pdf"));
    }

    #[test]
    fn test_template_with_extension_is_not_doubled() {
        let target = planned_target(
            Path::new("/cases/scan.PDF"),
            &["张三".to_string()],
            &parse_template("{0}.pdf").unwrap(),
            "张三",
        )
        .unwrap();

        assert_eq!(target, PathBuf::from("/cases/张三.PDF"));
    }

    #[test]
    fn test_template_with_other_extension_keeps_it() {
        let target = planned_target(
            Path::new("/cases/scan.pdf"),
            &["张三".to_string()],
            &parse_template("{0}.v2").unwrap(),
            "张三",
        )
        .unwrap();

        assert_eq!(target, PathBuf::from("/cases/张三.v2.pdf"));
    }

    #[test]
    fn test_template_column_out_of_range() {
        let result = planned_target(
            Path::new("/cases/scan.pdf"),
            &["张三".to_string()],
            &parse_template("{4}").unwrap(),
            "张三",
        );

        assert!(matches!(result, Err(RenameError::Template(_))));
    }

    #[test]
    fn test_rename_backs_up_existing_target() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("scan.pdf");
        let existing = dir.path().join("张三.pdf");
        fs::write(&file, "new").unwrap();
        fs::write(&existing, "old").unwrap();

        let (to, backup) = rename_file(
            &file,
            &["张三".to_string()],
            &parse_template("{0}").unwrap(),
            "张三",
        )
        .unwrap();

        assert_eq!(to, existing);
        assert_eq!(backup, Some(dir.path().join("张三.pdf.bak")));
        assert_eq!(fs::read_to_string(&existing).unwrap(), "new");
        assert_eq!(
            fs::read_to_string(dir.path().join("张三.pdf.bak")).unwrap(),
            "old"
        );
    }

    #[test]
    fn test_rename_to_same_name_is_noop() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("张三.pdf");
        fs::write(&file, "content").unwrap();

        let (to, backup) = rename_file(
            &file,
            &["张三".to_string()],
            &parse_template("{0}").unwrap(),
            "张三",
        )
        .unwrap();

        assert_eq!(to, file);
        assert!(backup.is_none());
        assert!(!dir.path().join("张三.pdf.bak").exists());
    }
}
