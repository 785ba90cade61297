//! Turn parsed command-line arguments into validated jobs.
//!
//! Everything that can be wrong with the job description is caught here, so
//! configuration and fatal errors are reported before any item runs.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Local;
use tracing::{debug, info};

use crate::classify::{copy_list, parse_rules, resolve};
use crate::cli::{
    ClassifyArgs, Command, ConvertArgs, MergeArgs, MoveArgs, OrientArgs, Recognizer, RenameArgs,
    SplitArgs,
};
use crate::config::ToolConfig;
use crate::convert::{pdf_target, SofficeConverter, EXCEL_EXTENSIONS, WORD_EXTENSIONS};
use crate::error::{AppError, ConfigError};
use crate::job::{IrregularPart, Job, JobContext, JobKind, SplitMode, WorkItem};
use crate::ocr::{TesseractRecognizer, TextLayerRecognizer, TextRecognizer};
use crate::range::{RangeError, RangeText};
use crate::relocate::pair_by_selection;
use crate::rename::{MatchRule, ReferenceTable, RenameConfig};
use crate::scanner::collect_files;
use crate::template::{parse_template, NamingTemplate};

const PDF_EXTENSIONS: [&str; 1] = ["pdf"];

/// Build the job described by `command`
pub fn build_job(command: &Command) -> Result<Job, AppError> {
    match command {
        Command::Split(args) => split_job(args),
        Command::Merge(args) => merge_job(args),
        Command::Rename(args) => rename_job(args),
        Command::Move(args) => move_job(args),
        Command::Classify(args) => classify_job(args),
        Command::Convert(args) => convert_job(args),
        Command::Orient(args) => orient_job(args),
    }
}

/// Collaborators for running `command`'s job
pub fn build_context(command: &Command, tools: &ToolConfig, dry_run: bool) -> JobContext {
    let recognizer_kind = match command {
        Command::Rename(args) => args.ocr,
        Command::Orient(args) => args.ocr,
        _ => Recognizer::TextLayer,
    };

    let recognizer: Box<dyn TextRecognizer> = match recognizer_kind {
        Recognizer::Tesseract => Box::new(TesseractRecognizer::new(tools)),
        Recognizer::TextLayer => Box::new(TextLayerRecognizer),
    };

    JobContext {
        recognizer,
        converter: Box::new(SofficeConverter::new(tools)),
        dry_run,
    }
}

/// Collect input files; finding none is fatal
fn inputs(
    sources: &[PathBuf],
    extensions: &[&str],
    recursive: bool,
) -> Result<Vec<PathBuf>, AppError> {
    let files = collect_files(sources, extensions, recursive)?;
    if files.is_empty() {
        return Err(AppError::NoInputFiles {
            sources: sources.to_vec(),
            extensions: extensions.iter().map(|e| e.to_string()).collect(),
        });
    }
    Ok(files)
}

fn optional_template(text: Option<&str>) -> Result<Option<NamingTemplate>, AppError> {
    text.map(parse_template).transpose().map_err(AppError::from)
}

/// Parse `SPEC[=NAME]`
pub fn parse_range_arg(arg: &str) -> Result<IrregularPart, AppError> {
    let (spec, name) = match arg.split_once('=') {
        Some((spec, name)) => (spec, Some(name)),
        None => (arg, None),
    };

    Ok(IrregularPart {
        range: RangeText::parse(spec)?,
        template: optional_template(name)?,
    })
}

fn split_job(args: &SplitArgs) -> Result<Job, AppError> {
    let template = optional_template(args.name.as_deref())?;

    let mode = match args.every {
        Some(0) => return Err(RangeError::ZeroStep.into()),
        Some(step) => {
            if args.start_page == 0 {
                return Err(RangeError::ZeroPage {
                    spec: args.start_page.to_string(),
                }
                .into());
            }
            SplitMode::Regular {
                step,
                start: args.start_page - 1,
            }
        }
        None => {
            let parts = args
                .ranges
                .iter()
                .map(|r| parse_range_arg(r))
                .collect::<Result<Vec<_>, _>>()?;
            if parts.is_empty() {
                return Err(ConfigError::MissingField("--every or --range").into());
            }
            SplitMode::Irregular(parts)
        }
    };

    let files = inputs(&args.sources, &PDF_EXTENSIONS, !args.no_recursive)?;
    info!(files = files.len(), "Prepared split job");

    let items = files
        .into_iter()
        .map(|source| WorkItem::Split {
            source,
            mode: mode.clone(),
            template: template.clone(),
            out_dir: args.out.clone(),
        })
        .collect();

    Ok(Job::new(JobKind::Split, items))
}

/// `merged-YYYYMMDDHHMMSS.pdf`, or the given name with `.pdf` ensured
pub fn merge_file_name(name: Option<&str>) -> String {
    match name.map(str::trim).filter(|n| !n.is_empty()) {
        Some(name) if name.to_lowercase().ends_with(".pdf") => name.to_string(),
        Some(name) => format!("{}.pdf", name),
        None => format!("merged-{}.pdf", Local::now().format("%Y%m%d%H%M%S")),
    }
}

fn merge_job(args: &MergeArgs) -> Result<Job, AppError> {
    let sources = inputs(&args.sources, &PDF_EXTENSIONS, !args.no_recursive)?;

    let dir = match &args.out {
        Some(dir) => dir.clone(),
        None => sources
            .first()
            .and_then(|s| s.parent())
            .map(Path::to_path_buf)
            .unwrap_or_default(),
    };
    let file_name = crate::template::sanitize_filename(&merge_file_name(args.name.as_deref()));
    let output = dir.join(file_name);
    debug!(output = ?output, inputs = sources.len(), "Prepared merge job");

    Ok(Job::new(
        JobKind::Merge,
        vec![WorkItem::Merge {
            sources,
            output,
            delete_sources: args.delete_sources,
        }],
    ))
}

fn read_text(path: &Path) -> Result<String, AppError> {
    fs::read_to_string(path).map_err(|source| {
        ConfigError::ReadInput {
            path: path.to_path_buf(),
            source,
        }
        .into()
    })
}

fn rename_job(args: &RenameArgs) -> Result<Job, AppError> {
    let rule = MatchRule::new(&args.pattern, args.column)?;
    let template = parse_template(&args.template)?;

    let table_text = match (&args.table, &args.table_text) {
        (Some(path), _) => read_text(path)?,
        (None, Some(text)) => text.clone(),
        (None, None) => return Err(ConfigError::MissingField("--table or --table-text").into()),
    };
    let table = ReferenceTable::parse(&table_text, args.skip_header);
    if table.is_empty() {
        return Err(ConfigError::MissingField("reference table rows").into());
    }
    template.check_width(table.width())?;

    if args.page == 0 {
        return Err(RangeError::ZeroPage {
            spec: args.page.to_string(),
        }
        .into());
    }

    let config = Arc::new(RenameConfig {
        rule,
        table,
        template,
        page: args.page - 1,
    });

    let files = inputs(&args.sources, &PDF_EXTENSIONS, !args.no_recursive)?;
    info!(files = files.len(), rows = config.table.candidates().len(), "Prepared rename job");

    let items = files
        .into_iter()
        .map(|source| WorkItem::Rename {
            source,
            config: Arc::clone(&config),
        })
        .collect();

    Ok(Job::new(JobKind::Rename, items))
}

fn move_job(args: &MoveArgs) -> Result<Job, AppError> {
    let pairs = pair_by_selection(&args.files, &args.destinations)?;

    if !args.names.is_empty() && args.names.len() != args.files.len() {
        return Err(ConfigError::Selection(format!(
            "Selected {} files but {} names; give one name per file or none",
            args.files.len(),
            args.names.len()
        ))
        .into());
    }

    for file in &args.files {
        if !file.is_file() {
            return Err(AppError::DirectoryNotFound { path: file.clone() });
        }
    }

    let items = pairs
        .into_iter()
        .enumerate()
        .map(|(i, (source, dest_dir))| WorkItem::Move {
            source,
            dest_dir,
            override_name: args.names.get(i).cloned(),
        })
        .collect();

    Ok(Job::new(JobKind::Move, items))
}

fn classify_job(args: &ClassifyArgs) -> Result<Job, AppError> {
    let mut text = match &args.rules {
        Some(path) => read_text(path)?,
        None => String::new(),
    };
    for rule in &args.rule {
        text.push('\n');
        text.push_str(rule);
    }

    let rules = parse_rules(&text)?;
    if rules.is_empty() {
        return Err(ConfigError::MissingField("--rules or --rule").into());
    }

    let plans = resolve(&args.root, &args.out, &rules)?;
    for plan in &plans {
        debug!(bucket = %plan.bucket, files = plan.files.len(), "Bucket planned");
    }

    let items = copy_list(&plans)
        .into_iter()
        .map(|(bucket, source, destination)| WorkItem::Copy {
            bucket,
            source,
            destination,
        })
        .collect();

    Ok(Job::new(JobKind::Classify, items))
}

fn convert_job(args: &ConvertArgs) -> Result<Job, AppError> {
    let (word, excel) = if args.word || args.excel {
        (args.word, args.excel)
    } else {
        (true, true)
    };

    let mut extensions: Vec<&str> = Vec::new();
    if word {
        extensions.extend(WORD_EXTENSIONS);
    }
    if excel {
        extensions.extend(EXCEL_EXTENSIONS);
    }

    let files = inputs(&args.folders, &extensions, !args.no_recursive)?;
    let items = files
        .into_iter()
        .map(|source| WorkItem::Convert {
            output: pdf_target(&source),
            source,
        })
        .collect();

    Ok(Job::new(JobKind::Convert, items))
}

fn orient_job(args: &OrientArgs) -> Result<Job, AppError> {
    let files = inputs(&args.sources, &PDF_EXTENSIONS, !args.no_recursive)?;
    let items = files
        .into_iter()
        .map(|source| WorkItem::Orient { source })
        .collect();

    Ok(Job::new(JobKind::Orient, items))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::Args;
    use crate::error::ExitCode;
    use clap::Parser;
    use tempfile::tempdir;

    fn job_for(argv: &[&str]) -> Result<Job, AppError> {
        let args = Args::try_parse_from(argv).unwrap();
        build_job(&args.command)
    }

    #[test]
    fn test_parse_range_arg() {
        let part = parse_range_arg("3-5=证据").unwrap();
        assert_eq!(part.range, RangeText::Pages { first: 3, last: 5 });
        assert!(part.template.is_some());

        let part = parse_range_arg("").unwrap();
        assert_eq!(part.range, RangeText::Whole);
        assert!(part.template.is_none());
    }

    #[test]
    fn test_bad_template_blocks_job() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("a.pdf"), "").unwrap();
        let source = dir.path().to_string_lossy().to_string();

        let err =
            job_for(&["docbatch", "split", &source, "--every", "2", "--name", "{0"]).unwrap_err();
        assert_eq!(err.exit_code(), ExitCode::ConfigError);
    }

    #[test]
    fn test_split_job_one_item_per_file() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("a.pdf"), "").unwrap();
        fs::write(dir.path().join("b.pdf"), "").unwrap();
        fs::write(dir.path().join("notes.txt"), "").unwrap();
        let source = dir.path().to_string_lossy().to_string();

        let job = job_for(&[
            "docbatch",
            "split",
            &source,
            "--every",
            "2",
            "--start-page",
            "3",
        ])
        .unwrap();

        assert_eq!(job.kind, JobKind::Split);
        assert_eq!(job.len(), 2);
        assert!(matches!(
            &job.items[0],
            WorkItem::Split {
                mode: SplitMode::Regular { step: 2, start: 2 },
                ..
            }
        ));
    }

    #[test]
    fn test_zero_step_is_config_error() {
        let err = job_for(&["docbatch", "split", "/nonexistent", "--every", "0"]).unwrap_err();
        assert_eq!(err.exit_code(), ExitCode::ConfigError);
    }

    #[test]
    fn test_missing_source_is_fatal() {
        let err = job_for(&["docbatch", "orient", "/nonexistent/case"]).unwrap_err();
        assert_eq!(err.exit_code(), ExitCode::DirectoryNotFound);
    }

    #[test]
    fn test_empty_folder_has_no_inputs() {
        let dir = tempdir().unwrap();
        let source = dir.path().to_string_lossy().to_string();

        let err = job_for(&["docbatch", "orient", &source]).unwrap_err();
        assert_eq!(err.exit_code(), ExitCode::NoInputFiles);
    }

    #[test]
    fn test_rename_template_wider_than_table() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("a.pdf"), "").unwrap();
        let source = dir.path().to_string_lossy().to_string();

        let err = job_for(&[
            "docbatch",
            "rename",
            &source,
            "--pattern",
            "被告:.*,",
            "--table-text",
            "张三\t001",
            "--template",
            "{0}-{5}",
        ])
        .unwrap_err();
        assert_eq!(err.exit_code(), ExitCode::ConfigError);
    }

    #[test]
    fn test_rename_invalid_pattern() {
        let err = job_for(&[
            "docbatch", "rename", "/nonexistent", "--pattern", "被告:(", "--table-text", "张三",
        ])
        .unwrap_err();
        assert_eq!(err.exit_code(), ExitCode::ConfigError);
    }

    #[test]
    fn test_move_selection_mismatch() {
        let err =
            job_for(&["docbatch", "move", "--file", "a.pdf", "b.pdf", "--to", "x"]).unwrap_err();
        assert_eq!(err.exit_code(), ExitCode::ConfigError);
    }

    #[test]
    fn test_merge_file_name() {
        assert_eq!(merge_file_name(Some("全卷")), "全卷.pdf");
        assert_eq!(merge_file_name(Some("全卷.PDF")), "全卷.PDF");

        let default = merge_file_name(None);
        assert!(default.starts_with("merged-"));
        assert!(default.ends_with(".pdf"));
        assert_eq!(default.len(), "merged-20250101120000.pdf".len());
    }

    #[test]
    fn test_classify_with_empty_plan_is_not_an_error() {
        let root = tempdir().unwrap();
        let out = tempdir().unwrap();

        let job = job_for(&[
            "docbatch",
            "classify",
            &root.path().to_string_lossy(),
            "--out",
            &out.path().to_string_lossy(),
            "--rule",
            "docs */*.pdf",
        ])
        .unwrap();

        assert!(job.is_empty());
    }

    #[test]
    fn test_convert_defaults_to_all_office_files() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("a.docx"), "").unwrap();
        fs::write(dir.path().join("b.xls"), "").unwrap();
        fs::write(dir.path().join("c.pdf"), "").unwrap();
        let source = dir.path().to_string_lossy().to_string();

        assert_eq!(job_for(&["docbatch", "convert", &source]).unwrap().len(), 2);
        assert_eq!(job_for(&["docbatch", "convert", &source, "--word"]).unwrap().len(), 1);
    }
}
