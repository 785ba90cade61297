//! Per-item work for each job kind.
//!
//! Every handler turns one [`WorkItem`] into an [`Outcome`]. Failures are
//! reported in the outcome and never escape to the runner.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::batch::Outcome;
use crate::classify::copy_into_bucket;
use crate::document::{merge_documents, PdfDocument, SaveMode};
use crate::range::{extract_pages, output_name, regular_split, PageRange};
use crate::relocate::{backup_existing, move_file, planned_destination};
use crate::rename::{MatchRenameEngine, RenameState};
use crate::template::NamingTemplate;

use super::types::{ItemError, JobContext, JobKind, SplitMode, WorkItem};

pub type ItemHandler = fn(&JobContext, WorkItem) -> Outcome;

/// Kind to handler lookup table
const HANDLERS: [(JobKind, ItemHandler); 7] = [
    (JobKind::Split, split),
    (JobKind::Merge, merge),
    (JobKind::Rename, rename),
    (JobKind::Move, relocate),
    (JobKind::Classify, copy),
    (JobKind::Convert, convert),
    (JobKind::Orient, orient),
];

pub fn handler_for(kind: JobKind) -> ItemHandler {
    HANDLERS
        .iter()
        .find(|(k, _)| *k == kind)
        .map(|(_, handler)| *handler)
        .unwrap_or(unsupported)
}

fn unsupported(_: &JobContext, _: WorkItem) -> Outcome {
    Outcome::Error("no handler for this item".to_string())
}

fn finish(result: Result<String, ItemError>) -> Outcome {
    match result {
        Ok(detail) => Outcome::Success(detail),
        Err(e) => {
            warn!("Item failed: {}", e);
            Outcome::Error(e.to_string())
        }
    }
}

fn split(ctx: &JobContext, item: WorkItem) -> Outcome {
    let WorkItem::Split {
        source,
        mode,
        template,
        out_dir,
    } = item
    else {
        return Outcome::Error(ItemError::WrongKind(JobKind::Split).to_string());
    };

    finish(split_document(
        &source,
        &mode,
        template.as_ref(),
        out_dir.as_deref(),
        ctx.dry_run,
    ))
}

/// Ranges and output paths for one source, in output order
pub fn plan_split(
    source: &Path,
    page_count: u32,
    mode: &SplitMode,
    template: Option<&NamingTemplate>,
    out_dir: Option<&Path>,
) -> Result<Vec<(PageRange, PathBuf)>, ItemError> {
    let ranges: Vec<(PageRange, Option<&NamingTemplate>)> = match mode {
        SplitMode::Regular { step, start } => regular_split(page_count, *step, *start)?
            .into_iter()
            .map(|range| (range, template))
            .collect(),
        SplitMode::Irregular(parts) => parts
            .iter()
            .map(|part| -> Result<_, ItemError> {
                let range = part.range.resolve(page_count)?;
                Ok((range, part.template.as_ref().or(template)))
            })
            .collect::<Result<_, ItemError>>()?,
    };

    ranges
        .into_iter()
        .map(|(range, template)| -> Result<_, ItemError> {
            Ok((range, output_name(source, range, template, out_dir)?))
        })
        .collect()
}

fn split_document(
    source: &Path,
    mode: &SplitMode,
    template: Option<&NamingTemplate>,
    out_dir: Option<&Path>,
    dry_run: bool,
) -> Result<String, ItemError> {
    let doc = PdfDocument::open(source)?;
    let plan = plan_split(source, doc.page_count(), mode, template, out_dir)?;
    if plan.is_empty() {
        return Err(ItemError::NothingToSplit {
            page_count: doc.page_count(),
        });
    }

    if dry_run {
        let names: Vec<String> = plan
            .iter()
            .map(|(range, path)| {
                format!("{}-{} -> {}", range.start + 1, range.end + 1, path.display())
            })
            .collect();
        return Ok(format!("would write {} parts: {}", plan.len(), names.join(", ")));
    }

    let total = plan.len();
    let mut written = 0;
    let mut first_error = None;

    // A failed part does not stop the remaining parts of this file
    for (range, path) in &plan {
        match extract_pages(&doc, *range, path) {
            Ok(()) => written += 1,
            Err(e) => {
                warn!(path = ?path, error = %e, "Failed to write part");
                first_error.get_or_insert_with(|| e.to_string());
            }
        }
    }

    if let Some(first_error) = first_error {
        return Err(ItemError::PartialSplit {
            written,
            total,
            first_error,
        });
    }

    let dir = plan
        .first()
        .and_then(|(_, p)| p.parent())
        .map(|p| p.display().to_string())
        .unwrap_or_default();
    info!(source = ?source, parts = written, "Split complete");
    Ok(format!("wrote {} parts to {}", written, dir))
}

fn merge(ctx: &JobContext, item: WorkItem) -> Outcome {
    let WorkItem::Merge {
        sources,
        output,
        delete_sources,
    } = item
    else {
        return Outcome::Error(ItemError::WrongKind(JobKind::Merge).to_string());
    };

    if ctx.dry_run {
        return Outcome::Success(format!(
            "would merge {} files into {}",
            sources.len(),
            output.display()
        ));
    }

    finish(merge_files(&sources, &output, delete_sources))
}

fn merge_files(
    sources: &[PathBuf],
    output: &Path,
    delete_sources: bool,
) -> Result<String, ItemError> {
    // Merging into one of the inputs overwrites it without a backup
    let backup = if sources.iter().any(|s| s.as_path() == output) {
        None
    } else {
        backup_existing(output).map_err(|source| ItemError::Io {
            action: "back up",
            path: output.to_path_buf(),
            source,
        })?
    };

    let pages = merge_documents(sources, output)?;

    if delete_sources {
        for source in sources.iter().filter(|s| s.as_path() != output) {
            fs::remove_file(source).map_err(|e| ItemError::Io {
                action: "delete",
                path: source.clone(),
                source: e,
            })?;
            debug!(path = ?source, "Deleted merged source");
        }
    }

    let mut detail = format!(
        "merged {} files ({} pages) into {}",
        sources.len(),
        pages,
        output.display()
    );
    if let Some(backup) = backup {
        detail.push_str(&format!("; previous file kept as {}", backup.display()));
    }
    Ok(detail)
}

fn rename(ctx: &JobContext, item: WorkItem) -> Outcome {
    let WorkItem::Rename { source, config } = item else {
        return Outcome::Error(ItemError::WrongKind(JobKind::Rename).to_string());
    };

    let engine = MatchRenameEngine::new(ctx.recognizer.as_ref(), &config);
    match engine.process(&source, ctx.dry_run) {
        RenameState::Renamed { to, backup } => {
            let mut detail = format!("renamed to {}", to.display());
            if let Some(backup) = backup {
                detail.push_str(&format!("; previous file kept as {}", backup.display()));
            }
            Outcome::Success(detail)
        }
        RenameState::Planned { to } => {
            Outcome::Success(format!("would rename to {}", to.display()))
        }
        RenameState::Unmatched(reason) => Outcome::NoMatch(reason),
        RenameState::RenameFailed(reason) => Outcome::Error(reason),
        other => Outcome::Error(format!("rename stopped in state {:?}", other)),
    }
}

fn relocate(ctx: &JobContext, item: WorkItem) -> Outcome {
    let WorkItem::Move {
        source,
        dest_dir,
        override_name,
    } = item
    else {
        return Outcome::Error(ItemError::WrongKind(JobKind::Move).to_string());
    };

    if ctx.dry_run {
        let target = planned_destination(&source, &dest_dir, override_name.as_deref());
        let note = if target.exists() {
            " (existing file would be kept as .bak)"
        } else {
            ""
        };
        return Outcome::Success(format!("would move to {}{}", target.display(), note));
    }

    finish(
        move_file(&source, &dest_dir, override_name.as_deref())
            .map(|moved| match moved.backup {
                Some(backup) => format!(
                    "moved to {}; previous file kept as {}",
                    moved.destination.display(),
                    backup.display()
                ),
                None => format!("moved to {}", moved.destination.display()),
            })
            .map_err(ItemError::from),
    )
}

fn copy(ctx: &JobContext, item: WorkItem) -> Outcome {
    let WorkItem::Copy {
        source,
        destination,
        ..
    } = item
    else {
        return Outcome::Error(ItemError::WrongKind(JobKind::Classify).to_string());
    };

    if ctx.dry_run {
        return Outcome::Success(format!("would copy to {}", destination.display()));
    }

    finish(
        copy_into_bucket(&source, &destination)
            .map(|_| format!("copied to {}", destination.display()))
            .map_err(|e| ItemError::Io {
                action: "copy",
                path: source.clone(),
                source: e,
            }),
    )
}

fn convert(ctx: &JobContext, item: WorkItem) -> Outcome {
    let WorkItem::Convert { source, output } = item else {
        return Outcome::Error(ItemError::WrongKind(JobKind::Convert).to_string());
    };

    if ctx.dry_run {
        return Outcome::Success(format!("would convert to {}", output.display()));
    }

    finish(
        ctx.converter
            .convert_to_pdf(&source, &output)
            .map(|()| format!("converted to {}", output.display()))
            .map_err(ItemError::from),
    )
}

fn orient(ctx: &JobContext, item: WorkItem) -> Outcome {
    let WorkItem::Orient { source } = item else {
        return Outcome::Error(ItemError::WrongKind(JobKind::Orient).to_string());
    };

    finish(orient_document(ctx, &source))
}

fn orient_document(ctx: &JobContext, source: &Path) -> Result<String, ItemError> {
    let mut doc = PdfDocument::open(source)?;

    let mut corrections = Vec::new();
    for page in 0..doc.page_count() {
        if let Some(degrees) = ctx.recognizer.detect_orientation(source, page)? {
            if degrees.rem_euclid(360) != 0 {
                corrections.push((page, degrees));
            }
        }
    }

    if corrections.is_empty() {
        return Ok("all pages upright".to_string());
    }

    let pages: Vec<String> = corrections
        .iter()
        .map(|(page, degrees)| format!("{} ({}°)", page + 1, degrees))
        .collect();

    if ctx.dry_run {
        return Ok(format!("would rotate pages {}", pages.join(", ")));
    }

    for (page, degrees) in &corrections {
        doc.rotate_page(*page, *degrees)?;
    }
    doc.save(source, SaveMode::Incremental)?;

    info!(source = ?source, pages = corrections.len(), "Corrected orientation");
    Ok(format!("rotated pages {}", pages.join(", ")))
}
