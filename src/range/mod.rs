//! Page range computation and split output naming.
//!
//! Everything here except [`extract_pages`] is pure, so a preview run and a
//! real run compute byte-identical output paths.

mod types;

pub use types::*;

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::document::{PdfDocument, SaveMode};
use crate::template::{sanitize_filename, NamingTemplate, TemplateError};

/// Fixed-step ranges covering `[start, page_count - 1]`
///
/// The last range may be shorter than `step`. No ranges are produced for an
/// empty document or a start past the last page.
pub fn regular_split(page_count: u32, step: u32, start: u32) -> Result<Vec<PageRange>, RangeError> {
    if step == 0 {
        return Err(RangeError::ZeroStep);
    }

    let ranges = (start..page_count)
        .step_by(step as usize)
        .map(|i| PageRange {
            start: i,
            end: i.saturating_add(step - 1).min(page_count - 1),
        })
        .collect();

    Ok(ranges)
}

/// Parse a user range such as `3-5` (1-indexed, inclusive) against a document
///
/// An empty spec selects the whole document. A missing left side defaults to
/// page 1, a missing right side to the left side. The end is clamped to the
/// last page.
pub fn parse_irregular_range(spec: &str, page_count: u32) -> Result<PageRange, RangeError> {
    RangeText::parse(spec)?.resolve(page_count)
}

impl RangeText {
    /// Syntax-only parse, usable before the page count is known
    pub fn parse(spec: &str) -> Result<Self, RangeError> {
        let spec = spec.trim();
        if spec.is_empty() {
            return Ok(RangeText::Whole);
        }

        let (left, right) = match spec.split_once('-') {
            Some((left, right)) => (left.trim(), Some(right.trim())),
            None => (spec, None),
        };

        let number = |text: &str| -> Result<u32, RangeError> {
            let page: u32 = text.parse().map_err(|_| RangeError::InvalidSpec {
                spec: spec.to_string(),
            })?;
            if page == 0 {
                return Err(RangeError::ZeroPage {
                    spec: spec.to_string(),
                });
            }
            Ok(page)
        };

        let first = if left.is_empty() { 1 } else { number(left)? };
        let last = match right {
            Some(r) if !r.is_empty() => number(r)?,
            _ => first,
        };

        if last < first {
            return Err(RangeError::Reversed {
                spec: spec.to_string(),
            });
        }

        Ok(RangeText::Pages { first, last })
    }

    /// Convert to a 0-indexed range within a document of `page_count` pages
    pub fn resolve(&self, page_count: u32) -> Result<PageRange, RangeError> {
        if page_count == 0 {
            return Err(RangeError::EmptyDocument);
        }

        match *self {
            RangeText::Whole => Ok(PageRange {
                start: 0,
                end: page_count - 1,
            }),
            RangeText::Pages { first, last } => {
                if first > page_count {
                    return Err(RangeError::StartBeyondEnd {
                        page: first,
                        page_count,
                    });
                }
                Ok(PageRange {
                    start: first - 1,
                    end: (last - 1).min(page_count - 1),
                })
            }
        }
    }
}

/// Directory split outputs land in by default: a sibling named after the source's stem
pub fn default_output_dir(source: &Path) -> PathBuf {
    let stem = source
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "split".to_string());

    source
        .parent()
        .map(|p| p.join(&stem))
        .unwrap_or_else(|| PathBuf::from(&stem))
}

/// Output path for one range of `source`
///
/// With a non-empty template the 1-based start page prefixes the rendered name
/// so several ranges sharing one literal name stay distinct; otherwise the name
/// is `part_{start}_{end}.pdf`. The template is rendered against a single-cell
/// row holding the source file's stem, so `{0}` stands for it.
pub fn output_name(
    source: &Path,
    range: PageRange,
    template: Option<&NamingTemplate>,
    out_dir: Option<&Path>,
) -> Result<PathBuf, TemplateError> {
    let dir = out_dir
        .map(Path::to_path_buf)
        .unwrap_or_else(|| default_output_dir(source));

    let rendered = match template.filter(|t| !t.is_empty()) {
        Some(template) => {
            let stem = source
                .file_stem()
                .map(|s| s.to_string_lossy().to_string())
                .unwrap_or_default();
            let name = sanitize_filename(&template.render(&[stem])?);
            let name = name.strip_suffix(".pdf").unwrap_or(&name).to_string();
            Some(name).filter(|n| !n.is_empty())
        }
        None => None,
    };

    let file_name = match rendered {
        Some(name) => format!("{}_{}.pdf", range.start + 1, name),
        None => format!("part_{}_{}.pdf", range.start + 1, range.end + 1),
    };

    Ok(dir.join(file_name))
}

/// Write the pages of `range` from `source` to `out_path`
pub fn extract_pages(
    source: &PdfDocument,
    range: PageRange,
    out_path: &Path,
) -> Result<(), RangeError> {
    let mut part = source
        .extract_range(range)
        .map_err(|e| RangeError::WriteFailed {
            path: out_path.to_path_buf(),
            reason: e.to_string(),
        })?;

    part.save(out_path, SaveMode::Compact)
        .map_err(|e| RangeError::WriteFailed {
            path: out_path.to_path_buf(),
            reason: e.to_string(),
        })?;

    debug!(path = ?out_path, start = range.start, end = range.end, "Wrote range");
    Ok(())
}
