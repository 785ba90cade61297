use crate::batch::{JobSummary, Outcome};
use crate::job::JobKind;
use std::io::{self, Write};

/// One finished item as shown in the final listing
#[derive(Debug, Clone)]
pub struct ItemLine {
    pub label: String,
    pub outcome: Outcome,
}

/// Display dry run results in a formatted output
pub fn display_dry_run(
    kind: JobKind,
    items: &[ItemLine],
    writer: &mut impl Write,
) -> io::Result<()> {
    writeln!(writer)?;
    writeln!(writer, "========================================")?;
    writeln!(writer, "              DRY RUN")?;
    writeln!(writer, "========================================")?;
    writeln!(writer)?;
    writeln!(writer, "Job:        {}", kind)?;
    writeln!(writer, "Operations: {}", items.len())?;
    writeln!(writer)?;

    if items.is_empty() {
        writeln!(writer, "Nothing to do.")?;
        return Ok(());
    }

    writeln!(writer, "Planned changes:")?;
    writeln!(writer)?;

    for (i, item) in items.iter().enumerate() {
        writeln!(writer, "  {}. {}", i + 1, item.label)?;
        match &item.outcome {
            Outcome::Success(plan) => writeln!(writer, "     Plan: {}", plan)?,
            Outcome::NoMatch(reason) => writeln!(writer, "     [?] {}", reason)?,
            Outcome::Error(reason) => writeln!(writer, "     [!] {}", reason)?,
        }
        writeln!(writer)?;
    }

    let planned = items.iter().filter(|i| matches!(i.outcome, Outcome::Success(_))).count();
    let unmatched = items.iter().filter(|i| matches!(i.outcome, Outcome::NoMatch(_))).count();
    let failed = items.iter().filter(|i| i.outcome.is_error()).count();

    writeln!(writer, "----------------------------------------")?;
    writeln!(writer, "Summary:")?;
    writeln!(writer, "  {} items would be processed", planned)?;
    if unmatched > 0 {
        writeln!(writer, "  {} items need manual handling", unmatched)?;
    }
    if failed > 0 {
        writeln!(writer, "  {} items would fail", failed)?;
    }

    writeln!(writer)?;
    writeln!(writer, "Run without --dry to apply these changes.")?;

    Ok(())
}

/// Display execution results (non-dry-run)
pub fn display_execution_result(
    summary: &JobSummary,
    items: &[ItemLine],
    writer: &mut impl Write,
) -> io::Result<()> {
    writeln!(writer)?;
    writeln!(
        writer,
        "Processed {} of {} items: {} succeeded.",
        summary.completed(),
        summary.total,
        summary.succeeded
    )?;

    let manual: Vec<&ItemLine> = items
        .iter()
        .filter(|i| matches!(i.outcome, Outcome::NoMatch(_)))
        .collect();
    if !manual.is_empty() {
        writeln!(writer, "  {} items need manual handling:", manual.len())?;
        for item in manual {
            writeln!(writer, "    - {}: {}", item.label, item.outcome.detail())?;
        }
    }

    let failed: Vec<&ItemLine> = items.iter().filter(|i| i.outcome.is_error()).collect();
    if !failed.is_empty() {
        writeln!(writer, "  {} items failed:", failed.len())?;
        for item in failed {
            writeln!(writer, "    - {}: {}", item.label, item.outcome.detail())?;
        }
    }

    if summary.stopped {
        writeln!(writer, "  {} items were not started.", summary.skipped)?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_items() -> Vec<ItemLine> {
        vec![
            ItemLine {
                label: "/cases/a.pdf".to_string(),
                outcome: Outcome::Success("would write 2 parts".to_string()),
            },
            ItemLine {
                label: "/cases/b.pdf".to_string(),
                outcome: Outcome::NoMatch(
                    "found '被告:李四,' but no table row matches".to_string(),
                ),
            },
            ItemLine {
                label: "/cases/c.pdf".to_string(),
                outcome: Outcome::Error("Failed to open /cases/c.pdf".to_string()),
            },
        ]
    }

    #[test]
    fn test_display_dry_run() {
        let mut output = Vec::new();

        display_dry_run(JobKind::Split, &create_test_items(), &mut output).unwrap();

        let output_str = String::from_utf8(output).unwrap();

        assert!(output_str.contains("DRY RUN"));
        assert!(output_str.contains("Job:        split"));
        assert!(output_str.contains("Plan: would write 2 parts"));
        assert!(output_str.contains("1 items would be processed"));
        assert!(output_str.contains("1 items need manual handling"));
        assert!(output_str.contains("1 items would fail"));
    }

    #[test]
    fn test_display_dry_run_empty() {
        let mut output = Vec::new();

        display_dry_run(JobKind::Classify, &[], &mut output).unwrap();

        let output_str = String::from_utf8(output).unwrap();

        assert!(output_str.contains("DRY RUN"));
        assert!(output_str.contains("Nothing to do"));
    }

    #[test]
    fn test_display_execution_result() {
        let mut summary = JobSummary::new(0, 3);
        summary.succeeded = 1;
        summary.no_match = 1;
        summary.failed = 1;
        let mut output = Vec::new();

        display_execution_result(&summary, &create_test_items(), &mut output).unwrap();

        let output_str = String::from_utf8(output).unwrap();
        assert!(output_str.contains("Processed 3 of 3 items: 1 succeeded."));
        assert!(output_str.contains("1 items need manual handling:"));
        assert!(output_str.contains("- /cases/c.pdf: Failed to open"));
    }
}
