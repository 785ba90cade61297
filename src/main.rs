use std::time::Duration;

use clap::Parser;
use docbatch::batch::{BatchRunner, JobEvent, JobSummary};
use docbatch::cli::Args;
use docbatch::commands::{build_context, build_job};
use docbatch::config::ToolConfig;
use docbatch::output::{display_dry_run, display_execution_result, ItemLine};
use docbatch::progress::{should_use_colors, Progress};
use docbatch::report::{write_report, JobReport};
use docbatch::{logging, AppError, ExitCode};
use tracing::{debug, error, info};

fn main() {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let args = Args::parse();

    logging::init(args.verbose);

    match run(args) {
        Ok(code) => std::process::exit(code.into()),
        Err(e) => {
            error!("{}", e);
            eprintln!("\nError: {}", e.detailed_message());
            std::process::exit(e.exit_code().into());
        }
    }
}

fn run(args: Args) -> Result<ExitCode, AppError> {
    let tools = ToolConfig::from_env();
    debug!(?tools, "Tool configuration loaded");

    let job = build_job(&args.command)?;
    let ctx = build_context(&args.command, &tools, args.dry);

    let kind = job.kind;
    let labels = job.labels();
    let total = labels.len();
    let mut progress = Progress::new_with_ui(args.verbose > 0, should_use_colors());
    let mut report = JobReport::new(kind, args.dry);

    progress.job_start(kind, total, args.dry);

    let runner = BatchRunner::new().with_item_delay(Duration::from_millis(args.delay_ms));
    let handle = job.submit(&runner, ctx)?;

    let mut items = Vec::with_capacity(total);
    let mut summary = JobSummary::new(handle.job_index(), total);
    for event in handle.events() {
        match event {
            JobEvent::Item(event) => {
                let label = labels
                    .get(event.item_index)
                    .cloned()
                    .unwrap_or_else(|| format!("item {}", event.item_index + 1));
                progress.item_done(event.item_index + 1, total, &label, &event.outcome);
                report.record(&event, &label);
                items.push(ItemLine {
                    label,
                    outcome: event.outcome,
                });
            }
            JobEvent::Finished(finished) => summary = finished,
        }
    }
    handle.join()?;

    progress.job_complete(&summary, args.dry);
    info!(
        succeeded = summary.succeeded,
        no_match = summary.no_match,
        failed = summary.failed,
        "Job complete"
    );

    let mut stdout = std::io::stdout();
    let shown = if args.dry {
        display_dry_run(kind, &items, &mut stdout)
    } else {
        display_execution_result(&summary, &items, &mut stdout)
    };
    shown.map_err(|e| AppError::Other(format!("Failed to display output: {}", e)))?;

    if let Some(path) = &args.report {
        report.finish(summary.clone());
        write_report(&report, path).map_err(|e| AppError::Report {
            path: path.clone(),
            message: e.to_string(),
        })?;
        progress.report_written(path);
    }

    Ok(if summary.failed > 0 {
        ExitCode::ItemFailures
    } else {
        ExitCode::Success
    })
}
