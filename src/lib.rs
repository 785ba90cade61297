pub mod batch;
pub mod classify;
pub mod cli;
pub mod commands;
pub mod config;
pub mod convert;
pub mod document;
pub mod error;
pub mod job;
pub mod logging;
pub mod ocr;
pub mod output;
pub mod progress;
pub mod range;
pub mod relocate;
pub mod rename;
pub mod report;
pub mod scanner;
pub mod template;

pub use batch::{BatchError, BatchRunner, JobEvent, JobHandle, JobSummary, Outcome, ProgressEvent};
pub use classify::{parse_rules, resolve, BucketPlan, ClassificationRule, ClassifiedFile, RuleError};
pub use error::{AppError, ConfigError, ExitCode};
pub use job::{Job, JobContext, JobKind, WorkItem};
pub use range::{output_name, parse_irregular_range, regular_split, PageRange, RangeError};
pub use relocate::{move_file, pair_by_selection, MoveError};
pub use rename::{find_match, MatchRenameEngine, MatchRule, ReferenceTable, RenameConfig};
pub use scanner::{collect_files, ScannerError};
pub use template::{parse_template, NamingTemplate, TemplateError};
