//! Rename files by matching recognised page text against a pasted reference table.

mod engine;
mod matcher;
mod types;

pub use engine::{planned_target, rename_file, MatchRenameEngine};
pub use matcher::find_match;
pub use types::{
    MatchResult, MatchRule, NoMatchReason, ReferenceTable, RenameConfig, RenameError, RenameState,
};
