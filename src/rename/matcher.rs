use tracing::trace;

use super::types::{MatchResult, MatchRule, NoMatchReason, ReferenceTable};

/// Find the table row whose match-column cell occurs inside the pattern hit
///
/// The hit is the whole match, capture groups included. Rows are tried in
/// table order and the first containing row wins. Rows too short to have the
/// match column, or with an empty cell there, are never selected.
pub fn find_match<'t>(text: &str, rule: &MatchRule, table: &'t ReferenceTable) -> MatchResult<'t> {
    let hit = match rule.pattern().find(text) {
        Some(m) => m.as_str(),
        None => return MatchResult::NoMatch(NoMatchReason::PatternNotFound),
    };

    trace!(hit = %hit, "Pattern matched");

    for row in table.candidates() {
        match row.get(rule.match_column()) {
            Some(cell) if !cell.is_empty() && hit.contains(cell.as_str()) => {
                return MatchResult::Matched {
                    row,
                    matched_text: hit.to_string(),
                };
            }
            _ => continue,
        }
    }

    MatchResult::NoMatch(NoMatchReason::NoRow {
        matched_text: hit.to_string(),
    })
}
