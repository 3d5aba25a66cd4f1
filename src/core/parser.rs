//! Pending-upgrade extraction from the package manager's table listing.
//!
//! The listing is text meant for people, so this is a heuristic: a row is
//! `<name>  <id> <installed> <available> ...` where the name is separated
//! from the id by at least two spaces. Rows that do not fit are skipped.
//! Known misparses: names containing a two-space run, version strings
//! containing spaces.

use crate::domain::model::PendingSet;
use regex::Regex;
use std::sync::LazyLock;

static ROW_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<name>.+?)\s{2,}(?P<id>[A-Za-z0-9.+\-]+)\s+(?P<installed>\S+)\s+(?P<available>\S+)")
        .expect("row pattern is a valid regex")
});

/// Parses the stdout of a "list pending upgrades" call.
pub fn parse_pending(stdout: &str) -> PendingSet {
    let lines: Vec<&str> = stdout.lines().map(|line| line.trim_end_matches('\r')).collect();

    // With a table rule present the rows are below it and the header is
    // above, so the header can never be taken for a package.
    let body = match lines.iter().position(|line| is_table_rule(line)) {
        Some(rule) => &lines[rule + 1..],
        None => &lines[..],
    };

    PendingSet::from_ids(body.iter().filter_map(|line| parse_row(line)))
}

/// The id column of one listing row, if the row fits the pattern.
pub fn parse_row(line: &str) -> Option<&str> {
    ROW_PATTERN
        .captures(line.trim())
        .and_then(|caps| caps.name("id"))
        .map(|id| id.as_str())
}

fn is_table_rule(line: &str) -> bool {
    let trimmed = line.trim();
    trimmed.len() >= 3 && trimmed.chars().all(|c| c == '-')
}
