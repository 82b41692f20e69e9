//! Query shaping: the only places accepted SQL text is rewritten.
//!
//! Both rewrites are bounding only; clauses are never removed or reordered.

use lazy_static::lazy_static;
use regex::{NoExpand, Regex};

lazy_static! {
    static ref WHITESPACE: Regex = Regex::new(r"\s+").expect("valid regex");
    static ref STARTS_WITH_SELECT: Regex = Regex::new(r"(?i)^\s*select\b").expect("valid regex");
    static ref HAS_LIMIT: Regex = Regex::new(r"(?i)\blimit\b").expect("valid regex");
    static ref LIMIT_CLAUSE: Regex =
        Regex::new(r"(?i)\blimit\s+(\d+)(?:\s*,\s*(\d+))?(?:\s+offset\s+(\d+))?").expect("valid regex");
}

/// Collapse whitespace and drop one trailing statement separator.
pub fn normalize_statement(sql: &str) -> String {
    let collapsed = WHITESPACE.replace_all(sql, " ");
    let collapsed = collapsed.trim();
    match collapsed.strip_suffix(';') {
        Some(stripped) => stripped.trim_end().to_string(),
        None => collapsed.to_string(),
    }
}

pub fn starts_with_select(sql: &str) -> bool {
    STARTS_WITH_SELECT.is_match(sql)
}

/// Keyword scan only: a LIMIT anywhere, including inside a derived table,
/// counts as already limited.
pub fn has_limit(sql: &str) -> bool {
    HAS_LIMIT.is_match(sql)
}

/// Returns the statement and whether a limit was appended.
pub fn apply_default_limit(sql: &str, limit: u64) -> (String, bool) {
    if has_limit(sql) {
        return (sql.to_string(), false);
    }
    (format!("{} LIMIT {}", sql, limit), true)
}

/// Rewrite the first LIMIT clause down to `cap` when it asks for more rows.
/// Forms: `LIMIT n`, `LIMIT offset, n`, `LIMIT n OFFSET offset`.
/// Returns the statement and whether it was capped.
pub fn enforce_limit_cap(sql: &str, cap: u64) -> (String, bool) {
    let caps = match LIMIT_CLAUSE.captures(sql) {
        Some(caps) => caps,
        None => return (sql.to_string(), false),
    };

    let first = &caps[1];
    let second = caps.get(2).map(|m| m.as_str());
    let offset = caps.get(3).map(|m| m.as_str());

    let count = second.unwrap_or(first);
    // Digits that overflow u64 are certainly above the cap.
    let within_cap = count.parse::<u64>().map(|n| n <= cap).unwrap_or(false);
    if within_cap {
        return (sql.to_string(), false);
    }

    let replacement = match (second, offset) {
        (Some(_), _) => format!("LIMIT {}, {}", first, cap),
        (None, Some(offset)) => format!("LIMIT {} OFFSET {}", cap, offset),
        (None, None) => format!("LIMIT {}", cap),
    };

    (LIMIT_CLAUSE.replace(sql, NoExpand(&replacement)).into_owned(), true)
}
