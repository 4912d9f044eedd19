use super::types::StatementKind;

const DML_KEYWORDS: [&str; 4] = ["insert", "update", "delete", "merge"];
const DDL_KEYWORDS: [&str; 8] = [
    "create", "alter", "drop", "truncate", "grant", "revoke", "rename", "comment",
];

/// Keywords that, appearing after CREATE [OR REPLACE], mark the start of a
/// procedural object. Matched with a leading space so that identifiers
/// merely containing the word (e.g. `type_registry`) do not trigger.
const CREATE_BLOCK_MARKERS: [&str; 5] = [
    " FUNCTION",
    " PROCEDURE",
    " TRIGGER",
    " PACKAGE",
    " TYPE",
];

fn leading_keyword(sql: &str) -> Option<String> {
    sql.split_whitespace().next().map(|w| w.to_lowercase())
}

/// Classification for a completed non-procedural statement.
pub fn classify_statement(sql: &str) -> StatementKind {
    let Some(keyword) = leading_keyword(sql) else {
        return StatementKind::Other;
    };
    if DML_KEYWORDS.contains(&keyword.as_str()) {
        StatementKind::Dml
    } else if DDL_KEYWORDS.contains(&keyword.as_str()) {
        StatementKind::Ddl
    } else {
        StatementKind::Other
    }
}

/// Whether a trimmed, comment-stripped line opens a PL/SQL block.
pub(crate) fn is_block_start(line: &str) -> bool {
    let upper = line.to_uppercase();
    if upper.starts_with("BEGIN") || upper.starts_with("DECLARE") {
        return true;
    }
    upper.starts_with("CREATE")
        && CREATE_BLOCK_MARKERS
            .iter()
            .any(|marker| upper.contains(marker))
}

/// Net block-level change contributed by one line: every `BEGIN` occurrence
/// opens a level, every `END;` occurrence closes one. Naive substring
/// counting; these tokens inside string literals or identifiers will
/// misfire, which is accepted, long-standing behavior.
pub(crate) fn level_delta(line: &str) -> i32 {
    let upper = line.to_uppercase();
    let opens = upper.matches("BEGIN").count() as i32;
    let closes = upper.matches("END;").count() as i32;
    opens - closes
}

pub(crate) fn has_block_end(line: &str) -> bool {
    line.to_uppercase().contains("END;")
}

/// Standalone routing check: does this single statement need the procedural
/// execution path? Exposed for callers that never run the full splitter.
pub fn is_procedural(sql: &str) -> bool {
    for line in sql.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with("--") {
            continue;
        }
        return is_block_start(trimmed);
    }
    false
}
