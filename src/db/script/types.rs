/// Classification tag attached to every parsed statement. It only drives
/// execution grouping; no grammar-level validation happens here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementKind {
    /// INSERT / UPDATE / DELETE / MERGE.
    Dml,
    /// CREATE / ALTER / DROP / GRANT and friends.
    Ddl,
    /// Procedural block: anonymous block, function, procedure, trigger,
    /// package or type body.
    Plsql,
    /// Anything else (SELECT, session commands, ...).
    Other,
}

impl StatementKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            StatementKind::Dml => "DML",
            StatementKind::Ddl => "DDL",
            StatementKind::Plsql => "PLSQL",
            StatementKind::Other => "OTHER",
        }
    }
}

/// One executable unit produced by the splitter. Immutable once emitted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Statement {
    /// 1-based position in the script; numbering is dense.
    pub ordinal: usize,
    /// Trimmed text with the trailing `;` delimiter stripped for plain SQL.
    /// Procedural blocks keep their closing `END;` since the semicolon is
    /// part of the block, not a delimiter.
    pub text: String,
    pub kind: StatementKind,
}

impl Statement {
    pub fn is_dml(&self) -> bool {
        self.kind == StatementKind::Dml
    }

    /// Shortened text for log lines and failure reports.
    pub fn display_text(&self, max_chars: usize) -> String {
        let mut out = String::with_capacity(max_chars.min(self.text.len()));
        for (taken, c) in self.text.chars().enumerate() {
            if taken == max_chars {
                out.push_str("...");
                break;
            }
            out.push(if c == '\n' { ' ' } else { c });
        }
        out
    }
}
