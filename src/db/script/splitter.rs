use std::path::Path;

use tracing::debug;

use crate::error::RunnerError;

use super::classify::{classify_statement, has_block_end, is_block_start, level_delta};
use super::types::{Statement, StatementKind};

/// Comment and string-literal state carried across lines.
///
/// Multi-line comments do not nest: the first `*/` closes the comment.
/// Line comments never survive past their line, so they need no flag here.
#[derive(Default)]
struct LexState {
    in_single_quote: bool,
    in_double_quote: bool,
    in_multi_comment: bool,
}

impl LexState {
    fn in_string(&self) -> bool {
        self.in_single_quote || self.in_double_quote
    }

    /// Advances the state over one source line and returns the effective
    /// text: comments removed, string-literal content passed through
    /// untouched. Each removed `/* ... */` leaves a single space so the
    /// surrounding code stays separated.
    fn effective_line(&mut self, line: &str) -> String {
        let chars: Vec<char> = line.chars().collect();
        let len = chars.len();
        let mut out = String::with_capacity(len);
        let mut i = 0usize;

        while i < len {
            let c = chars[i];
            let next = chars.get(i + 1).copied();

            if self.in_multi_comment {
                if c == '*' && next == Some('/') {
                    self.in_multi_comment = false;
                    out.push(' ');
                    i += 2;
                } else {
                    i += 1;
                }
                continue;
            }

            if self.in_single_quote {
                out.push(c);
                if c == '\'' {
                    self.in_single_quote = false;
                }
                i += 1;
                continue;
            }

            if self.in_double_quote {
                out.push(c);
                if c == '"' {
                    self.in_double_quote = false;
                }
                i += 1;
                continue;
            }

            if c == '-' && next == Some('-') {
                // Line comment: the rest of the line is gone.
                break;
            }

            if c == '/' && next == Some('*') {
                self.in_multi_comment = true;
                i += 2;
                continue;
            }

            if c == '\'' {
                self.in_single_quote = true;
            } else if c == '"' {
                self.in_double_quote = true;
            }
            out.push(c);
            i += 1;
        }

        out
    }
}

/// Line-driven statement splitter. Feed lines in order, then call
/// [`ScriptSplitter::finish`] to flush the trailing statement.
pub struct ScriptSplitter {
    lex: LexState,
    buffer: String,
    in_block: bool,
    plsql_level: i32,
    statements: Vec<Statement>,
}

impl Default for ScriptSplitter {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptSplitter {
    pub fn new() -> Self {
        Self {
            lex: LexState::default(),
            buffer: String::new(),
            in_block: false,
            plsql_level: 0,
            statements: Vec::new(),
        }
    }

    pub fn push_line(&mut self, raw: &str) {
        // The bare slash terminator is recognized before any comment or
        // string handling; it is never comment or string content.
        if raw.trim() == "/" {
            if self.in_block {
                self.emit_block();
            } else if !self.buffer.trim().is_empty() {
                // Stray slash mid-statement: keep it as statement text.
                self.buffer.push_str("/\n");
            }
            return;
        }

        let effective = self.lex.effective_line(raw);
        let line = effective.trim();
        if line.is_empty() {
            return;
        }

        if self.in_block {
            self.buffer.push_str(line);
            self.buffer.push('\n');
            self.plsql_level += level_delta(line);
            if has_block_end(line) && self.plsql_level <= 0 {
                self.emit_block();
            }
            return;
        }

        if is_block_start(line) {
            // A block start also delimits whatever was accumulating before it.
            if !self.buffer.trim().is_empty() {
                self.emit_plain();
            }
            self.in_block = true;
            // BEGIN on the start line is counted by the delta below; the
            // other openers (DECLARE, CREATE ...) open one level themselves.
            let upper = line.to_uppercase();
            self.plsql_level = if upper.starts_with("BEGIN") { 0 } else { 1 };
            self.buffer.push_str(line);
            self.buffer.push('\n');
            self.plsql_level += level_delta(line);
            if has_block_end(line) && self.plsql_level <= 0 {
                self.emit_block();
            }
            return;
        }

        self.buffer.push_str(line);
        self.buffer.push('\n');
        if line.ends_with(';') && !self.lex.in_string() {
            self.emit_plain();
        }
    }

    /// Flushes the trailing statement (with or without its delimiter) and
    /// returns everything parsed so far.
    pub fn finish(mut self) -> Vec<Statement> {
        if self.in_block {
            self.emit_block();
        } else {
            self.emit_plain();
        }
        debug!(count = self.statements.len(), "script parsed");
        self.statements
    }

    fn emit_plain(&mut self) {
        let trimmed = self.buffer.trim();
        let text = trimmed.strip_suffix(';').unwrap_or(trimmed).trim_end();
        if !text.is_empty() {
            let kind = classify_statement(text);
            self.push_statement(text.to_string(), kind);
        }
        self.buffer.clear();
    }

    fn emit_block(&mut self) {
        let text = self.buffer.trim().to_string();
        if !text.is_empty() {
            self.push_statement(text, StatementKind::Plsql);
        }
        self.buffer.clear();
        self.in_block = false;
        self.plsql_level = 0;
    }

    fn push_statement(&mut self, text: String, kind: StatementKind) {
        let ordinal = self.statements.len() + 1;
        self.statements.push(Statement {
            ordinal,
            text,
            kind,
        });
    }
}

/// Splits a script into its ordered statement list. Malformed comments
/// degrade gracefully: an unterminated `/*` swallows the rest of the script
/// instead of raising an error.
pub fn parse(script: &str) -> Vec<Statement> {
    let mut splitter = ScriptSplitter::new();
    for line in script.lines() {
        splitter.push_line(line);
    }
    splitter.finish()
}

/// Reads and splits a script file. The only hard failure is an unreadable
/// or absent file.
pub fn parse_file(path: &Path) -> Result<Vec<Statement>, RunnerError> {
    let content = std::fs::read_to_string(path)
        .map_err(|err| RunnerError::parse(format!("cannot read script {}: {err}", path.display())))?;
    Ok(parse(&content))
}
