use thiserror::Error;

/// Structured failure categories. Callers branch on the kind, never on a
/// concrete exception type or on message text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Could not reach or stay connected to the database.
    Connection,
    /// A bounded connection attempt ran out of time.
    Timeout,
    /// Credentials rejected.
    Auth,
    /// The server could not parse the statement.
    Syntax,
    /// Integrity constraint violation.
    Constraint,
    /// Script could not be read at all; aborts before any execution.
    Parse,
    /// Commit or rollback itself failed.
    Transaction,
    Unknown,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Connection => "connection",
            ErrorKind::Timeout => "timeout",
            ErrorKind::Auth => "auth",
            ErrorKind::Syntax => "syntax",
            ErrorKind::Constraint => "constraint",
            ErrorKind::Parse => "parse",
            ErrorKind::Transaction => "transaction",
            ErrorKind::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The one error type the crate surfaces. Vendor error codes are carried as
/// data; stack-trace style internals are never shown to the end user.
#[derive(Debug, Clone, Error)]
#[error("{message} [{kind}]{}", vendor_display(.vendor_code))]
pub struct RunnerError {
    pub kind: ErrorKind,
    pub message: String,
    pub vendor_code: Option<i32>,
    pub context: Option<String>,
}

fn vendor_display(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!(" (ORA-{code:05})"),
        None => String::new(),
    }
}

impl RunnerError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            vendor_code: None,
            context: None,
        }
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    pub fn parse(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Parse, message)
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Timeout, message)
    }

    pub fn transaction(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Transaction, message)
    }

    /// Short vendor identifier for CSV/reporting columns.
    pub fn code_label(&self) -> String {
        match self.vendor_code {
            Some(code) => format!("ORA-{code:05}"),
            None => self.kind.as_str().to_uppercase(),
        }
    }
}

/// Maps an ORA error number onto the structured taxonomy. The interesting
/// classes mirror what the SQLState prefixes cover on JDBC: 08 connection,
/// 28 auth, 42 syntax, 23 constraint.
pub fn classify_oracle_code(code: i32) -> ErrorKind {
    match code {
        1017 | 28000 | 28001 => ErrorKind::Auth,
        1 | 1400 | 1407 | 2290 | 2291 | 2292 => ErrorKind::Constraint,
        900..=999 | 1722 | 6550 => ErrorKind::Syntax,
        12170 => ErrorKind::Timeout,
        1034 | 3113 | 3114 | 12154 | 12514 | 12541 | 12545 => ErrorKind::Connection,
        _ => ErrorKind::Unknown,
    }
}

impl From<oracle::Error> for RunnerError {
    fn from(err: oracle::Error) -> Self {
        let vendor_code = err.db_error().map(|db| db.code());
        let kind = vendor_code.map_or(ErrorKind::Unknown, classify_oracle_code);
        // Keep the first line only; ODPI appends help URLs and frames.
        let message = err
            .to_string()
            .lines()
            .next()
            .unwrap_or_default()
            .to_string();
        Self {
            kind,
            message,
            vendor_code,
            context: None,
        }
    }
}

impl From<std::io::Error> for RunnerError {
    fn from(err: std::io::Error) -> Self {
        Self::parse(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_auth_codes() {
        assert_eq!(classify_oracle_code(1017), ErrorKind::Auth);
    }

    #[test]
    fn classifies_constraint_codes() {
        assert_eq!(classify_oracle_code(1), ErrorKind::Constraint);
        assert_eq!(classify_oracle_code(2291), ErrorKind::Constraint);
    }

    #[test]
    fn classifies_syntax_codes() {
        assert_eq!(classify_oracle_code(900), ErrorKind::Syntax);
        assert_eq!(classify_oracle_code(942), ErrorKind::Syntax);
        assert_eq!(classify_oracle_code(6550), ErrorKind::Syntax);
    }

    #[test]
    fn classifies_connection_and_timeout_codes() {
        assert_eq!(classify_oracle_code(12541), ErrorKind::Connection);
        assert_eq!(classify_oracle_code(12170), ErrorKind::Timeout);
    }

    #[test]
    fn unknown_codes_fall_through() {
        assert_eq!(classify_oracle_code(20000), ErrorKind::Unknown);
    }

    #[test]
    fn display_includes_kind_and_vendor_code() {
        let err = RunnerError {
            kind: ErrorKind::Constraint,
            message: "unique constraint violated".to_string(),
            vendor_code: Some(1),
            context: None,
        };
        let text = err.to_string();
        assert!(text.contains("[constraint]"), "{text}");
        assert!(text.contains("ORA-00001"), "{text}");
    }

    #[test]
    fn code_label_prefers_vendor_code() {
        let err = RunnerError {
            kind: ErrorKind::Auth,
            message: "invalid username/password".to_string(),
            vendor_code: Some(1017),
            context: None,
        };
        assert_eq!(err.code_label(), "ORA-01017");
        assert_eq!(RunnerError::timeout("gave up").code_label(), "TIMEOUT");
    }
}
