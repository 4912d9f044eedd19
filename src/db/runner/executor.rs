use tracing::{error, info, warn};

use crate::db::script::{Statement, StatementKind};
use crate::error::RunnerError;

use super::plan::{plan, ExecutionGroup, RunOptions};

/// Failure reports truncate statement text to this many characters.
pub const SQL_DISPLAY_CHARS: usize = 80;

/// The seam between the orchestration engine and a concrete driver. One
/// connection is exclusively owned by the executing call; nothing here is
/// shared across threads.
pub trait SqlConnection {
    /// Executes one statement and reports how many rows it touched or
    /// returned. No commit is implied.
    fn execute(&mut self, sql: &str) -> Result<RowCount, RunnerError>;

    /// Submits several statements as one driver-level batch on the open
    /// transaction and returns the number of statements submitted. Affected
    /// row counts are deliberately not reported: drivers are allowed to
    /// answer with no-info placeholders for batched operations.
    fn execute_batch(&mut self, statements: &[&str]) -> Result<usize, RunnerError>;

    fn commit(&mut self) -> Result<(), RunnerError>;

    fn rollback(&mut self) -> Result<(), RunnerError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowCount {
    Affected(u64),
    Returned(u64),
}

#[derive(Debug, Clone)]
pub enum Outcome {
    Success { rows: RowCount },
    Failure { error: RunnerError },
}

/// Per-statement execution record: ordinal, truncated SQL, structured
/// outcome. Internals never leak past the error kind and message.
#[derive(Debug, Clone)]
pub struct ExecutionResult {
    pub ordinal: usize,
    pub sql: String,
    pub outcome: Outcome,
}

impl ExecutionResult {
    fn success(statement: &Statement, rows: RowCount) -> Self {
        Self {
            ordinal: statement.ordinal,
            sql: statement.display_text(SQL_DISPLAY_CHARS),
            outcome: Outcome::Success { rows },
        }
    }

    fn failure(statement: &Statement, error: RunnerError) -> Self {
        Self {
            ordinal: statement.ordinal,
            sql: statement.display_text(SQL_DISPLAY_CHARS),
            outcome: Outcome::Failure { error },
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self.outcome, Outcome::Success { .. })
    }
}

/// Aggregate outcome of the DML group when it ran as one transaction or one
/// batch. `Submitted` reports statement count, not row count.
#[derive(Debug, Clone)]
pub enum GroupOutcome {
    Committed { statements: usize },
    Submitted { statements: usize },
    RolledBack { error: RunnerError },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunPhase {
    Idle,
    Partition,
    ExecuteNonDml,
    TransactionalDml,
    SequentialDml,
    BatchedDml,
    Done,
    Failed,
}

#[derive(Debug)]
pub struct RunReport {
    pub results: Vec<ExecutionResult>,
    /// Present when the DML group ran transactionally or batched.
    pub group: Option<GroupOutcome>,
    /// Terminal phase: `Done` or `Failed`.
    pub phase: RunPhase,
}

impl RunReport {
    fn new() -> Self {
        Self {
            results: Vec::new(),
            group: None,
            phase: RunPhase::Idle,
        }
    }

    pub fn succeeded(&self) -> bool {
        self.phase == RunPhase::Done
            && self.results.iter().all(ExecutionResult::is_success)
            && !matches!(self.group, Some(GroupOutcome::RolledBack { .. }))
    }
}

/// Drives a parsed statement list against one connection with the failure
/// policy from [`RunOptions`].
pub struct ScriptRunner<'a, C: SqlConnection> {
    conn: &'a mut C,
    options: RunOptions,
}

impl<'a, C: SqlConnection> ScriptRunner<'a, C> {
    pub fn new(conn: &'a mut C, options: RunOptions) -> Self {
        Self { conn, options }
    }

    pub fn run(&mut self, statements: Vec<Statement>) -> RunReport {
        let mut report = RunReport::new();
        let mut pending = Some(statements);
        let mut non_dml: Vec<Statement> = Vec::new();
        let mut dml_group: Option<ExecutionGroup> = None;

        let mut phase = RunPhase::Partition;
        loop {
            phase = match phase {
                RunPhase::Idle | RunPhase::Partition => {
                    for group in plan(pending.take().unwrap_or_default(), &self.options) {
                        if group.statements.iter().any(Statement::is_dml) {
                            dml_group = Some(group);
                        } else {
                            non_dml.extend(group.statements);
                        }
                    }
                    RunPhase::ExecuteNonDml
                }
                RunPhase::ExecuteNonDml => {
                    if self.run_non_dml(&non_dml, &mut report) {
                        match &dml_group {
                            None => RunPhase::Done,
                            Some(group) if group.batched => RunPhase::BatchedDml,
                            Some(group) if group.transactional => RunPhase::TransactionalDml,
                            Some(_) => RunPhase::SequentialDml,
                        }
                    } else {
                        RunPhase::Failed
                    }
                }
                RunPhase::TransactionalDml => {
                    let group = dml_group.take().unwrap_or_else(empty_group);
                    self.run_transactional(&group.statements, &mut report)
                }
                RunPhase::SequentialDml => {
                    let group = dml_group.take().unwrap_or_else(empty_group);
                    self.run_sequential(&group.statements, &mut report)
                }
                RunPhase::BatchedDml => {
                    let group = dml_group.take().unwrap_or_else(empty_group);
                    self.run_batched(&group.statements, &mut report)
                }
                RunPhase::Done | RunPhase::Failed => {
                    report.phase = phase;
                    return report;
                }
            };
        }
    }

    fn execute_one(&mut self, statement: &Statement) -> Result<RowCount, RunnerError> {
        if self.options.print_statements {
            info!("Executing: {}", statement.text);
        }
        self.conn.execute(&statement.text)
    }

    /// DDL, PL/SQL and everything else: each statement independent, relying
    /// on the connection's ambient commit behavior. Returns false when the
    /// remaining run must be aborted.
    fn run_non_dml(&mut self, statements: &[Statement], report: &mut RunReport) -> bool {
        for statement in statements {
            match self.execute_one(statement) {
                Ok(rows) => report.results.push(ExecutionResult::success(statement, rows)),
                Err(err) => {
                    warn!(
                        ordinal = statement.ordinal,
                        kind = %err.kind,
                        "statement failed: {}",
                        statement.display_text(SQL_DISPLAY_CHARS)
                    );
                    report.results.push(ExecutionResult::failure(statement, err));
                    if self.options.stop_on_error {
                        return false;
                    }
                }
            }
        }
        true
    }

    fn run_sequential(&mut self, statements: &[Statement], report: &mut RunReport) -> RunPhase {
        for statement in statements {
            match self.execute_one(statement) {
                Ok(rows) => {
                    if let Err(err) = self.conn.commit() {
                        error!(ordinal = statement.ordinal, "commit failed: {err}");
                        let failure = RunnerError::transaction(err.to_string());
                        report
                            .results
                            .push(ExecutionResult::failure(statement, failure));
                        if self.options.stop_on_error {
                            return RunPhase::Failed;
                        }
                    } else {
                        report.results.push(ExecutionResult::success(statement, rows));
                    }
                }
                Err(err) => {
                    self.rollback_logged();
                    warn!(
                        ordinal = statement.ordinal,
                        kind = %err.kind,
                        "statement failed: {}",
                        statement.display_text(SQL_DISPLAY_CHARS)
                    );
                    report.results.push(ExecutionResult::failure(statement, err));
                    if self.options.stop_on_error {
                        return RunPhase::Failed;
                    }
                }
            }
        }
        RunPhase::Done
    }

    /// One transaction for the whole group: any failure rolls everything
    /// back, independent of stop-on-error; partial commit is not an outcome.
    fn run_transactional(&mut self, statements: &[Statement], report: &mut RunReport) -> RunPhase {
        for statement in statements {
            match self.execute_one(statement) {
                Ok(rows) => report.results.push(ExecutionResult::success(statement, rows)),
                Err(err) => {
                    self.rollback_logged();
                    report
                        .results
                        .push(ExecutionResult::failure(statement, err.clone()));
                    report.group = Some(GroupOutcome::RolledBack { error: err });
                    return RunPhase::Failed;
                }
            }
        }
        match self.conn.commit() {
            Ok(()) => {
                report.group = Some(GroupOutcome::Committed {
                    statements: statements.len(),
                });
                RunPhase::Done
            }
            Err(err) => {
                error!("commit failed: {err}");
                self.rollback_logged();
                report.group = Some(GroupOutcome::RolledBack {
                    error: RunnerError::transaction(err.to_string()),
                });
                RunPhase::Failed
            }
        }
    }

    fn run_batched(&mut self, statements: &[Statement], report: &mut RunReport) -> RunPhase {
        let batchable: Vec<&str> = statements
            .iter()
            .filter(|s| s.kind != StatementKind::Plsql)
            .map(|s| s.text.as_str())
            .collect();
        if self.options.print_statements {
            for sql in &batchable {
                info!("Adding to batch: {sql}");
            }
        }
        match self.conn.execute_batch(&batchable) {
            Ok(submitted) => match self.conn.commit() {
                Ok(()) => {
                    report.group = Some(GroupOutcome::Submitted {
                        statements: submitted,
                    });
                    RunPhase::Done
                }
                Err(err) => {
                    error!("batch commit failed: {err}");
                    self.rollback_logged();
                    report.group = Some(GroupOutcome::RolledBack {
                        error: RunnerError::transaction(err.to_string()),
                    });
                    RunPhase::Failed
                }
            },
            Err(err) => {
                self.rollback_logged();
                report.group = Some(GroupOutcome::RolledBack { error: err });
                RunPhase::Failed
            }
        }
    }

    /// A failed rollback is logged but never replaces the statement failure
    /// that triggered it.
    fn rollback_logged(&mut self) {
        if let Err(err) = self.conn.rollback() {
            error!("rollback failed: {err}");
        }
    }
}

fn empty_group() -> ExecutionGroup {
    ExecutionGroup {
        statements: Vec::new(),
        transactional: false,
        batched: false,
    }
}

/// Convenience entry point mirroring `parse` on the splitting side.
pub fn execute<C: SqlConnection>(
    statements: Vec<Statement>,
    options: RunOptions,
    conn: &mut C,
) -> RunReport {
    ScriptRunner::new(conn, options).run(statements)
}
