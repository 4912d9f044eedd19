use super::*;

use crate::db::script::{parse, Statement, StatementKind};
use crate::error::{ErrorKind, RunnerError};

/// Scripted connection: statements matching a failure pattern fail, every
/// call is recorded for later inspection.
#[derive(Default)]
struct MockConnection {
    fail_on: Vec<String>,
    fail_commit: bool,
    log: Vec<String>,
}

impl MockConnection {
    fn failing_on(patterns: &[&str]) -> Self {
        Self {
            fail_on: patterns.iter().map(|p| p.to_string()).collect(),
            ..Self::default()
        }
    }

    fn should_fail(&self, sql: &str) -> bool {
        self.fail_on.iter().any(|pattern| sql.contains(pattern))
    }
}

impl SqlConnection for MockConnection {
    fn execute(&mut self, sql: &str) -> Result<RowCount, RunnerError> {
        if self.should_fail(sql) {
            self.log.push(format!("fail:{sql}"));
            return Err(RunnerError::new(ErrorKind::Syntax, "forced failure"));
        }
        self.log.push(format!("exec:{sql}"));
        Ok(RowCount::Affected(1))
    }

    fn execute_batch(&mut self, statements: &[&str]) -> Result<usize, RunnerError> {
        for sql in statements {
            if self.should_fail(sql) {
                self.log.push(format!("fail:{sql}"));
                return Err(RunnerError::new(ErrorKind::Constraint, "forced batch failure"));
            }
            self.log.push(format!("batch:{sql}"));
        }
        Ok(statements.len())
    }

    fn commit(&mut self) -> Result<(), RunnerError> {
        if self.fail_commit {
            self.log.push("commit-fail".to_string());
            return Err(RunnerError::transaction("forced commit failure"));
        }
        self.log.push("commit".to_string());
        Ok(())
    }

    fn rollback(&mut self) -> Result<(), RunnerError> {
        self.log.push("rollback".to_string());
        Ok(())
    }
}

fn stmt(ordinal: usize, text: &str, kind: StatementKind) -> Statement {
    Statement {
        ordinal,
        text: text.to_string(),
        kind,
    }
}

fn mixed_statements() -> Vec<Statement> {
    vec![
        stmt(1, "CREATE TABLE t (id NUMBER)", StatementKind::Ddl),
        stmt(2, "INSERT INTO t VALUES (1)", StatementKind::Dml),
        stmt(3, "BEGIN\nNULL;\nEND;", StatementKind::Plsql),
        stmt(4, "UPDATE t SET id = 2", StatementKind::Dml),
    ]
}

#[test]
fn test_plan_partitions_dml_last() {
    let groups = plan(mixed_statements(), &RunOptions::default());
    assert_eq!(groups.len(), 3);
    assert_eq!(groups[0].statements[0].kind, StatementKind::Ddl);
    assert_eq!(groups[1].statements[0].kind, StatementKind::Plsql);
    let dml = &groups[2];
    assert_eq!(dml.statements.len(), 2);
    assert!(dml.statements.iter().all(Statement::is_dml));
    // Script order inside the DML group.
    assert_eq!(dml.statements[0].ordinal, 2);
    assert_eq!(dml.statements[1].ordinal, 4);
}

#[test]
fn test_plan_group_flags_follow_options() {
    let options = RunOptions {
        transactional: true,
        batched: true,
        ..RunOptions::default()
    };
    let groups = plan(mixed_statements(), &options);
    let dml = groups.last().unwrap();
    assert!(dml.transactional);
    assert!(dml.batched);
    assert!(!groups[0].transactional);
    assert!(!groups[0].batched);
}

#[test]
fn test_plan_without_dml_has_no_dml_group() {
    let statements = vec![stmt(1, "CREATE TABLE t (id NUMBER)", StatementKind::Ddl)];
    let groups = plan(statements, &RunOptions::default());
    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].statements.len(), 1);
}

#[test]
fn test_non_dml_runs_before_dml() {
    let mut conn = MockConnection::default();
    let report = execute(mixed_statements(), RunOptions::default(), &mut conn);
    assert!(report.succeeded());
    let executed: Vec<&str> = conn
        .log
        .iter()
        .filter(|entry| entry.starts_with("exec:"))
        .map(String::as_str)
        .collect();
    assert_eq!(
        executed,
        vec![
            "exec:CREATE TABLE t (id NUMBER)",
            "exec:BEGIN\nNULL;\nEND;",
            "exec:INSERT INTO t VALUES (1)",
            "exec:UPDATE t SET id = 2",
        ]
    );
}

#[test]
fn test_sequential_commits_after_each_dml() {
    let mut conn = MockConnection::default();
    let statements = vec![
        stmt(1, "INSERT INTO t VALUES (1)", StatementKind::Dml),
        stmt(2, "UPDATE t SET id = 2", StatementKind::Dml),
    ];
    let report = execute(statements, RunOptions::default(), &mut conn);
    assert!(report.succeeded());
    assert_eq!(
        conn.log,
        vec![
            "exec:INSERT INTO t VALUES (1)",
            "commit",
            "exec:UPDATE t SET id = 2",
            "commit",
        ]
    );
}

#[test]
fn test_sequential_failure_keeps_earlier_commits() {
    let mut conn = MockConnection::failing_on(&["UPDATE"]);
    let statements = vec![
        stmt(1, "INSERT INTO t VALUES (1)", StatementKind::Dml),
        stmt(2, "UPDATE t SET id = 2", StatementKind::Dml),
    ];
    let report = execute(statements, RunOptions::default(), &mut conn);
    assert_eq!(report.phase, RunPhase::Failed);
    assert!(!report.succeeded());
    // The first statement's commit already happened and stays committed.
    assert!(conn.log.contains(&"commit".to_string()));
    assert!(report.results[0].is_success());
    assert!(!report.results[1].is_success());
}

#[test]
fn test_sequential_continues_when_stop_on_error_off() {
    let mut conn = MockConnection::failing_on(&["UPDATE"]);
    let statements = vec![
        stmt(1, "INSERT INTO t VALUES (1)", StatementKind::Dml),
        stmt(2, "UPDATE t SET id = 2", StatementKind::Dml),
        stmt(3, "DELETE FROM t", StatementKind::Dml),
    ];
    let options = RunOptions {
        stop_on_error: false,
        ..RunOptions::default()
    };
    let report = execute(statements, options, &mut conn);
    assert_eq!(report.phase, RunPhase::Done);
    assert_eq!(report.results.len(), 3);
    assert!(report.results[2].is_success());
    assert!(!report.succeeded(), "a failed statement is still a failed run");
}

#[test]
fn test_transactional_success_commits_once() {
    let mut conn = MockConnection::default();
    let statements = vec![
        stmt(1, "INSERT INTO t VALUES (1)", StatementKind::Dml),
        stmt(2, "UPDATE t SET id = 2", StatementKind::Dml),
    ];
    let options = RunOptions {
        transactional: true,
        ..RunOptions::default()
    };
    let report = execute(statements, options, &mut conn);
    assert!(report.succeeded());
    let commits = conn.log.iter().filter(|e| *e == "commit").count();
    assert_eq!(commits, 1);
    assert!(matches!(
        report.group,
        Some(GroupOutcome::Committed { statements: 2 })
    ));
}

#[test]
fn test_transactional_failure_rolls_back_everything() {
    let mut conn = MockConnection::failing_on(&["UPDATE"]);
    let statements = vec![
        stmt(1, "INSERT INTO t VALUES (1)", StatementKind::Dml),
        stmt(2, "UPDATE t SET id = 2", StatementKind::Dml),
        stmt(3, "DELETE FROM t", StatementKind::Dml),
    ];
    let options = RunOptions {
        transactional: true,
        stop_on_error: false,
        ..RunOptions::default()
    };
    let report = execute(statements, options, &mut conn);
    // Rollback happens even with stop-on-error off.
    assert_eq!(report.phase, RunPhase::Failed);
    assert!(conn.log.contains(&"rollback".to_string()));
    assert!(!conn.log.contains(&"commit".to_string()));
    assert!(matches!(report.group, Some(GroupOutcome::RolledBack { .. })));
    // The third statement never ran.
    assert_eq!(report.results.len(), 2);
}

#[test]
fn test_transactional_commit_failure_rolls_back() {
    let mut conn = MockConnection {
        fail_commit: true,
        ..MockConnection::default()
    };
    let statements = vec![stmt(1, "INSERT INTO t VALUES (1)", StatementKind::Dml)];
    let options = RunOptions {
        transactional: true,
        ..RunOptions::default()
    };
    let report = execute(statements, options, &mut conn);
    assert_eq!(report.phase, RunPhase::Failed);
    assert!(matches!(report.group, Some(GroupOutcome::RolledBack { .. })));
}

#[test]
fn test_batched_reports_submitted_count() {
    let mut conn = MockConnection::default();
    let statements = vec![
        stmt(1, "INSERT INTO t VALUES (1)", StatementKind::Dml),
        stmt(2, "UPDATE t SET id = 2", StatementKind::Dml),
    ];
    let options = RunOptions {
        batched: true,
        ..RunOptions::default()
    };
    let report = execute(statements, options, &mut conn);
    assert!(report.succeeded());
    assert!(matches!(
        report.group,
        Some(GroupOutcome::Submitted { statements: 2 })
    ));
    assert_eq!(
        conn.log,
        vec![
            "batch:INSERT INTO t VALUES (1)",
            "batch:UPDATE t SET id = 2",
            "commit",
        ]
    );
}

#[test]
fn test_batched_failure_rolls_back() {
    let mut conn = MockConnection::failing_on(&["UPDATE"]);
    let statements = vec![
        stmt(1, "INSERT INTO t VALUES (1)", StatementKind::Dml),
        stmt(2, "UPDATE t SET id = 2", StatementKind::Dml),
    ];
    let options = RunOptions {
        batched: true,
        ..RunOptions::default()
    };
    let report = execute(statements, options, &mut conn);
    assert_eq!(report.phase, RunPhase::Failed);
    assert!(conn.log.contains(&"rollback".to_string()));
    assert!(matches!(report.group, Some(GroupOutcome::RolledBack { .. })));
}

#[test]
fn test_ddl_failure_aborts_run_before_dml() {
    let mut conn = MockConnection::failing_on(&["CREATE"]);
    let report = execute(mixed_statements(), RunOptions::default(), &mut conn);
    assert_eq!(report.phase, RunPhase::Failed);
    // No DML ever reached the connection.
    assert!(!conn.log.iter().any(|e| e.contains("INSERT")));
}

#[test]
fn test_ddl_failure_with_stop_on_error_off_still_runs_dml() {
    let mut conn = MockConnection::failing_on(&["CREATE"]);
    let options = RunOptions {
        stop_on_error: false,
        ..RunOptions::default()
    };
    let report = execute(mixed_statements(), options, &mut conn);
    assert_eq!(report.phase, RunPhase::Done);
    assert!(conn.log.iter().any(|e| e.contains("INSERT")));
}

#[test]
fn test_empty_statement_list() {
    let mut conn = MockConnection::default();
    let report = execute(Vec::new(), RunOptions::default(), &mut conn);
    assert!(report.succeeded());
    assert!(report.results.is_empty());
    assert!(report.group.is_none());
    assert!(conn.log.is_empty());
}

#[test]
fn test_failure_report_truncates_sql() {
    let long_sql = format!("INSERT INTO t VALUES ('{}')", "x".repeat(200));
    let mut conn = MockConnection::failing_on(&["INSERT"]);
    let statements = vec![stmt(1, &long_sql, StatementKind::Dml)];
    let options = RunOptions {
        stop_on_error: false,
        ..RunOptions::default()
    };
    let report = execute(statements, options, &mut conn);
    let result = &report.results[0];
    assert!(result.sql.len() <= SQL_DISPLAY_CHARS + 3);
    assert!(result.sql.ends_with("..."));
}

#[test]
fn test_runner_integrates_with_parser() {
    let sql = r#"CREATE TABLE t (id NUMBER);
INSERT INTO t VALUES (1);
UPDATE t SET id = 2;
"#;
    let mut conn = MockConnection::default();
    let report = execute(parse(sql), RunOptions::default(), &mut conn);
    assert!(report.succeeded());
    assert_eq!(report.results.len(), 3);
    assert_eq!(conn.log[0], "exec:CREATE TABLE t (id NUMBER)");
}
