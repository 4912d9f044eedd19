use crate::db::script::Statement;

/// Caller-selected execution behavior for one script run.
#[derive(Debug, Clone, Copy)]
pub struct RunOptions {
    /// Abort the remaining run after the first failure outside a
    /// transactional group.
    pub stop_on_error: bool,
    /// Run all DML in one transaction with a single commit.
    pub transactional: bool,
    /// Queue all DML into one driver batch inside one transaction.
    pub batched: bool,
    /// Echo each statement before executing it.
    pub print_statements: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            stop_on_error: true,
            transactional: false,
            batched: false,
            print_statements: false,
        }
    }
}

/// An ordered run of statements sharing one execution mode. Non-DML
/// statements always travel alone and non-transactionally; the DML
/// statements of a script form a single group whose mode comes from the
/// caller's options.
#[derive(Debug, Clone)]
pub struct ExecutionGroup {
    pub statements: Vec<Statement>,
    pub transactional: bool,
    pub batched: bool,
}

impl ExecutionGroup {
    fn singleton(statement: Statement) -> Self {
        Self {
            statements: vec![statement],
            transactional: false,
            batched: false,
        }
    }
}

/// Partitions the parsed statement list into execution groups: the non-DML
/// subsequence first (order preserved, singleton groups), then one DML
/// group. Relative order within each subsequence is the script order.
pub fn plan(statements: Vec<Statement>, options: &RunOptions) -> Vec<ExecutionGroup> {
    let mut groups = Vec::new();
    let mut dml = Vec::new();

    for statement in statements {
        if statement.is_dml() {
            dml.push(statement);
        } else {
            groups.push(ExecutionGroup::singleton(statement));
        }
    }

    if !dml.is_empty() {
        groups.push(ExecutionGroup {
            statements: dml,
            transactional: options.transactional,
            batched: options.batched,
        });
    }

    groups
}
