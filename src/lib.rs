pub mod db;
pub mod error;
pub mod utils;

pub use db::connection::{ConnectionInfo, DbType, OracleSession};
pub use db::runner::{execute, RunOptions, RunReport, SqlConnection};
pub use db::script::{parse, parse_file, Statement, StatementKind};
pub use db::validate::{ConnectionTestResult, LoginValidator};
pub use error::{ErrorKind, RunnerError};
