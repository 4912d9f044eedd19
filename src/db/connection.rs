use oracle::Connection;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::db::runner::{RowCount, SqlConnection};
use crate::error::{ErrorKind, RunnerError};

/// Vendor tag selecting the URL/property template and defaults. One
/// configuration-driven builder instead of a subclass per vendor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DbType {
    Oracle,
    Postgres,
    MySql,
    SqlServer,
}

impl DbType {
    pub fn default_port(&self) -> u16 {
        match self {
            DbType::Oracle => 1521,
            DbType::Postgres => 5432,
            DbType::MySql => 3306,
            DbType::SqlServer => 1433,
        }
    }

    /// Cheap connectivity check statement.
    pub fn probe_query(&self) -> &'static str {
        match self {
            DbType::Oracle => "SELECT 1 FROM DUAL",
            _ => "SELECT 1",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DbType::Oracle => "oracle",
            DbType::Postgres => "postgres",
            DbType::MySql => "mysql",
            DbType::SqlServer => "sqlserver",
        }
    }
}

impl std::str::FromStr for DbType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "oracle" => Ok(DbType::Oracle),
            "postgres" | "postgresql" => Ok(DbType::Postgres),
            "mysql" => Ok(DbType::MySql),
            "sqlserver" | "mssql" => Ok(DbType::SqlServer),
            other => Err(format!("unsupported database type: {other}")),
        }
    }
}

impl std::fmt::Display for DbType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ConnectionInfo {
    pub name: String,
    pub db_type: DbType,
    pub username: String,
    #[serde(skip_serializing, default)]
    pub password: String,
    pub host: String,
    pub port: u16,
    pub service_name: String,
}

impl ConnectionInfo {
    pub fn new(
        name: &str,
        db_type: DbType,
        username: &str,
        password: &str,
        host: &str,
        port: u16,
        service_name: &str,
    ) -> Self {
        Self {
            name: name.to_string(),
            db_type,
            username: username.to_string(),
            password: password.to_string(),
            host: host.to_string(),
            port,
            service_name: service_name.to_string(),
        }
    }

    /// Vendor-specific connect string built from one template per dbType.
    pub fn connection_string(&self) -> String {
        match self.db_type {
            DbType::Oracle => format!("//{}:{}/{}", self.host, self.port, self.service_name),
            DbType::Postgres => format!(
                "postgresql://{}:{}/{}",
                self.host, self.port, self.service_name
            ),
            DbType::MySql => format!("mysql://{}:{}/{}", self.host, self.port, self.service_name),
            DbType::SqlServer => format!(
                "server={};port={};database={}",
                self.host, self.port, self.service_name
            ),
        }
    }

    pub fn display_string(&self) -> String {
        format!(
            "{} ({}@{}:{}/{})",
            self.name, self.username, self.host, self.port, self.service_name
        )
    }

    /// Securely clear the password from memory by overwriting with zeros
    /// then releasing the allocation.
    pub fn clear_password(&mut self) {
        // SAFETY: we write zeros over the valid UTF-8 bytes (zeros are valid UTF-8)
        let bytes = unsafe { self.password.as_bytes_mut() };
        for b in bytes.iter_mut() {
            // Use write_volatile to prevent the compiler from optimizing away the zeroing
            unsafe { std::ptr::write_volatile(b, 0) };
        }
        self.password.clear();
        self.password.shrink_to_fit();
    }
}

impl Default for ConnectionInfo {
    fn default() -> Self {
        Self {
            name: String::new(),
            db_type: DbType::Oracle,
            username: String::new(),
            password: String::new(),
            host: "localhost".to_string(),
            port: 1521,
            service_name: "ORCL".to_string(),
        }
    }
}

/// Oracle-backed [`SqlConnection`]. The session runs in manual-commit mode;
/// transaction boundaries belong to the executor.
pub struct OracleSession {
    conn: Connection,
    info: ConnectionInfo,
}

impl OracleSession {
    pub fn connect(mut info: ConnectionInfo) -> Result<Self, RunnerError> {
        if info.db_type != DbType::Oracle {
            return Err(RunnerError::new(
                ErrorKind::Connection,
                format!("no driver available for {}", info.db_type),
            ));
        }
        let conn_str = info.connection_string();
        debug!(target = %info.display_string(), "connecting");
        let conn = Connection::connect(&info.username, &info.password, &conn_str)
            .map_err(RunnerError::from)?;
        Self::apply_default_session_settings(&conn);
        // Drop the credential now that the session is established.
        info.clear_password();
        Ok(Self { conn, info })
    }

    fn apply_default_session_settings(conn: &Connection) {
        let statements = [
            "ALTER SESSION SET NLS_TIMESTAMP_FORMAT = 'yyyy-mm-dd hh24:mi:ss'",
            "ALTER SESSION SET NLS_DATE_FORMAT = 'yyyy-mm-dd hh24:mi:ss'",
        ];

        for statement in statements {
            if let Err(err) = conn.execute(statement, &[]) {
                warn!("failed to apply default session setting `{statement}`: {err}");
            }
        }
    }

    pub fn info(&self) -> &ConnectionInfo {
        &self.info
    }

    /// Connects, runs the vendor probe query and disconnects. Used by the
    /// fleet connectivity check.
    pub fn probe(info: &ConnectionInfo) -> Result<(), RunnerError> {
        let session = Self::connect(info.clone())?;
        session
            .conn
            .query_row_as::<i64>(info.db_type.probe_query(), &[])
            .map_err(RunnerError::from)?;
        Ok(())
    }
}

impl SqlConnection for OracleSession {
    fn execute(&mut self, sql: &str) -> Result<RowCount, RunnerError> {
        let mut stmt = self
            .conn
            .statement(sql)
            .build()
            .map_err(RunnerError::from)?;
        if stmt.is_query() {
            let rows = stmt.query(&[]).map_err(RunnerError::from)?;
            let mut count = 0u64;
            for row in rows {
                row.map_err(RunnerError::from)?;
                count += 1;
            }
            Ok(RowCount::Returned(count))
        } else {
            stmt.execute(&[]).map_err(RunnerError::from)?;
            let affected = stmt.row_count().map_err(RunnerError::from)?;
            Ok(RowCount::Affected(affected))
        }
    }

    fn execute_batch(&mut self, statements: &[&str]) -> Result<usize, RunnerError> {
        // The driver has no multi-statement batch call; each statement is
        // submitted on the open transaction and the submitted count is
        // reported, matching batch semantics where affected-row counts are
        // not available.
        for sql in statements {
            self.conn.execute(sql, &[]).map_err(RunnerError::from)?;
        }
        Ok(statements.len())
    }

    fn commit(&mut self) -> Result<(), RunnerError> {
        self.conn.commit().map_err(|err| {
            let source = RunnerError::from(err);
            RunnerError::transaction(source.message).with_context("commit")
        })
    }

    fn rollback(&mut self) -> Result<(), RunnerError> {
        self.conn.rollback().map_err(|err| {
            let source = RunnerError::from(err);
            RunnerError::transaction(source.message).with_context("rollback")
        })
    }
}
