use std::fs::File;
use std::io::Write;
use std::path::Path;

use tracing::info;

use crate::db::validate::ConnectionTestResult;
use crate::error::RunnerError;

const HEADER: [&str; 8] = [
    "Database",
    "ServiceName",
    "Type",
    "Status",
    "ResponseTime(ms)",
    "Timestamp",
    "ErrorCode",
    "ErrorMessage",
];

/// Writes the connectivity report to `path`, one row per target in the
/// order the results carry.
pub fn write_results(path: &Path, results: &[ConnectionTestResult]) -> Result<(), RunnerError> {
    let file = File::create(path).map_err(|err| {
        RunnerError::parse(format!("cannot create {}: {err}", path.display()))
    })?;
    write_to(file, results)?;
    info!(path = %path.display(), rows = results.len(), "connectivity report written");
    Ok(())
}

pub fn write_to<W: Write>(writer: W, results: &[ConnectionTestResult]) -> Result<(), RunnerError> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    csv_writer
        .write_record(HEADER)
        .map_err(csv_error)?;
    for result in results {
        let response_time = result.response_time_ms.to_string();
        let timestamp = result.timestamp.format("%Y-%m-%d %H:%M:%S").to_string();
        csv_writer
            .write_record([
                result.database_name.as_str(),
                result.service_name.as_str(),
                result.db_type.as_str(),
                result.status_label(),
                response_time.as_str(),
                timestamp.as_str(),
                result.error_code.as_deref().unwrap_or(""),
                result.error_message.as_deref().unwrap_or(""),
            ])
            .map_err(csv_error)?;
    }
    csv_writer.flush().map_err(RunnerError::from)?;
    Ok(())
}

fn csv_error(err: csv::Error) -> RunnerError {
    RunnerError::parse(err.to_string()).with_context("csv export")
}
