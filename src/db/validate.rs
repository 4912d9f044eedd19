use std::collections::VecDeque;
use std::sync::{mpsc, Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use crate::db::connection::{ConnectionInfo, DbType, OracleSession};
use crate::error::RunnerError;

pub const DEFAULT_WORKERS: usize = 10;
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Outcome of one connectivity check against one target.
#[derive(Debug, Clone)]
pub struct ConnectionTestResult {
    pub database_name: String,
    pub service_name: String,
    pub db_type: DbType,
    pub success: bool,
    pub timestamp: DateTime<Utc>,
    pub response_time_ms: u64,
    pub error_message: Option<String>,
    pub error_code: Option<String>,
}

impl ConnectionTestResult {
    fn success(info: &ConnectionInfo, response_time_ms: u64) -> Self {
        Self {
            database_name: info.name.clone(),
            service_name: info.service_name.clone(),
            db_type: info.db_type,
            success: true,
            timestamp: Utc::now(),
            response_time_ms,
            error_message: None,
            error_code: None,
        }
    }

    fn failure(info: &ConnectionInfo, response_time_ms: u64, error: &RunnerError) -> Self {
        Self {
            database_name: info.name.clone(),
            service_name: info.service_name.clone(),
            db_type: info.db_type,
            success: false,
            timestamp: Utc::now(),
            response_time_ms,
            error_message: Some(error.message.clone()),
            error_code: Some(error.code_label()),
        }
    }

    pub fn status_label(&self) -> &'static str {
        if self.success {
            "SUCCESS"
        } else {
            "FAILED"
        }
    }
}

type ProbeFn = dyn Fn(&ConnectionInfo) -> Result<(), RunnerError> + Send + Sync;

/// Fleet connectivity checker. Each target runs as an independent task on
/// its own connection over a bounded worker pool; results come back in the
/// caller's input order, not completion order.
pub struct LoginValidator {
    workers: usize,
    timeout: Duration,
    probe: Arc<ProbeFn>,
}

impl Default for LoginValidator {
    fn default() -> Self {
        Self::new(DEFAULT_WORKERS, DEFAULT_TIMEOUT)
    }
}

impl LoginValidator {
    pub fn new(workers: usize, timeout: Duration) -> Self {
        Self::with_probe(workers, timeout, Arc::new(OracleSession::probe))
    }

    /// Same validator with an injected probe; used by tests and by callers
    /// that bring their own driver.
    pub fn with_probe(workers: usize, timeout: Duration, probe: Arc<ProbeFn>) -> Self {
        Self {
            workers: workers.max(1),
            timeout,
            probe,
        }
    }

    pub fn run(&self, targets: &[ConnectionInfo]) -> Vec<ConnectionTestResult> {
        if targets.is_empty() {
            return Vec::new();
        }
        info!(
            targets = targets.len(),
            workers = self.workers,
            "starting connectivity checks"
        );

        let jobs: VecDeque<(usize, ConnectionInfo)> =
            targets.iter().cloned().enumerate().collect();
        let jobs = Arc::new(Mutex::new(jobs));
        let (tx, rx) = mpsc::channel::<(usize, ConnectionTestResult)>();

        let pool_size = self.workers.min(targets.len());
        let mut handles = Vec::with_capacity(pool_size);
        for _ in 0..pool_size {
            let jobs = Arc::clone(&jobs);
            let tx = tx.clone();
            let probe = Arc::clone(&self.probe);
            let timeout = self.timeout;
            handles.push(thread::spawn(move || loop {
                let job = jobs.lock().ok().and_then(|mut queue| queue.pop_front());
                let Some((index, target)) = job else {
                    break;
                };
                let result = check_one(&probe, &target, timeout);
                if tx.send((index, result)).is_err() {
                    break;
                }
            }));
        }
        drop(tx);

        let mut slots: Vec<Option<ConnectionTestResult>> = vec![None; targets.len()];
        for (index, result) in rx {
            slots[index] = Some(result);
        }
        for handle in handles {
            let _ = handle.join();
        }

        // Every job was either checked or timed out, so every slot is filled.
        slots.into_iter().flatten().collect()
    }
}

/// Runs one probe, bounded by the timeout. A probe that overruns is left to
/// finish on its detached thread; the task reports a timeout failure instead
/// of blocking, and other tasks are unaffected.
fn check_one(
    probe: &Arc<ProbeFn>,
    target: &ConnectionInfo,
    timeout: Duration,
) -> ConnectionTestResult {
    let started = Instant::now();
    let (tx, rx) = mpsc::channel();
    let task_probe = Arc::clone(probe);
    let task_target = target.clone();
    thread::spawn(move || {
        let _ = tx.send(task_probe(&task_target));
    });

    let outcome = rx.recv_timeout(timeout).unwrap_or_else(|_| {
        Err(RunnerError::timeout(format!(
            "no response from {} within {}ms",
            target.display_string(),
            timeout.as_millis()
        )))
    });
    let elapsed = started.elapsed().as_millis() as u64;

    match outcome {
        Ok(()) => {
            debug!(target = %target.name, elapsed_ms = elapsed, "connectivity check passed");
            ConnectionTestResult::success(target, elapsed)
        }
        Err(err) => {
            debug!(target = %target.name, kind = %err.kind, "connectivity check failed");
            ConnectionTestResult::failure(target, elapsed, &err)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn target(name: &str) -> ConnectionInfo {
        ConnectionInfo::new(name, DbType::Oracle, "app", "pw", "dbhost", 1521, name)
    }

    #[test]
    fn results_follow_input_order() {
        // Earlier targets sleep longer, so completion order is reversed.
        let probe: Arc<ProbeFn> = Arc::new(|info: &ConnectionInfo| {
            let delay = match info.name.as_str() {
                "alpha" => 60,
                "beta" => 30,
                _ => 1,
            };
            thread::sleep(Duration::from_millis(delay));
            Ok(())
        });
        let validator =
            LoginValidator::with_probe(3, Duration::from_secs(5), probe);
        let results = validator.run(&[target("alpha"), target("beta"), target("gamma")]);
        let names: Vec<_> = results.iter().map(|r| r.database_name.as_str()).collect();
        assert_eq!(names, vec!["alpha", "beta", "gamma"]);
        assert!(results.iter().all(|r| r.success));
    }

    #[test]
    fn failure_of_one_target_does_not_affect_others() {
        let probe: Arc<ProbeFn> = Arc::new(|info: &ConnectionInfo| {
            if info.name == "bad" {
                Err(RunnerError::new(ErrorKind::Auth, "invalid credentials"))
            } else {
                Ok(())
            }
        });
        let validator =
            LoginValidator::with_probe(2, Duration::from_secs(5), probe);
        let results = validator.run(&[target("good"), target("bad"), target("also-good")]);
        assert!(results[0].success);
        assert!(!results[1].success);
        assert_eq!(results[1].error_code.as_deref(), Some("AUTH"));
        assert!(results[2].success);
    }

    #[test]
    fn slow_probe_reports_timeout_instead_of_hanging() {
        let probe: Arc<ProbeFn> = Arc::new(|_: &ConnectionInfo| {
            thread::sleep(Duration::from_secs(10));
            Ok(())
        });
        let validator =
            LoginValidator::with_probe(1, Duration::from_millis(50), probe);
        let results = validator.run(&[target("stuck")]);
        assert_eq!(results.len(), 1);
        assert!(!results[0].success);
        assert_eq!(results[0].error_code.as_deref(), Some("TIMEOUT"));
    }

    #[test]
    fn worker_pool_is_bounded_but_processes_all_targets() {
        let probe: Arc<ProbeFn> = Arc::new(|_: &ConnectionInfo| Ok(()));
        let validator =
            LoginValidator::with_probe(2, Duration::from_secs(5), probe);
        let targets: Vec<ConnectionInfo> =
            (0..9).map(|i| target(&format!("db{i}"))).collect();
        let results = validator.run(&targets);
        assert_eq!(results.len(), 9);
        for (i, result) in results.iter().enumerate() {
            assert_eq!(result.database_name, format!("db{i}"));
        }
    }

    #[test]
    fn empty_target_list_yields_no_results() {
        let validator = LoginValidator::default();
        assert!(validator.run(&[]).is_empty());
    }
}
