use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::{ArgAction, Args, Parser, Subcommand};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use dbrunner::db::connection::{ConnectionInfo, DbType, OracleSession};
use dbrunner::db::runner::{execute, GroupOutcome, Outcome, RunOptions, SqlConnection};
use dbrunner::db::script::parse_file;
use dbrunner::db::storedproc::{build_anonymous_block, build_function_select, parse_params};
use dbrunner::db::validate::LoginValidator;
use dbrunner::error::RunnerError;
use dbrunner::utils::{csv_export, RunnerConfig};

#[derive(Parser)]
#[command(name = "dbrunner", version, about = "SQL script and stored procedure runner")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Execute a SQL script file against one database
    Run(RunArgs),
    /// Call a stored procedure or function
    Proc(ProcArgs),
    /// Check connectivity across a fleet of databases
    Check(CheckArgs),
}

#[derive(Args)]
struct ConnectArgs {
    /// Database type: oracle, postgres, mysql or sqlserver
    #[arg(short = 't', long = "type", default_value = "oracle", value_parser = parse_db_type)]
    db_type: DbType,

    #[arg(short = 'H', long)]
    host: String,

    /// Port; the vendor default is used when omitted
    #[arg(short = 'P', long)]
    port: Option<u16>,

    #[arg(short = 'u', long)]
    user: String,

    #[arg(short = 'p', long)]
    password: String,

    /// Service or database name
    #[arg(short = 'd', long)]
    database: String,
}

impl ConnectArgs {
    fn connection_info(&self) -> ConnectionInfo {
        ConnectionInfo::new(
            &self.database,
            self.db_type,
            &self.user,
            &self.password,
            &self.host,
            self.port.unwrap_or_else(|| self.db_type.default_port()),
            &self.database,
        )
    }
}

#[derive(Args)]
struct RunArgs {
    #[command(flatten)]
    connect: ConnectArgs,

    /// SQL script file to execute
    script: PathBuf,

    /// Abort the remaining run after the first failure
    #[arg(long, default_value_t = true, action = ArgAction::Set)]
    stop_on_error: bool,

    /// Run all DML in one transaction with a single commit
    #[arg(long)]
    transactional: bool,

    /// Queue all DML into one batch inside one transaction
    #[arg(long)]
    batched: bool,

    /// Echo each statement before executing it
    #[arg(long)]
    print_statements: bool,
}

#[derive(Args)]
struct ProcArgs {
    #[command(flatten)]
    connect: ConnectArgs,

    /// Procedure or function name
    procedure: String,

    /// Call as a function and report its return value
    #[arg(long)]
    function: bool,

    /// Input parameters (name:type:value,...)
    #[arg(short = 'i', long)]
    input: Option<String>,

    /// Output parameters (name:type,...)
    #[arg(short = 'o', long)]
    output: Option<String>,

    /// Input/output parameters (name:type:value,...)
    #[arg(long)]
    io: Option<String>,
}

#[derive(Args)]
struct CheckArgs {
    /// JSON file holding the list of connection targets
    targets: PathBuf,

    /// Write the report as CSV to this path
    #[arg(long)]
    csv_output: Option<PathBuf>,

    /// Worker pool size; defaults to the configured value
    #[arg(long)]
    workers: Option<usize>,

    /// Per-target timeout in seconds
    #[arg(long)]
    timeout_secs: Option<u64>,
}

fn parse_db_type(value: &str) -> Result<DbType, String> {
    value.parse()
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let config = RunnerConfig::load();
    let outcome = match cli.command {
        Command::Run(args) => run_script(args),
        Command::Proc(args) => run_procedure(args),
        Command::Check(args) => run_check(args, &config),
    };

    match outcome {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(err) => {
            error!("{err}");
            ExitCode::FAILURE
        }
    }
}

fn run_script(args: RunArgs) -> Result<bool, RunnerError> {
    let statements = parse_file(&args.script)?;
    if statements.is_empty() {
        warn!(script = %args.script.display(), "script contains no statements");
        return Ok(true);
    }
    info!(
        script = %args.script.display(),
        statements = statements.len(),
        "executing script"
    );

    let options = RunOptions {
        stop_on_error: args.stop_on_error,
        transactional: args.transactional,
        batched: args.batched,
        print_statements: args.print_statements,
    };
    let mut session = OracleSession::connect(args.connect.connection_info())?;
    let report = execute(statements, options, &mut session);

    for result in &report.results {
        match &result.outcome {
            Outcome::Success { .. } => {}
            Outcome::Failure { error } => {
                error!(ordinal = result.ordinal, "{}: {error}", result.sql);
            }
        }
    }
    match &report.group {
        Some(GroupOutcome::Committed { statements }) => {
            info!("committed {statements} DML statements in one transaction");
        }
        Some(GroupOutcome::Submitted { statements }) => {
            info!("submitted {statements} DML statements in one batch");
        }
        Some(GroupOutcome::RolledBack { error }) => {
            error!("DML group rolled back: {error}");
        }
        None => {}
    }

    let succeeded = report.succeeded();
    if succeeded {
        info!(statements = report.results.len(), "script completed");
    }
    Ok(succeeded)
}

fn run_procedure(args: ProcArgs) -> Result<bool, RunnerError> {
    let params = parse_params(
        args.input.as_deref(),
        args.output.as_deref(),
        args.io.as_deref(),
    )?;
    let db_type = args.connect.db_type;
    let sql = if args.function {
        build_function_select(db_type, &args.procedure, &params)?
    } else {
        build_anonymous_block(&args.procedure, &params)?
    };

    let mut session = OracleSession::connect(args.connect.connection_info())?;
    session.execute(&sql)?;
    session.commit()?;
    info!(procedure = %args.procedure, "call completed");
    Ok(true)
}

fn run_check(args: CheckArgs, config: &RunnerConfig) -> Result<bool, RunnerError> {
    let content = std::fs::read_to_string(&args.targets).map_err(|err| {
        RunnerError::parse(format!("cannot read targets {}: {err}", args.targets.display()))
    })?;
    let targets: Vec<ConnectionInfo> = serde_json::from_str(&content).map_err(|err| {
        RunnerError::parse(format!("invalid targets file {}: {err}", args.targets.display()))
    })?;

    let workers = args.workers.unwrap_or(config.validator_workers);
    let timeout = args
        .timeout_secs
        .map(Duration::from_secs)
        .unwrap_or_else(|| config.validator_timeout());
    let validator = LoginValidator::new(workers, timeout);
    let results = validator.run(&targets);

    let failed = results.iter().filter(|r| !r.success).count();
    for result in &results {
        if result.success {
            info!(
                "{}: {} ({}ms)",
                result.database_name,
                result.status_label(),
                result.response_time_ms
            );
        } else {
            warn!(
                "{}: {} ({})",
                result.database_name,
                result.status_label(),
                result.error_message.as_deref().unwrap_or("no detail")
            );
        }
    }
    info!(
        total = results.len(),
        failed,
        "connectivity check finished"
    );

    if let Some(path) = &args.csv_output {
        csv_export::write_results(path, &results)?;
    }
    Ok(failed == 0)
}
