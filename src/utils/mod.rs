pub mod config;
pub mod csv_export;

pub use config::RunnerConfig;
