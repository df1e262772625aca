//! Runtime for single-purpose grid reporters.
//!
//! A reporter declares its arguments, parses the command line, runs its
//! check (directly through [`exec::ProcessRunner`] or as a remote job
//! through [`job::JobSubmitter`]), records pass or fail, and prints an Inca
//! report document on stdout. Diagnostics go to stderr through `tracing`.

pub mod args;
pub mod compile;
pub mod error;
pub mod exec;
pub mod job;
pub mod report;
pub mod reporter;
pub mod unit;
pub mod xml;

pub use args::{ArgumentContract, ArgumentSpec, ArgvOutcome};
pub use error::{ArgumentError, ExecError, JobError};
pub use exec::{CommandOutput, ProcessRunner, ShellCommand};
pub use job::{JobOptions, JobOutput, JobSubmitter, SubmitterConfig};
pub use report::log::LogCategory;
pub use report::{ReportModel, ReporterInfo, Verbosity};
pub use reporter::Reporter;
pub use unit::UnitTest;

/// Environment variable holding the diagnostic `tracing` filter.
pub const LOG_ENV: &str = "INCA_REPORTER_LOG";

/// Installs a stderr subscriber filtered by `INCA_REPORTER_LOG` (default
/// `warn`). Stdout stays reserved for the report.
pub fn init_logging() -> anyhow::Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_env(LOG_ENV)
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|error| anyhow::anyhow!("failed to initialize tracing subscriber: {error}"))
}
