use std::path::PathBuf;
use thiserror::Error;

/// Problems found while registering or parsing reporter arguments.
///
/// The `Display` text is what ends up in the `<errorMessage>` of the failed
/// report, so it is part of the report contract.
#[derive(Debug, Error)]
pub enum ArgumentError {
    #[error("unknown argument '{0}'")]
    UnknownArgument(String),

    #[error("'{value}' is not a valid value for -{name}")]
    InvalidValue { name: String, value: String },

    #[error("{}", missing_message(.0))]
    Missing(Vec<String>),

    #[error("invalid pattern for argument '{name}': {source}")]
    InvalidPattern {
        name: String,
        #[source]
        source: regex::Error,
    },
}

fn missing_message(names: &[String]) -> String {
    match names {
        [single] => format!("Missing required argument '{single}'"),
        _ => format!("Missing required arguments '{}'", names.join("', '")),
    }
}

/// Failures of the runner itself. A command exiting non-zero is not an
/// error; it is reported through `CommandOutput::status`.
#[derive(Debug, Error)]
pub enum ExecError {
    #[error("create output pipe: {0}")]
    Pipe(#[source] std::io::Error),

    #[error("spawn '{command}': {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("wait for '{command}': {source}")]
    Wait {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("prepare {path}: {source}", path = .path.display())]
    Prepare {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("read output of '{command}': {source}")]
    Read {
        command: String,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Error)]
pub enum JobError {
    #[error("No executable supplied to submitJob")]
    MissingExecutable,

    #[error("{0}")]
    Submission(String),

    #[error("job did not complete within {seconds} seconds")]
    Timeout { seconds: u64 },

    #[error("job was cancelled before completing")]
    Cancelled,

    #[error("{path}: {source}", path = .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{0}")]
    Compile(String),

    #[error(transparent)]
    Exec(#[from] ExecError),
}
