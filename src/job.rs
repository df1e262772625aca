//! Remote batch job lifecycle: submit through the job-submission CLI, poll
//! the job-status CLI until the job leaves its waiting states, then collect
//! the stdout/stderr files the job wrote back.
//!
//! One deadline covers the whole submit and poll sequence. When it expires,
//! or the cancel token trips, the remote job is cancelled on a best-effort
//! basis before the error is returned.

mod compile;
mod status;

pub use compile::CSourceOptions;
pub use status::JobStatus;

use crate::error::JobError;
use crate::exec::deadline::{CancelToken, Deadline};
use crate::exec::ProcessRunner;
use crate::report::header::local_hostname;
use crate::report::log::LogCategory;
use chrono::{DateTime, Utc};
use std::io;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};

/// Report dependencies declared by probes that submit jobs.
pub const DEPENDENCIES: [&str; 2] = ["inca.GlobusUnitReporter", "inca.GridProxyReporter"];

const POLL_SLICE: Duration = Duration::from_millis(50);
const CANCEL_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobOptions {
    /// Appended verbatim to the submission command.
    pub arguments: Option<String>,
    pub poll_interval: Duration,
    /// Remove the stdout/stderr files once read.
    pub cleanup: bool,
    pub count: u32,
    /// Ask the submission CLI to dump the generated RSL.
    pub debug: bool,
    pub duroc: bool,
    /// `NAME=value` pairs set in the job's environment.
    pub env: Vec<String>,
    /// Defaults to the local host name.
    pub host: Option<String>,
    pub mpi: bool,
    pub queue: Option<String>,
    /// The executable already exists on the remote side (`-l`) rather than
    /// being staged from here (`-s`).
    pub remote: bool,
    pub service: Option<String>,
    /// Bound on the whole lifecycle. Also passed to the scheduler as
    /// `-maxtime` in whole minutes.
    pub timeout: Duration,
}

impl Default for JobOptions {
    fn default() -> Self {
        Self {
            arguments: None,
            poll_interval: Duration::from_secs(30),
            cleanup: true,
            count: 1,
            debug: false,
            duroc: false,
            env: Vec::new(),
            host: None,
            mpi: false,
            queue: None,
            remote: true,
            service: None,
            timeout: Duration::from_secs(3600),
        }
    }
}

impl JobOptions {
    /// `host`, or `host/service` when a service is named.
    pub fn contact(&self) -> String {
        let mut contact = self.host.clone().unwrap_or_else(local_hostname);
        if let Some(service) = &self.service {
            contact.push('/');
            contact.push_str(service);
        }
        contact
    }

    fn extra_rsl(&self, contact: &str) -> String {
        let mut rsl = format!("(host_count={})", self.count);
        if self.duroc {
            rsl.push_str(&format!("(resourceManagerContact={contact})"));
        }
        if self.mpi {
            rsl.push_str("(jobtype=mpi)");
        }
        rsl
    }
}

/// Names of the external commands and where job output lands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmitterConfig {
    pub submit_command: String,
    pub status_command: String,
    pub cancel_command: String,
    pub makefile_header_command: String,
    /// Substring every valid job handle contains.
    pub handle_marker: String,
    pub scratch_dir: PathBuf,
}

impl Default for SubmitterConfig {
    fn default() -> Self {
        Self {
            submit_command: "globus-job-submit".to_string(),
            status_command: "globus-job-status".to_string(),
            cancel_command: "globus-job-cancel".to_string(),
            makefile_header_command: "globus-makefile-header".to_string(),
            handle_marker: "https".to_string(),
            scratch_dir: dirs::home_dir().unwrap_or_else(std::env::temp_dir),
        }
    }
}

impl SubmitterConfig {
    /// The files the job's stdout and stderr are staged back into. Named by
    /// process id, so one process runs one job at a time.
    pub fn output_paths(&self) -> (PathBuf, PathBuf) {
        let stem = format!(".inca.tmp.{}", std::process::id());
        (
            self.scratch_dir.join(format!("{stem}.out")),
            self.scratch_dir.join(format!("{stem}.err")),
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobHandle {
    pub id: String,
    pub submitted_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobOutput {
    pub output: String,
    pub error: String,
    pub status: JobStatus,
}

enum Interrupt {
    Expired,
    Cancelled,
}

pub struct JobSubmitter<'a> {
    runner: ProcessRunner<'a>,
    config: SubmitterConfig,
    cancel: CancelToken,
}

impl<'a> JobSubmitter<'a> {
    pub fn new(runner: ProcessRunner<'a>, config: SubmitterConfig) -> Self {
        Self {
            runner,
            config,
            cancel: CancelToken::new(),
        }
    }

    pub fn with_cancel_token(mut self, token: CancelToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn config(&self) -> &SubmitterConfig {
        &self.config
    }

    /// Runs `executable` as a remote job and returns what it wrote.
    pub fn submit(&mut self, executable: &str, options: &JobOptions) -> Result<JobOutput, JobError> {
        if executable.trim().is_empty() {
            return Err(JobError::MissingExecutable);
        }
        let deadline = Deadline::after(options.timeout);
        ensure_on_path(&self.config.submit_command)?;

        let (out_path, err_path) = self.config.output_paths();
        let command = submit_command_line(&self.config, executable, options, &out_path, &err_path);
        let submitted = self.runner.run(&command, None)?;
        if !submitted.success() {
            return Err(JobError::Submission(format!(
                "call to '{command}' failed: {}",
                submitted.output
            )));
        }
        let id = submitted.output.trim().to_string();
        if !id.contains(&self.config.handle_marker) {
            return Err(JobError::Submission(format!(
                "invalid job id returned: '{id}'"
            )));
        }
        let handle = JobHandle {
            id,
            submitted_at: Utc::now(),
        };
        tracing::info!(job = handle.id.as_str(), "job submitted");

        let status = match self.wait_for(&handle, options, &deadline) {
            Ok(status) => status,
            Err(interrupt) => {
                self.cancel_remote(&handle);
                if options.cleanup {
                    remove_quietly(&out_path);
                    remove_quietly(&err_path);
                }
                return Err(match interrupt {
                    Interrupt::Expired => {
                        tracing::warn!(
                            job = handle.id.as_str(),
                            limit_secs = options.timeout.as_secs(),
                            "job deadline expired"
                        );
                        JobError::Timeout {
                            seconds: options.timeout.as_secs(),
                        }
                    }
                    Interrupt::Cancelled => JobError::Cancelled,
                });
            }
        };
        tracing::info!(
            job = handle.id.as_str(),
            %status,
            elapsed_ms = deadline.elapsed().as_millis() as u64,
            since_submit_secs = (Utc::now() - handle.submitted_at).num_seconds(),
            "job finished"
        );

        let output = read_job_file(&out_path, false);
        let error = read_job_file(&err_path, true);
        if options.cleanup {
            remove_quietly(&out_path);
            remove_quietly(&err_path);
        }
        Ok(JobOutput {
            output: output?,
            error: error?,
            status,
        })
    }

    fn wait_for(
        &mut self,
        handle: &JobHandle,
        options: &JobOptions,
        deadline: &Deadline,
    ) -> Result<JobStatus, Interrupt> {
        let query = format!(
            "{} {}",
            self.config.status_command,
            shell_words::quote(&handle.id)
        );
        let mut status = JobStatus::Submitting;
        while status.is_polling() {
            self.pause(options.poll_interval, deadline)?;
            let remaining = deadline.remaining().ok_or(Interrupt::Expired)?;
            let polled = match self.runner.run(&query, Some(remaining)) {
                Ok(polled) => polled,
                Err(err) => {
                    // A status query that cannot even start is retried on
                    // the next tick until the deadline gives up.
                    self.runner.log(LogCategory::Warn, err.to_string());
                    continue;
                }
            };
            if polled.timed_out {
                return Err(Interrupt::Expired);
            }
            let next = JobStatus::parse(&polled.output);
            if next != status {
                tracing::debug!(job = handle.id.as_str(), from = %status, to = %next, "job status changed");
            }
            status = next;
        }
        Ok(status)
    }

    /// Sleeps for `interval` in short slices so cancellation and expiry are
    /// noticed promptly.
    fn pause(&self, interval: Duration, deadline: &Deadline) -> Result<(), Interrupt> {
        let until = Instant::now() + interval;
        loop {
            if self.cancel.is_cancelled() {
                return Err(Interrupt::Cancelled);
            }
            let left = deadline.remaining().ok_or(Interrupt::Expired)?;
            let now = Instant::now();
            if now >= until {
                return Ok(());
            }
            thread::sleep(left.min(until - now).min(POLL_SLICE));
        }
    }

    fn cancel_remote(&mut self, handle: &JobHandle) {
        let command = format!(
            "{} -f {}",
            self.config.cancel_command,
            shell_words::quote(&handle.id)
        );
        if let Err(err) = self.runner.run(&command, Some(CANCEL_TIMEOUT)) {
            tracing::warn!(job = handle.id.as_str(), error = %err, "remote cancel failed");
        }
    }
}

fn submit_command_line(
    config: &SubmitterConfig,
    executable: &str,
    options: &JobOptions,
    out_path: &Path,
    err_path: &Path,
) -> String {
    let contact = options.contact();
    let mut words: Vec<String> = vec![config.submit_command.clone()];
    if options.debug {
        words.push("-dumprsl".to_string());
    }
    words.extend([
        "-stderr".to_string(),
        "-s".to_string(),
        shell_words::quote(&err_path.to_string_lossy()).into_owned(),
        "-stdout".to_string(),
        "-s".to_string(),
        shell_words::quote(&out_path.to_string_lossy()).into_owned(),
        shell_words::quote(&contact).into_owned(),
        "-count".to_string(),
        options.count.to_string(),
        "-maxtime".to_string(),
        (options.timeout.as_secs() / 60).to_string(),
        "-x".to_string(),
        shell_words::quote(&options.extra_rsl(&contact)).into_owned(),
    ]);
    for var in &options.env {
        words.push("-env".to_string());
        words.push(shell_words::quote(var).into_owned());
    }
    if let Some(queue) = &options.queue {
        words.push("-q".to_string());
        words.push(shell_words::quote(queue).into_owned());
    }
    words.push(if options.remote { "-l" } else { "-s" }.to_string());
    words.push(shell_words::quote(executable).into_owned());
    if let Some(arguments) = &options.arguments {
        words.push(arguments.clone());
    }
    words.join(" ")
}

/// The submission CLI is checked up front so a missing grid toolkit is
/// reported as such rather than as a shell error.
fn ensure_on_path(command: &str) -> Result<(), JobError> {
    let program = shell_words::split(command)
        .ok()
        .and_then(|words| words.into_iter().next())
        .unwrap_or_else(|| command.to_string());
    which::which(&program)
        .map(|_| ())
        .map_err(|_| JobError::Submission(format!("{program} not found on PATH")))
}

fn read_job_file(path: &Path, optional: bool) -> Result<String, JobError> {
    match std::fs::read_to_string(path) {
        Ok(text) => Ok(text),
        Err(err) if optional && err.kind() == io::ErrorKind::NotFound => Ok(String::new()),
        Err(source) => Err(JobError::Io {
            path: path.to_path_buf(),
            source,
        }),
    }
}

fn remove_quietly(path: &Path) {
    if let Err(err) = std::fs::remove_file(path) {
        if err.kind() != io::ErrorKind::NotFound {
            tracing::debug!(path = %path.display(), error = %err, "temp file not removed");
        }
    }
}

#[cfg(test)]
#[path = "job_tests.rs"]
mod tests;
