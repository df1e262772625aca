//! Shell command execution with combined output capture.
//!
//! Untimed commands run to completion. Timed commands run in their own
//! process group; when the deadline passes the whole group is killed, the
//! child is reaped, and the caller gets `TIMEOUT_STATUS` plus whatever output
//! arrived before the kill.

pub mod deadline;

use crate::error::ExecError;
use crate::report::log::{LogCategory, ReportLog};
use deadline::Deadline;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{self, Read};
use std::os::fd::{FromRawFd, OwnedFd};
use std::os::unix::process::{CommandExt, ExitStatusExt};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::thread;
use std::time::{Duration, Instant};

pub const SHELL: &str = "/bin/sh";

/// Exit status reported for a command killed at its deadline.
pub const TIMEOUT_STATUS: i32 = 1;

const READ_CHUNK_BYTES: usize = 4096;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShellCommand {
    line: String,
    cwd: Option<PathBuf>,
    env: BTreeMap<String, String>,
    timeout: Option<Duration>,
}

impl ShellCommand {
    pub fn new(line: impl Into<String>) -> Self {
        Self {
            line: line.into(),
            cwd: None,
            env: BTreeMap::new(),
            timeout: None,
        }
    }

    pub fn in_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.cwd = Some(dir.as_ref().to_path_buf());
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    pub fn timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn line(&self) -> &str {
        &self.line
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    pub status: i32,
    /// Standard output and standard error interleaved as written.
    pub output: String,
    pub timed_out: bool,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.status == 0 && !self.timed_out
    }
}

/// Runs shell commands on behalf of a reporter, recording each command line
/// in the report's `system` log before it starts.
pub struct ProcessRunner<'a> {
    log: &'a mut ReportLog,
}

impl<'a> ProcessRunner<'a> {
    pub fn new(log: &'a mut ReportLog) -> Self {
        Self { log }
    }

    pub fn log(&mut self, category: LogCategory, message: impl Into<String>) {
        self.log.log(category, message);
    }

    pub fn run(&mut self, line: &str, timeout: Option<Duration>) -> Result<CommandOutput, ExecError> {
        self.run_command(&ShellCommand::new(line).timeout(timeout))
    }

    /// A zero timeout is already expired: the command starts and is killed
    /// at once. Use `None` for an unbounded run.
    pub fn run_command(&mut self, command: &ShellCommand) -> Result<CommandOutput, ExecError> {
        self.log.log(LogCategory::System, command.line.as_str());
        let start = Instant::now();
        let result = match command.timeout {
            None => run_to_completion(command),
            Some(limit) => run_with_deadline(command, Deadline::after(limit)),
        };
        match &result {
            Ok(output) => tracing::info!(
                command = command.line.as_str(),
                elapsed_ms = start.elapsed().as_millis() as u64,
                status = output.status,
                timed_out = output.timed_out,
                output_bytes = output.output.len(),
                "command complete"
            ),
            Err(err) => tracing::warn!(command = command.line.as_str(), error = %err, "command failed to run"),
        }
        result
    }
}

fn run_to_completion(command: &ShellCommand) -> Result<CommandOutput, ExecError> {
    let (mut child, mut reader) = spawn(command, false)?;
    let mut bytes = Vec::new();
    let read = reader.read_to_end(&mut bytes);
    let status = child.wait().map_err(|source| ExecError::Wait {
        command: command.line.clone(),
        source,
    })?;
    read.map_err(|source| ExecError::Read {
        command: command.line.clone(),
        source,
    })?;

    // One trailing newline, whether or not the command printed one.
    let mut output = String::from_utf8_lossy(&bytes).into_owned();
    if output.ends_with('\n') {
        output.pop();
    }
    output.push('\n');
    Ok(CommandOutput {
        status: exit_code(status),
        output,
        timed_out: false,
    })
}

fn run_with_deadline(command: &ShellCommand, deadline: Deadline) -> Result<CommandOutput, ExecError> {
    let (mut child, reader) = spawn(command, true)?;
    let (tx, rx) = mpsc::channel();
    // Not joined: a process that escaped the group could hold the pipe open.
    thread::spawn(move || pump(reader, tx));

    let mut bytes = Vec::new();
    let mut timed_out = false;
    loop {
        let Some(remaining) = deadline.remaining() else {
            timed_out = true;
            break;
        };
        match rx.recv_timeout(remaining) {
            Ok(Ok(chunk)) => bytes.extend_from_slice(&chunk),
            Ok(Err(source)) => {
                kill_group(&child);
                let _ = child.wait();
                return Err(ExecError::Read {
                    command: command.line.clone(),
                    source,
                });
            }
            Err(RecvTimeoutError::Timeout) => {
                timed_out = true;
                break;
            }
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }

    if timed_out {
        kill_group(&child);
    }
    let status = child.wait().map_err(|source| ExecError::Wait {
        command: command.line.clone(),
        source,
    })?;
    if timed_out {
        tracing::warn!(
            command = command.line.as_str(),
            limit_secs = deadline.limit().as_secs(),
            "command killed at deadline"
        );
    }
    Ok(CommandOutput {
        status: if timed_out {
            TIMEOUT_STATUS
        } else {
            exit_code(status)
        },
        output: String::from_utf8_lossy(&bytes).into_owned(),
        timed_out,
    })
}

fn spawn(command: &ShellCommand, own_group: bool) -> Result<(Child, File), ExecError> {
    let (reader, stdout, stderr) = combined_pipe()?;
    let mut cmd = Command::new(SHELL);
    cmd.arg("-c")
        .arg(&command.line)
        .stdin(Stdio::null())
        .stdout(Stdio::from(stdout))
        .stderr(Stdio::from(stderr))
        .envs(&command.env);
    if let Some(dir) = &command.cwd {
        cmd.current_dir(dir);
    }
    if own_group {
        cmd.process_group(0);
    }
    let child = cmd.spawn().map_err(|source| ExecError::Spawn {
        command: command.line.clone(),
        source,
    })?;
    // The command owns our copies of the write end; drop them so the reader
    // sees end-of-file when the child and its descendants exit.
    drop(cmd);
    Ok((child, reader))
}

/// A pipe whose write end is handed out twice, once for stdout and once for
/// stderr, so the two streams interleave the way a terminal would show them.
fn combined_pipe() -> Result<(File, OwnedFd, OwnedFd), ExecError> {
    let mut fds = [0 as libc::c_int; 2];
    // SAFETY: fds has room for the two descriptors pipe writes.
    let rc = unsafe { open_pipe(&mut fds) };
    if rc != 0 {
        return Err(ExecError::Pipe(io::Error::last_os_error()));
    }
    // SAFETY: both descriptors were just created and are owned by nothing else.
    let (read, write) = unsafe { (OwnedFd::from_raw_fd(fds[0]), OwnedFd::from_raw_fd(fds[1])) };
    let write_again = write.try_clone().map_err(ExecError::Pipe)?;
    Ok((File::from(read), write, write_again))
}

#[cfg(any(target_os = "linux", target_os = "android", target_os = "freebsd"))]
unsafe fn open_pipe(fds: &mut [libc::c_int; 2]) -> libc::c_int {
    libc::pipe2(fds.as_mut_ptr(), libc::O_CLOEXEC)
}

#[cfg(not(any(target_os = "linux", target_os = "android", target_os = "freebsd")))]
unsafe fn open_pipe(fds: &mut [libc::c_int; 2]) -> libc::c_int {
    let rc = libc::pipe(fds.as_mut_ptr());
    if rc == 0 {
        for fd in fds.iter() {
            libc::fcntl(*fd, libc::F_SETFD, libc::FD_CLOEXEC);
        }
    }
    rc
}

fn pump(mut reader: File, tx: Sender<io::Result<Vec<u8>>>) {
    let mut buf = [0u8; READ_CHUNK_BYTES];
    loop {
        match reader.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => {
                if tx.send(Ok(buf[..n].to_vec())).is_err() {
                    break;
                }
            }
            Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
            Err(err) => {
                let _ = tx.send(Err(err));
                break;
            }
        }
    }
}

fn kill_group(child: &Child) {
    let pgid = child.id() as libc::pid_t;
    // SAFETY: the child is not yet reaped, so its group id is still ours.
    let rc = unsafe { libc::killpg(pgid, libc::SIGKILL) };
    if rc != 0 {
        tracing::debug!(pgid, error = %io::Error::last_os_error(), "killpg failed");
    }
}

fn exit_code(status: ExitStatus) -> i32 {
    status
        .code()
        .unwrap_or_else(|| 128 + status.signal().unwrap_or(0))
}

#[cfg(test)]
#[path = "exec_tests.rs"]
mod tests;
