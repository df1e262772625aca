//! Shared test infrastructure for integration tests.

use std::path::Path;
use std::process::{Command, Output, Stdio};
use tempfile::TempDir;

/// Result of one run of the `grid-unit-date` probe.
#[derive(Debug)]
pub struct ProbeRun {
    pub status: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

/// Runs the probe with a `PATH` that holds no grid toolkit, so any job
/// submission stops at the missing submit command instead of reaching a
/// real gatekeeper.
pub struct ProbeFixture {
    empty_path: TempDir,
}

impl Default for ProbeFixture {
    fn default() -> Self {
        Self::new()
    }
}

impl ProbeFixture {
    pub fn new() -> Self {
        Self {
            empty_path: TempDir::new().expect("create temp dir"),
        }
    }

    /// Links `name` in the fixture's `PATH` to an existing system program.
    pub fn link_command(&self, name: &str, target: &str) {
        let target = ["/bin", "/usr/bin"]
            .iter()
            .map(|dir| Path::new(dir).join(target))
            .find(|path| path.exists())
            .expect("system program to link");
        std::os::unix::fs::symlink(target, self.empty_path.path().join(name))
            .expect("link command");
    }

    pub fn run(&self, args: &[&str]) -> ProbeRun {
        self.run_with_env(args, &[])
    }

    pub fn run_with_env(&self, args: &[&str], envs: &[(&str, &str)]) -> ProbeRun {
        let output = Command::new(env!("CARGO_BIN_EXE_grid-unit-date"))
            .args(args)
            .env("PATH", self.empty_path.path())
            .env("HOME", self.empty_path.path())
            .env_remove("QUERY_STRING")
            .envs(envs.iter().copied())
            .stdin(Stdio::null())
            .output()
            .expect("run grid-unit-date");
        ProbeRun::from(output)
    }
}

impl From<Output> for ProbeRun {
    fn from(output: Output) -> Self {
        Self {
            status: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        }
    }
}
