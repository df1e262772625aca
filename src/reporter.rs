//! The facade a probe program is written against: one argument contract,
//! one report, and the temporary files to remove when the probe is done.

use crate::args::{ArgumentContract, ArgumentSpec, ArgvOutcome, VERBOSE};
use crate::compile::{self, CompileOptions};
use crate::error::{ArgumentError, ExecError};
use crate::exec::{CommandOutput, ProcessRunner};
use crate::job::{self, JobSubmitter, SubmitterConfig};
use crate::report::log::LogCategory;
use crate::report::{ReportModel, ReporterInfo, Verbosity};
use crate::unit::{UnitTest, SIMPLE_UNIT_DEPENDENCY};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub struct Reporter {
    contract: ArgumentContract,
    model: ReportModel,
    temp_paths: Vec<PathBuf>,
}

impl Reporter {
    pub fn new(info: ReporterInfo) -> Self {
        Self {
            contract: ArgumentContract::new(),
            model: ReportModel::new(info),
            temp_paths: Vec::new(),
        }
    }

    pub fn info(&self) -> &ReporterInfo {
        self.model.info()
    }

    pub fn model(&self) -> &ReportModel {
        &self.model
    }

    pub fn model_mut(&mut self) -> &mut ReportModel {
        &mut self.model
    }

    pub fn contract(&self) -> &ArgumentContract {
        &self.contract
    }

    pub fn add_arg(&mut self, spec: ArgumentSpec) -> Result<(), ArgumentError> {
        self.contract.register(spec)
    }

    pub fn add_dependency(&mut self, dependency: impl Into<String>) {
        self.model.add_dependency(dependency);
    }

    pub fn add_dependencies<I, S>(&mut self, dependencies: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for dependency in dependencies {
            self.model.add_dependency(dependency);
        }
    }

    /// Makes this a unit probe: a completed report carries the unit body.
    pub fn set_unit(&mut self, unit: UnitTest) {
        self.model.add_dependency(SIMPLE_UNIT_DEPENDENCY);
        self.model.set_body_builder(unit);
    }

    /// Parses `argv` and handles every outcome that ends the probe: help and
    /// version are printed, argument errors become a failed report. Each of
    /// these exits the process with status 0. Returns only when the probe
    /// should run.
    pub fn process_argv<I, S>(&mut self, argv: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        match self.try_process_argv(argv) {
            Ok(ArgvOutcome::Run) => {}
            Ok(ArgvOutcome::Help) => {
                let text = if self.verbosity() == Verbosity::Terse {
                    self.model.help_text(&self.contract)
                } else {
                    let document = self.model.help_document(&self.contract);
                    format!("{document}\n")
                };
                println!("{text}");
                self.exit();
            }
            Ok(ArgvOutcome::Version) => {
                println!("{}\n", self.model.version_text());
                self.exit();
            }
            Err(err) => self.fail_print_and_exit(err.to_string()),
        }
    }

    /// Parses `argv` without printing or exiting.
    pub fn try_process_argv<I, S>(&mut self, argv: I) -> Result<ArgvOutcome, ArgumentError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let outcome = self.contract.parse(argv);
        let terse = self.verbosity() == Verbosity::Terse;
        let log = self.model.report_log_mut();
        log.set_filter(self.contract.log_filter().clone());
        log.set_mirror_to_stderr(terse);
        outcome
    }

    fn verbosity(&self) -> Verbosity {
        Verbosity::from_arg(self.contract.value(VERBOSE))
    }

    pub fn arg_value(&self, name: &str) -> Option<&str> {
        self.contract.value(name)
    }

    pub fn nth_arg_value(&self, name: &str, occurrence: usize) -> Option<&str> {
        self.contract.nth_value(name, occurrence)
    }

    pub fn arg_values(&self, name: &str) -> Option<Vec<&str>> {
        self.contract.values(name)
    }

    pub fn log(&mut self, category: LogCategory, message: impl Into<String>) {
        self.model.log(category, message);
    }

    pub fn set_result(&mut self, completed: bool, fail_message: Option<String>) {
        self.model.set_result(completed, fail_message);
    }

    pub fn unit_success(&mut self) {
        self.model.set_result(true, None);
    }

    pub fn unit_failure(&mut self, message: impl Into<String>) {
        self.model.set_result(false, Some(message.into()));
    }

    pub fn set_body(&mut self, body: Option<String>) {
        self.model.set_body(body);
    }

    pub fn report(&mut self, verbosity: Option<Verbosity>) -> String {
        self.model.render(&self.contract, verbosity)
    }

    /// The report followed by a blank line.
    pub fn print_report(&mut self, verbosity: Option<Verbosity>) {
        println!("{}\n", self.report(verbosity));
    }

    pub fn fail_print_and_exit(&mut self, message: impl Into<String>) -> ! {
        self.model.set_result(false, Some(message.into()));
        self.print_report(None);
        self.exit()
    }

    fn exit(&mut self) -> ! {
        let _ = std::io::stdout().flush();
        self.remove_temp_paths();
        std::process::exit(0)
    }

    /// A runner that records commands in this report's log.
    pub fn runner(&mut self) -> ProcessRunner<'_> {
        ProcessRunner::new(self.model.report_log_mut())
    }

    /// Runs `line` and returns its status and combined output. A failure of
    /// the runner itself is folded into status 1 with the error as output.
    pub fn logged_command_status_output(
        &mut self,
        line: &str,
        timeout: Option<Duration>,
    ) -> CommandOutput {
        let result = self.runner().run(line, timeout);
        self.fold_exec_error(result)
    }

    pub fn logged_command_output(&mut self, line: &str, timeout: Option<Duration>) -> String {
        self.logged_command_status_output(line, timeout).output
    }

    pub fn compiled_program_status_output(&mut self, options: &CompileOptions) -> CommandOutput {
        let result = compile::compiled_program_status_output(&mut self.runner(), options);
        self.fold_exec_error(result)
    }

    pub fn compiled_program_output(&mut self, options: &CompileOptions) -> String {
        self.compiled_program_status_output(options).output
    }

    fn fold_exec_error(&mut self, result: Result<CommandOutput, ExecError>) -> CommandOutput {
        result.unwrap_or_else(|err| {
            let output = err.to_string();
            self.model.log(LogCategory::Error, output.as_str());
            CommandOutput {
                status: 1,
                output,
                timed_out: false,
            }
        })
    }

    /// A job submitter logging into this report. Declares the grid
    /// dependencies.
    pub fn job_submitter(&mut self, config: SubmitterConfig) -> JobSubmitter<'_> {
        self.add_dependencies(job::DEPENDENCIES);
        JobSubmitter::new(self.runner(), config)
    }

    /// Registers paths to delete, recursively, when the reporter goes away.
    pub fn temp_file<I, P>(&mut self, paths: I)
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        self.temp_paths
            .extend(paths.into_iter().map(|path| path.as_ref().to_path_buf()));
    }

    fn remove_temp_paths(&mut self) {
        for path in self.temp_paths.drain(..) {
            let removed = if path.is_dir() {
                std::fs::remove_dir_all(&path)
            } else {
                std::fs::remove_file(&path)
            };
            if let Err(err) = removed {
                tracing::debug!(path = %path.display(), error = %err, "temp path not removed");
            }
        }
    }
}

impl Drop for Reporter {
    fn drop(&mut self) {
        self.remove_temp_paths();
    }
}
