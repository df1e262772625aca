use super::{JobOptions, JobOutput, JobSubmitter};
use crate::error::JobError;
use crate::exec::ShellCommand;
use std::path::Path;

const SOURCE_FILE: &str = "gh.c";
const PROGRAM: &str = "gh";

/// How a C source unit is built before it is staged as a job.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CSourceOptions {
    /// Toolkit flavor handed to the makefile-header command.
    pub flavor: Option<String>,
    /// Compile and link with `mpicc` instead of the toolkit's compiler.
    pub mpi: bool,
}

impl JobSubmitter<'_> {
    /// Builds `code` against the grid toolkit headers in a scratch directory
    /// and submits the resulting program as a staged (non-remote) job.
    pub fn submit_c_source(
        &mut self,
        code: &str,
        options: &JobOptions,
        source: &CSourceOptions,
    ) -> Result<JobOutput, JobError> {
        let dir = tempfile::Builder::new()
            .prefix("inca-job.")
            .tempdir()
            .map_err(|err| JobError::Io {
                path: std::env::temp_dir(),
                source: err,
            })?;
        let result = self.build_and_submit(dir.path(), code, options, source);
        if !options.cleanup {
            let kept = dir.keep();
            tracing::debug!(dir = %kept.display(), "build directory kept");
        }
        result
    }

    fn build_and_submit(
        &mut self,
        dir: &Path,
        code: &str,
        options: &JobOptions,
        source: &CSourceOptions,
    ) -> Result<JobOutput, JobError> {
        let mut header_command = self.config.makefile_header_command.clone();
        if let Some(flavor) = &source.flavor {
            header_command.push_str(&format!(" --flavor={}", shell_words::quote(flavor)));
        }
        let header = self
            .runner
            .run_command(&ShellCommand::new(header_command).in_dir(dir))?;
        if !header.success() {
            return Err(JobError::Compile(format!(
                "globus-makefile-header failed: {}",
                header.output
            )));
        }

        let (cc, ld) = if source.mpi {
            ("mpicc", "mpicc")
        } else {
            ("$(GLOBUS_CC)", "$(GLOBUS_LD)")
        };
        let makefile = format!(
            "{}\n\nall:\n\t{cc} $(GLOBUS_CFLAGS) $(GLOBUS_INCLUDES) -c {SOURCE_FILE}\n\t{ld} -o {PROGRAM} {PROGRAM}.o $(GLOBUS_LDFLAGS) $(GLOBUS_PKG_LIBS) $(GLOBUS_LIBS)\n",
            header.output
        );
        write_file(&dir.join("Makefile"), &makefile)?;
        write_file(&dir.join(SOURCE_FILE), code)?;

        let make = self
            .runner
            .run_command(&ShellCommand::new("make").in_dir(dir))?;
        if !make.success() {
            return Err(JobError::Compile(format!("make failed: {}", make.output)));
        }

        let mut staged = options.clone();
        staged.remote = false;
        if let Ok(location) = std::env::var("GLOBUS_LOCATION") {
            staged.env.push(format!("LD_LIBRARY_PATH={location}/lib"));
        }
        let program = dir.join(PROGRAM);
        self.submit(&program.to_string_lossy(), &staged)
    }
}

fn write_file(path: &Path, contents: &str) -> Result<(), JobError> {
    std::fs::write(path, contents).map_err(|source| JobError::Io {
        path: path.to_path_buf(),
        source,
    })
}
