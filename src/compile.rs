//! Compile a small program locally and run it, in one shell command.

use crate::error::ExecError;
use crate::exec::{CommandOutput, ProcessRunner, ShellCommand};
use regex::Regex;
use std::sync::LazyLock;
use std::time::Duration;

static JAVA_CLASS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"class\s+\w+").expect("regex for java class declaration"));
static LIBRARY_DIR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"-L\s*(\S+)").expect("regex for library directory switch"));

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Language {
    #[default]
    C,
    CPlusPlus,
    Fortran,
    Java,
}

impl Language {
    pub fn extension(self) -> &'static str {
        match self {
            Language::C => "c",
            Language::CPlusPlus => "C",
            Language::Fortran => "f",
            Language::Java => "java",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileOptions {
    pub code: String,
    pub compiler: String,
    pub language: Language,
    /// Switch naming the compiler's output file, including any separator.
    pub out_switch: String,
    pub switches: String,
    pub timeout: Option<Duration>,
}

impl CompileOptions {
    pub fn new(code: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            compiler: "cc".to_string(),
            language: Language::C,
            out_switch: "-o ".to_string(),
            switches: String::new(),
            timeout: None,
        }
    }
}

/// Writes the source into a private scratch directory, compiles and runs it
/// there, and removes the directory afterwards. A compile failure shows up
/// as a non-zero status with the compiler's output.
pub fn compiled_program_status_output(
    runner: &mut ProcessRunner<'_>,
    options: &CompileOptions,
) -> Result<CommandOutput, ExecError> {
    let dir = tempfile::Builder::new()
        .prefix("inca-compile.")
        .tempdir()
        .map_err(|source| ExecError::Prepare {
            path: std::env::temp_dir(),
            source,
        })?;
    let prefix = format!("src{}", std::process::id());
    let source_path = dir
        .path()
        .join(format!("{prefix}.{}", options.language.extension()));

    let (line, code) = if options.language == Language::Java {
        let renamed = JAVA_CLASS.replace_all(&options.code, format!("class {prefix}").as_str());
        let line = format!(
            "({} {} {} && java {prefix})",
            options.compiler,
            source_path.display(),
            options.switches
        );
        (line, renamed.into_owned())
    } else {
        let line = format!(
            "({} {} {}{prefix} {} && ./{prefix})",
            options.compiler,
            source_path.display(),
            options.out_switch,
            options.switches
        );
        (line, options.code.clone())
    };
    let mut command = ShellCommand::new(line)
        .in_dir(dir.path())
        .timeout(options.timeout);
    if options.language == Language::Java {
        let classpath = match std::env::var("CLASSPATH") {
            Ok(existing) if !existing.is_empty() => format!("{existing}:."),
            _ => ".".to_string(),
        };
        command = command.env("CLASSPATH", classpath);
    }
    std::fs::write(&source_path, format!("{code}\n")).map_err(|source| ExecError::Prepare {
        path: source_path.clone(),
        source,
    })?;

    if let Some(library_path) = library_path(&options.switches) {
        command = command.env("LD_LIBRARY_PATH", library_path);
    }
    runner.run_command(&command)
}

/// `-L` directories from `switches`, ahead of any inherited search path.
fn library_path(switches: &str) -> Option<String> {
    let mut dirs: Vec<String> = LIBRARY_DIR
        .captures_iter(switches)
        .map(|caps| caps[1].to_string())
        .collect();
    if dirs.is_empty() {
        return None;
    }
    if let Ok(inherited) = std::env::var("LD_LIBRARY_PATH") {
        if !inherited.is_empty() {
            dirs.push(inherited);
        }
    }
    Some(dirs.join(":"))
}
