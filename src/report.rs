//! The in-memory report and its two renderings: a terse `completed` /
//! `failed` line, or the namespaced report document.

pub mod header;
pub mod log;

use crate::args::{ArgumentContract, VERBOSE};
use crate::xml;
use chrono::Utc;
use header::ReportHeader;
use log::{LogCategory, ReportLog};
use regex::Regex;
use std::path::Path;
use std::sync::LazyLock;

pub const REPORT_NAMESPACE: &str = "http://inca.sdsc.edu/dataModel/report_2.1";
pub const CORE_DEPENDENCY: &str = "inca.Reporter";

static CVS_REVISION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Revision: (.*) ").expect("regex for CVS revision"));

/// The `-verbose` levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verbosity {
    /// `completed` or `failed`, with the failure message if any.
    Terse,
    Report,
    /// The report document with the help block appended.
    ReportWithHelp,
}

impl Verbosity {
    pub fn from_arg(value: Option<&str>) -> Self {
        match value {
            Some("0") => Verbosity::Terse,
            Some("2") => Verbosity::ReportWithHelp,
            _ => Verbosity::Report,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReporterInfo {
    pub name: String,
    pub version: String,
    pub description: Option<String>,
    pub url: Option<String>,
}

impl ReporterInfo {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: "0".to_string(),
            description: None,
            url: None,
        }
    }

    /// Named after the basename of the running executable.
    pub fn from_invocation() -> Self {
        let path = invocation_path();
        let name = Path::new(&path)
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or(path);
        Self::new(name)
    }

    pub fn with_version(mut self, version: &str) -> Self {
        self.set_version(version);
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    /// Accepts a plain version or a CVS `$Revision: 1.4 $` keyword.
    pub fn set_version(&mut self, version: &str) {
        self.version = match CVS_REVISION.captures(version) {
            Some(caps) => caps[1].to_string(),
            None => version.to_string(),
        };
    }
}

/// Produces the probe-specific `<body>` content. Called at most once, the
/// first time a completed report is rendered without a body.
pub trait BodyBuilder {
    fn build_body(&self) -> Option<String>;
}

impl<F> BodyBuilder for F
where
    F: Fn() -> Option<String>,
{
    fn build_body(&self) -> Option<String> {
        self()
    }
}

pub struct ReportModel {
    info: ReporterInfo,
    dependencies: Vec<String>,
    log: ReportLog,
    completed: bool,
    fail_message: Option<String>,
    body: Option<String>,
    body_builder: Option<Box<dyn BodyBuilder>>,
    body_built: bool,
    working_dir: String,
    invocation_path: String,
    header: Option<ReportHeader>,
}

impl ReportModel {
    pub fn new(info: ReporterInfo) -> Self {
        let working_dir = std::env::current_dir()
            .map(|dir| dir.display().to_string())
            .unwrap_or_default();
        Self {
            info,
            dependencies: vec![CORE_DEPENDENCY.to_string()],
            log: ReportLog::new(),
            completed: false,
            fail_message: None,
            body: None,
            body_builder: None,
            body_built: false,
            working_dir,
            invocation_path: invocation_path(),
            header: None,
        }
    }

    pub fn info(&self) -> &ReporterInfo {
        &self.info
    }

    pub fn info_mut(&mut self) -> &mut ReporterInfo {
        &mut self.info
    }

    /// Dependencies only surface in help output.
    pub fn add_dependency(&mut self, dependency: impl Into<String>) {
        let dependency = dependency.into();
        if !self.dependencies.contains(&dependency) {
            self.dependencies.push(dependency);
        }
    }

    pub fn dependencies(&self) -> &[String] {
        &self.dependencies
    }

    pub fn log(&mut self, category: LogCategory, message: impl Into<String>) {
        self.log.log(category, message);
    }

    pub fn report_log(&self) -> &ReportLog {
        &self.log
    }

    pub fn report_log_mut(&mut self) -> &mut ReportLog {
        &mut self.log
    }

    /// Last call wins.
    pub fn set_result(&mut self, completed: bool, fail_message: Option<String>) {
        self.completed = completed;
        self.fail_message = fail_message;
    }

    pub fn set_completed(&mut self, completed: bool) {
        self.completed = completed;
    }

    pub fn set_fail_message(&mut self, message: Option<String>) {
        self.fail_message = message;
    }

    pub fn completed(&self) -> bool {
        self.completed
    }

    pub fn fail_message(&self) -> Option<&str> {
        self.fail_message.as_deref()
    }

    pub fn set_body(&mut self, body: Option<String>) {
        self.body = body;
    }

    pub fn body(&self) -> Option<&str> {
        self.body.as_deref()
    }

    pub fn set_body_builder(&mut self, builder: impl BodyBuilder + 'static) {
        self.body_builder = Some(Box::new(builder));
        self.body_built = false;
    }

    pub fn working_dir(&self) -> &str {
        &self.working_dir
    }

    pub fn set_working_dir(&mut self, dir: impl Into<String>) {
        self.working_dir = dir.into();
    }

    /// Renders at `verbosity`, or at the contract's `-verbose` level when
    /// `None`.
    pub fn render(&mut self, contract: &ArgumentContract, verbosity: Option<Verbosity>) -> String {
        let verbosity =
            verbosity.unwrap_or_else(|| Verbosity::from_arg(contract.value(VERBOSE)));
        if verbosity == Verbosity::Terse {
            return self.terse();
        }

        if self.completed && self.body.is_none() && !self.body_built {
            self.body_built = true;
            self.body = self.body_builder.as_ref().and_then(|b| b.build_body());
        }
        let completed = xml::leaf("completed", if self.completed { "true" } else { "false" });
        let message = self
            .fail_message
            .as_deref()
            .map(|message| xml::leaf("errorMessage", message));
        let mut sections = vec![
            xml::element("body", self.body.as_deref()),
            xml::element("exitStatus", [Some(completed), message].into_iter().flatten()),
        ];
        if verbosity == Verbosity::ReportWithHelp {
            sections.push(self.help_xml(contract));
        }
        self.document(contract, sections)
    }

    fn terse(&self) -> String {
        let mut result = if self.completed { "completed" } else { "failed" }.to_string();
        if let Some(message) = &self.fail_message {
            result.push_str(": ");
            result.push_str(message);
        }
        result
    }

    /// A report document whose only section is the help block.
    pub fn help_document(&mut self, contract: &ArgumentContract) -> String {
        let help = self.help_xml(contract);
        self.document(contract, vec![help])
    }

    pub fn help_xml(&self, contract: &ArgumentContract) -> String {
        let mut children = vec![
            xml::leaf("ID", "help"),
            xml::leaf("name", &self.info.name),
            xml::leaf("version", &self.info.version),
            xml::leaf("description", self.info.description.as_deref().unwrap_or("")),
            xml::leaf("url", self.info.url.as_deref().unwrap_or("")),
        ];
        for spec in contract.specs() {
            let mut fields = vec![
                xml::leaf("ID", &spec.name),
                xml::leaf("accepted", &spec.pattern),
                xml::leaf("description", spec.description.as_deref().unwrap_or("")),
            ];
            fields.extend(spec.default.as_deref().map(|d| xml::leaf("default", d)));
            children.push(xml::element("argDescription", fields));
        }
        for dependency in &self.dependencies {
            children.push(xml::element("dependency", [xml::leaf("ID", dependency)]));
        }
        xml::element("help", children)
    }

    /// Plain-text usage for `-help` at verbosity 0.
    pub fn help_text(&self, contract: &ArgumentContract) -> String {
        let program = Path::new(&self.invocation_path)
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.invocation_path.clone());
        let mut usage = program;
        let mut text = String::new();
        for spec in contract.specs() {
            text.push_str(&format!(" -{}\n", spec.name));
            if let Some(description) = &spec.description {
                text.push_str(&format!("\t{description}\n"));
            }
            usage.push_str(&format!(" -{}", spec.name));
            if let Some(default) = &spec.default {
                usage.push_str(&format!("={default}"));
            }
        }
        format!(
            "NAME:\n  {}\nVERSION:\n  {}\nURL:\n  {}\nSYNOPSIS:\n  {}\n{}\n",
            self.info.name,
            self.info.version,
            self.info.url.as_deref().unwrap_or("No URL"),
            usage,
            text
        )
    }

    pub fn version_text(&self) -> String {
        format!("{} {}", self.info.name, self.info.version)
    }

    fn document(&mut self, contract: &ArgumentContract, sections: Vec<String>) -> String {
        let header = match &self.header {
            Some(header) => header.clone(),
            None => {
                let header = self.capture_header();
                self.header = Some(header.clone());
                header
            }
        };
        let mut tags = header.fragments();

        let mut args = Vec::new();
        for spec in contract.specs() {
            for value in contract.values(&spec.name).unwrap_or_default() {
                args.push(xml::element(
                    "arg",
                    [xml::leaf("name", &spec.name), xml::leaf("value", value)],
                ));
            }
        }
        tags.push(xml::element("args", args));

        if !self.log.is_empty() {
            let entries = self.log.entries().iter().map(|entry| {
                xml::element(
                    entry.category.as_str(),
                    [
                        xml::leaf("gmt", &header::iso8601(&entry.gmt)),
                        xml::leaf("message", &entry.message),
                    ],
                )
            });
            tags.push(xml::element("log", entries));
        }
        tags.extend(sections);

        let root = xml::element("rep:report", tags).replacen(
            "<rep:report",
            &format!("<rep:report xmlns:rep='{REPORT_NAMESPACE}'"),
            1,
        );
        format!("<?xml version='1.0'?>\n{root}")
    }

    fn capture_header(&self) -> ReportHeader {
        ReportHeader {
            gmt: Utc::now(),
            hostname: header::local_hostname(),
            name: self.info.name.clone(),
            version: self.info.version.clone(),
            working_dir: self.working_dir.clone(),
            reporter_path: self.invocation_path.clone(),
        }
    }
}

fn invocation_path() -> String {
    std::env::args().next().unwrap_or_default()
}

#[cfg(test)]
#[path = "report_tests.rs"]
mod tests;
