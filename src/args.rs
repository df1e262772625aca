//! The reporter's command-line contract.
//!
//! Arguments arrive as `-name=value` tokens, a bare `name` (meaning
//! `name=yes`), a single `&`-joined query string, or, with no arguments at
//! all, the `QUERY_STRING` environment variable. Every registered argument
//! carries an optional default and a validation pattern; an argument without
//! a default is required.

use crate::error::ArgumentError;
use crate::report::log::LogFilter;
use regex::Regex;
use std::collections::BTreeMap;

pub const HELP: &str = "help";
pub const LOG: &str = "log";
pub const VERBOSE: &str = "verbose";
pub const VERSION: &str = "version";

pub const ANY_VALUE: &str = ".*";
pub const QUERY_STRING_ENV: &str = "QUERY_STRING";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArgumentSpec {
    pub name: String,
    pub description: Option<String>,
    pub default: Option<String>,
    /// Searched for (not anchored) in every supplied value.
    pub pattern: String,
}

impl ArgumentSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            default: None,
            pattern: ANY_VALUE.to_string(),
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn default_value(mut self, default: impl Into<String>) -> Self {
        self.default = Some(default.into());
        self
    }

    pub fn pattern(mut self, pattern: impl Into<String>) -> Self {
        self.pattern = pattern.into();
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedArgument {
    pub name: String,
    pub value: String,
}

/// What the caller should do after a successful parse.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgvOutcome {
    Run,
    Help,
    Version,
}

#[derive(Debug)]
struct Registered {
    spec: ArgumentSpec,
    matcher: Regex,
}

#[derive(Debug)]
pub struct ArgumentContract {
    specs: BTreeMap<String, Registered>,
    parsed: Vec<ParsedArgument>,
    log_filter: LogFilter,
}

impl Default for ArgumentContract {
    fn default() -> Self {
        Self::new()
    }
}

impl ArgumentContract {
    /// A contract holding only the reserved `help`, `log`, `verbose` and
    /// `version` arguments.
    pub fn new() -> Self {
        let mut contract = Self {
            specs: BTreeMap::new(),
            parsed: Vec::new(),
            log_filter: LogFilter::none(),
        };
        contract.register_builtin(
            ArgumentSpec::new(HELP)
                .description("display usage information (no|yes)")
                .default_value("no")
                .pattern("no|yes"),
        );
        contract.register_builtin(
            ArgumentSpec::new(LOG)
                .description("log message types included in report")
                .default_value("0")
                .pattern("[012345]|debug|error|info|system|warn"),
        );
        contract.register_builtin(
            ArgumentSpec::new(VERBOSE)
                .description("verbosity level (0|1|2)")
                .default_value("1")
                .pattern("[012]"),
        );
        contract.register_builtin(
            ArgumentSpec::new(VERSION)
                .description("show reporter version (no|yes)")
                .default_value("no")
                .pattern("no|yes"),
        );
        contract
    }

    fn register_builtin(&mut self, spec: ArgumentSpec) {
        let matcher = Regex::new(&spec.pattern).expect("regex for built-in argument");
        self.specs
            .insert(spec.name.clone(), Registered { spec, matcher });
    }

    /// Adds `spec`, replacing any earlier registration under the same name.
    pub fn register(&mut self, spec: ArgumentSpec) -> Result<(), ArgumentError> {
        let matcher = Regex::new(&spec.pattern).map_err(|source| ArgumentError::InvalidPattern {
            name: spec.name.clone(),
            source,
        })?;
        self.specs
            .insert(spec.name.clone(), Registered { spec, matcher });
        Ok(())
    }

    /// Parses `argv`, falling back to `QUERY_STRING` when `argv` is empty.
    pub fn parse<I, S>(&mut self, argv: I) -> Result<ArgvOutcome, ArgumentError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let query = std::env::var(QUERY_STRING_ENV).ok();
        self.parse_with_query(argv, query.as_deref())
    }

    /// Decodes every token before acting on any problem, so the parsed
    /// sequence is complete even when the result is an error.
    pub fn parse_with_query<I, S>(
        &mut self,
        argv: I,
        query: Option<&str>,
    ) -> Result<ArgvOutcome, ArgumentError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let argv: Vec<String> = argv.into_iter().map(Into::into).collect();
        let tokens: Vec<String> = match (argv.as_slice(), query) {
            ([single], _) => split_query(single),
            ([], Some(query)) => split_query(query),
            _ => argv,
        };

        let mut bad = None;
        let mut parsed = Vec::with_capacity(tokens.len());
        for token in &tokens {
            let (raw_name, value) = token.split_once('=').unwrap_or((token.as_str(), "yes"));
            let name = raw_name
                .strip_prefix("--")
                .or_else(|| raw_name.strip_prefix('-'))
                .unwrap_or(raw_name);
            match self.specs.get(name) {
                None => bad = Some(ArgumentError::UnknownArgument(name.to_string())),
                Some(registered) if !registered.matcher.is_match(value) => {
                    bad = Some(ArgumentError::InvalidValue {
                        name: name.to_string(),
                        value: value.to_string(),
                    })
                }
                Some(_) => {}
            }
            parsed.push(ParsedArgument {
                name: name.to_string(),
                value: value.to_string(),
            });
        }
        self.parsed = parsed;
        if let Some(err) = bad {
            return Err(err);
        }

        if self.value(HELP) != Some("no") {
            return Ok(ArgvOutcome::Help);
        }
        if self.value(VERSION) != Some("no") {
            return Ok(ArgvOutcome::Version);
        }

        let missing: Vec<String> = self
            .specs
            .keys()
            .filter(|name| self.value(name).is_none())
            .cloned()
            .collect();
        if !missing.is_empty() {
            return Err(ArgumentError::Missing(missing));
        }

        let log_filter = LogFilter::from_values(self.values(LOG).unwrap_or_default());
        self.log_filter = log_filter;
        Ok(ArgvOutcome::Run)
    }

    /// The last supplied value for `name`, else its default.
    pub fn value(&self, name: &str) -> Option<&str> {
        let registered = self.lookup(name)?;
        self.matches(name)
            .into_iter()
            .last()
            .or(registered.spec.default.as_deref())
    }

    /// The `occurrence`-th (1-based) supplied value for `name`, else its
    /// default. An occurrence of 0 is treated as 1.
    pub fn nth_value(&self, name: &str, occurrence: usize) -> Option<&str> {
        let registered = self.lookup(name)?;
        self.matches(name)
            .into_iter()
            .nth(occurrence.max(1) - 1)
            .or(registered.spec.default.as_deref())
    }

    /// Every supplied value for `name` in command-line order; the default
    /// alone when none was supplied. `None` for an unregistered name.
    pub fn values(&self, name: &str) -> Option<Vec<&str>> {
        let registered = self.lookup(name)?;
        let mut found = self.matches(name);
        if found.is_empty() {
            found.extend(registered.spec.default.as_deref());
        }
        Some(found)
    }

    /// Registered specs in name order.
    pub fn specs(&self) -> impl Iterator<Item = &ArgumentSpec> {
        self.specs.values().map(|registered| &registered.spec)
    }

    pub fn parsed(&self) -> &[ParsedArgument] {
        &self.parsed
    }

    /// The report log filter compiled by the last successful parse.
    pub fn log_filter(&self) -> &LogFilter {
        &self.log_filter
    }

    fn lookup(&self, name: &str) -> Option<&Registered> {
        let found = self.specs.get(name);
        if found.is_none() {
            tracing::error!(argument = name, "not a valid command line argument name");
        }
        found
    }

    fn matches(&self, name: &str) -> Vec<&str> {
        self.parsed
            .iter()
            .filter(|arg| arg.name == name)
            .map(|arg| arg.value.as_str())
            .collect()
    }
}

fn split_query(query: &str) -> Vec<String> {
    query
        .split('&')
        .filter(|token| !token.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
#[path = "args_tests.rs"]
mod tests;
