use chrono::{DateTime, Utc};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// Category of a report log entry. The declaration order is the order used
/// by numeric `-log` levels: level N includes the first N categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LogCategory {
    Error,
    Warn,
    System,
    Info,
    Debug,
}

impl LogCategory {
    pub const ALL: [LogCategory; 5] = [
        LogCategory::Error,
        LogCategory::Warn,
        LogCategory::System,
        LogCategory::Info,
        LogCategory::Debug,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            LogCategory::Error => "error",
            LogCategory::Warn => "warn",
            LogCategory::System => "system",
            LogCategory::Info => "info",
            LogCategory::Debug => "debug",
        }
    }
}

impl fmt::Display for LogCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LogCategory {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        LogCategory::ALL
            .into_iter()
            .find(|category| category.as_str() == value)
            .ok_or_else(|| format!("unknown log category '{value}'"))
    }
}

/// Set of categories admitted into the report, compiled from the values of
/// the `log` argument.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogFilter {
    included: BTreeSet<LogCategory>,
}

impl LogFilter {
    /// A filter that admits nothing; the state before arguments are parsed.
    pub fn none() -> Self {
        Self::default()
    }

    /// Digits `0`-`5` select the first N categories; a category name selects
    /// exactly that category. Anything else selects nothing.
    pub fn from_values<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut included = BTreeSet::new();
        for value in values {
            let value = value.as_ref();
            match value.parse::<usize>() {
                Ok(level) if value.len() == 1 && level <= LogCategory::ALL.len() => {
                    included.extend(LogCategory::ALL.iter().take(level).copied());
                }
                _ => {
                    if let Ok(category) = value.parse::<LogCategory>() {
                        included.insert(category);
                    }
                }
            }
        }
        Self { included }
    }

    pub fn admits(&self, category: LogCategory) -> bool {
        self.included.contains(&category)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    pub category: LogCategory,
    pub gmt: DateTime<Utc>,
    pub message: String,
}

/// Append-only log rendered into the report `<log>` element.
#[derive(Debug, Default)]
pub struct ReportLog {
    entries: Vec<LogEntry>,
    filter: LogFilter,
    mirror_to_stderr: bool,
}

impl ReportLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_filter(&mut self, filter: LogFilter) {
        self.filter = filter;
    }

    /// With terse (verbose=0) output the log never reaches the report, so
    /// entries are also echoed to stderr as they arrive.
    pub fn set_mirror_to_stderr(&mut self, mirror: bool) {
        self.mirror_to_stderr = mirror;
    }

    pub fn mirrors_to_stderr(&self) -> bool {
        self.mirror_to_stderr
    }

    pub fn log(&mut self, category: LogCategory, message: impl Into<String>) {
        let message = message.into();
        tracing::debug!(%category, message = message.as_str(), "report log");
        if !self.filter.admits(category) {
            return;
        }
        if self.mirror_to_stderr {
            eprintln!("{category}: {message}");
        }
        self.entries.push(LogEntry {
            category,
            gmt: Utc::now(),
            message,
        });
    }

    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_levels_are_cumulative() {
        let filter = LogFilter::from_values(["3"]);
        assert!(filter.admits(LogCategory::Error));
        assert!(filter.admits(LogCategory::Warn));
        assert!(filter.admits(LogCategory::System));
        assert!(!filter.admits(LogCategory::Info));
        assert!(!filter.admits(LogCategory::Debug));

        let everything = LogFilter::from_values(["5"]);
        assert!(LogCategory::ALL.iter().all(|c| everything.admits(*c)));
    }

    #[test]
    fn level_zero_admits_nothing() {
        let filter = LogFilter::from_values(["0"]);
        assert!(LogCategory::ALL.iter().all(|c| !filter.admits(*c)));
    }

    #[test]
    fn symbolic_values_select_exactly_one_category() {
        let filter = LogFilter::from_values(["debug", "warn"]);
        assert!(filter.admits(LogCategory::Debug));
        assert!(filter.admits(LogCategory::Warn));
        assert!(!filter.admits(LogCategory::Error));
        assert!(!filter.admits(LogCategory::System));
    }

    #[test]
    fn filtered_entries_are_dropped_and_order_is_kept() {
        let mut log = ReportLog::new();
        log.log(LogCategory::Info, "before filter");
        assert!(log.is_empty());

        log.set_filter(LogFilter::from_values(["info", "system"]));
        log.log(LogCategory::Info, "first");
        log.log(LogCategory::Debug, "dropped");
        log.log(LogCategory::System, "second");

        let messages: Vec<&str> = log.entries().iter().map(|e| e.message.as_str()).collect();
        assert_eq!(messages, ["first", "second"]);
        assert_eq!(log.entries()[1].category, LogCategory::System);
    }
}
