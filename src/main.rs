//! `grid-unit-date`: checks that a `/bin/date` job runs through a gatekeeper.
//!
//! Submissions may queue behind a batch system, so the job gets a generous
//! timeout (minutes) before the probe gives up on it.

use anyhow::Result;
use inca_reporter::{ArgumentSpec, JobOptions, Reporter, ReporterInfo, SubmitterConfig, UnitTest};
use regex::Regex;
use std::sync::LazyLock;
use std::time::Duration;

static VALID_DATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\w{3} \w{3} (\s|\d)\d \d{2}:\d{2}:\d{2}.* \w{3} \d{4}")
        .expect("regex for date output")
});

fn main() -> Result<()> {
    inca_reporter::init_logging()?;

    let info = ReporterInfo::new("grid-unit-date")
        .with_version("3")
        .with_description(
            "Verifies the submission of a /bin/date job through the specified local gatekeeper service",
        )
        .with_url("http://www.globus.org");
    let mut reporter = Reporter::new(info);
    reporter.set_unit(UnitTest::new("globus date"));
    reporter.add_dependencies(inca_reporter::job::DEPENDENCIES);
    reporter.add_arg(
        ArgumentSpec::new("count")
            .description("host_count parameter of rsl")
            .default_value("")
            .pattern(r"\d+"),
    )?;
    reporter.add_arg(
        ArgumentSpec::new("host")
            .description("hostname where gatekeeper is running")
            .default_value(""),
    )?;
    reporter.add_arg(
        ArgumentSpec::new("service")
            .description("the name of the jobmanager")
            .default_value(""),
    )?;
    reporter.add_arg(
        ArgumentSpec::new("timeout")
            .description("kill the job after this many minutes")
            .default_value("60")
            .pattern(r"\d+"),
    )?;
    reporter.process_argv(std::env::args().skip(1));

    let options = match job_options(&reporter) {
        Ok(options) => options,
        Err(message) => reporter.fail_print_and_exit(message),
    };
    let result = reporter
        .job_submitter(SubmitterConfig::default())
        .submit("/bin/date", &options);
    match result {
        Err(err) => reporter.unit_failure(format!("test failed: {err}")),
        Ok(job) if job.output.trim().is_empty() => {
            let mut message = "test failed".to_string();
            if !job.error.trim().is_empty() {
                message.push_str(": ");
                message.push_str(job.error.trim_end());
            }
            reporter.unit_failure(message);
        }
        Ok(job) if !looks_like_date(&job.output) => reporter.unit_failure(format!(
            "job completed but result is suspect: {}",
            job.output
        )),
        Ok(_) => reporter.unit_success(),
    }
    reporter.print_report(None);
    Ok(())
}

fn job_options(reporter: &Reporter) -> Result<JobOptions, String> {
    let non_empty = |name: &str| {
        reporter
            .arg_value(name)
            .filter(|value| !value.is_empty())
            .map(str::to_string)
    };
    let mut options = JobOptions {
        host: non_empty("host"),
        service: non_empty("service"),
        ..JobOptions::default()
    };
    if let Some(count) = non_empty("count") {
        options.count = count
            .parse()
            .map_err(|_| format!("'{count}' is not a valid host count"))?;
    }
    let minutes = reporter.arg_value("timeout").unwrap_or("60");
    let minutes: u64 = minutes
        .parse()
        .map_err(|_| format!("'{minutes}' is not a valid number of minutes"))?;
    options.timeout = Duration::from_secs(minutes.saturating_mul(60));
    Ok(options)
}

fn looks_like_date(text: &str) -> bool {
    VALID_DATE.is_match(text)
}
