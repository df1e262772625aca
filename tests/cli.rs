//! End-to-end runs of the `grid-unit-date` probe binary.
//!
//! Every outcome, including bad arguments, ends with exit status 0 and a
//! report (or terse line) on stdout.

mod common;

use common::ProbeFixture;

#[test]
fn terse_help_lists_every_argument() {
    let run = ProbeFixture::new().run(&["-help", "-verbose=0"]);
    assert_eq!(run.status, Some(0));
    assert!(run.stdout.starts_with(
        "NAME:\n  grid-unit-date\nVERSION:\n  3\nURL:\n  http://www.globus.org\nSYNOPSIS:\n  \
         grid-unit-date -count= -help=no -host= -log=0 -service= -timeout=60 -verbose=1 -version=no\n"
    ));
    assert!(run
        .stdout
        .contains(" -timeout\n\tkill the job after this many minutes\n"));
}

#[test]
fn xml_help_is_a_report_with_dependencies() {
    let run = ProbeFixture::new().run(&["-help=yes", "-verbose=1"]);
    assert_eq!(run.status, Some(0));
    assert!(run.stdout.starts_with("<?xml version='1.0'?>\n<rep:report xmlns:rep="));
    assert!(run.stdout.contains("  <help>\n    <ID>help</ID>\n    <name>grid-unit-date</name>\n"));
    for dependency in [
        "inca.Reporter",
        "inca.SimpleUnitReporter",
        "inca.GlobusUnitReporter",
        "inca.GridProxyReporter",
    ] {
        assert!(
            run.stdout.contains(&format!("<ID>{dependency}</ID>")),
            "missing {dependency}"
        );
    }
    assert!(run.stdout.ends_with("</rep:report>\n\n"));
}

#[test]
fn version_prints_name_and_version() {
    let run = ProbeFixture::new().run(&["-version"]);
    assert_eq!(run.status, Some(0));
    assert_eq!(run.stdout, "grid-unit-date 3\n\n");
}

#[test]
fn query_string_is_read_without_arguments() {
    let run = ProbeFixture::new().run_with_env(&[], &[("QUERY_STRING", "version=yes&verbose=1")]);
    assert_eq!(run.stdout, "grid-unit-date 3\n\n");
}

#[test]
fn unknown_argument_yields_a_failed_report() {
    let run = ProbeFixture::new().run(&["-bogus=1", "-verbose=1"]);
    assert_eq!(run.status, Some(0));
    assert!(run.stdout.contains(
        "  <exitStatus>\n    <completed>false</completed>\n    <errorMessage>unknown argument 'bogus'</errorMessage>\n  </exitStatus>\n"
    ));
    assert!(!run.stdout.contains("<name>bogus</name>"));
}

#[test]
fn invalid_value_is_reported_tersely() {
    let run = ProbeFixture::new().run(&["-timeout=soon", "-verbose=0"]);
    assert_eq!(run.status, Some(0));
    assert_eq!(
        run.stdout,
        "failed: 'soon' is not a valid value for -timeout\n\n"
    );
}

#[test]
fn missing_grid_toolkit_fails_the_unit() {
    let run = ProbeFixture::new().run(&["-verbose=0", "-timeout=1"]);
    assert_eq!(run.status, Some(0));
    assert_eq!(
        run.stdout,
        "failed: test failed: globus-job-submit not found on PATH\n\n"
    );
}

#[test]
fn failed_unit_report_has_no_body() {
    let run = ProbeFixture::new().run(&["-verbose=1", "-log=5", "-host=gk.example.org"]);
    assert_eq!(run.status, Some(0));
    assert!(run.stdout.contains("  <body></body>\n"));
    assert!(run.stdout.contains(
        "    <arg>\n      <name>host</name>\n      <value>gk.example.org</value>\n    </arg>\n"
    ));
    assert!(run
        .stdout
        .contains("<errorMessage>test failed: globus-job-submit not found on PATH</errorMessage>"));
}

#[test]
fn terse_run_mirrors_log_entries_to_stderr() {
    let fixture = ProbeFixture::new();
    fixture.link_command("globus-job-submit", "false");
    let run = fixture.run(&["-verbose=0", "-log=5", "-timeout=1"]);
    assert_eq!(run.status, Some(0));
    assert!(run
        .stdout
        .starts_with("failed: test failed: call to 'globus-job-submit -stderr -s "));
    assert!(
        run.stderr.contains("system: globus-job-submit -stderr -s "),
        "stderr was: {}",
        run.stderr
    );
}

#[test]
fn verbose_run_keeps_log_out_of_stderr() {
    let fixture = ProbeFixture::new();
    fixture.link_command("globus-job-submit", "false");
    let run = fixture.run(&["-verbose=1", "-log=5", "-timeout=1"]);
    assert!(!run.stderr.contains("system: "));
    assert!(run.stdout.contains("  <log>\n    <system>\n"));
}
