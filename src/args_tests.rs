use super::*;
use crate::report::log::LogCategory;

fn contract_with_defaults() -> ArgumentContract {
    let mut contract = ArgumentContract::new();
    contract
        .register(ArgumentSpec::new("hasdef").description("has default").default_value("def"))
        .expect("register hasdef");
    contract
        .register(
            ArgumentSpec::new("hasdef2")
                .description("also has default")
                .default_value("def2"),
        )
        .expect("register hasdef2");
    contract
}

#[test]
fn empty_argv_yields_defaults() {
    let mut contract = contract_with_defaults();
    let outcome = contract
        .parse_with_query(Vec::<String>::new(), None)
        .expect("parse");
    assert_eq!(outcome, ArgvOutcome::Run);
    assert_eq!(contract.value("hasdef"), Some("def"));
    assert_eq!(contract.value("hasdef2"), Some("def2"));
    assert_eq!(contract.value(HELP), Some("no"));
    assert_eq!(contract.value(VERSION), Some("no"));
    assert_eq!(contract.value(VERBOSE), Some("1"));
}

#[test]
fn repeated_arguments_keep_every_occurrence() {
    let mut contract = contract_with_defaults();
    contract
        .register(ArgumentSpec::new("nodef").description("no default"))
        .expect("register nodef");
    let argv = [
        "nodef=1", "hasdef=2", "hasdef=3", "nodef=4", "hasdef=5", "verbose=1",
    ];
    contract.parse_with_query(argv, None).expect("parse");

    assert_eq!(contract.value("hasdef"), Some("5"));
    assert_eq!(contract.value("nodef"), Some("4"));
    assert_eq!(contract.nth_value("hasdef", 1), Some("2"));
    assert_eq!(contract.nth_value("hasdef", 2), Some("3"));
    assert_eq!(contract.nth_value("hasdef", 3), Some("5"));
    assert_eq!(contract.nth_value("hasdef", 4), Some("def"));
    assert_eq!(contract.nth_value("hasdef", 5), Some("def"));
    assert_eq!(contract.nth_value("hasdef2", 1), Some("def2"));
    assert_eq!(contract.nth_value("nodef", 1), Some("1"));
    assert_eq!(contract.nth_value("nodef", 2), Some("4"));
    assert_eq!(contract.nth_value("nodef", 3), None);

    assert_eq!(contract.values("hasdef"), Some(vec!["2", "3", "5"]));
    assert_eq!(contract.values("hasdef2"), Some(vec!["def2"]));
    assert_eq!(contract.values("nodef"), Some(vec!["1", "4"]));
}

#[test]
fn unregistered_names_have_no_value() {
    let contract = contract_with_defaults();
    assert_eq!(contract.value("bogus"), None);
    assert_eq!(contract.nth_value("bogus", 1), None);
    assert_eq!(contract.values("bogus"), None);
}

#[test]
fn missing_required_argument_is_named() {
    let mut contract = ArgumentContract::new();
    contract
        .register(ArgumentSpec::new("nodef"))
        .expect("register nodef");
    let err = contract
        .parse_with_query(Vec::<String>::new(), None)
        .expect_err("nodef has no value");
    assert!(matches!(&err, ArgumentError::Missing(names) if names == &["nodef"]));
    assert_eq!(err.to_string(), "Missing required argument 'nodef'");
}

#[test]
fn several_missing_arguments_are_reported_together() {
    let mut contract = ArgumentContract::new();
    contract.register(ArgumentSpec::new("beta")).expect("beta");
    contract.register(ArgumentSpec::new("alpha")).expect("alpha");
    let err = contract
        .parse_with_query(Vec::<String>::new(), None)
        .expect_err("both missing");
    assert_eq!(
        err.to_string(),
        "Missing required arguments 'alpha', 'beta'"
    );
}

#[test]
fn unknown_argument_fails_but_keeps_all_tokens() {
    let mut contract = contract_with_defaults();
    let err = contract
        .parse_with_query(["-bogus=1", "-hasdef=7"], None)
        .expect_err("bogus is unknown");
    assert_eq!(err.to_string(), "unknown argument 'bogus'");
    let names: Vec<&str> = contract.parsed().iter().map(|a| a.name.as_str()).collect();
    assert_eq!(names, ["bogus", "hasdef"]);
    assert_eq!(contract.value("hasdef"), Some("7"));
}

#[test]
fn pattern_mismatch_is_reported_and_value_is_retained() {
    let mut contract = ArgumentContract::new();
    contract
        .register(ArgumentSpec::new("count").default_value("1").pattern(r"\d+"))
        .expect("register count");
    let err = contract
        .parse_with_query(["-count=many", "-verbose=1"], None)
        .expect_err("count must be numeric");
    assert_eq!(err.to_string(), "'many' is not a valid value for -count");
    assert_eq!(contract.value("count"), Some("many"));
}

#[test]
fn reregistration_replaces_the_prior_spec() {
    let mut contract = ArgumentContract::new();
    contract
        .register(ArgumentSpec::new("mode").default_value("a"))
        .expect("first");
    contract
        .register(ArgumentSpec::new("mode").default_value("b"))
        .expect("second");
    contract
        .parse_with_query(Vec::<String>::new(), None)
        .expect("parse");
    assert_eq!(contract.value("mode"), Some("b"));
    assert_eq!(contract.specs().filter(|s| s.name == "mode").count(), 1);
}

#[test]
fn invalid_pattern_is_rejected_at_registration() {
    let mut contract = ArgumentContract::new();
    let err = contract
        .register(ArgumentSpec::new("broken").pattern("(unclosed"))
        .expect_err("pattern does not compile");
    assert!(matches!(err, ArgumentError::InvalidPattern { name, .. } if name == "broken"));
}

#[test]
fn single_token_is_split_as_query_string() {
    let mut contract = contract_with_defaults();
    contract
        .parse_with_query(["-hasdef=x&hasdef2=y&verbose=2"], None)
        .expect("parse");
    assert_eq!(contract.value("hasdef"), Some("x"));
    assert_eq!(contract.value("hasdef2"), Some("y"));
    assert_eq!(contract.value(VERBOSE), Some("2"));
}

#[test]
fn empty_argv_reads_external_query_string() {
    let mut contract = contract_with_defaults();
    contract
        .parse_with_query(Vec::<String>::new(), Some("hasdef=q&verbose=0"))
        .expect("parse");
    assert_eq!(contract.value("hasdef"), Some("q"));
    assert_eq!(contract.value(VERBOSE), Some("0"));
}

#[test]
fn bare_name_means_yes_and_dashes_are_stripped() {
    let mut contract = ArgumentContract::new();
    contract
        .register(ArgumentSpec::new("flag").default_value("no"))
        .expect("register flag");
    contract
        .parse_with_query(["--flag", "-verbose=0"], None)
        .expect("parse");
    assert_eq!(contract.value("flag"), Some("yes"));
    assert_eq!(contract.value(VERBOSE), Some("0"));
}

#[test]
fn values_keep_embedded_equals_signs() {
    let mut contract = ArgumentContract::new();
    contract
        .register(ArgumentSpec::new("env").default_value(""))
        .expect("register env");
    contract
        .parse_with_query(["-env=A=1", "-verbose=1"], None)
        .expect("parse");
    assert_eq!(contract.value("env"), Some("A=1"));
}

#[test]
fn help_is_checked_before_missing_arguments() {
    let mut contract = ArgumentContract::new();
    contract
        .register(ArgumentSpec::new("nodef"))
        .expect("register nodef");
    let outcome = contract
        .parse_with_query(["-help", "-verbose=0"], None)
        .expect("help short-circuits validation");
    assert_eq!(outcome, ArgvOutcome::Help);
}

#[test]
fn help_wins_over_version() {
    let mut contract = ArgumentContract::new();
    let outcome = contract
        .parse_with_query(["-version=yes", "-help=yes"], None)
        .expect("parse");
    assert_eq!(outcome, ArgvOutcome::Help);
}

#[test]
fn version_is_checked_before_missing_arguments() {
    let mut contract = ArgumentContract::new();
    contract
        .register(ArgumentSpec::new("nodef"))
        .expect("register nodef");
    let outcome = contract
        .parse_with_query(["-version=yes", "-verbose=1"], None)
        .expect("version short-circuits validation");
    assert_eq!(outcome, ArgvOutcome::Version);
}

#[test]
fn log_filter_is_compiled_from_every_log_value() {
    let mut contract = ArgumentContract::new();
    contract
        .parse_with_query(["-log=1", "-log=debug"], None)
        .expect("parse");
    let filter = contract.log_filter();
    assert!(filter.admits(LogCategory::Error));
    assert!(filter.admits(LogCategory::Debug));
    assert!(!filter.admits(LogCategory::Warn));
}

#[test]
fn each_parse_replaces_the_previous_sequence() {
    let mut contract = contract_with_defaults();
    contract
        .parse_with_query(["-hasdef=1", "-hasdef=2"], None)
        .expect("first parse");
    contract
        .parse_with_query(["-hasdef2=3", "-verbose=1"], None)
        .expect("second parse");
    assert_eq!(contract.values("hasdef"), Some(vec!["def"]));
    assert_eq!(contract.parsed().len(), 2);
}
