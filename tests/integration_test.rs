use assert_cmd::Command;
use predicates::prelude::*;

const POLICY: &str = "tests/fixtures/attribute-filter.xml";
const BROKEN: &str = "tests/fixtures/broken-policy.xml";
const LIBRARY: &str = "tests/fixtures/requests/library.json";
const REQUESTS: &str = "tests/fixtures/requests";

fn shibfilter() -> Command {
    #[allow(deprecated)]
    let mut cmd = Command::cargo_bin("shibfilter").unwrap();
    cmd.env_remove("RUST_LOG");
    cmd
}

// ── check ──

#[test]
fn check_valid_policy_exits_zero() {
    shibfilter()
        .args(["--no-color", "check", POLICY])
        .assert()
        .success()
        .stdout(predicate::str::contains("ExampleFederationPolicy"))
        .stdout(predicate::str::contains("releaseAffiliationToFederation"))
        .stdout(predicate::str::contains("Summary: 5 policies"));
}

#[test]
fn check_broken_policy_exits_two() {
    shibfilter()
        .args(["check", BROKEN])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("DoesNotExist"));
}

#[test]
fn check_missing_policy_exits_two() {
    shibfilter()
        .args(["check", "tests/fixtures/no-such-policy.xml"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("no-such-policy.xml"));
}

#[test]
fn check_json_outline() {
    let output = shibfilter().args(["--json", "check", POLICY]).output().unwrap();
    assert!(output.status.success());
    let parsed: serde_json::Value = serde_json::from_slice(&output.stdout).expect("valid JSON");
    assert_eq!(parsed["valid"], true);
    assert_eq!(parsed["outline"]["group"], "ExampleFederationPolicy");
    assert_eq!(parsed["outline"]["policies"].as_array().unwrap().len(), 5);
    assert_eq!(parsed["outline"]["shared_attribute_rules"], 1);
}

// ── run ──

#[test]
fn run_prints_released_and_withheld() {
    shibfilter()
        .args(["--no-color", "run", POLICY, LIBRARY])
        .assert()
        .success()
        .stdout(predicate::str::contains("RELEASE mail = jdoe@example.edu"))
        .stdout(predicate::str::contains("RELEASE eduPersonScopedAffiliation = member@example.edu"))
        .stdout(predicate::str::contains("WITHHOLD eduPersonPrincipalName"))
        .stdout(predicate::str::contains("jdoe@gmail.example.com").not());
}

#[test]
fn run_verbose_shows_policy_verdicts() {
    shibfilter()
        .args(["--no-color", "-v", "run", POLICY, LIBRARY])
        .assert()
        .success()
        .stdout(predicate::str::contains("TRUE [releaseContactToLibrary]"))
        .stdout(predicate::str::contains("FALSE [releaseToResearchAndScholarship]"));
}

#[test]
fn run_directory_filters_every_request() {
    shibfilter()
        .args(["--no-color", "run", POLICY, REQUESTS])
        .assert()
        .success()
        .stdout(predicate::str::contains("library.json"))
        .stdout(predicate::str::contains("research.json"))
        .stdout(predicate::str::contains("Summary: 2 requests"));
}

#[test]
fn run_json_report_shape() {
    let output = shibfilter()
        .args(["--json", "run", POLICY, REQUESTS])
        .output()
        .unwrap();
    assert!(output.status.success());

    let parsed: serde_json::Value = serde_json::from_slice(&output.stdout).expect("valid JSON");
    assert_eq!(parsed["summary"]["requests"], 2);
    assert_eq!(parsed["summary"]["errors"], 0);

    let reports = parsed["reports"].as_array().unwrap();
    let library = reports
        .iter()
        .find(|r| r["request"].as_str().unwrap().ends_with("library.json"))
        .unwrap();
    assert_eq!(library["released"]["mail"], serde_json::json!(["jdoe@example.edu"]));
    assert_eq!(
        library["released"]["eduPersonScopedAffiliation"],
        serde_json::json!([{"value": "member", "scope": "example.edu"}])
    );
    assert!(library["withheld"]
        .as_array()
        .unwrap()
        .contains(&serde_json::json!("eduPersonPrincipalName")));
    assert!(library["policies"].as_array().unwrap().len() == 5);
}

#[test]
fn no_color_output_has_no_escape_codes() {
    let output = shibfilter()
        .args(["--no-color", "run", POLICY, LIBRARY])
        .output()
        .unwrap();
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(!stdout.contains("\x1b["), "found ANSI escapes in {}", stdout);
}

#[test]
fn run_with_broken_policy_exits_two() {
    shibfilter().args(["run", BROKEN, LIBRARY]).assert().code(2);
}

#[test]
fn run_with_missing_request_exits_two() {
    shibfilter()
        .args(["run", POLICY, "tests/fixtures/requests/missing.json"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("missing.json"));
}

#[test]
fn run_with_invalid_request_exits_two() {
    let dir = tempfile::tempdir().unwrap();
    let request = dir.path().join("bad.json");
    std::fs::write(&request, r#"{"principle": "typo"}"#).unwrap();
    shibfilter()
        .args(["run", POLICY])
        .arg(&request)
        .assert()
        .code(2)
        .stderr(predicate::str::contains("bad.json"));
}

#[test]
fn run_without_requests_is_usage_error() {
    shibfilter().args(["run", POLICY]).assert().failure();
}

#[test]
fn rc_file_enables_json() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join(".shibfilterrc"), "json = true\n").unwrap();
    let policy = std::fs::canonicalize(POLICY).unwrap();
    let request = std::fs::canonicalize(LIBRARY).unwrap();
    let output = shibfilter()
        .current_dir(dir.path())
        .arg("run")
        .arg(&policy)
        .arg(&request)
        .output()
        .unwrap();
    assert!(output.status.success());
    let parsed: serde_json::Value = serde_json::from_slice(&output.stdout).expect("valid JSON");
    assert_eq!(parsed["summary"]["requests"], 1);
}
