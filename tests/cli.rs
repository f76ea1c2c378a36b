use assert_cmd::Command;
use predicates::prelude::*;

fn bin() -> Command {
    Command::cargo_bin("kodegen_bundler_runtime").unwrap()
}

#[test]
fn test_first_run_writes_defaults_and_exits_2() {
    let temp = tempfile::tempdir().unwrap();

    bin()
        .current_dir(temp.path())
        .arg("--no-color")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("Wrote config defaults"));

    let config = std::fs::read_to_string(temp.path().join("jcup/config.json")).unwrap();
    assert!(config.contains("\"executable_name\": \"MyApp\""));
    assert!(config.contains("\"to_create\""));
    assert_eq!(
        std::fs::read_to_string(temp.path().join("jcup/.gitignore")).unwrap(),
        "*\n!.gitignore\n!config.json\n"
    );
}

#[test]
fn test_empty_matrix_succeeds() {
    let temp = tempfile::tempdir().unwrap();
    let config = temp.path().join("bundle/config.json");
    std::fs::create_dir_all(config.parent().unwrap()).unwrap();
    std::fs::write(&config, r#"{"to_create": []}"#).unwrap();

    bin()
        .current_dir(temp.path())
        .args(["--no-color", "--config"])
        .arg(&config)
        .assert()
        .success()
        .stdout(predicate::str::contains("Nothing was bundled."));

    // Missing fields were filled in and the folders were created beside the config.
    let rewritten = std::fs::read_to_string(&config).unwrap();
    assert!(rewritten.contains("\"runtime_version\": 17"));
    assert!(temp.path().join("bundle/artifacts").is_dir());
    assert!(temp.path().join("bundle/download-cache").is_dir());
}

#[test]
fn test_broken_config_is_fatal() {
    let temp = tempfile::tempdir().unwrap();
    let config = temp.path().join("config.json");
    std::fs::write(&config, "{ \"to_create\": ").unwrap();

    bin()
        .args(["--no-color", "--config"])
        .arg(&config)
        .assert()
        .code(255)
        .stderr(predicate::str::contains("Fatal error"));
}

#[test]
fn test_unknown_only_value_is_rejected() {
    bin()
        .args(["--only", "plan9"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown operating system"));
}
