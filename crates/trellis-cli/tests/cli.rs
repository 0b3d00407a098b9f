//! End-to-end checks of the `trellis` binary.
//!
//! Nothing here needs Python: the scaffolding commands are exercised up to
//! the prerequisite check, and everything else is pure rendering.

use assert_cmd::cargo;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

/// A command isolated from the user's config file and `TRELLIS_*` vars.
fn trellis(dir: &TempDir) -> assert_cmd::Command {
    let mut cmd = cargo::cargo_bin_cmd!("trellis");
    cmd.current_dir(dir.path())
        .env("HOME", dir.path())
        .env("XDG_CONFIG_HOME", dir.path().join(".config"))
        .env_remove("TRELLIS_CONFIG")
        .env_remove("TRELLIS_OUTPUT_FORMAT")
        .env_remove("TRELLIS_PROJECT__PYTHON")
        .env_remove("TRELLIS_PROJECT__SETTINGS")
        .env_remove("NO_COLOR");
    cmd
}

#[test]
fn help_lists_commands() {
    let temp = TempDir::new().unwrap();
    trellis(&temp)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("new"))
        .stdout(predicate::str::contains("plan"))
        .stdout(predicate::str::contains("render"));
}

#[test]
fn version_flag() {
    let temp = TempDir::new().unwrap();
    trellis(&temp)
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn no_subcommand_is_a_usage_error() {
    let temp = TempDir::new().unwrap();
    trellis(&temp).assert().code(2);
}

#[test]
fn plan_lists_the_file_set() {
    let temp = TempDir::new().unwrap();
    trellis(&temp)
        .args(["plan", "shop"])
        .assert()
        .success()
        .stdout(predicate::str::contains("settings/base.py"))
        .stdout(predicate::str::contains("credentials/.env"))
        .stdout(predicate::str::contains("(0700)"));

    assert!(!temp.path().join("shop").exists(), "plan must not write");
}

#[test]
fn plan_as_json() {
    let temp = TempDir::new().unwrap();
    let out = trellis(&temp)
        .args(["--output-format", "json", "plan", "shop"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let doc: serde_json::Value = serde_json::from_slice(&out).unwrap();
    assert_eq!(doc["package"], "shop");
    let entries = doc["entries"].as_array().unwrap();
    assert!(entries.iter().any(|e| e["kind"] == "symlink"));
    assert!(
        entries
            .iter()
            .all(|e| e["path"].as_str().is_some_and(|p| !p.contains("<generated>")))
    );
}

#[test]
fn render_env_template() {
    let temp = TempDir::new().unwrap();
    trellis(&temp)
        .args(["render", "env", "--name", "shop"])
        .assert()
        .success()
        .stdout(predicate::str::contains("SECRET_KEY="))
        .stdout(predicate::str::contains("shop.settings"));
}

#[test]
fn render_list() {
    let temp = TempDir::new().unwrap();
    trellis(&temp)
        .args(["render", "--list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("settings-base"))
        .stdout(predicate::str::contains("requirements-production"));
}

#[test]
fn render_unknown_template_is_not_found() {
    let temp = TempDir::new().unwrap();
    trellis(&temp)
        .args(["render", "dockerfile"])
        .assert()
        .code(3)
        .stderr(predicate::str::contains("dockerfile"))
        .stderr(predicate::str::contains("trellis render --list"));
}

#[test]
fn invalid_project_name_is_rejected_before_anything_runs() {
    let temp = TempDir::new().unwrap();
    trellis(&temp)
        .args(["new", "my-site", "--yes"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("my-site"));

    assert!(!temp.path().join("my-site").exists());
}

#[test]
fn missing_interpreter_aborts_the_run() {
    let temp = TempDir::new().unwrap();
    trellis(&temp)
        .args(["new", "shop", "--yes", "--python", "/no/such/python3"])
        .assert()
        .code(5)
        .stderr(predicate::str::contains("python"));

    assert!(
        !temp.path().join("shop").exists(),
        "an aborted run leaves nothing behind"
    );
}

#[test]
fn dry_run_with_missing_interpreter_writes_nothing() {
    let temp = TempDir::new().unwrap();
    trellis(&temp)
        .args(["new", "shop", "--dry-run", "--python", "/no/such/python3"])
        .assert()
        .failure();

    assert!(!temp.path().join("shop").exists());
}

#[test]
fn check_reports_missing_interpreter() {
    let temp = TempDir::new().unwrap();
    trellis(&temp)
        .args(["check", "--python", "/no/such/python3"])
        .assert()
        .code(3);
}

#[test]
fn config_get_reads_defaults() {
    let temp = TempDir::new().unwrap();
    trellis(&temp)
        .args(["config", "get", "project.python"])
        .assert()
        .success()
        .stdout(predicate::str::diff("python3\n"));
}

#[test]
fn config_get_sees_environment_overrides() {
    let temp = TempDir::new().unwrap();
    trellis(&temp)
        .env("TRELLIS_PROJECT__PYTHON", "python3.12")
        .args(["config", "get", "project.python"])
        .assert()
        .success()
        .stdout(predicate::str::diff("python3.12\n"));
}

#[test]
fn local_config_file_is_layered() {
    let temp = TempDir::new().unwrap();
    fs::write(
        temp.path().join("trellis.toml"),
        "[project]\ntime_zone = \"Europe/Berlin\"\n",
    )
    .unwrap();

    trellis(&temp)
        .args(["config", "get", "project.time_zone"])
        .assert()
        .success()
        .stdout(predicate::str::diff("Europe/Berlin\n"));
}

#[test]
fn config_path_prints_a_location() {
    let temp = TempDir::new().unwrap();
    trellis(&temp)
        .args(["config", "path"])
        .assert()
        .success()
        .stdout(predicate::str::contains("config.toml"));
}

#[test]
fn missing_explicit_config_file_is_a_config_error() {
    let temp = TempDir::new().unwrap();
    trellis(&temp)
        .args(["--config", "absent.toml", "config", "list"])
        .assert()
        .code(4)
        .stderr(predicate::str::contains("configuration"));
}

#[test]
fn init_local_keeps_an_existing_file_unless_forced() {
    let temp = TempDir::new().unwrap();
    trellis(&temp).args(["init", "--local"]).assert().success();
    let written = fs::read_to_string(temp.path().join("trellis.toml")).unwrap();
    assert!(written.contains("[project]"));

    fs::write(temp.path().join("trellis.toml"), "# edited\n").unwrap();
    trellis(&temp).args(["init", "--local"]).assert().success();
    assert_eq!(
        fs::read_to_string(temp.path().join("trellis.toml")).unwrap(),
        "# edited\n"
    );

    trellis(&temp)
        .args(["init", "--local", "--force"])
        .assert()
        .success();
    let rewritten = fs::read_to_string(temp.path().join("trellis.toml")).unwrap();
    assert!(rewritten.contains("[project]"));
}

#[test]
fn completions_for_bash() {
    let temp = TempDir::new().unwrap();
    trellis(&temp)
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("trellis"));
}

#[test]
fn config_get_unknown_key_is_a_user_error() {
    let temp = TempDir::new().unwrap();
    trellis(&temp)
        .args(["config", "get", "project.nope"])
        .assert()
        .code(2);
}
