use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use assert_cmd::prelude::*;
use predicates::prelude::*;
use predicates::str::contains;
use tempfile::TempDir;

const DESIRED: &str = r#"
core:
  id: payments
components:
  namespace_isolation:
    shape: simple
    value: payments
  mesh:
    shape: singleton
    control_plane: cp-a
    role_bindings:
      - role: r1
        groups: [g1]
  certificates:
    shape: keyed_list
    members:
      - key: api
      - key: web
"#;

fn keel_cmd(home: &Path) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("keel"));
    cmd.env("HOME", home)
        .env("USERPROFILE", home)
        .env("RUST_LOG", "warn");
    cmd
}

fn write_desired(dir: &Path, contents: &str) -> PathBuf {
    let path = dir.join("payments.yaml");
    fs::write(&path, contents).expect("write desired");
    path
}

fn state_file(home: &Path) -> PathBuf {
    home.join(".keel").join("state").join("payments.json")
}

#[test]
fn init_creates_empty_state_and_refuses_overwrite() {
    let home = TempDir::new().expect("home");

    keel_cmd(home.path())
        .args(["init", "payments"])
        .assert()
        .success()
        .stdout(contains("Initialized 'payments'"));
    assert!(state_file(home.path()).exists());

    keel_cmd(home.path())
        .args(["init", "payments"])
        .assert()
        .failure()
        .stderr(contains("already exists"));

    keel_cmd(home.path())
        .args(["init", "payments", "--force"])
        .assert()
        .success();
}

#[test]
fn plan_lists_changes_without_touching_state() {
    let home = TempDir::new().expect("home");
    let desired = write_desired(home.path(), DESIRED);

    keel_cmd(home.path())
        .arg("plan")
        .arg(&desired)
        .assert()
        .success()
        .stdout(contains("Plan for 'payments'"))
        .stdout(contains("certificates/api"))
        .stdout(contains("add mesh (control plane cp-a)"));

    assert!(!state_file(home.path()).exists());
}

#[test]
fn plan_json_is_machine_readable() {
    let home = TempDir::new().expect("home");
    let desired = write_desired(home.path(), DESIRED);

    let output = keel_cmd(home.path())
        .arg("plan")
        .arg(&desired)
        .arg("--json")
        .output()
        .expect("run plan");
    assert!(output.status.success());

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).expect("json");
    assert_eq!(json["project"], "payments");
    let changes = json["changes"].as_array().expect("changes");
    assert_eq!(changes.len(), 4);
    assert_eq!(changes[0]["component"], "namespace_isolation");
}

#[test]
fn apply_converges_and_second_apply_is_a_noop() {
    let home = TempDir::new().expect("home");
    let desired = write_desired(home.path(), DESIRED);

    keel_cmd(home.path())
        .arg("apply")
        .arg(&desired)
        .assert()
        .success()
        .stdout(contains("converged (4 change(s) applied)"));

    keel_cmd(home.path())
        .arg("apply")
        .arg(&desired)
        .assert()
        .success()
        .stdout(contains("already in sync"));

    keel_cmd(home.path())
        .args(["show", "payments"])
        .assert()
        .success()
        .stdout(contains("control plane cp-a"))
        .stdout(contains("api, web"));
}

#[test]
fn dry_run_leaves_state_alone() {
    let home = TempDir::new().expect("home");
    let desired = write_desired(home.path(), DESIRED);

    keel_cmd(home.path())
        .arg("apply")
        .arg(&desired)
        .arg("--dry-run")
        .assert()
        .success()
        .stdout(contains("[dry-run] Plan for 'payments'"));

    assert!(!state_file(home.path()).exists());
}

#[test]
fn removing_a_member_from_desired_deletes_it() {
    let home = TempDir::new().expect("home");
    let desired = write_desired(home.path(), DESIRED);
    keel_cmd(home.path()).arg("apply").arg(&desired).assert().success();

    let trimmed = write_desired(home.path(), &DESIRED.replace("      - key: web\n", ""));
    keel_cmd(home.path())
        .arg("plan")
        .arg(&trimmed)
        .assert()
        .success()
        .stdout(contains("remove certificates/web"))
        .stdout(contains("certificates/api").not());
}

#[test]
fn unknown_component_fails_before_any_change() {
    let home = TempDir::new().expect("home");
    let desired = write_desired(
        home.path(),
        "core:\n  id: payments\ncomponents:\n  legacy:\n    shape: simple\n    value: enabled\n",
    );

    keel_cmd(home.path())
        .arg("apply")
        .arg(&desired)
        .assert()
        .failure()
        .stderr(contains("unknown component 'legacy'"));
}

#[test]
fn show_json_prints_recorded_snapshot() {
    let home = TempDir::new().expect("home");
    keel_cmd(home.path())
        .args(["init", "payments"])
        .assert()
        .success();

    let output = keel_cmd(home.path())
        .args(["show", "payments", "--json"])
        .output()
        .expect("run show");
    assert!(output.status.success());
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).expect("json");
    assert_eq!(json["core"]["id"], "payments");
}

#[test]
fn show_without_state_points_at_init() {
    let home = TempDir::new().expect("home");
    keel_cmd(home.path())
        .args(["show", "payments"])
        .assert()
        .failure()
        .stderr(contains("keel init payments"));
}

#[test]
fn explicit_state_path_is_honoured() {
    let home = TempDir::new().expect("home");
    let desired = write_desired(home.path(), DESIRED);
    let state = home.path().join("custom").join("payments.json");

    keel_cmd(home.path())
        .arg("apply")
        .arg(&desired)
        .arg("--state")
        .arg(&state)
        .assert()
        .success();

    assert!(state.exists());
    assert!(!state_file(home.path()).exists());
}
