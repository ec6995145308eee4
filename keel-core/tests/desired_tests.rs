//! Desired-state loading and settings integration tests.

use assert_fs::prelude::*;
use keel_core::{
    desired, settings, types::ComponentName, Component, ConfigError, RoleBinding, Shape,
};
use predicates::prelude::predicate;
use rstest::rstest;

const DESIRED: &str = r#"
core:
  id: payments
  display_name: Payments
components:
  namespace_isolation:
    shape: simple
    value: payments
  access_control:
    shape: full
    identity: corp-sso
    role_bindings:
      - role: admin
        groups: [platform, sre]
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
        attributes:
          issuer: acme
      - key: web
"#;

// ---------------------------------------------------------------------------
// 1. Load
// ---------------------------------------------------------------------------

#[test]
fn load_desired_reads_every_shape() {
    let dir = assert_fs::TempDir::new().expect("tempdir");
    let file = dir.child("payments.yaml");
    file.write_str(DESIRED).expect("write");

    let state = desired::load_desired(file.path()).expect("load");
    assert_eq!(state.id().0, "payments");
    assert_eq!(state.core.display_name, "Payments");

    let access = state
        .component(&ComponentName::from("access_control"))
        .expect("access_control");
    match access {
        Component::Full(full) => {
            assert_eq!(full.identity.as_deref(), Some("corp-sso"));
            assert_eq!(
                full.role_bindings,
                vec![RoleBinding::new("admin", ["platform", "sre"])]
            );
        }
        other => panic!("expected full, got {other:?}"),
    }
}

#[rstest]
#[case("namespace_isolation", Shape::Simple)]
#[case("access_control", Shape::Full)]
#[case("mesh", Shape::Singleton)]
#[case("certificates", Shape::KeyedList)]
fn load_desired_preserves_shape_tags(#[case] name: &str, #[case] shape: Shape) {
    let dir = assert_fs::TempDir::new().expect("tempdir");
    let file = dir.child("payments.yaml");
    file.write_str(DESIRED).expect("write");

    let state = desired::load_desired(file.path()).expect("load");
    let component = state
        .component(&ComponentName::from(name))
        .unwrap_or_else(|| panic!("missing {name}"));
    assert_eq!(component.shape(), shape);
}

#[test]
fn load_missing_desired_returns_not_found() {
    let dir = assert_fs::TempDir::new().expect("tempdir");
    let err = desired::load_desired(&dir.path().join("absent.yaml")).unwrap_err();
    assert!(matches!(err, ConfigError::NotFound { .. }), "got: {err}");
    assert!(err.to_string().contains("absent.yaml"));
}

#[test]
fn load_unknown_shape_returns_parse_error_with_path() {
    let dir = assert_fs::TempDir::new().expect("tempdir");
    let file = dir.child("bad.yaml");
    file.write_str("core:\n  id: p\ncomponents:\n  mesh:\n    shape: hexagon\n")
        .expect("write");

    let err = desired::load_desired(file.path()).unwrap_err();
    assert!(matches!(err, ConfigError::Parse { .. }), "got: {err}");
    assert!(err.to_string().contains("bad.yaml"));
}

#[test]
fn yaml_roundtrip_keeps_components() {
    let dir = assert_fs::TempDir::new().expect("tempdir");
    let file = dir.child("payments.yaml");
    file.write_str(DESIRED).expect("write");
    let state = desired::load_desired(file.path()).expect("load");

    let rendered = desired::to_yaml(&state).expect("render");
    let out = dir.child("out.yaml");
    out.write_str(&rendered).expect("write");
    out.assert(predicate::str::contains("control_plane: cp-a"));

    let reloaded = desired::load_desired(out.path()).expect("reload");
    assert_eq!(reloaded, state);
}

// ---------------------------------------------------------------------------
// 2. Settings
// ---------------------------------------------------------------------------

#[test]
fn malformed_settings_return_parse_error() {
    let home = assert_fs::TempDir::new().expect("tempdir");
    home.child(".keel").create_dir_all().expect("mkdir");
    let config = home.child(".keel").child("config.yaml");
    config.write_str("retry_attempts: [not, a, number]\n").expect("write");

    let err = settings::load_at(home.path()).unwrap_err();
    assert!(matches!(err, ConfigError::Parse { .. }), "got: {err}");
    assert!(err.to_string().contains("config.yaml"));
}
