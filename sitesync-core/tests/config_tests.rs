//! Config error-message and parsing integration tests.

use assert_fs::prelude::*;
use predicates::prelude::*;
use rstest::rstest;
use sitesync_core::{config, ConfigError, StoreKind};

fn write_config(home: &assert_fs::TempDir, body: &str) {
    home.child(".sitesync/config.yaml")
        .write_str(body)
        .expect("write config");
}

// ---------------------------------------------------------------------------
// 1. Load error messages
// ---------------------------------------------------------------------------

#[test]
fn load_missing_config_returns_not_found() {
    let home = assert_fs::TempDir::new().expect("tempdir");
    let err = config::load_at(home.path()).unwrap_err();
    assert!(matches!(err, ConfigError::NotFound { .. }), "got: {err}");
    assert!(err.to_string().contains("config.yaml"));
}

#[test]
fn load_corrupt_yaml_returns_parse_error_with_path() {
    let home = assert_fs::TempDir::new().expect("tempdir");
    write_config(&home, ": : corrupt : yaml : !!!\n  - broken: [unclosed");

    let err = config::load_at(home.path()).unwrap_err();
    assert!(matches!(err, ConfigError::Parse { .. }), "got: {err}");
    assert!(err.to_string().contains("config.yaml"), "must contain file path, got: {err}");
}

#[test]
fn load_without_site_is_a_parse_error() {
    let home = assert_fs::TempDir::new().expect("tempdir");
    write_config(&home, "content_root: /srv/blog\n");
    let err = config::load_at(home.path()).unwrap_err();
    assert!(matches!(err, ConfigError::Parse { .. }), "got: {err}");
}

// ---------------------------------------------------------------------------
// 2. Field parsing
// ---------------------------------------------------------------------------

#[test]
fn full_config_parses_every_field() {
    let home = assert_fs::TempDir::new().expect("tempdir");
    write_config(
        &home,
        r#"
site: "https://example.dev"
content_root: /srv/blog
collection: site.standard.document
path_prefix: /posts
extension: markdown
clock_id: 7
concurrency: 4
store:
  kind: xrpc
  endpoint: https://pds.example.dev
  repo: did:plc:abc123
  token_env: MY_TOKEN
  timeout_secs: 5
"#,
    );

    let cfg = config::load_at(home.path()).expect("load");
    assert_eq!(cfg.site.0, "https://example.dev");
    assert_eq!(cfg.path_prefix, "/posts");
    assert_eq!(cfg.extension, "markdown");
    assert_eq!(cfg.clock_id, 7);
    assert_eq!(cfg.concurrency, 4);
    assert_eq!(cfg.store.kind, StoreKind::Xrpc);
    assert_eq!(cfg.store.repo.as_deref(), Some("did:plc:abc123"));
    assert_eq!(cfg.store.token_env, "MY_TOKEN");
    assert_eq!(cfg.store.timeout_secs, 5);
}

#[rstest]
#[case("clock_id: 1024\n", "clock_id")]
#[case("concurrency: 0\n", "concurrency")]
#[case("extension: .md\n", "extension")]
#[case("path_prefix: blog\n", "path_prefix")]
fn out_of_range_values_are_rejected(#[case] extra: &str, #[case] field: &str) {
    let home = assert_fs::TempDir::new().expect("tempdir");
    write_config(
        &home,
        &format!("site: https://example.dev\ncontent_root: /srv/blog\n{extra}"),
    );
    let err = config::load_at(home.path()).unwrap_err();
    assert!(
        predicate::str::contains(field).eval(&err.to_string()),
        "expected '{field}' in: {err}"
    );
}
