use assert_cmd::Command;
use jsonwebtoken::{EncodingKey, Header, encode};
use predicates::prelude::*;
use serde_json::json;

fn mint(claims: serde_json::Value) -> String {
    let mut payload = json!({
        "sub": "employee-3",
        "exp": chrono::Utc::now().timestamp() + 3600,
    });
    if let (Some(base), Some(extra)) = (payload.as_object_mut(), claims.as_object()) {
        base.extend(extra.clone());
    }
    encode(&Header::default(), &payload, &EncodingKey::from_secret(b"cli")).unwrap()
}

fn keystone(store: &std::path::Path) -> Command {
    let mut cmd = Command::cargo_bin("keystone").unwrap();
    cmd.env_remove("KEYSTONE_TOKEN_FILE")
        .env("RUST_LOG", "warn")
        .arg("--store")
        .arg(store);
    cmd
}

#[test]
fn version_prints_package_name() {
    let dir = tempfile::tempdir().unwrap();
    keystone(&dir.path().join("tokens.json"))
        .arg("version")
        .assert()
        .success()
        .stdout(predicate::str::contains("keystone_cli"));
}

#[test]
fn decode_prints_claims_json() {
    let dir = tempfile::tempdir().unwrap();
    let token = mint(json!({ "roles": ["editor"], "tenant_id": "acme" }));
    keystone(&dir.path().join("tokens.json"))
        .args(["decode", token.as_str()])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"subject\": \"employee-3\""))
        .stdout(predicate::str::contains("\"editor\""))
        .stdout(predicate::str::contains("\"tenant_id\": \"acme\""));
}

#[test]
fn decode_rejects_malformed_token() {
    let dir = tempfile::tempdir().unwrap();
    keystone(&dir.path().join("tokens.json"))
        .args(["decode", "not-a-token"])
        .assert()
        .code(1);
}

#[test]
fn check_with_explicit_token() {
    let dir = tempfile::tempdir().unwrap();
    let store = dir.path().join("tokens.json");
    let token = mint(json!({ "roles": ["editor"], "permissions": ["*:reports"] }));

    keystone(&store)
        .args(["check", "--token", token.as_str(), "--permission", "read:reports"])
        .assert()
        .success()
        .stdout(predicate::str::diff("allowed\n"));

    keystone(&store)
        .args(["check", "--token", token.as_str(), "--permission", "read:users"])
        .assert()
        .code(3)
        .stdout(predicate::str::diff("denied\n"));

    keystone(&store)
        .args(["check", "--token", token.as_str(), "--roles", "admin", "editor", "--any"])
        .assert()
        .success();

    keystone(&store)
        .args(["check", "--token", token.as_str(), "--roles", "admin", "editor"])
        .assert()
        .code(3);
}

#[test]
fn check_menu_perms() {
    let dir = tempfile::tempdir().unwrap();
    let token = mint(json!({ "permissions": ["read:*"] }));
    keystone(&dir.path().join("tokens.json"))
        .args(["check", "--token", token.as_str(), "--menu-perms", "read:seo"])
        .assert()
        .success();
}

#[test]
fn login_check_logout_round() {
    let dir = tempfile::tempdir().unwrap();
    let store = dir.path().join("tokens.json");
    let token = mint(json!({ "is_admin": true }));

    keystone(&store)
        .args(["login", "--access-token", token.as_str(), "--refresh-token", "r1"])
        .assert()
        .success();
    assert!(store.exists());

    keystone(&store)
        .args(["check", "--permission", "delete:employees"])
        .assert()
        .success();

    keystone(&store).arg("logout").assert().success();

    keystone(&store)
        .args(["check", "--permission", "delete:employees"])
        .assert()
        .code(3);
}

#[test]
fn refresh_without_session_fails() {
    let dir = tempfile::tempdir().unwrap();
    keystone(&dir.path().join("tokens.json"))
        .arg("refresh")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("log in first"));
}

#[test]
fn refresh_keeps_valid_token_offline() {
    let dir = tempfile::tempdir().unwrap();
    let store = dir.path().join("tokens.json");
    let token = mint(json!({}));

    keystone(&store)
        .args(["login", "--access-token", token.as_str()])
        .assert()
        .success();

    keystone(&store)
        .arg("refresh")
        .assert()
        .success()
        .stdout(predicate::str::contains("access token valid until"));
}
