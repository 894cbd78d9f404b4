//! End-to-end upload against a real SSH server.
//!
//! Runs only with `--features docker-e2e`. The server is described by
//! `SFTPUSH_E2E_HOST`, `SFTPUSH_E2E_PORT`, `SFTPUSH_E2E_USER`,
//! `SFTPUSH_E2E_PASSWORD` and `SFTPUSH_E2E_TARGET` (a writable directory).
#![cfg(feature = "docker-e2e")]

use sftpush_core::UploadErrorKind;
use sftpush_lib::config::RawConfig;
use sftpush_lib::upload_with;

fn e2e_var(name: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| panic!("{} must be set for docker-e2e tests", name))
}

fn raw_for(source: &std::path::Path, password: &str) -> RawConfig {
    let source = source.to_string_lossy().to_string();
    let password = password.to_string();
    RawConfig::from_lookup(move |key| match key {
        "hostname" => Some(e2e_var("SFTPUSH_E2E_HOST")),
        "port" => Some(e2e_var("SFTPUSH_E2E_PORT")),
        "username" => Some(e2e_var("SFTPUSH_E2E_USER")),
        "password" => Some(password.clone()),
        "upload_source_path" => Some(source.clone()),
        "upload_target_path" => Some(e2e_var("SFTPUSH_E2E_TARGET")),
        _ => None,
    })
}

#[tokio::test]
async fn test_upload_hello_to_real_server() {
    let dir = tempfile::tempdir().unwrap();
    let source = dir.path().join("a.txt");
    std::fs::write(&source, b"hello").unwrap();

    let config = raw_for(&source, &e2e_var("SFTPUSH_E2E_PASSWORD"))
        .validate()
        .unwrap();
    let outcome = upload_with(config).await;

    assert_eq!(outcome.result.unwrap(), 5);
    assert!(outcome.report.succeeded());
}

#[tokio::test]
async fn test_wrong_password_is_an_auth_error() {
    let dir = tempfile::tempdir().unwrap();
    let source = dir.path().join("never.txt");
    std::fs::write(&source, b"nope").unwrap();

    let config = raw_for(&source, "definitely-not-the-password")
        .validate()
        .unwrap();
    let outcome = upload_with(config).await;

    assert_eq!(outcome.result.unwrap_err().kind, UploadErrorKind::Auth);
}
