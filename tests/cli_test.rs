use assert_cmd::cargo_bin;
use assert_cmd::prelude::*;
use predicates::prelude::*;
use roundup::application::signature::sign;
use std::io::Write;
use std::process::Command;

const FIXTURE: &str = "tests/fixtures/card_payment.json";

#[test]
fn test_sign_prints_webhook_signature() -> Result<(), Box<dyn std::error::Error>> {
    let expected = sign("cli-secret", &std::fs::read(FIXTURE)?);

    let mut cmd = Command::new(cargo_bin!("roundup"));
    cmd.arg("sign")
        .arg(FIXTURE)
        .env("STARLING_WEBHOOK_SECRET", "cli-secret");

    cmd.assert()
        .success()
        .stdout(predicate::str::diff(format!("{expected}\n")));

    Ok(())
}

#[test]
fn test_sign_covers_exact_bytes() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(file, "{{\"content\":{{}}}}  ").unwrap();
    let expected = sign("cli-secret", b"{\"content\":{}}  ");

    let output = Command::new(cargo_bin!("roundup"))
        .arg("sign")
        .arg(file.path())
        .env("STARLING_WEBHOOK_SECRET", "cli-secret")
        .output()
        .expect("Failed to execute command");

    assert!(output.status.success());
    assert_eq!(String::from_utf8_lossy(&output.stdout).trim_end(), expected);
}

#[test]
fn test_sign_without_secret_fails() {
    let mut cmd = Command::new(cargo_bin!("roundup"));
    cmd.arg("sign")
        .arg(FIXTURE)
        .env_remove("STARLING_WEBHOOK_SECRET");

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("starling-webhook-secret"));
}

#[test]
fn test_serve_refuses_to_start_without_secrets() {
    let mut cmd = Command::new(cargo_bin!("roundup"));
    cmd.arg("serve")
        .arg("--bind")
        .arg("127.0.0.1:0")
        .env_remove("STARLING_WEBHOOK_SECRET")
        .env_remove("STARLING_PERSONAL_TOKEN")
        .env_remove("STARLING_SAVINGS_GOAL");

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("missing secret"));
}

#[test]
fn test_help_lists_subcommands() {
    Command::new(cargo_bin!("roundup"))
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("serve").and(predicate::str::contains("sign")));
}
