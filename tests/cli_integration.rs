//! End-to-end tests for the `mk` binary.
//!
//! Each test runs with a scratch HOME and a scrubbed environment so the
//! developer's own config and token are never read. None of these tests
//! reach the network: they stop at validation, configuration or
//! credential checks.

use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

const SCRUBBED: &[&str] = &[
    "SHOP",
    "API_VERSION",
    "ADMIN_TOKEN",
    "MEASUREKEEP_CONFIG",
    "XDG_CONFIG_HOME",
    "RUST_LOG",
];

/// Get a command for running mk inside `home`.
fn mk(home: &Path) -> Command {
    let mut cmd = Command::cargo_bin("mk").unwrap();
    for var in SCRUBBED {
        cmd.env_remove(var);
    }
    cmd.env("HOME", home).current_dir(home);
    cmd
}

#[test]
fn help_describes_tool() {
    let home = TempDir::new().unwrap();
    mk(home.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("measurement"));
}

#[test]
fn version_flag_works() {
    let home = TempDir::new().unwrap();
    mk(home.path())
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("mk"));
}

mod validation {
    use super::*;

    #[test]
    fn missing_customer_id() {
        let home = TempDir::new().unwrap();
        mk(home.path())
            .arg("list")
            .assert()
            .code(2)
            .stdout(predicate::str::contains(r#""ok": false"#))
            .stdout(predicate::str::contains(r#""status": 400"#))
            .stderr(predicate::str::contains("missing customer_id"));
    }

    #[test]
    fn malformed_customer_id() {
        let home = TempDir::new().unwrap();
        mk(home.path())
            .args(["selected", "--customer-id", "abc"])
            .assert()
            .code(2)
            .stderr(predicate::str::contains("invalid customer_id"));
    }

    #[test]
    fn missing_shop() {
        let home = TempDir::new().unwrap();
        mk(home.path())
            .args(["list", "--customer-id", "42"])
            .assert()
            .code(2)
            .stderr(predicate::str::contains("missing shop"));
    }

    #[test]
    fn missing_credential() {
        let home = TempDir::new().unwrap();
        mk(home.path())
            .args(["list", "--customer-id", "42", "--shop", "https://test-shop.myshopify.com"])
            .assert()
            .code(1)
            .stdout(predicate::str::contains(r#""status": 500"#))
            .stderr(predicate::str::contains("admin credential not configured"));
    }

    #[test]
    fn shop_from_environment() {
        let home = TempDir::new().unwrap();
        mk(home.path())
            .env("SHOP", "test-shop.myshopify.com")
            .args(["delete", "--customer-id", "42", "--id", "x"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("admin credential not configured"));
    }

    #[test]
    fn values_must_be_flat_object() {
        let home = TempDir::new().unwrap();
        mk(home.path())
            .args(["save", "--customer-id", "42", "--values", "[1, 2]"])
            .assert()
            .code(2)
            .stderr(predicate::str::contains("JSON object"));
    }
}

mod auth {
    use super::*;

    #[test]
    fn status_without_token() {
        let home = TempDir::new().unwrap();
        mk(home.path())
            .args(["auth", "--status"])
            .assert()
            .success()
            .stdout(predicate::str::contains("not configured"));
    }

    #[test]
    fn store_then_status_then_logout() {
        let home = TempDir::new().unwrap();

        mk(home.path())
            .args(["auth", "--token", "shpat_abc123"])
            .assert()
            .success()
            .stdout(predicate::str::contains("shpat_abc123").not());

        assert!(home.path().join(".measurekeep/secrets.toml").exists());

        mk(home.path())
            .args(["auth", "--status"])
            .assert()
            .success()
            .stdout(predicate::str::contains("configured (secret store)"));

        mk(home.path())
            .args(["-q", "auth", "--status"])
            .assert()
            .success()
            .stdout("authenticated\n");

        mk(home.path()).args(["auth", "--logout"]).assert().success();

        mk(home.path())
            .args(["-q", "auth", "--status"])
            .assert()
            .success()
            .stdout("not_authenticated\n");
    }

    #[test]
    fn environment_token_wins() {
        let home = TempDir::new().unwrap();
        mk(home.path())
            .env("ADMIN_TOKEN", "shpat_env")
            .args(["auth", "--status"])
            .assert()
            .success()
            .stdout(predicate::str::contains("ADMIN_TOKEN"))
            .stdout(predicate::str::contains("shpat_env").not());
    }

    #[test]
    fn non_interactive_requires_token() {
        let home = TempDir::new().unwrap();
        mk(home.path())
            .args(["--no-interactive", "auth"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Token required"));
    }
}

mod config {
    use super::*;

    #[test]
    fn set_then_get() {
        let home = TempDir::new().unwrap();

        mk(home.path())
            .args(["config", "set", "storage.layout", "aggregate"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Set storage.layout = aggregate"));

        mk(home.path())
            .args(["config", "get", "storage.layout"])
            .assert()
            .success()
            .stdout("aggregate\n");

        assert!(home.path().join(".measurekeep/config.toml").exists());
    }

    #[test]
    fn shop_domain_is_normalized() {
        let home = TempDir::new().unwrap();
        mk(home.path())
            .args(["config", "set", "shop.domain", "https://my-store.myshopify.com/"])
            .assert()
            .success();

        mk(home.path())
            .args(["config", "get", "shop.domain"])
            .assert()
            .success()
            .stdout("my-store.myshopify.com\n");
    }

    #[test]
    fn explicit_config_path() {
        let home = TempDir::new().unwrap();
        let path = home.path().join("elsewhere.toml");

        mk(home.path())
            .env("MEASUREKEEP_CONFIG", &path)
            .args(["config", "set", "retry.max_attempts", "5"])
            .assert()
            .success();

        assert!(path.exists());
        mk(home.path())
            .env("MEASUREKEEP_CONFIG", &path)
            .args(["config", "get", "retry.max_attempts"])
            .assert()
            .success()
            .stdout("5\n");
    }

    #[test]
    fn rejects_bad_values_and_keys() {
        let home = TempDir::new().unwrap();
        mk(home.path())
            .args(["config", "set", "storage.layout", "sideways"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("storage.layout"));

        mk(home.path())
            .args(["config", "get", "trunk.branch"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("unknown configuration key"));
    }

    #[test]
    fn list_shows_defaults() {
        let home = TempDir::new().unwrap();
        mk(home.path())
            .args(["config", "list"])
            .assert()
            .success()
            .stdout(predicate::str::contains("shop.api_version = 2025-10"))
            .stdout(predicate::str::contains("shop.domain = (not set)"));
    }
}

#[test]
fn completion_generates_script() {
    let home = TempDir::new().unwrap();
    mk(home.path())
        .args(["completion", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("mk"));
}
