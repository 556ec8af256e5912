//! End-to-end CLI tests for the skillpack binary.
//!
//! These tests drive `pack`, `verify` and `check` over real temp directories
//! and assert on exit codes and stdout.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

/// Get a Command for the skillpack binary, isolated from user config.
fn skillpack(home: &Path) -> Command {
    let mut cmd = Command::cargo_bin("skillpack").expect("skillpack binary should exist");
    cmd.env_remove("SKILLPACK_CONFIG")
        .env_remove("SKILLPACK_LOG")
        .env_remove("RUST_LOG")
        .env("XDG_CONFIG_HOME", home.join("xdg"))
        .env("HOME", home);
    cmd
}

fn write_bundle(root: &Path, name: &str) {
    let dir = root.join(name);
    fs::create_dir_all(dir.join("scripts")).unwrap();
    fs::write(
        dir.join("SKILL.md"),
        format!("---\nname: {name}\ndescription: Does {name} things\n---\n\n# {name}\n"),
    )
    .unwrap();
    fs::write(dir.join("scripts/run.py"), "print('hi')\n").unwrap();
}

fn setup(valid: &[&str], empty: &[&str]) -> (TempDir, std::path::PathBuf) {
    let tmp = TempDir::new().unwrap();
    let source = tmp.path().join("skills");
    fs::create_dir_all(&source).unwrap();
    for name in valid {
        write_bundle(&source, name);
    }
    for name in empty {
        fs::create_dir_all(source.join(name)).unwrap();
    }
    (tmp, source)
}

// ============================================================================
// pack
// ============================================================================

mod pack {
    use super::*;

    #[test]
    fn all_valid_exits_clean() {
        let (tmp, source) = setup(&["alpha", "beta"], &[]);
        let out = tmp.path().join("dist");

        skillpack(tmp.path())
            .arg("pack")
            .arg(&source)
            .arg("-o")
            .arg(&out)
            .assert()
            .code(0)
            .stdout(predicate::str::contains("[OK]   alpha"))
            .stdout(predicate::str::contains("SUCCESS: 2/2 units packaged"));

        assert!(out.join("alpha.zip").is_file());
        assert!(out.join("beta.zip").is_file());
    }

    #[test]
    fn partial_failure_exits_one_and_lists_failures() {
        let (tmp, source) = setup(&["alpha", "beta"], &["empty"]);
        let out = tmp.path().join("dist");

        skillpack(tmp.path())
            .arg("pack")
            .arg(&source)
            .arg("-o")
            .arg(&out)
            .assert()
            .code(1)
            .stdout(predicate::str::contains("[FAIL] empty"))
            .stdout(predicate::str::contains("WARNING: 2/3 units packaged"))
            .stdout(predicate::str::contains("  - empty [missing_descriptor]"));

        assert!(out.join("alpha.zip").is_file());
        assert!(!out.join("empty.zip").exists());
    }

    #[test]
    fn empty_source_exits_no_units() {
        let (tmp, source) = setup(&[], &[]);

        skillpack(tmp.path())
            .arg("pack")
            .arg(&source)
            .arg("-o")
            .arg(tmp.path().join("dist"))
            .assert()
            .code(3)
            .stdout(predicate::str::contains("no units found"));
    }

    #[test]
    fn missing_source_exits_io_error() {
        let tmp = TempDir::new().unwrap();

        skillpack(tmp.path())
            .arg("pack")
            .arg(tmp.path().join("nope"))
            .assert()
            .code(21)
            .stderr(predicate::str::contains("ERROR"));
    }

    #[test]
    fn json_format_is_parseable() {
        let (tmp, source) = setup(&["alpha"], &["empty"]);

        let output = skillpack(tmp.path())
            .args(["--format", "json", "pack"])
            .arg(&source)
            .arg("-o")
            .arg(tmp.path().join("dist"))
            .output()
            .unwrap();

        assert_eq!(output.status.code(), Some(1));
        let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
        assert_eq!(value["mode"], "package");
        assert_eq!(value["totals"]["attempted"], 2);
        assert_eq!(value["totals"]["failed"], 1);
        assert_eq!(value["units"][1]["unit"], "empty");
        assert_eq!(value["units"][1]["kind"], "missing_descriptor");
    }
}

// ============================================================================
// verify / check
// ============================================================================

mod verify {
    use super::*;

    #[test]
    fn pack_then_verify_is_clean() {
        let (tmp, source) = setup(&["alpha", "beta"], &[]);
        let out = tmp.path().join("dist");

        skillpack(tmp.path())
            .arg("pack")
            .arg(&source)
            .arg("-o")
            .arg(&out)
            .assert()
            .code(0);

        skillpack(tmp.path())
            .arg("verify")
            .arg(&out)
            .assert()
            .code(0)
            .stdout(predicate::str::contains("SUCCESS: 2/2 units verified"));
    }

    #[test]
    fn name_prefixed_archives_fail_verification() {
        let (tmp, source) = setup(&["alpha"], &[]);
        let out = tmp.path().join("dist");

        skillpack(tmp.path())
            .args(["pack", "--policy", "name-prefixed"])
            .arg(&source)
            .arg("-o")
            .arg(&out)
            .assert()
            .code(0);

        skillpack(tmp.path())
            .arg("verify")
            .arg(&out)
            .assert()
            .code(1)
            .stdout(predicate::str::contains("[missing_descriptor]"));
    }

    #[test]
    fn garbage_archive_is_corrupted() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("dist");
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("junk.zip"), b"definitely not a zip").unwrap();

        skillpack(tmp.path())
            .arg("verify")
            .arg(&dir)
            .assert()
            .code(1)
            .stdout(predicate::str::contains("junk [corrupted]"));
    }

    #[test]
    fn check_writes_nothing() {
        let (tmp, source) = setup(&["alpha"], &[]);

        skillpack(tmp.path())
            .current_dir(tmp.path())
            .arg("check")
            .arg(&source)
            .assert()
            .code(0)
            .stdout(predicate::str::contains("SUCCESS: 1/1 units valid"));

        assert!(!tmp.path().join("packaged-skills").exists());
    }
}

// ============================================================================
// Config and argument errors
// ============================================================================

mod errors {
    use super::*;

    #[test]
    fn unknown_command_fails() {
        let tmp = TempDir::new().unwrap();
        skillpack(tmp.path())
            .arg("nonexistent-command")
            .assert()
            .failure()
            .stderr(predicate::str::contains("error"));
    }

    #[test]
    fn bad_policy_rejected() {
        let (tmp, source) = setup(&["alpha"], &[]);
        skillpack(tmp.path())
            .args(["pack", "--policy", "sideways"])
            .arg(&source)
            .assert()
            .failure();
    }

    #[test]
    fn missing_config_file_exits_config_error() {
        let (tmp, source) = setup(&["alpha"], &[]);
        skillpack(tmp.path())
            .arg("--config")
            .arg(tmp.path().join("missing.toml"))
            .arg("check")
            .arg(&source)
            .assert()
            .code(11)
            .stderr(predicate::str::contains("Config file not found"));
    }

    #[test]
    fn invalid_config_exits_config_error() {
        let (tmp, source) = setup(&["alpha"], &[]);
        let config = tmp.path().join("skillpack.toml");
        fs::write(&config, "compression_level = 42\n").unwrap();

        skillpack(tmp.path())
            .arg("--config")
            .arg(&config)
            .arg("check")
            .arg(&source)
            .assert()
            .code(11);
    }

    #[test]
    fn config_from_env_applies_required_keys() {
        let (tmp, source) = setup(&["alpha"], &[]);
        let config = tmp.path().join("skillpack.toml");
        fs::write(&config, "extra_required_keys = [\"license\"]\n").unwrap();

        skillpack(tmp.path())
            .env("SKILLPACK_CONFIG", &config)
            .arg("check")
            .arg(&source)
            .assert()
            .code(1)
            .stdout(predicate::str::contains("[missing_required_key]"));
    }
}

// ============================================================================
// Edge cases
// ============================================================================

mod edges {
    use super::*;

    #[test]
    fn repack_in_place_ignores_default_output_dir() {
        let (tmp, source) = setup(&["alpha"], &[]);

        for _ in 0..2 {
            skillpack(tmp.path())
                .current_dir(&source)
                .args(["pack", "."])
                .assert()
                .code(0)
                .stdout(predicate::str::contains("SUCCESS: 1/1 units packaged"));
        }

        assert!(source.join("packaged-skills/alpha.zip").is_file());
    }

    #[test]
    fn stored_compression_from_config_packs_and_verifies() {
        let (tmp, source) = setup(&["alpha"], &[]);
        let config = tmp.path().join("skillpack.toml");
        fs::write(&config, "compression_level = 0\n").unwrap();
        let out = tmp.path().join("dist");

        skillpack(tmp.path())
            .arg("--config")
            .arg(&config)
            .arg("pack")
            .arg(&source)
            .arg("-o")
            .arg(&out)
            .assert()
            .code(0);

        skillpack(tmp.path())
            .arg("verify")
            .arg(&out)
            .assert()
            .code(0);
    }

    #[test]
    fn quiet_silences_rust_log() {
        let (tmp, source) = setup(&["alpha"], &[]);

        skillpack(tmp.path())
            .env("RUST_LOG", "trace")
            .args(["-q", "check"])
            .arg(&source)
            .assert()
            .code(0)
            .stderr(predicate::str::is_empty());
    }

    #[test]
    fn timestamps_flag_accepted() {
        let (tmp, source) = setup(&["alpha"], &[]);

        skillpack(tmp.path())
            .args(["--timestamps", "-v", "check"])
            .arg(&source)
            .assert()
            .code(0)
            .stderr(predicate::str::contains("Batch started"));
    }
}
