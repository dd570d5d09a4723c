use std::fs;

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;

fn workspace_with_scenarios() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    let configs = dir.path().join("simulator").join("configs");
    fs::create_dir_all(&configs).unwrap();
    fs::write(
        configs.join("urban.yaml"),
        "taps: 6\nrange_bins: 1024\nfrequency: 12.5\n\
         description: urban clutter test\n",
    )
    .unwrap();
    fs::write(configs.join("coastal.yaml"), "taps: 8\nseed: 7\n").unwrap();
    fs::write(configs.join("notes.txt"), "taps: 99\n").unwrap();
    dir
}

#[test]
fn top_level_help_lists_subcommands() {
    let mut cmd = cargo_bin_cmd!("gmtictl");
    let output = cmd
        .arg("--help")
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let text = String::from_utf8_lossy(&output);
    for sub in ["scenarios", "show", "run", "watch", "submit"] {
        assert!(text.contains(sub), "help missing '{sub}'");
    }
    assert!(text.contains("--engine-url"), "help missing --engine-url");
}

#[test]
fn run_help_mentions_options() {
    let mut cmd = cargo_bin_cmd!("gmtictl");
    let output = cmd
        .arg("run")
        .arg("--help")
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let text = String::from_utf8_lossy(&output);
    assert!(text.contains("--scenario"), "run help missing --scenario");
    assert!(text.contains("--ticks"), "run help missing --ticks");
    assert!(
        text.contains("--submit-delay-ms"),
        "run help missing --submit-delay-ms"
    );
    for flag in ["--taps", "--range-bins", "--doppler-bins", "--noise"] {
        assert!(text.contains(flag), "run help missing {flag}");
    }
}

#[test]
fn poll_interval_below_the_floor_is_rejected() {
    for sub in ["run", "watch"] {
        cargo_bin_cmd!("gmtictl")
            .arg(sub)
            .arg("--interval-ms")
            .arg("0")
            .assert()
            .failure()
            .stderr(predicate::str::contains("--interval-ms"));
    }
}

#[test]
fn scenarios_lists_descriptors_sorted() {
    let workspace = workspace_with_scenarios();
    let mut cmd = cargo_bin_cmd!("gmtictl");
    let output = cmd
        .current_dir(workspace.path())
        .env_remove("GMTI_CONFIG_PATH")
        .arg("scenarios")
        .arg("--root")
        .arg(workspace.path())
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let text = String::from_utf8_lossy(&output);
    let coastal = text.find("coastal.yaml").expect("coastal listed");
    let urban = text.find("urban.yaml").expect("urban listed");
    assert!(coastal < urban, "listing not sorted:\n{text}");
    assert!(text.contains("urban clutter test"));
    assert!(!text.contains("notes.txt"));
}

#[test]
fn scenarios_reports_missing_directory() {
    let workspace = tempfile::tempdir().unwrap();
    cargo_bin_cmd!("gmtictl")
        .current_dir(workspace.path())
        .env_remove("GMTI_CONFIG_PATH")
        .arg("scenarios")
        .arg("--root")
        .arg(workspace.path())
        .assert()
        .success()
        .stderr(predicate::str::contains("Scenario directory not found"));
}

#[test]
fn show_prints_defaults_for_missing_fields() {
    let workspace = workspace_with_scenarios();
    let file = workspace
        .path()
        .join("simulator")
        .join("configs")
        .join("urban.yaml");
    cargo_bin_cmd!("gmtictl")
        .current_dir(workspace.path())
        .env_remove("GMTI_CONFIG_PATH")
        .arg("show")
        .arg(&file)
        .assert()
        .success()
        .stdout(predicate::str::contains("taps:         6"))
        .stdout(predicate::str::contains("doppler_bins: 256"))
        .stdout(predicate::str::contains("seed:         random"));
}

#[test]
fn show_rejects_unreadable_file() {
    let workspace = tempfile::tempdir().unwrap();
    cargo_bin_cmd!("gmtictl")
        .current_dir(workspace.path())
        .arg("show")
        .arg(workspace.path().join("absent.yaml"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("could not read descriptor"));
}

#[test]
fn submit_to_unreachable_engine_fails() {
    let workspace = tempfile::tempdir().unwrap();
    cargo_bin_cmd!("gmtictl")
        .current_dir(workspace.path())
        .env_remove("GMTI_CONFIG_PATH")
        .env_remove("GMTI_ENGINE_URL")
        .arg("--engine-url")
        .arg("http://127.0.0.1:9")
        .arg("submit")
        .arg("--seed")
        .arg("42")
        .assert()
        .failure()
        .stdout(predicate::str::contains("taps=4, range=2048, doppler=256"))
        .stderr(predicate::str::contains("Failed to submit scenario"));
}

#[test]
fn submit_applies_clamped_hand_edits() {
    let workspace = tempfile::tempdir().unwrap();
    cargo_bin_cmd!("gmtictl")
        .current_dir(workspace.path())
        .env_remove("GMTI_CONFIG_PATH")
        .env_remove("GMTI_ENGINE_URL")
        .arg("--engine-url")
        .arg("http://127.0.0.1:9")
        .arg("submit")
        .arg("--taps")
        .arg("99")
        .arg("--range-bins")
        .arg("512")
        .assert()
        .failure()
        .stdout(predicate::str::contains("taps=32, range=512, doppler=256"));
}
