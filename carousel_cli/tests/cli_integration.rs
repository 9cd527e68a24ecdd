use std::io::Write;

use assert_cmd::Command;
use predicates::prelude::*;

fn fast_config() -> tempfile::NamedTempFile {
    let mut f = tempfile::NamedTempFile::new().expect("tempfile");
    // Scaled-down mechanics so a sim session finishes in well under a second.
    write!(
        f,
        "[motion]\n\
         full_rotation_ms = 400\n\
         settle_ms = 20\n\
         poll_ms = 1\n\
         \n\
         [homing]\n\
         debounce_ms = 150\n\
         switch_poll_ms = 10\n"
    )
    .expect("write config");
    f
}

#[test]
fn help_names_the_subcommands() {
    Command::cargo_bin("carousel")
        .expect("binary")
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("run"))
        .stdout(predicate::str::contains("self-check"));
}

#[test]
fn self_check_passes_on_the_sim_rig() {
    Command::cargo_bin("carousel")
        .expect("binary")
        .arg("self-check")
        .assert()
        .success()
        .stdout(predicate::str::contains("self-check: ok"));
}

#[test]
fn self_check_json_emits_a_structured_line() {
    let out = Command::cargo_bin("carousel")
        .expect("binary")
        .args(["--json", "self-check"])
        .assert()
        .success();
    let stdout = String::from_utf8_lossy(&out.get_output().stdout).to_string();
    let line = stdout.lines().next().expect("one line");
    let v: serde_json::Value = serde_json::from_str(line).expect("valid json");
    assert_eq!(v["self_check"], "ok");
}

#[test]
fn run_calibrates_measures_and_quits() {
    let cfg = fast_config();
    Command::cargo_bin("carousel")
        .expect("binary")
        .args(["--config", cfg.path().to_str().expect("utf8 path"), "run"])
        .write_stdin("2\nquit\n")
        .timeout(std::time::Duration::from_secs(30))
        .assert()
        .success()
        .stdout(predicate::str::contains("calibrated: turntable at slot 1"))
        .stdout(predicate::str::contains("slot 2 opacity"));
}

#[test]
fn run_rejects_out_of_range_slot() {
    let cfg = fast_config();
    Command::cargo_bin("carousel")
        .expect("binary")
        .args(["--config", cfg.path().to_str().expect("utf8 path"), "run"])
        .write_stdin("7\nquit\n")
        .timeout(std::time::Duration::from_secs(30))
        .assert()
        .success()
        .stdout(predicate::str::contains("rejected"));
}

#[test]
fn invalid_config_fails_fast() {
    let mut f = tempfile::NamedTempFile::new().expect("tempfile");
    write!(f, "[motion]\nmotor_speed = 0\n").expect("write config");
    Command::cargo_bin("carousel")
        .expect("binary")
        .args(["--config", f.path().to_str().expect("utf8 path"), "self-check"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("motor_speed"));
}
