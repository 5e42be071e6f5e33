use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

fn rostersync() -> Command {
    Command::cargo_bin("rostersync").unwrap()
}

const ROSTER: &str = r#"{"L1":[{"employeeId":42,"fullName":"Ada Byron"},{"employeeId":77,"fullName":"Grace Hopper"}]}"#;

const TEMPLATES: &str = r#"{"L1":[{"templateId":7,"startLocal":"08:00","endLocal":"20:00","durationMinutes":720,"amount":1500}]}"#;

const SCHEDULE: &str = r#"{"items":[{"remoteId":"R1","employeeId":42,"dueInstant":"2026-08-05T08:00:00Z","durationMinutes":720,"templateId":7,"amount":1500,"departments":["L1"]}]}"#;

fn setup_workspace(display_offset_minutes: i32) -> TempDir {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("roster.json"), ROSTER).unwrap();
    fs::write(dir.path().join("templates.json"), TEMPLATES).unwrap();
    fs::write(dir.path().join("schedule-2026-08.json"), SCHEDULE).unwrap();
    let config = format!(
        "display_offset_minutes = {}\nnamespace = \"{}\"\ndata_dir = \"{}\"\n",
        display_offset_minutes,
        dir.path().display(),
        dir.path().join("data").display()
    );
    fs::write(dir.path().join(".rostersync.toml"), config).unwrap();
    dir
}

#[test]
fn test_grid_shows_baseline_shifts() {
    let dir = setup_workspace(0);

    rostersync()
        .args([
            "grid",
            "--year",
            "2026",
            "--month",
            "8",
            "--root",
            dir.path().to_str().unwrap(),
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("L1 2026-08"))
        .stdout(predicate::str::contains("Ada Byron (42): 05=08:00-20:00 (1500)"))
        .stdout(predicate::str::contains("Grace Hopper (77): no shifts"));
}

#[test]
fn test_grid_respects_display_offset() {
    let dir = setup_workspace(180);

    rostersync()
        .args([
            "grid",
            "--year",
            "2026",
            "--month",
            "8",
            "--root",
            dir.path().to_str().unwrap(),
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("05=11:00-23:00 (1500)"));
}

#[test]
fn test_grid_unknown_line() {
    let dir = setup_workspace(0);

    rostersync()
        .args([
            "grid",
            "--year",
            "2026",
            "--month",
            "8",
            "--line",
            "L9",
            "--root",
            dir.path().to_str().unwrap(),
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("unknown line: L9"));
}

#[test]
fn test_grid_json_format() {
    let dir = setup_workspace(0);

    rostersync()
        .args([
            "grid",
            "--year",
            "2026",
            "--month",
            "8",
            "--line",
            "L1",
            "--format",
            "json",
            "--root",
            dir.path().to_str().unwrap(),
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"line\": \"L1\""))
        .stdout(predicate::str::contains("\"remote_id\": \"R1\""));
}

#[test]
fn test_grid_reflects_pending_edit() {
    let dir = setup_workspace(0);
    let root = dir.path().to_str().unwrap().to_string();

    rostersync()
        .args([
            "overlay", "set", "--line", "L1", "--year", "2026", "--month", "8",
            "--employee", "42", "--day", "5", "--start", "09:00", "--end", "21:00",
            "--root", &root,
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("recorded pending shift at L1:2026-08:42:05"));

    // Separate invocation: the edit survives on disk and shadows the cell.
    rostersync()
        .args(["grid", "--year", "2026", "--month", "8", "--root", &root])
        .assert()
        .success()
        .stdout(predicate::str::contains("05=09:00-21:00 (1500)"));
}

#[test]
fn test_grid_missing_schedule_file_fails() {
    let dir = setup_workspace(0);

    rostersync()
        .args([
            "grid",
            "--year",
            "2026",
            "--month",
            "9",
            "--root",
            dir.path().to_str().unwrap(),
        ])
        .assert()
        .failure()
        .code(2)
        .stderr(predicate::str::contains("schedule-2026-09.json"));
}

#[test]
fn test_grid_falls_back_to_archived_month() {
    let dir = setup_workspace(0);
    let root = dir.path().to_str().unwrap().to_string();

    rostersync()
        .args(["grid", "--year", "2026", "--month", "8", "--root", &root])
        .assert()
        .success();

    // The payload disappears; the archived copy still renders.
    fs::remove_file(dir.path().join("schedule-2026-08.json")).unwrap();

    rostersync()
        .args(["grid", "--year", "2026", "--month", "8", "--root", &root])
        .assert()
        .success()
        .stdout(predicate::str::contains("05=08:00-20:00 (1500)"))
        .stderr(predicate::str::contains("last-known-good"));
}

#[test]
fn test_plan_never_uses_archived_month() {
    let dir = setup_workspace(0);
    let root = dir.path().to_str().unwrap().to_string();

    rostersync()
        .args(["grid", "--year", "2026", "--month", "8", "--root", &root])
        .assert()
        .success();

    fs::remove_file(dir.path().join("schedule-2026-08.json")).unwrap();

    rostersync()
        .args(["plan", "--year", "2026", "--month", "8", "--line", "L1", "--root", &root])
        .assert()
        .failure()
        .code(2);
}
