use std::path::{Path, PathBuf};
use std::process::{Command, Output};

fn bin() -> String {
    std::env::var("CARGO_BIN_EXE_touchline").unwrap_or_else(|_| {
        PathBuf::from(env!("CARGO_MANIFEST_DIR"))
            .join("../../target/debug/touchline")
            .to_string_lossy()
            .to_string()
    })
}

/// Run the binary inside `dir` so no stray `touchline.toml` is picked up.
fn touchline(dir: &Path, args: &[&str]) -> Output {
    Command::new(bin())
        .current_dir(dir)
        .env("RUST_LOG", "warn")
        .args(args)
        .output()
        .expect("failed to spawn touchline")
}

fn new_crop_track(dir: &Path, name: &str) -> PathBuf {
    let output = touchline(
        dir,
        &["new", "--kind", "crop", "--total-frames", "300", "-o", name],
    );
    assert!(
        output.status.success(),
        "new failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    dir.join(name)
}

#[test]
fn new_track_passes_check() {
    let dir = tempfile::tempdir().unwrap();
    let track = new_crop_track(dir.path(), "crop.json");

    let json: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&track).unwrap()).unwrap();
    assert_eq!(json["kind"], "crop");
    assert_eq!(json["totalFrames"], 300);
    assert_eq!(json["keyframes"].as_array().unwrap().len(), 2);

    let output = touchline(dir.path(), &["check", "crop.json"]);
    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(stdout.contains("Invariants OK"), "unexpected output: {stdout}");
}

#[test]
fn sample_prints_one_json_line_per_frame() {
    let dir = tempfile::tempdir().unwrap();
    new_crop_track(dir.path(), "crop.json");

    let output = touchline(dir.path(), &["sample", "crop.json", "--frame", "42"]);
    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).unwrap();
    let lines: Vec<&str> = stdout.lines().collect();
    assert_eq!(lines.len(), 1, "stdout: {stdout:?}");

    let value: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
    assert_eq!(value["frame"], 42);
    assert_eq!(value["width"], 1920.0);
    assert_eq!(value["height"], 1080.0);

    let output = touchline(
        dir.path(),
        &["sample", "crop.json", "--from", "0", "--to", "99", "--step", "10"],
    );
    assert!(output.status.success());
    assert_eq!(String::from_utf8(output.stdout).unwrap().lines().count(), 10);
}

#[test]
fn replay_applies_actions_and_saves() {
    let dir = tempfile::tempdir().unwrap();
    new_crop_track(dir.path(), "crop.json");
    std::fs::write(
        dir.path().join("actions.json"),
        r#"[
            {"type": "ADD_KEYFRAME", "frame": 150, "payload": {"x": 480.0, "y": 0.0, "width": 960.0, "height": 1080.0}},
            {"type": "REMOVE_KEYFRAME", "frame": 0},
            {"type": "MOVE_KEYFRAME", "from": 150, "to": 120}
        ]"#,
    )
    .unwrap();

    let output = touchline(
        dir.path(),
        &["replay", "crop.json", "actions.json", "-o", "out.json"],
    );
    assert!(
        output.status.success(),
        "replay failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(stdout.contains("2 applied, 0 no-op, 1 rejected"), "{stdout}");

    let out: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(dir.path().join("out.json")).unwrap())
            .unwrap();
    let frames: Vec<u64> = out["keyframes"]
        .as_array()
        .unwrap()
        .iter()
        .map(|kf| kf["frame"].as_u64().unwrap())
        .collect();
    assert_eq!(frames, vec![0, 120, 299]);
}

#[test]
fn sample_clamps_range_to_last_frame() {
    let dir = tempfile::tempdir().unwrap();
    new_crop_track(dir.path(), "crop.json");

    let output = touchline(
        dir.path(),
        &[
            "sample",
            "crop.json",
            "--from",
            "290",
            "--to",
            "18446744073709551615",
        ],
    );
    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).unwrap();
    let frames: Vec<u64> = stdout
        .lines()
        .map(|l| serde_json::from_str::<serde_json::Value>(l).unwrap()["frame"].as_u64().unwrap())
        .collect();
    assert_eq!(frames, (290..=299).collect::<Vec<u64>>());
}

#[test]
fn replay_ending_mid_trim_keeps_hidden_keyframes() {
    let dir = tempfile::tempdir().unwrap();
    new_crop_track(dir.path(), "crop.json");
    std::fs::write(
        dir.path().join("actions.json"),
        r#"[
            {"type": "ADD_KEYFRAME", "frame": 10, "payload": {"x": 100.0, "y": 0.0, "width": 960.0, "height": 1080.0}},
            {"type": "ADD_KEYFRAME", "frame": 250, "payload": {"x": 300.0, "y": 0.0, "width": 960.0, "height": 1080.0}},
            {"type": "START_TRIM", "start": 30, "end": 200}
        ]"#,
    )
    .unwrap();

    let output = touchline(
        dir.path(),
        &["replay", "crop.json", "actions.json", "-o", "out.json"],
    );
    assert!(output.status.success());

    let out: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(dir.path().join("out.json")).unwrap())
            .unwrap();
    let frames: Vec<u64> = out["keyframes"]
        .as_array()
        .unwrap()
        .iter()
        .map(|kf| kf["frame"].as_u64().unwrap())
        .collect();
    assert_eq!(frames, vec![0, 10, 250, 299]);
}

#[test]
fn check_fails_on_unsorted_keyframes() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("bad.json"),
        r#"{
            "kind": "crop",
            "totalFrames": 300,
            "keyframes": [
                {"frame": 0, "origin": "permanent", "x": 0.0, "y": 0.0, "width": 1.0, "height": 1.0},
                {"frame": 200, "origin": "user", "x": 0.0, "y": 0.0, "width": 1.0, "height": 1.0},
                {"frame": 100, "origin": "user", "x": 0.0, "y": 0.0, "width": 1.0, "height": 1.0},
                {"frame": 299, "origin": "permanent", "x": 0.0, "y": 0.0, "width": 1.0, "height": 1.0}
            ]
        }"#,
    )
    .unwrap();

    let output = touchline(dir.path(), &["check", "bad.json"]);
    assert!(!output.status.success());
    let stderr = String::from_utf8(output.stderr).unwrap();
    assert!(stderr.contains("failed to restore keyframes"), "{stderr}");
}

#[test]
fn init_config_writes_a_loadable_file() {
    let dir = tempfile::tempdir().unwrap();
    let output = touchline(dir.path(), &["init-config"]);
    assert!(output.status.success());
    assert!(dir.path().join("touchline.toml").exists());

    // Refuses to overwrite without --force.
    let output = touchline(dir.path(), &["init-config"]);
    assert!(!output.status.success());

    // `info` now reports the file it picked up.
    let output = touchline(dir.path(), &["info"]);
    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(stdout.contains("touchline.toml"), "{stdout}");
    assert!(stdout.contains("Interpolation:  linear"), "{stdout}");
}
