use std::path::PathBuf;
use std::process::Command;

const SCENE: &str = r##"{
    "scene_id": "cli",
    "song": {"artist": "Cli Artist", "title": "Smoke"},
    "lines": [{"text": "hello there", "start": 0.0, "end": 2.0}],
    "words": [
        {"word": "hello", "start": 0.0, "end": 0.8},
        {"word": "there", "start": 0.9, "end": 1.8}
    ],
    "palette": ["#0a0a14", "#ff8800"],
    "song_start": 0.0,
    "song_end": 2.0
}"##;

const TIMELINE: &str = r#"{
    "key_schema": 1,
    "keyframes": [
        {"time_ms": 0, "chunks": [
            {"key": "0:0:0", "x": 40, "y": 60, "font_size": 24, "visible": true}
        ]},
        {"time_ms": 900, "chunks": [
            {"key": "0:0:1", "x": 40, "y": 60, "font_size": 24, "visible": true}
        ]}
    ]
}"#;

fn fixture_dir(name: &str) -> PathBuf {
    let dir = PathBuf::from("target").join("cli_smoke").join(name);
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(dir.join("scene.json"), SCENE).unwrap();
    std::fs::write(dir.join("timeline.json"), TIMELINE).unwrap();
    dir
}

#[test]
fn cli_inspect_reports_coverage() {
    let dir = fixture_dir("inspect");
    let out = Command::new(env!("CARGO_BIN_EXE_lyric-dance"))
        .arg("inspect")
        .arg("--scene")
        .arg(dir.join("scene.json"))
        .arg("--timeline")
        .arg(dir.join("timeline.json"))
        .env("LYRIC_DANCE_HEALTH_SECS", "0")
        .output()
        .unwrap();
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));

    let v: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(v["session_key"], "cli:2");
    assert_eq!(v["words"], 2);
    assert_eq!(v["expected_chunks"], 2);
    assert_eq!(v["keyframes"], 2);
    assert_eq!(v["chunk_entries"], 2);
    assert_eq!(v["unresolved_keys"], 0);
    assert_eq!(v["has_direction"], false);
}

#[test]
fn cli_frame_writes_png() {
    let dir = fixture_dir("frame");
    let out_path = dir.join("out.png");
    let _ = std::fs::remove_file(&out_path);

    let status = Command::new(env!("CARGO_BIN_EXE_lyric-dance"))
        .arg("frame")
        .arg("--scene")
        .arg(dir.join("scene.json"))
        .arg("--timeline")
        .arg(dir.join("timeline.json"))
        .args(["--at", "0.5", "--width", "80", "--height", "120"])
        .arg("--out")
        .arg(&out_path)
        .status()
        .unwrap();
    assert!(status.success());

    let img = image::open(&out_path).unwrap().to_rgba8();
    assert_eq!(img.dimensions(), (80, 120));
    assert!(img.pixels().all(|p| p[3] == 255));
}

#[test]
fn cli_rejects_unknown_ratio() {
    let dir = fixture_dir("ratio");
    let out = Command::new(env!("CARGO_BIN_EXE_lyric-dance"))
        .arg("export")
        .arg("--scene")
        .arg(dir.join("scene.json"))
        .arg("--timeline")
        .arg(dir.join("timeline.json"))
        .args(["--ratio", "4:3"])
        .output()
        .unwrap();
    assert!(!out.status.success());
}
