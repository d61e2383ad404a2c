use std::path::PathBuf;
use std::process::Command;

fn exe() -> PathBuf {
    std::env::var_os("CARGO_BIN_EXE_timewarp")
        .map(PathBuf::from)
        .unwrap_or_else(|| {
            let mut p = PathBuf::from("target").join("debug");
            p.push(if cfg!(windows) {
                "timewarp.exe"
            } else {
                "timewarp"
            });
            p
        })
}

#[test]
fn stats_on_missing_input_fails() {
    let output = Command::new(exe())
        .args(["stats", "--in", "target/cli_smoke/does-not-exist.mp4"])
        .output()
        .unwrap();
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("does-not-exist.mp4"), "{stderr}");
}

#[test]
fn warp_rejects_bad_scale_before_opening_input() {
    let status = Command::new(exe())
        .args([
            "warp",
            "--in",
            "target/cli_smoke/missing.mp4",
            "--out",
            "target/cli_smoke/out.mp4",
            "--scale-x",
            "0",
        ])
        .status()
        .unwrap();
    assert!(!status.success());
}

#[test]
fn cut_rejects_inverted_range() {
    let status = Command::new(exe())
        .args([
            "cut",
            "--in",
            "target/cli_smoke/missing.mp4",
            "--out",
            "target/cli_smoke/out.mp4",
            "--first",
            "10",
            "--last",
            "5",
        ])
        .status()
        .unwrap();
    assert!(!status.success());
}

#[test]
fn warp_config_file_with_unknown_field_fails() {
    let dir = PathBuf::from("target").join("cli_smoke");
    std::fs::create_dir_all(&dir).unwrap();
    let cfg_path = dir.join("bad_warp.json");
    std::fs::write(
        &cfg_path,
        r#"{"input":"in.mp4","output":"out.mp4","frobnicate":true}"#,
    )
    .unwrap();

    let output = Command::new(exe())
        .args(["warp", "--config"])
        .arg(&cfg_path)
        .output()
        .unwrap();
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("parse config"), "{stderr}");
}
