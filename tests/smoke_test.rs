/// Smoke tests to verify the binary runs without panicking
use std::process::Command;

fn netwatch() -> Command {
    Command::new(env!("CARGO_BIN_EXE_netwatch"))
}

#[test]
fn binary_shows_help() {
    let output = netwatch()
        .arg("--help")
        .output()
        .expect("Failed to execute netwatch");

    assert!(
        output.status.success(),
        "Binary failed to run --help: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("netwatch"), "Help output should mention netwatch");
    assert!(stdout.contains("snapshot"), "Help output should list the snapshot command");
}

#[test]
fn binary_shows_version() {
    let output = netwatch()
        .arg("--version")
        .output()
        .expect("Failed to execute netwatch");

    assert!(
        output.status.success(),
        "Binary failed to run --version: {}",
        String::from_utf8_lossy(&output.stderr)
    );
}

#[test]
fn invalid_subcommand_fails_gracefully() {
    let output = netwatch()
        .arg("nonexistent-command")
        .output()
        .expect("Failed to execute netwatch");

    // Should fail with error, not panic
    assert!(
        !output.status.success(),
        "Invalid subcommand should return error status"
    );

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        !stderr.contains("panicked at"),
        "Invalid subcommand should not cause panic"
    );
}

#[test]
fn themes_lists_all_builtins() {
    let output = netwatch().arg("themes").output().expect("Failed to execute netwatch");
    assert!(output.status.success());

    let stdout = String::from_utf8_lossy(&output.stdout);
    for id in ["cyber", "light", "matrix", "midnight", "geography"] {
        assert!(stdout.contains(id), "missing theme {}", id);
    }
}

#[test]
fn snapshot_writes_png_headlessly() {
    let out = std::env::temp_dir().join(format!("netwatch-smoke-{}.png", std::process::id()));
    let _ = std::fs::remove_file(&out);

    let output = netwatch()
        .args(["snapshot", "--no-geography", "--seed", "3", "--ticks", "5", "--width", "64", "--height", "48"])
        .arg("--out")
        .arg(&out)
        .output()
        .expect("Failed to execute netwatch");

    assert!(
        output.status.success(),
        "snapshot failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    assert!(out.exists(), "snapshot did not write {}", out.display());
    let _ = std::fs::remove_file(&out);
}

#[test]
fn snapshot_clamps_oversized_density() {
    let out = std::env::temp_dir().join(format!("netwatch-smoke-dense-{}.png", std::process::id()));
    let output = netwatch()
        .args(["snapshot", "--no-geography", "--ticks", "1", "--width", "16", "--height", "12"])
        .args(["--density", "10000000"])
        .arg("--out")
        .arg(&out)
        .output()
        .expect("Failed to execute netwatch");

    assert!(
        output.status.success(),
        "oversized density should be clamped: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    assert!(!String::from_utf8_lossy(&output.stderr).contains("panicked at"));
    let _ = std::fs::remove_file(&out);
}

#[test]
fn snapshot_rejects_unknown_theme() {
    let out = std::env::temp_dir().join(format!("netwatch-smoke-bad-{}.png", std::process::id()));
    let output = netwatch()
        .args(["snapshot", "--no-geography", "--theme", "sepia", "--ticks", "1"])
        .arg("--out")
        .arg(&out)
        .output()
        .expect("Failed to execute netwatch");

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("unknown theme"));
    assert!(!stderr.contains("panicked at"));
}
