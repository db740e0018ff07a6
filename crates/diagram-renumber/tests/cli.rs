use std::fs;
use std::path::Path;
use std::process::{Command, Output, Stdio};

const FIXTURE: &str = concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/tests/fixtures/system_architecture.xml"
);
const EXPECTED: &str = concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/tests/fixtures/system_architecture_fixed.xml"
);

fn run_in(dir: &Path, args: &[&str]) -> Output {
    Command::new(assert_cmd::cargo::cargo_bin!("diagram-renumber"))
        .current_dir(dir)
        .args(args)
        .env_remove("RUST_LOG")
        .output()
        .expect("run diagram-renumber")
}

#[test]
fn no_arguments_use_default_file_names() {
    let tmp = tempfile::tempdir().expect("temp dir");
    fs::copy(FIXTURE, tmp.path().join("system_architecture.xml")).expect("copy fixture");

    let output = run_in(tmp.path(), &[]);
    assert!(
        output.status.success(),
        "stderr:\n{}",
        String::from_utf8_lossy(&output.stderr)
    );

    let written = fs::read_to_string(tmp.path().join("system_architecture_fixed.xml"))
        .expect("read output");
    assert_eq!(written, fs::read_to_string(EXPECTED).expect("read expected"));

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("mapped=9"), "{stdout}");
    assert!(stdout.contains("legacy-ldap-removed"), "{stdout}");
}

#[test]
fn missing_input_fails_without_creating_output() {
    let tmp = tempfile::tempdir().expect("temp dir");

    let output = run_in(tmp.path(), &[]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("system_architecture.xml"), "{stderr}");
    assert!(!tmp.path().join("system_architecture_fixed.xml").exists());
}

#[test]
fn unwritable_output_fails() {
    let tmp = tempfile::tempdir().expect("temp dir");
    fs::copy(FIXTURE, tmp.path().join("in.xml")).expect("copy fixture");
    fs::write(tmp.path().join("blocker"), b"not a directory").expect("write blocker");

    let output = run_in(tmp.path(), &["in.xml", "blocker/out.xml"]);
    assert!(!output.status.success());
    assert!(
        String::from_utf8_lossy(&output.stderr).contains("failed to write"),
        "stderr:\n{}",
        String::from_utf8_lossy(&output.stderr)
    );
}

#[test]
fn map_out_and_json_summary() {
    let tmp = tempfile::tempdir().expect("temp dir");
    fs::copy(FIXTURE, tmp.path().join("in.xml")).expect("copy fixture");

    let output = run_in(
        tmp.path(),
        &["in.xml", "out.xml", "--map-out", "ids.json", "--format", "json"],
    );
    assert!(
        output.status.success(),
        "stderr:\n{}",
        String::from_utf8_lossy(&output.stderr)
    );

    let summary: serde_json::Value = serde_json::from_slice(&output.stdout).expect("json summary");
    assert_eq!(summary["mapped_ids"], 9);
    assert_eq!(summary["rewritten_attributes"], 17);
    assert_eq!(summary["map_out"], "ids.json");

    let table = fs::read_to_string(tmp.path().join("ids.json")).expect("read table");
    let table: serde_json::Value = serde_json::from_str(&table).expect("json table");
    assert_eq!(table["gateway-7Xq"], "2");
    assert_eq!(table["edge-legacy"], "10");
    assert!(table.get("legacy-ldap-removed").is_none());
}

#[test]
fn quiet_prints_nothing() {
    let tmp = tempfile::tempdir().expect("temp dir");
    fs::copy(FIXTURE, tmp.path().join("in.xml")).expect("copy fixture");

    let output = run_in(tmp.path(), &["--quiet", "in.xml", "out.xml"]);
    assert!(output.status.success());
    assert!(output.stdout.is_empty());
    assert!(tmp.path().join("out.xml").exists());
}

#[test]
fn does_not_fail_on_broken_pipe() {
    let tmp = tempfile::tempdir().expect("temp dir");
    fs::copy(FIXTURE, tmp.path().join("in.xml")).expect("copy fixture");

    let mut child = Command::new(assert_cmd::cargo::cargo_bin!("diagram-renumber"))
        .current_dir(tmp.path())
        .args(["in.xml", "out.xml"])
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("spawn diagram-renumber");

    // Closing the read end forces stdout writes to return EPIPE / BrokenPipe.
    drop(child.stdout.take());

    let output = child.wait_with_output().expect("wait for diagram-renumber");
    assert!(
        output.status.success(),
        "expected success even when stdout is closed\nstderr:\n{}",
        String::from_utf8_lossy(&output.stderr)
    );
    assert!(tmp.path().join("out.xml").exists());
}
