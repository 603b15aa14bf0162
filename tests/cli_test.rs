//! CLI contract tests
//!
//! Drives the built binary through init, import, solve, describe and the
//! read-only views, checking that state persists between invocations.

use std::path::Path;
use std::process::{Command, Output};

fn storyline_bin() -> String {
    env!("CARGO_BIN_EXE_storyline").to_string()
}

fn run(dir: &Path, args: &[&str]) -> Output {
    Command::new(storyline_bin())
        .arg("--dir")
        .arg(dir)
        .args(args)
        .current_dir(dir)
        .env_remove("STORYLINE_DB")
        .env_remove("RUST_LOG")
        .output()
        .expect("failed to run storyline binary")
}

fn run_ok(dir: &Path, args: &[&str]) -> String {
    let output = run(dir, args);
    assert!(
        output.status.success(),
        "storyline {:?} failed: {}",
        args,
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8_lossy(&output.stdout).to_string()
}

fn run_json(dir: &Path, args: &[&str]) -> serde_json::Value {
    let mut full = args.to_vec();
    full.extend(["--format", "json"]);
    let stdout = run_ok(dir, &full);
    serde_json::from_str(&stdout).unwrap_or_else(|e| panic!("bad JSON ({}): {}", e, stdout))
}

fn setup() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("story.toml"),
        r#"
[[challenge]]
id = 1
name = "Recon"
category = "osint"

[[challenge]]
id = 3
name = "Root"
predecessors = [2]

[[challenge]]
id = 2
name = "Foothold"
predecessors = [1]
"#,
    )
    .unwrap();

    run_ok(dir.path(), &["init"]);
    assert!(dir.path().join("storyline.toml").exists());
    assert!(dir.path().join("storyline.redb").exists());
    run_ok(dir.path(), &["import", "story.toml"]);
    dir
}

fn status_of(view: &serde_json::Value, id: u64) -> String {
    view["challenges"]
        .as_array()
        .unwrap()
        .iter()
        .find(|c| c["challengeId"] == id)
        .map(|c| c["status"].as_str().unwrap().to_string())
        .unwrap()
}

#[test]
fn test_solve_flow_persists() {
    let dir = setup();
    let path = dir.path();

    let view = run_json(path, &["view", "player", "7"]);
    assert_eq!(status_of(&view, 1), "unlocked");
    assert_eq!(status_of(&view, 2), "locked");

    let solve = run_json(path, &["solve", "--player", "7", "1"]);
    assert_eq!(solve["newlyUnlocked"], serde_json::json!([2]));

    let view = run_json(path, &["view", "player", "7"]);
    assert_eq!(status_of(&view, 1), "solved");
    assert_eq!(status_of(&view, 2), "unlocked");
}

#[test]
fn test_locked_solve_fails() {
    let dir = setup();
    let output = run(dir.path(), &["solve", "--player", "7", "3"]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("locked"), "stderr: {}", stderr);
}

#[test]
fn test_describe_and_list_solutions() {
    let dir = setup();
    let path = dir.path();

    assert!(!run(path, &["describe", "--player", "4", "1", "whois lookup"])
        .status
        .success());

    run_ok(path, &["solve", "--player", "4", "1"]);
    run_ok(path, &["describe", "--player", "4", "1", "whois lookup"]);
    run_ok(path, &["finalize", "--player", "4", "1"]);

    let solutions = run_json(path, &["solutions"]);
    assert_eq!(solutions[0]["text"], "whois lookup");
    assert_eq!(solutions[0]["finalized"], true);
}

#[test]
fn test_cycle_rejected_by_challenge_update() {
    let dir = setup();
    let path = dir.path();

    let output = run(path, &["challenge", "update", "1", "--after", "3"]);
    assert!(!output.status.success());

    let graph = run_json(path, &["view", "graph"]);
    assert_eq!(graph["edges"].as_array().unwrap().len(), 2);
    assert_eq!(graph["roots"], serde_json::json!([1]));
}

#[test]
fn test_admin_view_candidates() {
    let dir = setup();
    let admin = run_json(dir.path(), &["view", "admin", "--editing", "2"]);
    assert_eq!(admin["candidatePredecessors"], serde_json::json!([1]));
}

#[test]
fn test_validate_definition_file() {
    let dir = setup();
    let path = dir.path();
    std::fs::write(
        path.join("broken.toml"),
        "[[challenge]]\nid = 1\npredecessors = [2]\n\n[[challenge]]\nid = 2\npredecessors = [1]\n",
    )
    .unwrap();

    run_ok(path, &["validate"]);

    let output = run(path, &["validate", "--file", "broken.toml", "--format", "json"]);
    assert!(!output.status.success());
    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["valid"], false);
}

#[test]
fn test_status_and_progress() {
    let dir = setup();
    let path = dir.path();
    run_ok(path, &["solve", "--player", "1", "1"]);

    let status = run_json(path, &["status"]);
    assert_eq!(status["stats"]["totalChallenges"], 3);
    assert_eq!(status["stats"]["maxDepth"], 3);

    let progress = run_json(path, &["progress"]);
    assert_eq!(progress[0]["solvedCount"], 1);
    assert_eq!(progress[0]["unlockedCount"], 2);
}

#[test]
fn test_graph_version_keeps_counting() {
    let dir = setup();
    let path = dir.path();

    let added = run_json(path, &["challenge", "add", "4", "--name", "Extra"]);
    assert_eq!(added["version"], 2);
    let added = run_json(path, &["challenge", "add", "5", "--name", "More", "--after", "4"]);
    assert_eq!(added["version"], 3);

    let graph = run_json(path, &["view", "graph"]);
    assert_eq!(graph["version"], 3);
}
