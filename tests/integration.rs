mod common;

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

use common::CARS_CSV;

fn carbench_binary() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_carbench"))
}

fn setup_test_env() -> (TempDir, PathBuf) {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().to_path_buf();

    let config_dir = root.join("config");
    fs::create_dir_all(&config_dir).unwrap();
    fs::write(root.join("cars.csv"), CARS_CSV).unwrap();

    let config_content = format!(
        r#"[dataset]
path = "{root}/cars.csv"

[index]
path = "{root}/data/index.sqlite"
collection = "cars"
batch_size = 2

[embedding]
provider = "hash"
dims = 4096

[retrieval]
top_k = 3

[generation]
local_url = "http://127.0.0.1:9"
timeout_secs = 5
"#,
        root = root.display()
    );

    let config_path = config_dir.join("carbench.toml");
    fs::write(&config_path, config_content).unwrap();

    (tmp, config_path)
}

fn command(config_path: &Path, args: &[&str]) -> Command {
    let mut cmd = Command::new(carbench_binary());
    cmd.arg("--config")
        .arg(config_path)
        .args(args)
        .env_remove("OPENAI_API_KEY")
        .env_remove("GOOGLE_API_KEY")
        .env_remove("RUST_LOG");
    cmd
}

fn run(mut cmd: Command) -> (String, String, bool) {
    let output = cmd
        .output()
        .unwrap_or_else(|e| panic!("Failed to run carbench binary: {}", e));
    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    (stdout, stderr, output.status.success())
}

fn run_carbench(config_path: &Path, args: &[&str]) -> (String, String, bool) {
    run(command(config_path, args))
}

#[test]
fn test_init_creates_database() {
    let (tmp, config_path) = setup_test_env();

    let (stdout, stderr, success) = run_carbench(&config_path, &["init"]);
    assert!(success, "init failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("initialized"));
    assert!(tmp.path().join("data/index.sqlite").exists());
}

#[test]
fn test_init_idempotent() {
    let (_tmp, config_path) = setup_test_env();

    let (_, _, first) = run_carbench(&config_path, &["init"]);
    assert!(first, "First init failed");
    let (_, _, second) = run_carbench(&config_path, &["init"]);
    assert!(second, "Second init failed (not idempotent)");
}

#[test]
fn test_ingest_and_stats() {
    let (_tmp, config_path) = setup_test_env();

    let (stdout, stderr, success) = run_carbench(&config_path, &["ingest", "--progress", "off"]);
    assert!(success, "ingest failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("Indexed 5 documents into collection 'cars'."));

    let (stdout, stderr, success) = run_carbench(&config_path, &["stats"]);
    assert!(success, "stats failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("Collection:  cars"));
    assert!(stdout.contains("Model:       hash-v1 (4096 dims)"));
    assert!(stdout.contains("Documents:   5"));
}

#[test]
fn test_reingest_replaces_collection() {
    let (_tmp, config_path) = setup_test_env();

    run_carbench(&config_path, &["ingest", "--progress", "off"]);
    let (stdout, _, success) = run_carbench(&config_path, &["ingest", "--progress", "off"]);
    assert!(success);
    assert!(stdout.contains("Indexed 5 documents"));

    let (stdout, _, _) = run_carbench(&config_path, &["stats"]);
    assert!(stdout.contains("Documents:   5"), "duplicates after reingest: {}", stdout);
}

#[test]
fn test_ingest_json_progress_on_stderr() {
    let (_tmp, config_path) = setup_test_env();

    let (stdout, stderr, success) =
        run_carbench(&config_path, &["ingest", "--progress", "json"]);
    assert!(success, "ingest failed: {}", stderr);
    assert!(!stdout.contains("\"event\""));

    let writes: Vec<serde_json::Value> = stderr
        .lines()
        .filter_map(|l| serde_json::from_str::<serde_json::Value>(l).ok())
        .filter(|v| v["phase"] == "writing")
        .collect();
    // batch_size = 2 over 5 documents
    assert_eq!(writes.len(), 3);
    assert_eq!(writes[2]["n"], 5);
    assert_eq!(writes[2]["total"], 5);
}

#[test]
fn test_ingest_dataset_override() {
    let (tmp, config_path) = setup_test_env();
    let other = tmp.path().join("one.jsonl");
    fs::write(
        &other,
        r#"{"Make":"Toyota","Model":"86","Year":2017,"Engine Fuel Type":"premium unleaded (required)","Engine HP":205.0,"Engine Cylinders":4.0,"Transmission Type":"MANUAL","Driven_Wheels":"rear wheel drive","Number of Doors":2.0,"Market Category":"Performance","Vehicle Size":"Compact","Vehicle Style":"Coupe","highway MPG":30,"city mpg":21,"Popularity":2031,"MSRP":26255}
"#,
    )
    .unwrap();

    let (stdout, stderr, success) = run_carbench(
        &config_path,
        &["ingest", "--dataset", other.to_str().unwrap(), "--progress", "off"],
    );
    assert!(success, "ingest failed: {}", stderr);
    assert!(stdout.contains("Indexed 1 documents"));
}

#[test]
fn test_ingest_missing_dataset_fails() {
    let (_tmp, config_path) = setup_test_env();
    let (_, stderr, success) = run_carbench(
        &config_path,
        &["ingest", "--dataset", "/nonexistent/cars.csv", "--progress", "off"],
    );
    assert!(!success);
    assert!(stderr.contains("failed to load dataset"));
}

#[test]
fn test_retrieve_prints_context() {
    let (_tmp, config_path) = setup_test_env();
    run_carbench(&config_path, &["ingest", "--progress", "off"]);

    let (stdout, stderr, success) = run_carbench(
        &config_path,
        &["retrieve", "2017 Toyota 86 horsepower", "--k", "1"],
    );
    assert!(success, "retrieve failed: {}", stderr);
    assert!(stdout.contains("The 2017 Toyota 86 is a Compact Coupe with 2 doors."));
    assert!(stdout.contains("205 HP"));
    assert!(!stdout.contains("Tesla"));
}

#[test]
fn test_retrieve_before_ingest_fails() {
    let (_tmp, config_path) = setup_test_env();
    let (_, stderr, success) = run_carbench(&config_path, &["retrieve", "anything"]);
    assert!(!success);
    assert!(stderr.contains("collection not found"), "{}", stderr);
}

#[test]
fn test_backend_precedence_from_env() {
    let (_tmp, config_path) = setup_test_env();

    let (stdout, _, success) = run_carbench(&config_path, &["backend"]);
    assert!(success);
    assert_eq!(stdout.trim(), "local");

    let mut cmd = command(&config_path, &["backend"]);
    cmd.env("GOOGLE_API_KEY", "g-test");
    let (stdout, _, _) = run(cmd);
    assert_eq!(stdout.trim(), "gemini");

    let mut cmd = command(&config_path, &["backend"]);
    cmd.env("GOOGLE_API_KEY", "g-test").env("OPENAI_API_KEY", "sk-test");
    let (stdout, _, _) = run(cmd);
    assert_eq!(stdout.trim(), "openai");

    let mut cmd = command(&config_path, &["backend"]);
    cmd.env("OPENAI_API_KEY", "");
    let (stdout, _, _) = run(cmd);
    assert_eq!(stdout.trim(), "local");
}

#[test]
fn test_ask_with_unreachable_local_backend_fails() {
    let (_tmp, config_path) = setup_test_env();
    run_carbench(&config_path, &["ingest", "--progress", "off"]);

    let (stdout, stderr, success) = run_carbench(&config_path, &["ask", "What is the MSRP of the Toyota 86?"]);
    assert!(!success, "ask unexpectedly succeeded: {}", stdout);
    assert!(stderr.contains("local backend unavailable"), "{}", stderr);
}

#[test]
fn test_missing_config_uses_defaults() {
    let tmp = TempDir::new().unwrap();
    let (stdout, stderr, success) =
        run_carbench(&tmp.path().join("absent.toml"), &["backend"]);
    assert!(success, "backend failed: {}", stderr);
    assert_eq!(stdout.trim(), "local");
}

#[test]
fn test_invalid_config_rejected() {
    let tmp = TempDir::new().unwrap();
    let config_path = tmp.path().join("bad.toml");
    fs::write(&config_path, "[index]\nbatch_size = 5000\n").unwrap();
    let (_, _, success) = run_carbench(&config_path, &["backend"]);
    assert!(!success);
}
