use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

fn trend_binary() -> PathBuf {
    let mut path = std::env::current_exe().unwrap();
    path.pop(); // remove test binary name
    path.pop(); // remove deps/
    path.push("trend");
    path
}

fn setup_test_env() -> (TempDir, PathBuf) {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().to_path_buf();

    let config_dir = root.join("config");
    fs::create_dir_all(&config_dir).unwrap();

    let catalog = root.join("catalog");
    fs::create_dir_all(catalog.join("categories")).unwrap();
    fs::create_dir_all(catalog.join("collections")).unwrap();

    fs::write(
        catalog.join("collections.jsonl"),
        r#"{"id":"c1","name":"Channel One","popularity":5000}"#,
    )
    .unwrap();
    fs::write(
        catalog.join("categories/10.jsonl"),
        concat!(
            r#"{"id":"v1","title":"건강 무릎 당뇨 이야기","collection_id":"c1","published_at":"2025-11-01T00:00:00Z","duration":"PT3M","views":12000,"likes":300,"comments":20}"#,
            "\n",
            r#"{"id":"v2","title":"plain upload","collection_id":"c2","collection_name":"Two","published_at":"2025-11-02T00:00:00Z","duration":"PT5M","views":90000,"likes":10,"comments":1}"#,
            "\n",
            "not json at all\n",
        ),
    )
    .unwrap();
    fs::write(
        catalog.join("collections/c1.jsonl"),
        r#"{"id":"v3","title":"건강 체조","collection_id":"c1","duration":"PT10M","views":700}"#,
    )
    .unwrap();

    let config_content = format!(
        r#"[db]
path = "{root}/data/trend.sqlite"

[catalog]
root = "{root}/catalog"

[collect]
max_results = 50
archive_dir = "{root}/archive"

[ranking]
limit = 20

[logging]
level = "warn"
"#,
        root = root.display()
    );

    let config_path = config_dir.join("trend.toml");
    fs::write(&config_path, config_content).unwrap();

    (tmp, config_path)
}

fn run_trend(config_path: &Path, args: &[&str]) -> (String, String, Option<i32>) {
    let binary = trend_binary();
    let output = Command::new(&binary)
        .arg("--config")
        .arg(config_path.to_str().unwrap())
        .args(args)
        .env_remove("RUST_LOG")
        .output()
        .unwrap_or_else(|e| panic!("Failed to run trend binary at {:?}: {}", binary, e));

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    (stdout, stderr, output.status.code())
}

#[test]
fn test_init_is_idempotent() {
    let (tmp, config) = setup_test_env();
    let (stdout, stderr, code) = run_trend(&config, &["init"]);
    assert_eq!(code, Some(0), "init failed: {}", stderr);
    assert!(stdout.contains("initialized"));
    assert!(tmp.path().join("data/trend.sqlite").exists());

    let (_, stderr, code) = run_trend(&config, &["init"]);
    assert_eq!(code, Some(0), "second init failed: {}", stderr);
}

#[test]
fn test_collect_and_rank_json() {
    let (tmp, config) = setup_test_env();
    run_trend(&config, &["init"]);

    let (stdout, stderr, code) = run_trend(
        &config,
        &["collect", "categories", "10", "--date", "2025-11-15"],
    );
    assert_eq!(code, Some(0), "collect failed: {}", stderr);
    assert!(stdout.contains("new snapshots: 2"), "stdout: {}", stdout);
    assert!(stdout.contains("ok"));
    assert!(tmp.path().join("archive/2025-11-15/items.jsonl").exists());

    let (stdout, _, code) = run_trend(
        &config,
        &["collect", "categories", "10", "--date", "2025-11-15"],
    );
    assert_eq!(code, Some(0));
    assert!(stdout.contains("new snapshots: 0"), "stdout: {}", stdout);
    assert!(stdout.contains("duplicates: 2"), "stdout: {}", stdout);

    let (stdout, stderr, code) = run_trend(&config, &["rank", "--date", "2025-11-15", "--json"]);
    assert_eq!(code, Some(0), "rank failed: {}", stderr);
    let out: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(out["count"], 2);
    assert_eq!(out["items"][0]["snapshot"]["item_id"], "v1");
    assert_eq!(out["items"][0]["heuristic"]["total"].as_f64(), Some(10.3));
    assert_eq!(out["items"][0]["has_history"], false);
    assert_eq!(out["items"][0]["delta"], 0);

    let (stdout, _, code) = run_trend(
        &config,
        &["rank", "--date", "2025-11-15", "--sort", "views", "--limit", "1", "--json"],
    );
    assert_eq!(code, Some(0));
    let out: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(out["count"], 1);
    assert_eq!(out["items"][0]["snapshot"]["item_id"], "v2");

    let (stdout, _, code) = run_trend(&config, &["rank", "--date", "2025-11-15"]);
    assert_eq!(code, Some(0));
    assert!(stdout.contains("v1"));
    assert!(stdout.contains("2 item(s)"));

    let (stdout, _, code) = run_trend(&config, &["rank", "--date", "2025-01-01"]);
    assert_eq!(code, Some(0));
    assert!(stdout.contains("No results"));
}

#[test]
fn test_invalid_input_exits_with_two() {
    let (_tmp, config) = setup_test_env();
    run_trend(&config, &["init"]);

    let (_, stderr, code) = run_trend(&config, &["rank", "--order", "sideways"]);
    assert_eq!(code, Some(2));
    assert!(stderr.contains("error:"));

    let (_, _, code) = run_trend(&config, &["rank", "--limit", "0"]);
    assert_eq!(code, Some(2));

    let (_, _, code) = run_trend(&config, &["rank", "--source", "galaxy"]);
    assert_eq!(code, Some(2));

    // No active collections yet.
    let (_, stderr, code) = run_trend(&config, &["collect", "collections"]);
    assert_eq!(code, Some(2), "stderr: {}", stderr);

    let (_, _, code) = run_trend(&config, &["collect", "categories", "10", "--max", "99"]);
    assert_eq!(code, Some(2));

    for args in [
        &["rank", "--date", "2025-13-45"][..],
        &["collect", "categories", "10", "--date", "yesterday"][..],
        &["collect", "collections", "--date", "2025/11/15"][..],
    ] {
        let (_, stderr, code) = run_trend(&config, args);
        assert_eq!(code, Some(2), "{:?}: {}", args, stderr);
        assert!(stderr.contains("invalid date"), "stderr: {}", stderr);
    }

    let (_, _, code) = run_trend(&config, &["collections", "add", "c1", "--weight", "-1"]);
    assert_eq!(code, Some(2));
}

#[test]
fn test_archive_failure_keeps_collected_rows() {
    let (tmp, config) = setup_test_env();
    run_trend(&config, &["init"]);
    // A plain file where the archive directory should be.
    fs::write(tmp.path().join("archive"), "").unwrap();

    let (stdout, stderr, code) = run_trend(
        &config,
        &["collect", "categories", "10", "--date", "2025-11-15"],
    );
    assert_eq!(code, Some(1), "stdout: {}", stdout);
    assert!(stderr.contains("archive"), "stderr: {}", stderr);
    assert!(!stdout.contains("ok\n"));

    let (stdout, _, code) = run_trend(&config, &["rank", "--date", "2025-11-15", "--json"]);
    assert_eq!(code, Some(0));
    let out: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(out["count"], 2);
}

#[test]
fn test_collection_weight_and_block() {
    let (_tmp, config) = setup_test_env();
    run_trend(&config, &["init"]);

    let (stdout, stderr, code) = run_trend(
        &config,
        &["collections", "add", "c1", "--weight", "2"],
    );
    assert_eq!(code, Some(0), "add failed: {}", stderr);
    assert!(stdout.contains("added c1 (weight 2.00)"));

    let (stdout, _, _) = run_trend(&config, &["collections", "list"]);
    assert!(stdout.contains("2.00"), "stdout: {}", stdout);

    let (_, stderr, code) = run_trend(
        &config,
        &["collect", "collections", "--date", "2025-11-15"],
    );
    assert_eq!(code, Some(0), "collect failed: {}", stderr);
    let (stdout, _, _) = run_trend(&config, &["show", "v3", "--json"]);
    let detail: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(
        detail["latest"]["heuristic"]["collection"].as_f64(),
        Some(10.0)
    );

    let (stdout, _, code) = run_trend(&config, &["collections", "block", "c1"]);
    assert_eq!(code, Some(0));
    assert!(stdout.contains("blocked c1"));
    let (stdout, _, _) = run_trend(&config, &["collections", "list"]);
    assert!(stdout.contains("blacklisted"));

    // The only active collection is blocked.
    let (_, _, code) = run_trend(&config, &["collect", "collections"]);
    assert_eq!(code, Some(2));

    let (stdout, _, _) = run_trend(&config, &["collections", "unblock", "c1"]);
    assert!(stdout.contains("unblocked c1"));
    let (stdout, _, _) = run_trend(&config, &["collections", "block", "ghost"]);
    assert!(stdout.contains("unknown collection: ghost"));
}

#[test]
fn test_runtime_failure_exits_with_one() {
    let (_tmp, config) = setup_test_env();
    run_trend(&config, &["init"]);

    let (_, stderr, code) = run_trend(&config, &["show", "ghost"]);
    assert_eq!(code, Some(1));
    assert!(stderr.contains("item not found"));

    let (_, _, code) = run_trend(&config, &["stats"]);
    assert_eq!(code, Some(0));

    let (_, _, code) = run_trend(
        &config.with_file_name("missing.toml"),
        &["stats"],
    );
    assert_eq!(code, Some(1));
}

#[test]
fn test_collections_watch_list_and_collection_run() {
    let (tmp, config) = setup_test_env();
    run_trend(&config, &["init"]);

    let (stdout, _, code) = run_trend(
        &config,
        &["collections", "add", "c1", "--name", "Channel One"],
    );
    assert_eq!(code, Some(0));
    assert!(stdout.contains("added c1"));

    let (stdout, _, _) = run_trend(&config, &["collections", "list"]);
    assert!(stdout.contains("c1"));
    assert!(stdout.contains("active"));

    let (stdout, stderr, code) = run_trend(
        &config,
        &["collect", "collections", "--date", "2025-11-15"],
    );
    assert_eq!(code, Some(0), "collect collections failed: {}", stderr);
    assert!(stdout.contains("new snapshots: 1"), "stdout: {}", stdout);
    assert!(tmp
        .path()
        .join("archive/2025-11-15/items_collections.jsonl")
        .exists());

    let (stdout, _, code) = run_trend(
        &config,
        &["collect", "collections", "--date", "2025-11-15", "--skip-collected"],
    );
    assert_eq!(code, Some(0));
    assert!(stdout.contains("skipped (already collected): 1"), "stdout: {}", stdout);

    let (stdout, _, _) = run_trend(
        &config,
        &["rank", "--date", "2025-11-15", "--source", "collection", "--json"],
    );
    let out: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(out["count"], 1);
    assert_eq!(out["items"][0]["snapshot"]["partition"], "collection:c1");

    let (stdout, _, code) = run_trend(&config, &["collections", "remove", "c1"]);
    assert_eq!(code, Some(0));
    assert!(stdout.contains("removed c1"));

    let (_, _, code) = run_trend(&config, &["collect", "collections"]);
    assert_eq!(code, Some(2));
}

#[test]
fn test_label_and_unlabeled() {
    let (_tmp, config) = setup_test_env();
    run_trend(&config, &["init"]);
    run_trend(
        &config,
        &["collect", "categories", "10", "--date", "2025-11-15"],
    );

    let (stdout, _, code) = run_trend(&config, &["unlabeled"]);
    assert_eq!(code, Some(0));
    assert!(stdout.contains("v1"));
    assert!(stdout.contains("v2"));

    let (stdout, stderr, code) = run_trend(
        &config,
        &["label", "v1", "--yes", "--by", "reviewer", "--notes", "clear fit"],
    );
    assert_eq!(code, Some(0), "label failed: {}", stderr);
    assert!(stdout.contains("labeled v1 as yes"));

    let (stdout, _, _) = run_trend(&config, &["unlabeled"]);
    assert!(!stdout.contains("v1"));
    assert!(stdout.contains("v2"));

    let (stdout, _, code) = run_trend(&config, &["show", "v1", "--json"]);
    assert_eq!(code, Some(0));
    let detail: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(detail["item"]["id"], "v1");
    assert_eq!(detail["labels"][0]["is_target"], true);
    assert_eq!(detail["labels"][0]["labeled_by"], "reviewer");

    let (stdout, _, code) = run_trend(&config, &["show", "v1"]);
    assert_eq!(code, Some(0));
    assert!(stdout.contains("--- Item ---"));
    assert!(stdout.contains("heuristic:  10.30"));

    let (_, stderr, code) = run_trend(&config, &["label", "ghost", "--no"]);
    assert_eq!(code, Some(1));
    assert!(stderr.contains("item not found"));

    let (stdout, _, _) = run_trend(&config, &["stats"]);
    assert!(stdout.contains("Items:        2"));
    assert!(stdout.contains("Labels:       1"));
    assert!(stdout.contains("2025-11-15"));
}
