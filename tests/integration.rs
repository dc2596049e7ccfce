use serde_json::{json, Value};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::TempDir;

fn hymnal_binary() -> PathBuf {
    let mut path = std::env::current_exe().unwrap();
    path.pop(); // remove test binary name
    path.pop(); // remove deps/
    path.push("hymnal");
    path
}

/// A nested-object document: two major groups, three hymns, one blank hymn.
fn backing_document() -> Value {
    json!({
        "Mandala 1": {
            "Sukta 1": [
                {"samhita": {"devanagari": {"text": "अग्निमीळे पुरोहितं"}},
                 "padapatha": {"transliteration": {"text": "agnim īḷe purohitam"}},
                 "translation": "I glorify Agni, the household priest"},
                {"translation": "Agni, worthy of praise by ancient seers"}
            ],
            "Sukta 2": [
                {"translation": "Beautiful Vayu, come, these Soma drops are ready"}
            ]
        },
        "Mandala 9": {
            "Sukta 1": [{"translation": "Flow, Soma, in sweetest stream"}],
            "Sukta 2": [{"translation": ""}]
        }
    })
}

fn setup_test_env() -> (TempDir, PathBuf) {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().to_path_buf();

    let config_dir = root.join("config");
    fs::create_dir_all(&config_dir).unwrap();
    let dataset_dir = root.join("dataset");
    fs::create_dir_all(&dataset_dir).unwrap();
    let mirror_dir = root.join("mirror");
    fs::create_dir_all(&mirror_dir).unwrap();

    fs::write(
        dataset_dir.join("rigveda.json"),
        serde_json::to_string_pretty(&backing_document()).unwrap(),
    )
    .unwrap();

    // Two mirrors carrying the same verse, plus one JSON Lines source.
    let record = r#"[{"reference": "RV 1.1.1", "english": "I glorify Agni..."}]"#;
    fs::write(mirror_dir.join("a.json"), record).unwrap();
    fs::write(mirror_dir.join("b.json"), record).unwrap();
    fs::write(
        mirror_dir.join("c.jsonl"),
        "{\"ref\": \"RV 1.2.1\", \"en\": \"Beautiful Vayu, come\", \"rishi\": \"Madhuchchhandas\"}\n\
         {\"ref\": \"RV 1.2.2\", \"en\": \"these Soma drops are ready\"}\n",
    )
    .unwrap();

    let config_content = format!(
        r#"[corpus]
path = "{root}/dataset/rigveda.json"

[server]
bind = "127.0.0.1:7341"

[query]
default_page_size = 2

[refresh]
output = "{root}/dataset/hymns_refreshed.json"
timeout_secs = 5

[[refresh.sources]]
name = "mirror-a"
path = "{root}/mirror/a.json"

[[refresh.sources]]
name = "mirror-b"
path = "{root}/mirror/b.json"

[[refresh.sources]]
name = "mirror-c"
path = "{root}/mirror/c.jsonl"

[[refresh.sources]]
name = "gone"
path = "{root}/mirror/missing.json"
"#,
        root = root.display()
    );

    let config_path = config_dir.join("hymnal.toml");
    fs::write(&config_path, config_content).unwrap();

    (tmp, config_path)
}

fn run_hymnal(config_path: &Path, args: &[&str]) -> Output {
    let binary = hymnal_binary();
    Command::new(&binary)
        .arg("--config")
        .arg(config_path.to_str().unwrap())
        .args(args)
        .output()
        .unwrap_or_else(|e| panic!("Failed to run hymnal binary at {:?}: {}", binary, e))
}

fn stdout_of(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).to_string()
}

fn stderr_of(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).to_string()
}

fn assert_success(output: &Output) {
    assert!(
        output.status.success(),
        "command failed: stdout={}, stderr={}",
        stdout_of(output),
        stderr_of(output)
    );
}

fn backups_of(dir: &Path, file_name: &str) -> Vec<PathBuf> {
    let prefix = format!("{}.bak.", file_name);
    fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().path())
        .filter(|p| {
            p.file_name()
                .unwrap()
                .to_string_lossy()
                .starts_with(&prefix)
        })
        .collect()
}

#[test]
fn test_stats_reports_shape_and_counts() {
    let (_tmp, config_path) = setup_test_env();

    let output = run_hymnal(&config_path, &["stats"]);
    assert_success(&output);
    let stdout = stdout_of(&output);
    assert!(stdout.contains("nested-object"), "{}", stdout);
    assert!(stdout.contains("Hymns:       3"), "{}", stdout);
    assert!(stdout.contains("Verses:      4"), "{}", stdout);
}

#[test]
fn test_query_json_pagination() {
    let (_tmp, config_path) = setup_test_env();

    let output = run_hymnal(&config_path, &["query", "--json"]);
    assert_success(&output);
    let page: Value = serde_json::from_str(&stdout_of(&output)).unwrap();
    assert_eq!(page["total"], 3);
    assert_eq!(page["page"], 1);
    assert_eq!(page["pageSize"], 2);
    assert_eq!(page["items"].as_array().unwrap().len(), 2);
    assert_eq!(page["items"][0]["reference"], "Rig Veda 1.1");

    let output = run_hymnal(&config_path, &["query", "--json", "--page", "2"]);
    assert_success(&output);
    let page: Value = serde_json::from_str(&stdout_of(&output)).unwrap();
    assert_eq!(page["items"].as_array().unwrap().len(), 1);
    assert_eq!(page["items"][0]["reference"], "Rig Veda 9.1");
    assert_eq!(page["items"][0]["subject"], "Soma");
}

#[test]
fn test_query_malformed_numbers_fall_back() {
    let (_tmp, config_path) = setup_test_env();

    let output = run_hymnal(
        &config_path,
        &["query", "--json", "--page", "-3", "--page-size", "lots"],
    );
    assert_success(&output);
    let page: Value = serde_json::from_str(&stdout_of(&output)).unwrap();
    assert_eq!(page["page"], 1);
    assert_eq!(page["pageSize"], 2);
}

#[test]
fn test_query_text_and_filters() {
    let (_tmp, config_path) = setup_test_env();

    let output = run_hymnal(&config_path, &["query", "VAYU"]);
    assert_success(&output);
    let stdout = stdout_of(&output);
    assert!(stdout.contains("Rig Veda 1.2"), "{}", stdout);
    assert!(!stdout.contains("Rig Veda 1.1\n"), "{}", stdout);

    let output = run_hymnal(
        &config_path,
        &["query", "--json", "--major-group", "1", "--subject", "Agni"],
    );
    assert_success(&output);
    let page: Value = serde_json::from_str(&stdout_of(&output)).unwrap();
    assert_eq!(page["total"], 1);
    assert_eq!(page["items"][0]["reference"], "Rig Veda 1.1");
    assert_eq!(page["items"][0]["attribution"], "Madhuchchhandas");

    let output = run_hymnal(&config_path, &["query", "nothing-like-this"]);
    assert_success(&output);
    assert!(stdout_of(&output).contains("No results"));
}

#[test]
fn test_get_hymn() {
    let (_tmp, config_path) = setup_test_env();

    let output = run_hymnal(&config_path, &["get", "Rig Veda 1.1", "--json"]);
    assert_success(&output);
    let hymn: Value = serde_json::from_str(&stdout_of(&output)).unwrap();
    assert_eq!(hymn["verseCount"], 2);
    assert_eq!(hymn["verses"][0]["originalScript"], "अग्निमीळे पुरोहितं");
    assert_eq!(hymn["verses"][0]["transliteration"], "agnim īḷe purohitam");
    assert_eq!(
        hymn["combinedTranslation"],
        "I glorify Agni, the household priest\nAgni, worthy of praise by ancient seers"
    );
}

#[test]
fn test_get_unknown_reference_fails() {
    let (_tmp, config_path) = setup_test_env();

    let output = run_hymnal(&config_path, &["get", "Rig Veda 9.2"]);
    assert!(!output.status.success());
    assert_eq!(output.status.code(), Some(1));
    assert!(stderr_of(&output).contains("hymn not found"));
}

#[test]
fn test_sources_lists_configured_providers() {
    let (_tmp, config_path) = setup_test_env();

    let output = run_hymnal(&config_path, &["sources"]);
    assert_success(&output);
    let stdout = stdout_of(&output);
    for name in ["mirror-a", "mirror-b", "mirror-c", "gone"] {
        assert!(stdout.contains(name), "missing {}: {}", name, stdout);
    }
    assert!(stdout.contains("file"));
}

#[test]
fn test_refresh_merges_dedups_and_backs_up() {
    let (tmp, config_path) = setup_test_env();
    let dataset = tmp.path().join("dataset");

    let output = run_hymnal(&config_path, &["refresh"]);
    assert_success(&output);
    let stdout = stdout_of(&output);
    assert!(stdout.contains("gone: skipped"), "{}", stdout);
    assert!(stdout.contains("duplicates dropped: 1"), "{}", stdout);

    let artifact: Vec<Value> = serde_json::from_str(
        &fs::read_to_string(dataset.join("hymns_refreshed.json")).unwrap(),
    )
    .unwrap();
    let refs: Vec<&str> = artifact
        .iter()
        .map(|h| h["reference"].as_str().unwrap())
        .collect();
    assert_eq!(refs, vec!["RV 1.1.1", "RV 1.2.1", "RV 1.2.2"]);
    assert_eq!(artifact[1]["attribution"], "Madhuchchhandas");
    assert_eq!(artifact[1]["verseCount"], 1);

    assert_eq!(backups_of(&dataset, "rigveda.json").len(), 1);
    assert!(backups_of(&dataset, "hymns_refreshed.json").is_empty());

    // A second run backs up the previous artifact before overwriting it.
    std::thread::sleep(std::time::Duration::from_millis(5));
    let output = run_hymnal(&config_path, &["refresh"]);
    assert_success(&output);
    assert_eq!(backups_of(&dataset, "hymns_refreshed.json").len(), 1);
}

#[test]
fn test_refresh_falls_back_to_backing_document() {
    let (tmp, config_path) = setup_test_env();
    let mirror = tmp.path().join("mirror");
    for file in ["a.json", "b.json", "c.jsonl"] {
        fs::remove_file(mirror.join(file)).unwrap();
    }

    let output = run_hymnal(&config_path, &["refresh"]);
    assert_success(&output);
    assert!(stdout_of(&output).contains("fallback sample: 4 records"));

    let artifact: Vec<Value> = serde_json::from_str(
        &fs::read_to_string(tmp.path().join("dataset/hymns_refreshed.json")).unwrap(),
    )
    .unwrap();
    assert_eq!(artifact[0]["reference"], "Rig Veda 1.1.1");
    assert_eq!(artifact[3]["reference"], "Rig Veda 9.1.1");
}

#[test]
fn test_refresh_without_any_data_exits_2_and_writes_nothing() {
    let (tmp, config_path) = setup_test_env();
    let dataset = tmp.path().join("dataset");
    for file in ["a.json", "b.json", "c.jsonl"] {
        fs::remove_file(tmp.path().join("mirror").join(file)).unwrap();
    }
    fs::remove_file(dataset.join("rigveda.json")).unwrap();

    let output = run_hymnal(&config_path, &["refresh"]);
    assert_eq!(output.status.code(), Some(2), "stderr={}", stderr_of(&output));
    assert!(!dataset.join("hymns_refreshed.json").exists());
    assert!(fs::read_dir(&dataset).unwrap().next().is_none());
}

#[test]
fn test_missing_config_fails() {
    let tmp = TempDir::new().unwrap();
    let output = run_hymnal(&tmp.path().join("absent.toml"), &["stats"]);
    assert_eq!(output.status.code(), Some(1));
    assert!(stderr_of(&output).contains("Failed to read config file"));
}
