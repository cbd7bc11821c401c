//! Integration tests for discovery CRUD via the CLI.
//!
//! These tests verify that `sg init/add/list/show/rm` work end to end:
//! - JSON and human-readable output formats
//! - listing filters, ordering, and the per-file warning path
//! - validation failing before anything is written

mod common;

use common::TestEnv;
use predicates::prelude::*;
use std::fs;

#[test]
fn test_init_creates_backlog_with_marker() {
    let env = TestEnv::new();

    env.sg()
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("\"created\":true"));

    let marker = env.backlog_dir().join(".gitkeep");
    assert!(marker.exists());
    assert_eq!(fs::metadata(&marker).unwrap().len(), 0);

    // Idempotent: second init succeeds and reports nothing new.
    env.sg()
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("\"created\":false"));
}

#[test]
fn test_add_json_output_and_file_on_disk() {
    let env = TestEnv::init();

    let id = env.add("Unbounded retry loop in sync worker", &[]);
    assert!(id.starts_with("sgd-"));
    assert_eq!(id.len(), 10); // "sgd-" + 6 symbols
    assert!(env.backlog_dir().join(format!("{}.json", id)).exists());
}

#[test]
fn test_add_human_output() {
    let env = TestEnv::init();

    env.sg()
        .args(["add", "Readable output", "--by", "itest", "-H"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Captured discovery sgd-"))
        .stdout(predicate::str::contains("\"Readable output\""));
}

#[test]
fn test_add_with_category_severity_location_tags() {
    let env = TestEnv::init();

    let id = env.add(
        "Missing index on lookups",
        &[
            "--category",
            "performance",
            "--severity",
            "high",
            "--tag",
            "db",
            "--file",
            "src/query.rs",
            "--line",
            "88",
        ],
    );

    env.sg()
        .args(["show", &id])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"category\":\"performance\""))
        .stdout(predicate::str::contains("\"severity\":\"high\""))
        .stdout(predicate::str::contains("\"file\":\"src/query.rs\""))
        .stdout(predicate::str::contains("\"line\":88"));
}

#[test]
fn test_add_empty_title_fails_without_writing() {
    let env = TestEnv::init();

    env.sg()
        .args(["add", "", "--by", "itest"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("title"));

    // Only the marker file exists.
    let entries: Vec<_> = fs::read_dir(env.backlog_dir())
        .unwrap()
        .map(|e| e.unwrap().file_name().into_string().unwrap())
        .collect();
    assert_eq!(entries, vec![".gitkeep".to_string()]);
}

#[test]
fn test_add_rejects_bad_enums_and_tags() {
    let env = TestEnv::init();

    env.sg()
        .args(["add", "Bad category", "--by", "itest", "--category", "urgent"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid category"));

    env.sg()
        .args(["add", "Bad tag", "--by", "itest", "--tag", "No-Caps"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("tag"));
}

#[test]
fn test_add_without_init_fails() {
    let env = TestEnv::new();

    env.sg()
        .args(["add", "No backlog yet", "--by", "itest"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("sg init"));
}

#[test]
fn test_show_unknown_id_exits_2() {
    let env = TestEnv::init();

    env.sg()
        .args(["show", "sgd-ZZZZZZ"])
        .assert()
        .failure()
        .code(2)
        .stderr(predicate::str::contains("not found"));
}

#[test]
fn test_list_filters_and_orders() {
    let env = TestEnv::init();

    env.add("Oldest bug", &["--category", "bug"]);
    env.add("Perf issue", &["--category", "performance"]);
    env.add("Newest bug", &["--category", "bug", "--severity", "critical"]);

    let output = env
        .sg()
        .args(["list", "--category", "bug"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let discoveries = value["discoveries"].as_array().unwrap();
    assert_eq!(discoveries.len(), 2);
    // Newest first.
    assert_eq!(discoveries[0]["title"], "Newest bug");
    assert_eq!(discoveries[1]["title"], "Oldest bug");

    env.sg()
        .args(["list", "--severity", "critical", "-H"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Newest bug"))
        .stdout(predicate::str::contains("Perf issue").not());
}

#[test]
fn test_list_limit() {
    let env = TestEnv::init();
    for i in 0..5 {
        env.add(&format!("Discovery {}", i), &[]);
    }

    let output = env.sg().args(["list", "--limit", "2"]).output().unwrap();
    let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(value["discoveries"].as_array().unwrap().len(), 2);
}

#[test]
fn test_list_with_corrupt_file_warns_and_succeeds() {
    let env = TestEnv::init();
    env.add("Healthy record", &[]);
    fs::write(env.backlog_dir().join("sgd-MANGLE.json"), "{ broken").unwrap();

    env.sg()
        .args(["list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Healthy record"))
        .stderr(predicate::str::contains("sgd-MANGLE.json"));
}

#[test]
fn test_rm_deletes_record() {
    let env = TestEnv::init();
    let id = env.add("Short-lived", &[]);

    env.sg()
        .args(["rm", &id])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"deleted\""));
    assert!(!env.backlog_dir().join(format!("{}.json", id)).exists());

    env.sg().args(["rm", &id]).assert().failure().code(2);
}

#[test]
fn test_repo_config_default_limit_applies() {
    let env = TestEnv::init();
    fs::write(
        env.path().join(".spyglass").join("config.toml"),
        "default_limit = 1\n",
    )
    .unwrap();
    env.add("One", &[]);
    env.add("Two", &[]);

    let output = env.sg().args(["list"]).output().unwrap();
    let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(value["discoveries"].as_array().unwrap().len(), 1);
}

#[test]
fn test_config_show_reports_sources() {
    let env = TestEnv::init();
    fs::write(
        env.path().join(".spyglass").join("config.toml"),
        "max_tags = 4\n",
    )
    .unwrap();

    env.sg()
        .args(["config", "show", "-H"])
        .assert()
        .success()
        .stdout(predicate::str::contains("max_tags:       4 (repo)"))
        .stdout(predicate::str::contains("scan_workers:   8 (default)"));
}

#[test]
fn test_config_show_human_flag_reports_cli_source() {
    let env = TestEnv::init();

    // -H participates in resolution as the highest-precedence layer.
    env.sg()
        .args(["config", "show", "-H"])
        .assert()
        .success()
        .stdout(predicate::str::contains("output_format:  human (cli)"));

    // Without the flag the built-in default applies.
    let output = env.sg().args(["config", "show"]).output().unwrap();
    let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(value["output_format"]["value"], "json");
    assert_eq!(value["output_format"]["source"], "default");
}
