//! CLI integration tests for agmd
//!
//! Each test runs the binary against a temporary project and registry, with
//! HOME pointed into the sandbox so no user configuration leaks in.

use predicates::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

const DIRECTIVES: &str = "\
# Guide

## Rules

:::list rule
typescript
eslint
:::end

## Deploy

:::include workflow:deploy
";

const RENDERED: &str = "\
# Guide

## Rules

### typescript

Use strict mode.

### eslint

No unused vars.

## Deploy

### deploy

1. Build
2. Ship
";

/// Temporary project directory plus registry
struct Sandbox {
    dir: TempDir,
}

impl Sandbox {
    fn new() -> Self {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("project")).unwrap();
        Self { dir }
    }

    fn project(&self) -> PathBuf {
        self.dir.path().join("project")
    }

    fn registry(&self) -> PathBuf {
        self.dir.path().join("registry")
    }

    /// Get a command instance for the agmd binary, sandboxed
    fn cmd(&self) -> assert_cmd::Command {
        let mut cmd = assert_cmd::Command::new(assert_cmd::cargo::cargo_bin!("agmd"));
        cmd.current_dir(self.project())
            .env("HOME", self.dir.path())
            .env("XDG_CONFIG_HOME", self.dir.path().join("config"))
            .env("AGMD_REGISTRY", self.registry())
            .env_remove("AGMD_LOG");
        cmd
    }

    fn write(&self, name: &str, content: &str) {
        fs::write(self.project().join(name), content).unwrap();
    }

    fn read(&self, name: &str) -> String {
        fs::read_to_string(self.project().join(name)).unwrap()
    }

    fn add_item(&self, kind: &str, name: &str, body: &str) {
        let path = self.item_path(kind, name);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, format!("---\nname: {}\ndescription: ''\n---\n\n{}\n", name, body)).unwrap();
    }

    fn item_path(&self, kind: &str, name: &str) -> PathBuf {
        self.registry().join(kind).join(format!("{}.md", name))
    }

    fn with_standard_registry(self) -> Self {
        self.add_item("rule", "typescript", "Use strict mode.");
        self.add_item("rule", "eslint", "No unused vars.");
        self.add_item("workflow", "deploy", "1. Build\n2. Ship");
        self
    }
}

fn exists(path: &Path) -> bool {
    path.exists()
}

// =============================================================================
// Init
// =============================================================================

#[test]
fn test_init_creates_directives() {
    let sb = Sandbox::new();

    sb.cmd()
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("Created directives.md"));

    assert!(sb.read("directives.md").contains(":::list rule"));
}

#[test]
fn test_init_refuses_existing_document() {
    let sb = Sandbox::new();
    sb.write("directives.md", "mine\n");

    sb.cmd()
        .arg("init")
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));

    assert_eq!(sb.read("directives.md"), "mine\n");
}

// =============================================================================
// Sync
// =============================================================================

#[test]
fn test_sync_renders_output() {
    let sb = Sandbox::new().with_standard_registry();
    sb.write("directives.md", DIRECTIVES);

    sb.cmd()
        .arg("sync")
        .assert()
        .success()
        .stdout(predicate::str::contains("Synced AGENTS.md"));

    assert_eq!(sb.read("AGENTS.md"), RENDERED);
}

#[test]
fn test_sync_stdout_does_not_write() {
    let sb = Sandbox::new().with_standard_registry();
    sb.write("directives.md", DIRECTIVES);

    sb.cmd()
        .args(["sync", "--stdout"])
        .assert()
        .success()
        .stdout(RENDERED);

    assert!(!exists(&sb.project().join("AGENTS.md")));
}

#[test]
fn test_sync_warns_on_missing_reference() {
    let sb = Sandbox::new();
    sb.write("directives.md", "# Doc\n\n:::include rule:missing\n\nEnd\n");

    sb.cmd()
        .arg("sync")
        .assert()
        .success()
        .stderr(predicate::str::contains("rule:missing (line 3) not found in registry"));

    assert_eq!(sb.read("AGENTS.md"), "# Doc\n\n\nEnd\n");
}

#[test]
fn test_sync_refuses_pending_new_blocks() {
    let sb = Sandbox::new();
    sb.write("directives.md", "# Doc\n\n:::new rule:draft\nBody\n:::end\n");

    sb.cmd()
        .arg("sync")
        .assert()
        .failure()
        .stderr(predicate::str::contains("agmd promote --all"));

    assert!(!exists(&sb.project().join("AGENTS.md")));
}

#[test]
fn test_sync_reports_parse_error_line() {
    let sb = Sandbox::new();
    sb.write("directives.md", "# Doc\n:::list rule\ntypescript\n:::\n");

    sb.cmd()
        .arg("sync")
        .assert()
        .failure()
        .stderr(predicate::str::contains("line 2"))
        .stderr(predicate::str::contains("line 4 has a bare ':::'"));
}

#[test]
fn test_sync_uses_project_config() {
    let sb = Sandbox::new().with_standard_registry();
    sb.write("agmd.toml", "source = \"agents.src.md\"\noutput = \"CLAUDE.md\"\n");
    sb.write("agents.src.md", ":::include workflow:deploy\n");

    sb.cmd().arg("sync").assert().success();

    assert_eq!(sb.read("CLAUDE.md"), "### deploy\n\n1. Build\n2. Ship\n");
}

#[test]
fn test_sync_from_subdirectory() {
    let sb = Sandbox::new().with_standard_registry();
    sb.write("directives.md", ":::include rule:eslint\n");
    fs::create_dir_all(sb.project().join("src/deep")).unwrap();

    sb.cmd()
        .current_dir(sb.project().join("src/deep"))
        .arg("sync")
        .assert()
        .success();

    assert_eq!(sb.read("AGENTS.md"), "### eslint\n\nNo unused vars.\n");
}

// =============================================================================
// Promote
// =============================================================================

#[test]
fn test_promote_all_moves_blocks_into_registry() {
    let sb = Sandbox::new();
    sb.write(
        "directives.md",
        "# Doc\n\n:::new rule:style\n\nTabs, not spaces.\n\n:::end\n\n:::new workflow:release\nTag it.\n:::end\n",
    );

    sb.cmd()
        .args(["promote", "--all"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Promoted 2 item(s)"));

    assert_eq!(
        sb.read("directives.md"),
        "# Doc\n\n:::include rule:style\n\n:::include workflow:release\n"
    );
    let stored = fs::read_to_string(sb.item_path("rule", "style")).unwrap();
    assert_eq!(stored, "---\nname: style\ndescription: ''\n---\n\nTabs, not spaces.\n");

    sb.cmd()
        .args(["promote", "--all"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No ':::new' blocks"));
}

#[test]
fn test_promote_one_key() {
    let sb = Sandbox::new();
    sb.write(
        "directives.md",
        ":::new rule:a\nA\n:::end\n:::new rule:b\nB\n:::end\n",
    );

    sb.cmd().args(["promote", "rule:b"]).assert().success();

    assert_eq!(sb.read("directives.md"), ":::new rule:a\nA\n:::end\n:::include rule:b\n");
    assert!(exists(&sb.item_path("rule", "b")));
    assert!(!exists(&sb.item_path("rule", "a")));
}

#[test]
fn test_promote_duplicate_fails_and_leaves_source() {
    let sb = Sandbox::new();
    sb.add_item("rule", "taken", "Original");
    let source = ":::new rule:taken\nReplacement\n:::end\n";
    sb.write("directives.md", source);

    sb.cmd()
        .args(["promote", "rule:taken"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));

    assert_eq!(sb.read("directives.md"), source);
    assert!(fs::read_to_string(sb.item_path("rule", "taken"))
        .unwrap()
        .contains("Original"));
}

#[test]
fn test_promote_all_skips_duplicates() {
    let sb = Sandbox::new();
    sb.add_item("rule", "taken", "Original");
    sb.write(
        "directives.md",
        ":::new rule:taken\nX\n:::end\n:::new rule:fresh\nY\n:::end\n",
    );

    sb.cmd()
        .args(["promote", "--all"])
        .assert()
        .success()
        .stderr(predicate::str::contains("Skipped rule:taken (line 1)"));

    assert_eq!(
        sb.read("directives.md"),
        ":::new rule:taken\nX\n:::end\n:::include rule:fresh\n"
    );
}

#[test]
fn test_promote_requires_key_or_all() {
    let sb = Sandbox::new();
    sb.cmd().arg("promote").assert().failure();
}

// =============================================================================
// Validate
// =============================================================================

#[test]
fn test_validate_passes_when_resolved() {
    let sb = Sandbox::new().with_standard_registry();
    sb.write("directives.md", DIRECTIVES);

    sb.cmd()
        .arg("validate")
        .assert()
        .success()
        .stdout(predicate::str::contains("All references resolve"));
}

#[test]
fn test_validate_reports_problems() {
    let sb = Sandbox::new().with_standard_registry();
    sb.write(
        "directives.md",
        ":::list rule\ntypescript\nghost\n:::end\n:::new rule:draft\nx\n:::end\n",
    );

    sb.cmd()
        .arg("validate")
        .assert()
        .failure()
        .stdout(predicate::str::contains("rule:ghost (line 3)"))
        .stdout(predicate::str::contains(":::new rule:draft (line 5)"))
        .stderr(predicate::str::contains("1 unresolved reference(s), 1 pending block(s)"));
}

#[test]
fn test_validate_json() {
    let sb = Sandbox::new();
    sb.write("directives.md", ":::include rule:nope\n");

    let assert = sb.cmd().args(["--format", "json", "validate"]).assert().failure();
    let stdout = String::from_utf8(assert.get_output().stdout.clone()).unwrap();
    let report: serde_json::Value = serde_json::from_str(stdout.trim()).unwrap();

    assert_eq!(report["valid"], false);
    assert_eq!(report["unresolved"][0]["reference"]["name"], "nope");
    assert_eq!(report["unresolved"][0]["reason"], "not_in_registry");
}

// =============================================================================
// Extract
// =============================================================================

#[test]
fn test_extract_recovers_items() {
    let sb = Sandbox::new();
    sb.add_item("rule", "eslint", "Kept as is");
    sb.write("directives.md", DIRECTIVES);
    sb.write(
        "AGENTS.md",
        &RENDERED.replace("Use strict mode.\n", "Use strict mode.\n\n## Purpose\n\nTypes help.\n"),
    );

    sb.cmd()
        .arg("extract")
        .assert()
        .success()
        .stdout(predicate::str::contains("Created rule:typescript"))
        .stdout(predicate::str::contains("Created 2 item(s), 1 already in registry, 0 failed"));

    let typescript = fs::read_to_string(sb.item_path("rule", "typescript")).unwrap();
    assert!(typescript.ends_with("Use strict mode.\n\n## Purpose\n\nTypes help.\n"));
    assert!(!typescript.contains("Build"));

    let eslint = fs::read_to_string(sb.item_path("rule", "eslint")).unwrap();
    assert!(eslint.contains("Kept as is"));
    assert!(exists(&sb.item_path("workflow", "deploy")));
}

#[test]
fn test_extract_dry_run_writes_nothing() {
    let sb = Sandbox::new();
    sb.write("directives.md", DIRECTIVES);
    sb.write("OLD.md", RENDERED);

    sb.cmd()
        .args(["extract", "--rendered", "OLD.md", "--dry-run"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Would create 3 item(s)"));

    assert!(!exists(&sb.registry()));
}

#[test]
fn test_extract_continues_past_failed_items() {
    let sb = Sandbox::new();
    sb.write("directives.md", DIRECTIVES);
    sb.write("AGENTS.md", RENDERED);
    // A file where the rule directory should be makes every rule write fail
    fs::create_dir_all(sb.registry()).unwrap();
    fs::write(sb.registry().join("rule"), "not a directory").unwrap();

    sb.cmd()
        .arg("extract")
        .assert()
        .failure()
        .stdout(predicate::str::contains("Created workflow:deploy"))
        .stdout(predicate::str::contains("Created 1 item(s), 0 already in registry, 2 failed"))
        .stderr(predicate::str::contains("Failed to create rule:typescript"))
        .stderr(predicate::str::contains("Failed to create rule:eslint"))
        .stderr(predicate::str::contains("Failed to extract 2 item(s)"));

    assert!(exists(&sb.item_path("workflow", "deploy")));
}

#[test]
fn test_extract_json_reports_failures() {
    let sb = Sandbox::new();
    sb.write("directives.md", DIRECTIVES);
    sb.write("AGENTS.md", RENDERED);
    fs::create_dir_all(sb.registry()).unwrap();
    fs::write(sb.registry().join("rule"), "not a directory").unwrap();

    let assert = sb.cmd().args(["--format", "json", "extract"]).assert().failure();
    let stdout = String::from_utf8(assert.get_output().stdout.clone()).unwrap();
    let report: serde_json::Value = serde_json::from_str(stdout.trim()).unwrap();
    assert_eq!(report["created"], serde_json::json!(["workflow:deploy"]));
    assert_eq!(report["failed"].as_array().unwrap().len(), 2);
    assert_eq!(report["failed"][0]["key"], "rule:typescript");
}

#[test]
fn test_extract_warns_about_missing_items() {
    let sb = Sandbox::new();
    sb.write("directives.md", DIRECTIVES);
    sb.write("AGENTS.md", "# Guide\n\n## Rules\n\n### typescript\n\nOnly this.\n");

    sb.cmd()
        .arg("extract")
        .assert()
        .success()
        .stderr(predicate::str::contains("rule:eslint not found under '## Rules'"))
        .stderr(predicate::str::contains("section '## Deploy' not found"));
}

// =============================================================================
// Registry items
// =============================================================================

#[test]
fn test_new_show_and_list() {
    let sb = Sandbox::new();

    sb.cmd()
        .args(["new", "rule:auth/custom-auth", "--content", "Use OAuth.", "-d", "Auth rules"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Created rule:auth/custom-auth"));

    assert!(sb.registry().join("rule/auth/custom-auth.md").is_file());

    sb.cmd()
        .args(["show", "rule:auth/custom-auth"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Auth rules"))
        .stdout(predicate::str::contains("Use OAuth."));

    sb.cmd()
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("rule:auth/custom-auth"));
}

#[test]
fn test_new_rejects_existing_item() {
    let sb = Sandbox::new();
    sb.add_item("rule", "x", "one");

    sb.cmd()
        .args(["new", "rule:x", "--content", "two"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("rule:x already exists in registry"));
}

#[test]
fn test_new_rejects_invalid_name() {
    let sb = Sandbox::new();

    sb.cmd()
        .args(["new", "rule:../escape"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid name"));

    assert!(!exists(&sb.dir.path().join("escape.md")));
}

#[test]
fn test_show_raw_prints_file() {
    let sb = Sandbox::new();
    sb.add_item("workflow", "deploy", "Ship it");

    sb.cmd()
        .args(["show", "workflow:deploy", "--raw"])
        .assert()
        .success()
        .stdout("---\nname: deploy\ndescription: ''\n---\n\nShip it\n");
}

#[test]
fn test_show_missing_item_fails() {
    let sb = Sandbox::new();

    sb.cmd()
        .args(["show", "rule:nope"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("rule:nope not found in registry"));
}

#[test]
fn test_list_filters_by_kind_json() {
    let sb = Sandbox::new().with_standard_registry();

    let assert = sb.cmd().args(["--format", "json", "list", "rule"]).assert().success();
    let stdout = String::from_utf8(assert.get_output().stdout.clone()).unwrap();
    let items: serde_json::Value = serde_json::from_str(stdout.trim()).unwrap();

    let names: Vec<&str> = items
        .as_array()
        .unwrap()
        .iter()
        .map(|i| i["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["eslint", "typescript"]);
}

#[test]
fn test_list_empty_registry() {
    let sb = Sandbox::new();

    sb.cmd()
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("No items found."));
}

#[test]
fn test_registry_flag_overrides_env() {
    let sb = Sandbox::new();
    let other = sb.dir.path().join("other");

    sb.cmd()
        .arg("--registry")
        .arg(&other)
        .args(["new", "rule:x"])
        .assert()
        .success();

    assert!(other.join("rule/x.md").is_file());
    assert!(!exists(&sb.registry()));
}
