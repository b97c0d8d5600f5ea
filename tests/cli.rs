// The `argot` binary against the manifests in tests/fixtures.
// Requires: assert_cmd, predicates crates in [dev-dependencies]

use std::sync::Arc;

use argot::declare::manifest::Manifest;
use argot::dispatch::{handler_fn, CommandManager, Reply, Responder};
use argot::model::{AllowAll, InvocationContext, NoEntities};
use argot::registrar::{ExternalId, RegisteredSchema};
use argot::FrameworkConfig;
use assert_cmd::Command;
use async_trait::async_trait;
use predicates::{prelude::PredicateBooleanExt, str::contains};

const ROLES: &str = "tests/fixtures/valid/roles.yaml";

fn argot() -> Command {
    Command::cargo_bin("argot").unwrap()
}

#[test]
fn schema_prints_payload_json() {
    argot()
        .args(["schema", ROLES, "--root", "role"])
        .assert()
        .success()
        .stdout(contains("\"name\": \"role\"").and(contains("\"option_type\": \"ROLE\"")));
}

#[test]
fn schema_rejects_unknown_root() {
    argot()
        .args(["schema", ROLES, "--root", "nope"])
        .assert()
        .failure()
        .stderr(contains("no compiled root named 'nope'"));
}

#[test]
fn usage_lists_every_command() {
    argot()
        .args(["usage", ROLES])
        .assert()
        .success()
        .stdout(
            contains("!role add <member> <role> [reason...]")
                .and(contains("!role color set <role> <colour>"))
                .and(contains("!slowmode <seconds> [where]")),
        );
}

#[test]
fn config_supplies_prefix_and_log_filter() {
    let config = std::env::temp_dir().join(format!("argot-cli-config-{}.yaml", std::process::id()));
    std::fs::write(&config, "prefixes: ['?']\nlog_filter: argot=info\n").unwrap();
    argot()
        .env_remove("RUST_LOG")
        .arg("--config")
        .arg(&config)
        .args(["usage", ROLES])
        .assert()
        .success()
        .stdout(contains("?role add <member> <role> [reason...]"))
        .stderr(contains("command schema compiled"));
    let _ = std::fs::remove_file(config);
}

#[test]
fn check_passes_on_valid_manifests() {
    argot()
        .args(["check", "tests/fixtures/valid"])
        .assert()
        .success()
        .stdout(contains("roles.yaml").and(contains("2 root(s) compiled")));
}

#[test]
fn check_reports_rejected_roots() {
    argot()
        .args(["check", "tests/fixtures/invalid"])
        .assert()
        .failure()
        .stdout(contains("root 'tag'").and(contains("follows an optional parameter")))
        .stderr(contains("1 of 1 manifest(s) failed"));
}

struct Silent;

#[async_trait]
impl Responder for Silent {
    async fn send(&self, _ctx: &InvocationContext, _reply: Reply) {}
}

fn snapshot_of(manifest_path: &str, root: &str, description: Option<&str>) -> std::path::PathBuf {
    let manifest = Manifest::load(manifest_path).unwrap();
    let manager = CommandManager::builder(
        FrameworkConfig::default(),
        Arc::new(NoEntities),
        Arc::new(AllowAll),
        Arc::new(Silent),
    )
    .manifest(&manifest, handler_fn(|_call| async { Ok(()) }))
    .build()
    .unwrap();
    let mut tree = manager
        .trees()
        .iter()
        .find(|t| t.name() == root)
        .cloned()
        .unwrap();
    if let Some(description) = description {
        tree = argot::schema::CommandTree::new(root, description);
    }
    let schema = RegisteredSchema {
        external_id: ExternalId("123".to_string()),
        root: tree,
    };
    let path = std::env::temp_dir().join(format!(
        "argot-cli-{root}-{}-{}.json",
        description.is_some(),
        std::process::id()
    ));
    std::fs::write(&path, serde_json::to_string(&schema).unwrap()).unwrap();
    path
}

#[test]
fn diff_reports_unchanged_roots() {
    let snapshot = snapshot_of(ROLES, "slowmode", None);
    argot()
        .arg("diff")
        .arg(&snapshot)
        .arg(ROLES)
        .assert()
        .success()
        .stdout(contains("unchanged (123)"));
    let _ = std::fs::remove_file(snapshot);
}

#[test]
fn diff_shows_the_first_difference() {
    let snapshot = snapshot_of(ROLES, "slowmode", Some("Old slowmode"));
    argot()
        .arg("diff")
        .arg(&snapshot)
        .arg(ROLES)
        .assert()
        .success()
        .stdout(contains("--- slowmode: description 'Old slowmode' -> 'Set channel slowmode' ---"));
    let _ = std::fs::remove_file(snapshot);
}
