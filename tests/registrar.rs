// Change-detecting registration against a counting platform double.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use argot::registrar::{
    ExternalId, PlatformClient, PlatformError, RegistrationOutcome, SchemaRegistrar,
};
use argot::declare::CommandBuilder;
use argot::dispatch::{handler_fn, CommandManager, Reply, Responder};
use argot::model::{AllowAll, InvocationContext, NoEntities};
use argot::schema::{CommandTree, NodeKind, SchemaPayload};
use argot::FrameworkConfig;
use async_trait::async_trait;
use serde_json::json;

#[derive(Default)]
struct CountingPlatform {
    calls: AtomicUsize,
    failing: bool,
}

impl CountingPlatform {
    fn failing() -> Self {
        Self {
            calls: AtomicUsize::new(0),
            failing: true,
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PlatformClient for CountingPlatform {
    async fn upsert_command(&self, payload: &SchemaPayload) -> Result<ExternalId, PlatformError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::task::yield_now().await;
        if self.failing {
            return Err(PlatformError::new("rate limited"));
        }
        Ok(ExternalId(format!("{}-{n}", payload.name)))
    }
}

fn ban_tree(description: &str, required: bool) -> CommandTree {
    let mut tree = CommandTree::new("ban", description);
    let target = tree
        .add_child(tree.root(), NodeKind::Parameter, "target", "Who to ban")
        .expect("child");
    tree.set_property(target, "type", json!("USER"));
    tree.set_property(target, "required", json!(required));
    tree
}

#[tokio::test]
async fn identical_trees_register_once() {
    let platform = Arc::new(CountingPlatform::default());
    let registrar = SchemaRegistrar::new(platform.clone());

    let first = registrar.register(ban_tree("Ban a member", true)).await.expect("registered");
    assert!(matches!(first, RegistrationOutcome::Registered(_)));
    assert!(registrar.is_registered("ban"));

    let second = registrar.register(ban_tree("Ban a member", true)).await.expect("unchanged");
    assert_eq!(second, RegistrationOutcome::Unchanged(first.external_id().clone()));
    assert_eq!(platform.calls(), 1);
}

#[tokio::test]
async fn changed_trees_register_again() {
    let platform = Arc::new(CountingPlatform::default());
    let registrar = SchemaRegistrar::new(platform.clone());

    registrar.register(ban_tree("Ban a member", true)).await.expect("registered");
    let outcome = registrar
        .register(ban_tree("Ban a member", false))
        .await
        .expect("registered");
    assert!(matches!(outcome, RegistrationOutcome::Registered(_)));
    assert_eq!(platform.calls(), 2);

    let stored = registrar.registered("ban").await.expect("stored");
    assert_eq!(stored.external_id, ExternalId("ban-1".to_string()));
}

#[tokio::test]
async fn failures_are_not_marked_registered() {
    let platform = Arc::new(CountingPlatform::failing());
    let registrar = SchemaRegistrar::new(platform.clone());

    let err = registrar
        .register(ban_tree("Ban a member", true))
        .await
        .expect_err("platform refuses");
    assert!(err.to_string().contains("rate limited"));
    assert!(!registrar.is_registered("ban"));
    assert!(registrar.registered("ban").await.is_none());

    registrar
        .register(ban_tree("Ban a member", true))
        .await
        .expect_err("still refused");
    assert_eq!(platform.calls(), 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_identical_registrations_reach_the_platform_once() {
    let platform = Arc::new(CountingPlatform::default());
    let registrar = Arc::new(SchemaRegistrar::new(platform.clone()));

    let handles: Vec<_> = (0..8)
        .map(|_| registrar.spawn_register(ban_tree("Ban a member", true)))
        .collect();
    let mut registered = 0;
    for handle in handles {
        match handle.await.expect("task").expect("outcome") {
            RegistrationOutcome::Registered(_) => registered += 1,
            RegistrationOutcome::Unchanged(_) => {}
        }
    }
    assert_eq!(registered, 1);
    assert_eq!(platform.calls(), 1);
}

#[tokio::test]
async fn batches_keep_input_order() {
    let platform = Arc::new(CountingPlatform::default());
    let registrar = SchemaRegistrar::new(platform.clone());
    let kick = CommandTree::new("kick", "Kick a member");

    let results = registrar
        .register_all(vec![ban_tree("Ban a member", true), kick])
        .await;
    assert_eq!(results.len(), 2);
    let names: Vec<String> = results
        .iter()
        .map(|r| r.as_ref().expect("ok").external_id().0.clone())
        .collect();
    assert!(names[0].starts_with("ban-"));
    assert!(names[1].starts_with("kick-"));
}

#[tokio::test]
async fn snapshots_survive_a_restart() {
    let dir = std::env::temp_dir().join(format!("argot-snapshots-{}", std::process::id()));
    let _ = std::fs::remove_dir_all(&dir);

    let platform = Arc::new(CountingPlatform::default());
    let registrar = SchemaRegistrar::with_snapshot_dir(platform.clone(), &dir).expect("dir");
    registrar.register(ban_tree("Ban a member", true)).await.expect("registered");
    assert!(dir.join("ban.json").exists());

    let restarted = SchemaRegistrar::with_snapshot_dir(platform.clone(), &dir).expect("dir");
    assert!(restarted.is_registered("ban"));
    let outcome = restarted
        .register(ban_tree("Ban a member", true))
        .await
        .expect("unchanged");
    assert!(matches!(outcome, RegistrationOutcome::Unchanged(_)));
    assert_eq!(platform.calls(), 1);

    let _ = std::fs::remove_dir_all(&dir);
}

#[tokio::test]
async fn malformed_snapshots_are_skipped_at_startup() {
    let dir = std::env::temp_dir().join(format!("argot-bad-snapshots-{}", std::process::id()));
    let _ = std::fs::remove_dir_all(&dir);
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(dir.join("empty.json"), r#"{"external_id":"1","root":{"nodes":[],"root":0}}"#)
        .unwrap();
    std::fs::write(
        dir.join("stray.json"),
        r#"{"external_id":"2","root":{"nodes":[{"kind":"ROOT","name":"ban","description":"x"}],"root":4}}"#,
    )
    .unwrap();

    let platform = Arc::new(CountingPlatform::default());
    let registrar = SchemaRegistrar::with_snapshot_dir(platform.clone(), &dir).expect("starts");
    assert!(!registrar.is_registered("ban"));
    let outcome = registrar
        .register(ban_tree("Ban a member", true))
        .await
        .expect("registered");
    assert!(matches!(outcome, RegistrationOutcome::Registered(_)));

    let _ = std::fs::remove_dir_all(&dir);
}

struct Silent;

#[async_trait]
impl Responder for Silent {
    async fn send(&self, _ctx: &InvocationContext, _reply: Reply) {}
}

#[tokio::test]
async fn manager_registers_into_the_configured_snapshot_dir() {
    let dir = std::env::temp_dir().join(format!("argot-config-snapshots-{}", std::process::id()));
    let _ = std::fs::remove_dir_all(&dir);
    let config = FrameworkConfig {
        snapshot_dir: Some(dir.clone()),
        ..FrameworkConfig::default()
    };
    let manager = CommandManager::builder(
        config,
        Arc::new(NoEntities),
        Arc::new(AllowAll),
        Arc::new(Silent),
    )
    .command(
        CommandBuilder::new("ping")
            .description("Check the bot is alive")
            .handler(handler_fn(|_call| async { Ok(()) })),
    )
    .build()
    .expect("manager builds");

    let platform = Arc::new(CountingPlatform::default());
    let (registrar, results) = manager.register_schemas(platform.clone()).await.expect("registrar");
    assert_eq!(results.len(), 1);
    assert!(registrar.is_registered("ping"));
    assert!(dir.join("ping.json").exists());

    let (_, again) = manager.register_schemas(platform.clone()).await.expect("registrar");
    assert!(matches!(again[0], Ok(RegistrationOutcome::Unchanged(_))));
    assert_eq!(platform.calls(), 1);

    let _ = std::fs::remove_dir_all(&dir);
}
