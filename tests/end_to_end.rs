// Dispatching text and structured invocations through a fully built manager.

mod common;

use std::sync::{Arc, Mutex};

use anyhow::anyhow;
use argot::declare::CommandBuilder;
use argot::dispatch::{handler_fn, CommandHandler, CommandManager, DispatchOutcome, Reply};
use argot::model::{Arguments, Snowflake, User};
use argot::resolve::{OptionValue, TypedOption};
use argot::{ArgumentErrorKind, ErrorType, FrameworkConfig};
use common::{entities, guild_ctx, RecordingResponder, StaticPermissions};
use tokio::task::JoinHandle;

type Captured = Arc<Mutex<Option<Arguments>>>;

fn capturing() -> (Captured, Arc<dyn CommandHandler>) {
    let seen: Captured = Arc::new(Mutex::new(None));
    let slot = Arc::clone(&seen);
    let handler = handler_fn(move |call| {
        let slot = Arc::clone(&slot);
        async move {
            *slot.lock().unwrap() = Some(call.args.clone());
            Ok(())
        }
    });
    (seen, handler)
}

struct Harness {
    manager: CommandManager,
    responder: Arc<RecordingResponder>,
    seen: Captured,
}

fn harness(permissions: &[&str]) -> Harness {
    let (seen, handler) = capturing();
    let responder = Arc::new(RecordingResponder::default());
    let manager = CommandManager::builder(
        FrameworkConfig::default(),
        entities(),
        Arc::new(StaticPermissions::granting(permissions)),
        responder.clone(),
    )
    .command(
        CommandBuilder::new("role add")
            .description("Give a member a role")
            .signature("<member:member> <role:role> [reason...]")
            .configure("member", |p| p.flags("other"))
            .permission("manage_roles")
            .handler(Arc::clone(&handler)),
    )
    .command(
        CommandBuilder::new("set")
            .description("Set a level")
            .signature("<level:int> [quiet:bool]")
            .configure("level", |p| p.min_value(1.0).max_value(5.0))
            .configure("quiet", |p| p.permission("admin"))
            .handler(Arc::clone(&handler)),
    )
    .command(
        CommandBuilder::new("shirt")
            .description("Pick a shirt size")
            .signature("<size>")
            .configure("size", |p| p.choices("small=s,large=l"))
            .handler(Arc::clone(&handler)),
    )
    .command(
        CommandBuilder::new("colour")
            .description("Pick a colour")
            .signature("<pick:colour>")
            .handler(handler),
    )
    .enumeration("colour", vec!["red".into(), "dark_blue".into()])
    .build()
    .expect("manager builds");
    Harness {
        manager,
        responder,
        seen,
    }
}

fn captured(seen: &Captured) -> Arguments {
    seen.lock().unwrap().clone().expect("handler ran")
}

fn argument_kind(outcome: &DispatchOutcome) -> &ArgumentErrorKind {
    match outcome {
        DispatchOutcome::Rejected(err) => err.argument_kind().expect("argument failure"),
        other => panic!("expected a rejection, got {other:?}"),
    }
}

// ============================================================================
// TEXT FRONT END
// ============================================================================

#[tokio::test]
async fn role_add_resolves_every_parameter() {
    let h = harness(&["manage_roles"]);
    let outcome = h
        .manager
        .dispatch_text("!role add bob Moderator being helpful", guild_ctx())
        .await;
    assert!(matches!(outcome, DispatchOutcome::Invoked), "{outcome:?}");

    let args = captured(&h.seen);
    assert_eq!(args.names(), vec!["member", "role", "reason"]);
    assert_eq!(
        args.get("member").and_then(|v| v.as_member()).map(|m| m.id()),
        Some(Snowflake(20))
    );
    assert_eq!(
        args.get("role").and_then(|v| v.as_role()).map(|r| r.id),
        Some(Snowflake(500))
    );
    assert_eq!(
        args.get("reason").and_then(|v| v.as_strings()),
        Some(&["being".to_string(), "helpful".to_string()][..])
    );
    assert!(h.responder.replies().is_empty());
}

#[tokio::test]
async fn missing_role_is_reported() {
    let h = harness(&["manage_roles"]);
    let outcome = h
        .manager
        .dispatch_text("!role add bob Nope", guild_ctx())
        .await;
    assert!(matches!(
        argument_kind(&outcome),
        ArgumentErrorKind::NotFound { entity: "role", input } if input == "Nope"
    ));
    match h.responder.last() {
        Some(Reply::Error(text)) => {
            assert_eq!(
                text,
                "Invalid value for `role`: no role matching 'Nope' was found \
                 Check the spelling, or mention the target directly."
            )
        }
        other => panic!("expected an error reply, got {other:?}"),
    }
    assert!(h.seen.lock().unwrap().is_none());
}

#[tokio::test]
async fn ambiguous_role_lists_candidates() {
    let h = harness(&["manage_roles"]);
    let outcome = h
        .manager
        .dispatch_text("!role add bob helper", guild_ctx())
        .await;
    match argument_kind(&outcome) {
        ArgumentErrorKind::AmbiguousMatch { candidates, .. } => assert_eq!(candidates.len(), 2),
        other => panic!("expected ambiguity, got {other:?}"),
    }
}

#[tokio::test]
async fn bounded_level_checks_both_edges() {
    let h = harness(&[]);
    let below = h.manager.dispatch_text("!set 0", guild_ctx()).await;
    assert!(matches!(
        argument_kind(&below),
        ArgumentErrorKind::BelowMinimum { min, .. } if min == "1"
    ));

    let inside = h.manager.dispatch_text("!set 3", guild_ctx()).await;
    assert!(matches!(inside, DispatchOutcome::Invoked));
    let args = captured(&h.seen);
    assert_eq!(args.get("level").and_then(|v| v.as_i64()), Some(3));
    assert!(args.get("quiet").is_some_and(|v| v.is_absent()));

    let above = h.manager.dispatch_text("!set 6", guild_ctx()).await;
    assert!(matches!(
        argument_kind(&above),
        ArgumentErrorKind::AboveMaximum { max, .. } if max == "5"
    ));
}

#[tokio::test]
async fn missing_required_input_shows_usage() {
    let h = harness(&["manage_roles"]);
    let outcome = h.manager.dispatch_text("!role add", guild_ctx()).await;
    assert!(matches!(outcome, DispatchOutcome::ShowedUsage));
    assert_eq!(
        h.responder.last(),
        Some(Reply::Usage(
            "Usage: !role add <member> <role> [reason...]".to_string()
        ))
    );
}

#[tokio::test]
async fn command_permission_is_checked_before_resolution() {
    let h = harness(&[]);
    let outcome = h
        .manager
        .dispatch_text("!role add bob Moderator", guild_ctx())
        .await;
    match outcome {
        DispatchOutcome::Rejected(err) => assert_eq!(err.error_type(), ErrorType::PermissionDenied),
        other => panic!("expected a permission failure, got {other:?}"),
    }
    assert_eq!(
        h.responder.last().map(|r| r.text().to_string()),
        Some("You do not have permission to use `role add`.".to_string())
    );
}

#[tokio::test]
async fn parameter_permission_only_applies_to_supplied_input() {
    let h = harness(&[]);
    let denied = h.manager.dispatch_text("!set 2 yes", guild_ctx()).await;
    assert!(matches!(denied, DispatchOutcome::Rejected(_)));

    let allowed = harness(&["admin"]);
    let outcome = allowed.manager.dispatch_text("!set 2 yes", guild_ctx()).await;
    assert!(matches!(outcome, DispatchOutcome::Invoked));
    assert_eq!(
        captured(&allowed.seen).get("quiet").and_then(|v| v.as_bool()),
        Some(true)
    );
}

#[tokio::test]
async fn enumerations_match_case_and_separator_insensitively() {
    let h = harness(&[]);
    let outcome = h.manager.dispatch_text("!colour Dark-Blue", guild_ctx()).await;
    assert!(matches!(outcome, DispatchOutcome::Invoked), "{outcome:?}");
    let outcome = h.manager.dispatch_text("!colour purple", guild_ctx()).await;
    assert!(matches!(
        argument_kind(&outcome),
        ArgumentErrorKind::MustSpecifyOne { .. }
    ));
}

#[tokio::test]
async fn trailing_choice_string_takes_only_the_choice() {
    let h = harness(&[]);
    let outcome = h
        .manager
        .dispatch_text("!shirt small DROP TABLE", guild_ctx())
        .await;
    assert!(matches!(outcome, DispatchOutcome::Invoked), "{outcome:?}");
    assert_eq!(
        captured(&h.seen).get("size").and_then(|v| v.as_str()),
        Some("s")
    );

    let outcome = h.manager.dispatch_text("!shirt medium", guild_ctx()).await;
    assert!(matches!(
        argument_kind(&outcome),
        ArgumentErrorKind::MustSpecifyOne { input, .. } if input == "medium"
    ));
}

#[tokio::test]
async fn unprefixed_unknown_and_bot_messages() {
    let h = harness(&[]);
    assert!(matches!(
        h.manager.dispatch_text("hello there", guild_ctx()).await,
        DispatchOutcome::NotACommand
    ));
    assert!(matches!(
        h.manager.dispatch_text("!dance", guild_ctx()).await,
        DispatchOutcome::Unknown
    ));

    let mut ctx = guild_ctx();
    ctx.issuer = User {
        bot: true,
        ..ctx.issuer.clone()
    };
    assert!(matches!(
        h.manager.dispatch_text("!set 3", ctx).await,
        DispatchOutcome::NotACommand
    ));
}

// ============================================================================
// STRUCTURED FRONT END
// ============================================================================

#[tokio::test]
async fn structured_options_resolve_by_name() {
    let h = harness(&["manage_roles"]);
    let outcome = h
        .manager
        .dispatch_structured(
            "role add",
            vec![
                TypedOption::new("role", OptionValue::Role(Snowflake(500))),
                TypedOption::new("member", OptionValue::User(Snowflake(20))),
            ],
            guild_ctx(),
        )
        .await;
    assert!(matches!(outcome, DispatchOutcome::Invoked), "{outcome:?}");
    let args = captured(&h.seen);
    assert_eq!(
        args.get("role").and_then(|v| v.as_role()).map(|r| r.name.as_str()),
        Some("Moderator")
    );
    assert!(args.get("reason").is_some_and(|v| v.is_absent()));
}

#[tokio::test]
async fn structured_unknown_path() {
    let h = harness(&[]);
    let outcome = h
        .manager
        .dispatch_structured("role purge", Vec::new(), guild_ctx())
        .await;
    assert!(matches!(outcome, DispatchOutcome::Unknown));
}

// ============================================================================
// HANDLER FAILURES
// ============================================================================

#[tokio::test]
async fn handler_errors_are_answered() {
    let responder = Arc::new(RecordingResponder::default());
    let manager = CommandManager::builder(
        FrameworkConfig::default(),
        entities(),
        Arc::new(StaticPermissions::default()),
        responder.clone(),
    )
    .command(
        CommandBuilder::new("fail")
            .description("Always fails")
            .handler(handler_fn(|_call| async { Err(anyhow!("database offline")) })),
    )
    .build()
    .expect("manager builds");

    let outcome = manager.dispatch_text("!fail", guild_ctx()).await;
    assert!(matches!(outcome, DispatchOutcome::HandlerFailed));
    assert_eq!(
        responder.last(),
        Some(Reply::Error(
            "`fail` failed to complete. Please try again later.".to_string()
        ))
    );
    assert!(!responder.replies().iter().any(|r| r.text().contains("database offline")));
}

#[tokio::test]
async fn deferred_failures_reach_the_responder() {
    let responder = Arc::new(RecordingResponder::default());
    let pending: Arc<Mutex<Option<JoinHandle<()>>>> = Arc::new(Mutex::new(None));
    let slot = Arc::clone(&pending);
    let manager = CommandManager::builder(
        FrameworkConfig::default(),
        entities(),
        Arc::new(StaticPermissions::default()),
        responder.clone(),
    )
    .command(
        CommandBuilder::new("later")
            .description("Fails after returning")
            .handler(handler_fn(move |call| {
                let slot = Arc::clone(&slot);
                async move {
                    let handle = call.defer(async { Err(anyhow!("timed out")) });
                    *slot.lock().unwrap() = Some(handle);
                    Ok(())
                }
            })),
    )
    .build()
    .expect("manager builds");

    let outcome = manager.dispatch_text("!later", guild_ctx()).await;
    assert!(matches!(outcome, DispatchOutcome::Invoked));

    let handle = pending.lock().unwrap().take().expect("deferred task");
    handle.await.expect("deferred task completes");
    assert_eq!(
        responder.last(),
        Some(Reply::Error(
            "`later` failed to complete. Please try again later.".to_string()
        ))
    );
    assert!(!responder.replies().iter().any(|r| r.text().contains("timed out")));
}

#[tokio::test]
async fn broken_declarations_are_skipped_at_build() {
    let responder = Arc::new(RecordingResponder::default());
    let manager = CommandManager::builder(
        FrameworkConfig::default(),
        entities(),
        Arc::new(StaticPermissions::default()),
        responder,
    )
    .command(
        CommandBuilder::new("bad")
            .description("Broken signature")
            .signature("<open")
            .handler(handler_fn(|_call| async { Ok(()) })),
    )
    .command(
        CommandBuilder::new("ping")
            .description("Pong")
            .handler(handler_fn(|_call| async { Ok(()) })),
    )
    .build()
    .expect("manager builds");

    assert_eq!(manager.failures().len(), 1);
    assert_eq!(manager.failures()[0].root, "bad");
    assert!(matches!(
        manager.dispatch_text("!bad", guild_ctx()).await,
        DispatchOutcome::Unknown
    ));
    assert!(matches!(
        manager.dispatch_text("!ping", guild_ctx()).await,
        DispatchOutcome::Invoked
    ));
}
