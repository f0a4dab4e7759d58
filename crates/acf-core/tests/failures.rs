//! Failure paths and traffic logging

use acf_core::prelude::*;
use acf_core::{HandlerRegistry, OperationKind};
use acf_test_utils::{
    engine_with, memory_engine, quiet_config, recorded_engine, sample_skill, set_field, EventLog,
    FailingHandler, PanickingHandler,
};
use pretty_assertions::assert_eq;
use serde_json::json;
use std::sync::Arc;

#[tokio::test]
async fn missing_handler_is_an_engine_error() {
    let registry = HandlerRegistry::in_memory();
    let mut registry_without_hooks = HandlerRegistry::new();
    for ty in registry.types() {
        if ty != ArtifactType::Hook {
            if let Ok(handler) = registry.get(ty) {
                registry_without_hooks.register(Arc::clone(handler));
            }
        }
    }
    let engine = CrudEngine::with_registry("/virtual", quiet_config(10), registry_without_hooks);

    let err = engine
        .read_hook("format", ReadOptions::new())
        .await
        .unwrap_err();
    assert!(err.is_handler_not_found());
    assert!(engine.list_skills().await.unwrap().success);
    assert!(engine.get_history().is_empty());
}

#[tokio::test]
async fn panicking_handler_becomes_internal_failure() {
    let engine = engine_with(
        Arc::new(PanickingHandler::new(ArtifactType::Skill)),
        quiet_config(10),
    );
    let events = EventLog::new();
    engine.subscribe(events.callback());

    let result = engine.create_skill(&sample_skill(), CreateOptions::new()).await.unwrap();
    assert!(!result.success);
    assert_eq!(result.error_code(), Some(ErrorCode::Internal));
    let message = result.error.unwrap().message;
    assert!(message.contains("exploded"), "{message}");

    let deleted = engine.delete_skill("core/example", DeleteOptions::new()).await.unwrap();
    assert_eq!(deleted.error_code(), Some(ErrorCode::Internal));

    // the engine keeps serving after a panic
    assert!(engine.list_skills().await.unwrap().success);
    assert!(engine.get_history().is_empty());
    assert!(events.is_empty());
}

#[tokio::test]
async fn failures_are_logged_at_error_level() {
    let (engine, logger) = recorded_engine(quiet_config(10));

    let read = engine.read_rule("missing", ReadOptions::new()).await.unwrap();
    assert_eq!(read.error_code(), Some(ErrorCode::NotFound));

    let failed = logger.matching("read rule 'missing' failed");
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].level, LogLevel::Error);
    assert_eq!(failed[0].context["success"], json!(false));
    assert_eq!(failed[0].context["error"]["code"], json!("NOT_FOUND"));
    assert_eq!(failed[0].context["artifactId"], json!("missing"));
}

#[tokio::test]
async fn missing_target_logs_one_error_per_mutation() {
    let (engine, logger) = recorded_engine(quiet_config(10));

    let update = engine
        .update_rule("missing", &set_field("description", "x"), UpdateOptions::new())
        .await
        .unwrap();
    assert_eq!(update.error_code(), Some(ErrorCode::NotFound));
    let delete = engine.delete_rule("missing", DeleteOptions::new()).await.unwrap();
    assert_eq!(delete.error_code(), Some(ErrorCode::NotFound));

    let errors: Vec<_> = logger
        .at_level(LogLevel::Error)
        .into_iter()
        .map(|r| r.message)
        .collect();
    assert_eq!(
        errors,
        vec!["update rule 'missing' failed", "delete rule 'missing' failed"]
    );

    let pre_reads = logger.matching("read rule 'missing' failed");
    assert_eq!(pre_reads.len(), 2);
    assert!(pre_reads.iter().all(|r| r.level == LogLevel::Debug));
    assert!(pre_reads.iter().all(|r| r.context["preRead"] == json!(true)));
}

#[tokio::test]
async fn operation_id_is_shared_by_history_event_and_logs() {
    let (engine, logger) = recorded_engine(quiet_config(10));
    let events = EventLog::new();
    engine.subscribe(events.callback());

    engine.create_skill(&sample_skill(), CreateOptions::new()).await.unwrap();
    engine
        .update_skill("core/example", &set_field("description", "B"), UpdateOptions::new())
        .await
        .unwrap();

    let entry = &engine.get_recent_operations(1)[0];
    assert_eq!(entry.operation_descriptor.kind, OperationKind::Update);
    let event = &events.events()[1];
    assert_eq!(event.operation_id, entry.operation_id);

    let id = json!(entry.operation_id.to_string());
    let tagged: Vec<_> = logger
        .records()
        .into_iter()
        .filter(|r| r.context.get("operationId") == Some(&id))
        .collect();
    // pre-read started/succeeded, update started/succeeded, change event
    assert_eq!(tagged.len(), 5);
    assert!(tagged.iter().any(|r| r.is_event && r.message == "artifact.updated"));
    assert!(tagged.iter().any(|r| r.message == "read skill 'core/example' succeeded"));
}

#[tokio::test]
async fn before_state_is_logged_only_when_enabled() {
    let (engine, logger) = recorded_engine(quiet_config(10).with_state_in_logs(true));
    engine.create_skill(&sample_skill(), CreateOptions::new()).await.unwrap();
    engine
        .update_skill("core/example", &set_field("description", "B"), UpdateOptions::new())
        .await
        .unwrap();

    let started = logger.matching("update skill 'core/example' started");
    assert_eq!(started.len(), 1);
    assert_eq!(started[0].context["beforeState"]["content"], json!("X"));

    let production = CrudEngineConfig::production().with_console_logging(false);
    let (engine, logger) = recorded_engine(production);
    engine.create_skill(&sample_skill(), CreateOptions::new()).await.unwrap();
    engine
        .update_skill("core/example", &set_field("description", "B"), UpdateOptions::new())
        .await
        .unwrap();

    let started = logger.matching("update skill 'core/example' started");
    assert_eq!(started.len(), 1);
    assert!(!started[0].context.contains_key("beforeState"));
}

#[tokio::test]
async fn dry_runs_leave_no_trace() {
    let engine = memory_engine(quiet_config(10));
    let events = EventLog::new();
    engine.subscribe(events.callback());

    let planned = engine
        .create_skill(&sample_skill(), CreateOptions::new().dry_run())
        .await
        .unwrap();
    assert!(planned.success);
    assert!(!engine.read_skill("core/example", ReadOptions::new()).await.unwrap().success);

    engine.create_skill(&sample_skill(), CreateOptions::new()).await.unwrap();
    engine
        .update_skill("core/example", &set_field("description", "B"), UpdateOptions::new().dry_run())
        .await
        .unwrap();
    engine
        .delete_skill("core/example", DeleteOptions::new().dry_run())
        .await
        .unwrap();

    let read = engine.read_skill("core/example", ReadOptions::new()).await.unwrap();
    assert_eq!(read.data.unwrap().description, None);
    assert_eq!(engine.get_history().len(), 1);
    assert_eq!(events.names(), vec!["created"]);
}

#[tokio::test]
async fn wrong_payload_variant_is_rejected() {
    let (engine, logger) = recorded_engine(quiet_config(10));
    let hook: Artifact = Hook::new("fmt", "PostToolUse", "cargo fmt").into();

    let result = engine
        .create(ArtifactType::Skill, &hook, CreateOptions::new())
        .await
        .unwrap();
    assert_eq!(result.error_code(), Some(ErrorCode::InvalidInput));
    assert_eq!(logger.matching("rejected").len(), 1);
    assert!(engine.list_hooks().await.unwrap().data.unwrap().is_empty());
}

#[tokio::test]
async fn failed_pre_read_does_not_block_update() {
    let handler = Arc::new(FailingHandler::new(ArtifactType::Rule));
    let engine = engine_with(handler.clone(), quiet_config(10));
    let events = EventLog::new();
    engine.subscribe(events.callback());

    engine
        .create_rule(&Rule::new("style", "Use rustfmt.\n"), CreateOptions::new())
        .await
        .unwrap();
    handler.set(acf_test_utils::FailOn {
        read: true,
        ..Default::default()
    });

    let updated = engine
        .update_rule("style", &set_field("description", "Formatting"), UpdateOptions::new())
        .await
        .unwrap();
    assert!(updated.success);

    let entry = &engine.get_recent_operations(1)[0];
    assert!(entry.before_snapshot.is_absent());
    assert!(!entry.after_snapshot.is_absent());
    assert_eq!(events.names(), vec!["created", "updated"]);
    // create, pre-read, update
    assert_eq!(handler.calls(), 3);
}

#[tokio::test]
async fn disabled_snapshots_skip_history_but_still_notify() {
    let config = quiet_config(10).with_snapshots(false);
    let engine = memory_engine(config);
    let events = EventLog::new();
    engine.subscribe(events.callback());

    engine.create_skill(&sample_skill(), CreateOptions::new()).await.unwrap();
    assert!(engine.get_history().is_empty());
    assert_eq!(events.len(), 1);
}
