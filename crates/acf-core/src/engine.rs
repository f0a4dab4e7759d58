//! The CRUD engine
//!
//! Composes persistence dispatch, traffic logging, snapshot versioning and
//! change notification around the registered handlers.
//!
//! # Pipeline
//!
//! ```text
//! resolve handler → (update/delete) pre-read → logged handler call
//!     → on success: after-snapshot → history entry → change event
//! ```
//!
//! Reads and lists pass straight through the traffic logger. Failed and
//! dry-run operations leave no history entry and emit no event.

use crate::config::CrudEngineConfig;
use crate::error::EngineError;
use crate::events::ChangeEvent;
use crate::history::{HistoryEntry, OperationDescriptor, OperationHistory, OperationKind};
use crate::logger::{logger_for, LogContext, Logger};
use crate::registry::HandlerRegistry;
use crate::result::{ErrorCode, ErrorInfo, OperationResult};
use crate::snapshot::{Snapshot, SnapshotCapture};
use crate::subscriptions::{SubscriberStats, SubscriptionManager, Unsubscribe};
use crate::traffic::{TrafficContext, TrafficLogger};
use acf_artifact::{
    compute_field_changes, Agent, Artifact, ArtifactChanges, ArtifactType, ArtifactValue, Command,
    Hook, McpServer, Rule, Skill, SubAgent, TypedArtifact,
};
use acf_handlers::{ArtifactHandler, CreateOptions, DeleteOptions, ReadOptions, UpdateOptions};
use chrono::Utc;
use serde_json::json;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use ulid::Ulid;

/// Engine result: `Err` only for a missing handler
pub type EngineResult<T> = Result<OperationResult<T>, EngineError>;

/// CRUD facade over the artifact handlers
#[derive(Debug)]
pub struct CrudEngine {
    root: PathBuf,
    config: CrudEngineConfig,
    registry: HandlerRegistry,
    traffic: TrafficLogger,
    snapshots: SnapshotCapture,
    history: OperationHistory,
    subscriptions: SubscriptionManager,
}

impl CrudEngine {
    /// Create engine over the filesystem handlers rooted at `root`
    #[must_use]
    pub fn new(root: impl Into<PathBuf>, config: CrudEngineConfig) -> Self {
        Self::with_registry(root, config, HandlerRegistry::filesystem())
    }

    /// Create engine over an explicit registry
    ///
    /// Partial registries are accepted; operations on a missing type return
    /// `EngineError::HandlerNotFound`.
    #[must_use]
    pub fn with_registry(
        root: impl Into<PathBuf>,
        config: CrudEngineConfig,
        registry: HandlerRegistry,
    ) -> Self {
        let logger = logger_for(&config.logging);
        let root = root.into();
        if !registry.is_complete() {
            tracing::debug!(missing = ?registry.missing(), "engine created with a partial registry");
        }
        Self {
            traffic: TrafficLogger::new(logger, config.logging.include_state_in_logs),
            history: OperationHistory::new(config.versioning.history_size),
            snapshots: SnapshotCapture::new(),
            subscriptions: SubscriptionManager::new(),
            registry,
            config,
            root,
        }
    }

    /// Replace the logger chosen from configuration
    #[must_use]
    pub fn with_logger(mut self, logger: Arc<dyn Logger>) -> Self {
        self.traffic = TrafficLogger::new(logger, self.config.logging.include_state_in_logs);
        self
    }

    /// Project root passed to every handler
    #[inline]
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Active configuration
    #[inline]
    #[must_use]
    pub fn config(&self) -> &CrudEngineConfig {
        &self.config
    }

    /// Registered handlers
    #[inline]
    #[must_use]
    pub fn registry(&self) -> &HandlerRegistry {
        &self.registry
    }

    fn handler(&self, artifact_type: ArtifactType) -> Result<Arc<dyn ArtifactHandler>, EngineError> {
        self.registry.get(artifact_type).map(Arc::clone)
    }

    // ---- generic operations ----

    /// Create an artifact of `artifact_type`
    ///
    /// # Errors
    /// Returns `EngineError::HandlerNotFound` if no handler is registered
    pub async fn create(
        &self,
        artifact_type: ArtifactType,
        artifact: &Artifact,
        options: CreateOptions,
    ) -> EngineResult<Artifact> {
        let handler = self.handler(artifact_type)?;
        let operation_id = Ulid::new();
        let id = artifact.id();
        let ctx = TrafficContext::new(operation_id, OperationKind::Create, artifact_type)
            .with_id(&id)
            .with_dry_run(options.dry_run);

        if let Some(error) = variant_mismatch(artifact_type, artifact) {
            self.traffic.reject(&ctx, &error);
            return Ok(OperationResult::failure(error));
        }

        let before = self.snapshot(artifact_type, &id, None);
        let result = self
            .traffic
            .invoke(ctx, handler.create(&self.root, artifact, &options))
            .await;

        if let (true, false, Some(created)) = (result.success, options.dry_run, &result.data) {
            let descriptor = OperationDescriptor::new(OperationKind::Create, artifact_type, &id)
                .with_options(options);
            self.record(operation_id, descriptor, &result, before, Some(created));
            self.notify(ChangeEvent::created(created.clone(), operation_id));
        }
        Ok(result)
    }

    /// Read an artifact by id
    ///
    /// # Errors
    /// Returns `EngineError::HandlerNotFound` if no handler is registered
    pub async fn read(
        &self,
        artifact_type: ArtifactType,
        id: &str,
        options: ReadOptions,
    ) -> EngineResult<Artifact> {
        let handler = self.handler(artifact_type)?;
        let ctx = TrafficContext::new(Ulid::new(), OperationKind::Read, artifact_type).with_id(id);
        Ok(self
            .traffic
            .invoke(ctx, handler.read(&self.root, id, &options))
            .await)
    }

    /// Apply `changes` to an artifact
    ///
    /// # Errors
    /// Returns `EngineError::HandlerNotFound` if no handler is registered
    pub async fn update(
        &self,
        artifact_type: ArtifactType,
        id: &str,
        changes: &ArtifactChanges,
        options: UpdateOptions,
    ) -> EngineResult<Artifact> {
        let handler = self.handler(artifact_type)?;
        let operation_id = Ulid::new();
        let current = self.pre_read(&handler, operation_id, artifact_type, id).await;
        let before = self.snapshot(artifact_type, id, current.as_ref());

        let ctx = TrafficContext::new(operation_id, OperationKind::Update, artifact_type)
            .with_id(id)
            .with_dry_run(options.dry_run)
            .with_before(current.as_ref());
        let result = self
            .traffic
            .invoke(ctx, handler.update(&self.root, id, changes, &options))
            .await;

        if let (true, false, Some(updated)) = (result.success, options.dry_run, &result.data) {
            let old = current.as_ref().map_or(ArtifactValue::Null, Artifact::to_value);
            let field_changes = compute_field_changes(&old, &updated.to_value());

            let descriptor = OperationDescriptor::new(OperationKind::Update, artifact_type, id)
                .with_options(options)
                .with_changes(changes);
            self.record(operation_id, descriptor, &result, before, Some(updated));
            self.notify(ChangeEvent::updated(updated.clone(), field_changes, operation_id));
        }
        Ok(result)
    }

    /// Delete an artifact
    ///
    /// # Errors
    /// Returns `EngineError::HandlerNotFound` if no handler is registered
    pub async fn delete(
        &self,
        artifact_type: ArtifactType,
        id: &str,
        options: DeleteOptions,
    ) -> EngineResult<()> {
        let handler = self.handler(artifact_type)?;
        let operation_id = Ulid::new();
        let current = self.pre_read(&handler, operation_id, artifact_type, id).await;
        let before = self.snapshot(artifact_type, id, current.as_ref());

        let ctx = TrafficContext::new(operation_id, OperationKind::Delete, artifact_type)
            .with_id(id)
            .with_dry_run(options.dry_run)
            .with_before(current.as_ref());
        let result = self
            .traffic
            .invoke(ctx, handler.delete(&self.root, id, &options))
            .await;

        if result.success && !options.dry_run {
            let descriptor = OperationDescriptor::new(OperationKind::Delete, artifact_type, id)
                .with_options(options);
            self.record(operation_id, descriptor, &result.clone().map(|()| None::<Artifact>), before, None);
            self.notify(ChangeEvent::deleted(artifact_type, id, current, operation_id));
        }
        Ok(result)
    }

    /// All artifacts of `artifact_type`, sorted by id
    ///
    /// # Errors
    /// Returns `EngineError::HandlerNotFound` if no handler is registered
    pub async fn list(&self, artifact_type: ArtifactType) -> EngineResult<Vec<Artifact>> {
        let handler = self.handler(artifact_type)?;
        let ctx = TrafficContext::new(Ulid::new(), OperationKind::List, artifact_type);
        Ok(self.traffic.invoke(ctx, handler.list(&self.root)).await)
    }

    // ---- typed operations ----

    /// Create a typed artifact
    ///
    /// # Errors
    /// Returns `EngineError::HandlerNotFound` if no handler is registered
    pub async fn create_typed<T: TypedArtifact>(&self, artifact: &T, options: CreateOptions) -> EngineResult<T> {
        let artifact: Artifact = artifact.clone().into();
        Ok(self.create(T::TYPE, &artifact, options).await?.and_then(narrow))
    }

    /// Read a typed artifact
    ///
    /// # Errors
    /// Returns `EngineError::HandlerNotFound` if no handler is registered
    pub async fn read_typed<T: TypedArtifact>(&self, id: &str, options: ReadOptions) -> EngineResult<T> {
        Ok(self.read(T::TYPE, id, options).await?.and_then(narrow))
    }

    /// Update a typed artifact
    ///
    /// # Errors
    /// Returns `EngineError::HandlerNotFound` if no handler is registered
    pub async fn update_typed<T: TypedArtifact>(
        &self,
        id: &str,
        changes: &ArtifactChanges,
        options: UpdateOptions,
    ) -> EngineResult<T> {
        Ok(self.update(T::TYPE, id, changes, options).await?.and_then(narrow))
    }

    /// List typed artifacts
    ///
    /// # Errors
    /// Returns `EngineError::HandlerNotFound` if no handler is registered
    pub async fn list_typed<T: TypedArtifact>(&self) -> EngineResult<Vec<T>> {
        Ok(self
            .list(T::TYPE)
            .await?
            .and_then(|items| items.into_iter().map(narrow).collect()))
    }

    // ---- history ----

    /// Retained history, oldest first
    #[must_use]
    pub fn get_history(&self) -> Vec<HistoryEntry> {
        self.history.get_all()
    }

    /// Up to `n` history entries, most recent first
    #[must_use]
    pub fn get_recent_operations(&self, n: usize) -> Vec<HistoryEntry> {
        self.history.get_recent(n)
    }

    /// Drop all history entries
    pub fn clear_history(&self) {
        self.history.clear();
    }

    // ---- subscriptions ----

    /// Receive every change event
    pub fn subscribe<F>(&self, callback: F) -> Unsubscribe
    where
        F: Fn(&ChangeEvent) + Send + Sync + 'static,
    {
        self.subscriptions.subscribe(callback)
    }

    /// Receive change events for one type
    pub fn subscribe_to_type<F>(&self, artifact_type: ArtifactType, callback: F) -> Unsubscribe
    where
        F: Fn(&ChangeEvent) + Send + Sync + 'static,
    {
        self.subscriptions.subscribe_to_type(artifact_type, callback)
    }

    /// Receive change events for one artifact
    pub fn subscribe_to_artifact<F>(
        &self,
        artifact_type: ArtifactType,
        artifact_id: impl Into<String>,
        callback: F,
    ) -> Unsubscribe
    where
        F: Fn(&ChangeEvent) + Send + Sync + 'static,
    {
        self.subscriptions
            .subscribe_to_artifact(artifact_type, artifact_id, callback)
    }

    /// Subscriber counts per tier
    #[must_use]
    pub fn get_subscriber_stats(&self) -> SubscriberStats {
        self.subscriptions.stats()
    }

    /// The engine's subscription manager
    #[inline]
    #[must_use]
    pub fn subscriptions(&self) -> &SubscriptionManager {
        &self.subscriptions
    }

    // ---- pipeline steps ----

    /// Current state for diffing; a failed read is not fatal
    async fn pre_read(
        &self,
        handler: &Arc<dyn ArtifactHandler>,
        operation_id: Ulid,
        artifact_type: ArtifactType,
        id: &str,
    ) -> Option<Artifact> {
        let ctx = TrafficContext::new(operation_id, OperationKind::Read, artifact_type)
            .with_id(id)
            .as_pre_read();
        self.traffic
            .invoke(ctx, handler.read(&self.root, id, &ReadOptions::new()))
            .await
            .data
    }

    fn snapshot(&self, artifact_type: ArtifactType, id: &str, state: Option<&Artifact>) -> Option<Snapshot> {
        self.config
            .versioning
            .capture_snapshots
            .then(|| self.snapshots.capture(artifact_type, id, state))
    }

    fn record<T: Clone + Into<Option<Artifact>>>(
        &self,
        operation_id: Ulid,
        descriptor: OperationDescriptor,
        result: &OperationResult<T>,
        before: Option<Snapshot>,
        after_state: Option<&Artifact>,
    ) {
        let Some(before) = before else {
            return;
        };
        let after = self
            .snapshots
            .capture(before.artifact_type, before.artifact_id.clone(), after_state);
        self.history.add(HistoryEntry {
            operation_id,
            operation_descriptor: descriptor,
            result: result.clone().map(Into::into),
            before_snapshot: before,
            after_snapshot: after,
            timestamp: Utc::now(),
        });
    }

    fn notify(&self, event: ChangeEvent) {
        let delivered = self.subscriptions.emit(&event);
        let mut ctx = LogContext::new();
        ctx.insert("operationId".into(), json!(event.operation_id.to_string()));
        ctx.insert("artifactType".into(), json!(event.artifact_type.as_str()));
        ctx.insert("artifactId".into(), json!(event.artifact_id));
        ctx.insert("subscribers".into(), json!(delivered));
        self.traffic
            .logger()
            .event(&format!("artifact.{}", event.name()), &ctx);
    }
}

fn variant_mismatch(expected: ArtifactType, artifact: &Artifact) -> Option<ErrorInfo> {
    let actual = artifact.artifact_type();
    (actual != expected).then(|| {
        ErrorInfo::new(
            ErrorCode::InvalidInput,
            format!("expected a {expected} payload, got a {actual}"),
        )
    })
}

fn narrow<T: TypedArtifact>(artifact: Artifact) -> Result<T, ErrorInfo> {
    T::from_artifact(artifact).map_err(|e| ErrorInfo::new(ErrorCode::TypeMismatch, e.to_string()))
}

macro_rules! typed_operations {
    ($($ty:ident => $create:ident, $read:ident, $update:ident, $delete:ident, $list:ident;)+) => {
        /// Per-type delegations to the generic operations
        impl CrudEngine {
            $(
                #[doc = concat!("Create a [`", stringify!($ty), "`]")]
                ///
                /// # Errors
                /// Returns `EngineError::HandlerNotFound` if no handler is registered
                pub async fn $create(&self, artifact: &$ty, options: CreateOptions) -> EngineResult<$ty> {
                    self.create_typed(artifact, options).await
                }

                #[doc = concat!("Read a [`", stringify!($ty), "`]")]
                ///
                /// # Errors
                /// Returns `EngineError::HandlerNotFound` if no handler is registered
                pub async fn $read(&self, id: &str, options: ReadOptions) -> EngineResult<$ty> {
                    self.read_typed(id, options).await
                }

                #[doc = concat!("Update a [`", stringify!($ty), "`]")]
                ///
                /// # Errors
                /// Returns `EngineError::HandlerNotFound` if no handler is registered
                pub async fn $update(
                    &self,
                    id: &str,
                    changes: &ArtifactChanges,
                    options: UpdateOptions,
                ) -> EngineResult<$ty> {
                    self.update_typed(id, changes, options).await
                }

                #[doc = concat!("Delete a [`", stringify!($ty), "`]")]
                ///
                /// # Errors
                /// Returns `EngineError::HandlerNotFound` if no handler is registered
                pub async fn $delete(&self, id: &str, options: DeleteOptions) -> EngineResult<()> {
                    self.delete(<$ty as TypedArtifact>::TYPE, id, options).await
                }

                #[doc = concat!("List every [`", stringify!($ty), "`]")]
                ///
                /// # Errors
                /// Returns `EngineError::HandlerNotFound` if no handler is registered
                pub async fn $list(&self) -> EngineResult<Vec<$ty>> {
                    self.list_typed().await
                }
            )+
        }
    };
}

typed_operations! {
    Skill => create_skill, read_skill, update_skill, delete_skill, list_skills;
    Hook => create_hook, read_hook, update_hook, delete_hook, list_hooks;
    SubAgent => create_sub_agent, read_sub_agent, update_sub_agent, delete_sub_agent, list_sub_agents;
    Rule => create_rule, read_rule, update_rule, delete_rule, list_rules;
    Agent => create_agent, read_agent, update_agent, delete_agent, list_agents;
    Command => create_command, read_command, update_command, delete_command, list_commands;
    McpServer => create_mcp_server, read_mcp_server, update_mcp_server, delete_mcp_server, list_mcp_servers;
}
