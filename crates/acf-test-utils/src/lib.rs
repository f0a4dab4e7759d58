//! Testing utilities for the ACF workspace
//!
//! Shared fixtures, scripted handlers, and a logger that records what it is
//! given.

#![allow(missing_docs)]

use acf_artifact::{
    Agent, Artifact, ArtifactChanges, ArtifactType, Command, Hook, McpServer, Rule, Skill, SubAgent,
};
use acf_core::{
    ChangeEvent, CrudEngine, CrudEngineConfig, HandlerRegistry, LogContext, LogLevel, Logger,
};
use acf_handlers::{
    ArtifactHandler, CreateOptions, DeleteOptions, HandlerError, HandlerResult, MemoryHandler,
    ReadOptions, UpdateOptions,
};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::path::Path;
use std::sync::Arc;

// ---- fixtures ----

pub fn sample_skill() -> Skill {
    Skill::new("core", "example", "X")
}

pub fn sample_hook() -> Hook {
    Hook::new("format", "PostToolUse", "cargo fmt").with_matcher("Edit")
}

/// One valid artifact per type
pub fn sample_artifacts() -> Vec<Artifact> {
    vec![
        sample_skill().with_description("Example skill").into(),
        sample_hook().into(),
        SubAgent::new("reviewer", "Review the diff.\n").into(),
        Rule::new("testing", "Always run tests.\n").into(),
        Agent::new("planner", "Plan the work.\n").into(),
        Command::new("deploy", "Deploy $ARGUMENTS\n").into(),
        McpServer::stdio("filesystem", "npx").into(),
    ]
}

/// Config with console logging off and the given history size
pub fn quiet_config(history_size: usize) -> CrudEngineConfig {
    CrudEngineConfig::development()
        .with_console_logging(false)
        .with_history_size(history_size)
}

/// Engine over in-memory handlers
pub fn memory_engine(config: CrudEngineConfig) -> CrudEngine {
    CrudEngine::with_registry("/virtual", config, HandlerRegistry::in_memory())
}

/// In-memory engine with `handler` replacing the default for its type
pub fn engine_with(handler: Arc<dyn ArtifactHandler>, config: CrudEngineConfig) -> CrudEngine {
    let registry = HandlerRegistry::in_memory().with(handler);
    CrudEngine::with_registry("/virtual", config, registry)
}

/// In-memory engine whose traffic goes to a [`RecordingLogger`]
pub fn recorded_engine(config: CrudEngineConfig) -> (CrudEngine, RecordingLogger) {
    let logger = RecordingLogger::new();
    let engine = memory_engine(config).with_logger(Arc::new(logger.clone()));
    (engine, logger)
}

// ---- change events ----

/// Collects delivered change events
#[derive(Debug, Clone, Default)]
pub struct EventLog {
    events: Arc<Mutex<Vec<ChangeEvent>>>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Callback that appends to this log
    pub fn callback(&self) -> impl Fn(&ChangeEvent) + Send + Sync + 'static {
        let events = Arc::clone(&self.events);
        move |event: &ChangeEvent| events.lock().push(event.clone())
    }

    pub fn events(&self) -> Vec<ChangeEvent> {
        self.events.lock().clone()
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.events.lock().iter().map(ChangeEvent::name).collect()
    }

    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.lock().is_empty()
    }
}

// ---- logging ----

#[derive(Debug, Clone, PartialEq)]
pub struct LogRecord {
    pub level: LogLevel,
    pub message: String,
    pub context: LogContext,
    pub is_event: bool,
}

/// Logger that keeps every entry; children share the sink
#[derive(Debug, Clone, Default)]
pub struct RecordingLogger {
    records: Arc<Mutex<Vec<LogRecord>>>,
    context: LogContext,
}

impl RecordingLogger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<LogRecord> {
        self.records.lock().clone()
    }

    /// Records whose message contains `needle`
    pub fn matching(&self, needle: &str) -> Vec<LogRecord> {
        self.records
            .lock()
            .iter()
            .filter(|r| r.message.contains(needle))
            .cloned()
            .collect()
    }

    pub fn at_level(&self, level: LogLevel) -> Vec<LogRecord> {
        self.records
            .lock()
            .iter()
            .filter(|r| r.level == level)
            .cloned()
            .collect()
    }

    fn push(&self, level: LogLevel, message: &str, context: &LogContext, is_event: bool) {
        self.records.lock().push(LogRecord {
            level,
            message: message.to_string(),
            context: acf_core::logger::merge_context(&self.context, context),
            is_event,
        });
    }
}

impl Logger for RecordingLogger {
    fn log(&self, level: LogLevel, message: &str, context: &LogContext) {
        self.push(level, message, context, false);
    }

    fn event(&self, name: &str, context: &LogContext) {
        self.push(LogLevel::Info, name, context, true);
    }

    fn child(&self, context: LogContext) -> Arc<dyn Logger> {
        Arc::new(Self {
            records: Arc::clone(&self.records),
            context: acf_core::logger::merge_context(&self.context, &context),
        })
    }
}

// ---- scripted handlers ----

/// Operations a [`FailingHandler`] can be told to fail
#[derive(Debug, Clone, Copy, Default)]
pub struct FailOn {
    pub create: bool,
    pub read: bool,
    pub update: bool,
    pub delete: bool,
    pub list: bool,
}

/// In-memory handler that fails selected operations with `InvalidInput`
#[derive(Debug)]
pub struct FailingHandler {
    inner: MemoryHandler,
    fail: Mutex<FailOn>,
    calls: Mutex<usize>,
}

impl FailingHandler {
    /// Fails nothing until configured
    pub fn new(artifact_type: ArtifactType) -> Self {
        Self {
            inner: MemoryHandler::new(artifact_type),
            fail: Mutex::new(FailOn::default()),
            calls: Mutex::new(0),
        }
    }

    /// Fails every operation
    pub fn always(artifact_type: ArtifactType) -> Self {
        let handler = Self::new(artifact_type);
        handler.set(FailOn {
            create: true,
            read: true,
            update: true,
            delete: true,
            list: true,
        });
        handler
    }

    pub fn set(&self, fail: FailOn) {
        *self.fail.lock() = fail;
    }

    /// Handler calls so far
    pub fn calls(&self) -> usize {
        *self.calls.lock()
    }

    fn check(&self, op: &str, fails: impl Fn(&FailOn) -> bool) -> Result<(), HandlerError> {
        *self.calls.lock() += 1;
        if fails(&*self.fail.lock()) {
            Err(HandlerError::InvalidInput(format!("scripted {op} failure")))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl ArtifactHandler for FailingHandler {
    fn artifact_type(&self) -> ArtifactType {
        self.inner.artifact_type()
    }

    async fn create(&self, root: &Path, artifact: &Artifact, options: &CreateOptions) -> HandlerResult<Artifact> {
        self.check("create", |f| f.create)?;
        self.inner.create(root, artifact, options).await
    }

    async fn read(&self, root: &Path, id: &str, options: &ReadOptions) -> HandlerResult<Artifact> {
        self.check("read", |f| f.read)?;
        self.inner.read(root, id, options).await
    }

    async fn update(
        &self,
        root: &Path,
        id: &str,
        changes: &ArtifactChanges,
        options: &UpdateOptions,
    ) -> HandlerResult<Artifact> {
        self.check("update", |f| f.update)?;
        self.inner.update(root, id, changes, options).await
    }

    async fn delete(&self, root: &Path, id: &str, options: &DeleteOptions) -> HandlerResult<()> {
        self.check("delete", |f| f.delete)?;
        self.inner.delete(root, id, options).await
    }

    async fn list(&self, root: &Path) -> HandlerResult<Vec<Artifact>> {
        self.check("list", |f| f.list)?;
        self.inner.list(root).await
    }
}

/// Handler whose mutations panic; reads and lists are served from memory
#[derive(Debug)]
pub struct PanickingHandler {
    inner: MemoryHandler,
}

impl PanickingHandler {
    pub fn new(artifact_type: ArtifactType) -> Self {
        Self {
            inner: MemoryHandler::new(artifact_type),
        }
    }
}

#[async_trait]
impl ArtifactHandler for PanickingHandler {
    fn artifact_type(&self) -> ArtifactType {
        self.inner.artifact_type()
    }

    async fn create(&self, _root: &Path, artifact: &Artifact, _options: &CreateOptions) -> HandlerResult<Artifact> {
        panic!("create of {} exploded", artifact.id())
    }

    async fn read(&self, root: &Path, id: &str, options: &ReadOptions) -> HandlerResult<Artifact> {
        self.inner.read(root, id, options).await
    }

    async fn update(
        &self,
        _root: &Path,
        id: &str,
        _changes: &ArtifactChanges,
        _options: &UpdateOptions,
    ) -> HandlerResult<Artifact> {
        panic!("update of {id} exploded")
    }

    async fn delete(&self, _root: &Path, id: &str, _options: &DeleteOptions) -> HandlerResult<()> {
        panic!("delete of {id} exploded")
    }

    async fn list(&self, root: &Path) -> HandlerResult<Vec<Artifact>> {
        self.inner.list(root).await
    }
}

/// Changes setting one string field
pub fn set_field(field: &str, value: &str) -> ArtifactChanges {
    ArtifactChanges::new().set(field, serde_json::Value::from(value))
}
