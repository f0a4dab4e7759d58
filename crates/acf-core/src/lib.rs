//! ACF Core
//!
//! CRUD engine for agent-configuration artifacts. Every mutation is
//! persisted through a per-type handler, traffic-logged, versioned as
//! before/after snapshots in a bounded history, and broadcast to
//! subscribers at global, type and artifact scope.
//!
//! # Core Concepts
//!
//! - [`CrudEngine`]: generic and typed create/read/update/delete/list
//! - [`HandlerRegistry`]: one [`ArtifactHandler`](acf_handlers::ArtifactHandler) per type
//! - [`TrafficLogger`] / [`Logger`]: structured operation logging
//! - [`OperationHistory`]: bounded FIFO of [`HistoryEntry`]
//! - [`SubscriptionManager`]: three-tier change notification
//!
//! # Example
//!
//! ```rust,no_run
//! use acf_core::prelude::*;
//!
//! # async fn example() -> Result<(), EngineError> {
//! let engine = CrudEngine::new(".", CrudEngineConfig::production());
//! let _unsubscribe = engine.subscribe_to_type(ArtifactType::Skill, |event| {
//!     println!("{} {}", event.name(), event.artifact_id);
//! });
//!
//! let result = engine
//!     .create_skill(&Skill::new("core", "example", "X"), CreateOptions::new())
//!     .await?;
//! assert!(result.success);
//! # Ok(())
//! # }
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod config;
pub mod engine;
pub mod error;
pub mod events;
pub mod history;
pub mod logger;
pub mod registry;
pub mod result;
pub mod snapshot;
pub mod subscriptions;
pub mod traffic;

pub use config::{CrudEngineConfig, LogLevel, LoggingConfig, VersioningConfig};
pub use engine::{CrudEngine, EngineResult};
pub use error::{ConfigError, EngineError};
pub use events::{ChangeEvent, ChangeKind};
pub use history::{HistoryEntry, OperationDescriptor, OperationHistory, OperationKind};
pub use logger::{init_tracing, LogContext, Logger, NoopLogger, TracingLogger};
pub use registry::HandlerRegistry;
pub use result::{ErrorCode, ErrorInfo, OperationResult};
pub use snapshot::{Snapshot, SnapshotCapture};
pub use subscriptions::{ScopeKey, SubscriberStats, Subscriber, SubscriptionManager, Unsubscribe};
pub use traffic::{TrafficContext, TrafficLogger};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for driving the engine
    pub use crate::config::{CrudEngineConfig, LogLevel};
    pub use crate::engine::CrudEngine;
    pub use crate::error::EngineError;
    pub use crate::events::ChangeEvent;
    pub use crate::result::{ErrorCode, OperationResult};
    pub use acf_artifact::{
        Agent, Artifact, ArtifactChanges, ArtifactType, Command, Hook, McpServer, Rule, Skill,
        SubAgent,
    };
    pub use acf_handlers::{CreateOptions, DeleteOptions, ReadOptions, UpdateOptions};
}

#[cfg(test)]
mod integration_tests {
    use super::prelude::*;
    use super::HandlerRegistry;

    #[tokio::test]
    async fn filesystem_engine_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let engine = CrudEngine::new(dir.path(), CrudEngineConfig::production().with_console_logging(false));

        let rule = Rule::new("testing", "Always run tests.\n");
        assert!(engine.create_rule(&rule, CreateOptions::new()).await.unwrap().success);
        let read = engine.read_rule("testing", ReadOptions::new()).await.unwrap();
        assert_eq!(read.data, Some(rule));
        assert!(dir.path().join(".claude/rules/testing.md").exists());
    }

    #[tokio::test]
    async fn partial_registry_fails_fast() {
        let engine = CrudEngine::with_registry(
            "/unused",
            CrudEngineConfig::default(),
            HandlerRegistry::new(),
        );
        let err = engine.list(ArtifactType::Hook).await.unwrap_err();
        assert!(err.is_handler_not_found());
    }
}
