//! Type-indexed handler registry

use crate::error::EngineError;
use acf_artifact::ArtifactType;
use acf_handlers::{default_handlers, memory_handlers, ArtifactHandler};
use std::collections::BTreeMap;
use std::sync::Arc;

/// One handler per [`ArtifactType`]
#[derive(Debug, Clone, Default)]
pub struct HandlerRegistry {
    handlers: BTreeMap<ArtifactType, Arc<dyn ArtifactHandler>>,
}

impl HandlerRegistry {
    /// Create empty registry
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Filesystem handlers for every type
    #[must_use]
    pub fn filesystem() -> Self {
        Self::from_handlers(default_handlers())
    }

    /// In-memory handlers for every type
    #[must_use]
    pub fn in_memory() -> Self {
        Self::from_handlers(memory_handlers())
    }

    /// Build from handlers; later entries replace earlier ones of the same type
    #[must_use]
    pub fn from_handlers(handlers: impl IntoIterator<Item = Arc<dyn ArtifactHandler>>) -> Self {
        let mut registry = Self::new();
        for handler in handlers {
            registry.register(handler);
        }
        registry
    }

    /// Register `handler` under its own type, returning the one it replaces
    pub fn register(&mut self, handler: Arc<dyn ArtifactHandler>) -> Option<Arc<dyn ArtifactHandler>> {
        self.handlers.insert(handler.artifact_type(), handler)
    }

    /// With `handler` registered
    #[must_use]
    pub fn with(mut self, handler: Arc<dyn ArtifactHandler>) -> Self {
        self.register(handler);
        self
    }

    /// Handler for `artifact_type`
    ///
    /// # Errors
    /// Returns `EngineError::HandlerNotFound` if none is registered
    pub fn get(&self, artifact_type: ArtifactType) -> Result<&Arc<dyn ArtifactHandler>, EngineError> {
        self.handlers
            .get(&artifact_type)
            .ok_or(EngineError::HandlerNotFound(artifact_type))
    }

    /// Check if `artifact_type` has a handler
    #[inline]
    #[must_use]
    pub fn contains(&self, artifact_type: ArtifactType) -> bool {
        self.handlers.contains_key(&artifact_type)
    }

    /// Types without a handler
    #[must_use]
    pub fn missing(&self) -> Vec<ArtifactType> {
        ArtifactType::ALL
            .into_iter()
            .filter(|ty| !self.contains(*ty))
            .collect()
    }

    /// Check if every type has a handler
    #[inline]
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.missing().is_empty()
    }

    /// Registered types, in declaration order
    pub fn types(&self) -> impl Iterator<Item = ArtifactType> + '_ {
        self.handlers.keys().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use acf_handlers::MemoryHandler;
    use pretty_assertions::assert_eq;

    #[test]
    fn presets_are_complete() {
        assert!(HandlerRegistry::filesystem().is_complete());
        assert!(HandlerRegistry::in_memory().is_complete());
    }

    #[test]
    fn partial_registry_reports_missing() {
        let registry = HandlerRegistry::new().with(Arc::new(MemoryHandler::new(ArtifactType::Hook)));
        assert!(registry.contains(ArtifactType::Hook));
        assert_eq!(registry.missing().len(), ArtifactType::ALL.len() - 1);
        assert!(matches!(
            registry.get(ArtifactType::Skill),
            Err(EngineError::HandlerNotFound(ArtifactType::Skill))
        ));
    }

    #[test]
    fn register_replaces_same_type() {
        let mut registry = HandlerRegistry::new();
        assert!(registry.register(Arc::new(MemoryHandler::new(ArtifactType::Rule))).is_none());
        assert!(registry.register(Arc::new(MemoryHandler::new(ArtifactType::Rule))).is_some());
        assert_eq!(registry.types().collect::<Vec<_>>(), vec![ArtifactType::Rule]);
    }
}
