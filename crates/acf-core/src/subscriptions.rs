//! Three-tier change subscriptions
//!
//! Subscribers register at one of three scopes:
//! - `*`: every event
//! - `type:<type>`: events for one artifact type
//! - `artifact:<type>:<id>`: events for one artifact
//!
//! [`SubscriptionManager::emit`] notifies global, then type, then artifact
//! subscribers. Callbacks run synchronously on the emitting task; a panicking
//! callback is logged and skipped.

use crate::events::ChangeEvent;
use acf_artifact::ArtifactType;
use indexmap::IndexMap;
use parking_lot::Mutex;
use serde::Serialize;
use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Weak};

/// Subscriber callback
pub type Subscriber = Arc<dyn Fn(&ChangeEvent) + Send + Sync>;

/// Scope a subscriber is registered under
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ScopeKey {
    Global,
    Type(ArtifactType),
    Artifact(ArtifactType, String),
}

impl ScopeKey {
    /// The three scopes an event for `artifact_type`/`artifact_id` reaches,
    /// in delivery order
    #[must_use]
    pub fn for_event(artifact_type: ArtifactType, artifact_id: &str) -> [ScopeKey; 3] {
        [
            Self::Global,
            Self::Type(artifact_type),
            Self::Artifact(artifact_type, artifact_id.to_string()),
        ]
    }
}

impl fmt::Display for ScopeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Global => f.write_str("*"),
            Self::Type(ty) => write!(f, "type:{ty}"),
            Self::Artifact(ty, id) => write!(f, "artifact:{ty}:{id}"),
        }
    }
}

/// Subscriber counts per tier
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriberStats {
    pub global: usize,
    pub by_type: usize,
    pub by_artifact: usize,
    /// Scope keys currently held
    pub scopes: usize,
}

impl SubscriberStats {
    /// All subscribers
    #[inline]
    #[must_use]
    pub fn total(&self) -> usize {
        self.global + self.by_type + self.by_artifact
    }
}

#[derive(Default)]
struct Registry {
    next_id: u64,
    scopes: HashMap<ScopeKey, IndexMap<u64, Subscriber>>,
}

impl Registry {
    fn insert(&mut self, key: ScopeKey, subscriber: Subscriber) -> u64 {
        self.next_id += 1;
        let id = self.next_id;
        self.scopes.entry(key).or_default().insert(id, subscriber);
        id
    }

    fn remove(&mut self, key: &ScopeKey, id: u64) -> bool {
        let Some(set) = self.scopes.get_mut(key) else {
            return false;
        };
        let removed = set.shift_remove(&id).is_some();
        if set.is_empty() {
            self.scopes.remove(key);
        }
        removed
    }
}

/// Handle that removes one subscription
///
/// Calling [`Unsubscribe::unsubscribe`] more than once is a no-op. Dropping
/// the handle leaves the subscription in place.
#[derive(Clone)]
pub struct Unsubscribe {
    registry: Weak<Mutex<Registry>>,
    key: ScopeKey,
    id: u64,
}

impl Unsubscribe {
    /// Remove the subscription; returns `true` only on the first effective call
    pub fn unsubscribe(&self) -> bool {
        match self.registry.upgrade() {
            Some(registry) => registry.lock().remove(&self.key, self.id),
            None => false,
        }
    }

    /// Scope of the subscription
    #[inline]
    #[must_use]
    pub fn scope(&self) -> &ScopeKey {
        &self.key
    }
}

impl fmt::Debug for Unsubscribe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Unsubscribe")
            .field("scope", &self.key.to_string())
            .field("id", &self.id)
            .finish()
    }
}

/// Scope-keyed subscriber registry owned by one engine
#[derive(Clone, Default)]
pub struct SubscriptionManager {
    registry: Arc<Mutex<Registry>>,
}

impl SubscriptionManager {
    /// Create empty manager
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn register(&self, key: ScopeKey, subscriber: Subscriber) -> Unsubscribe {
        let id = self.registry.lock().insert(key.clone(), subscriber);
        tracing::trace!(scope = %key, id, "subscriber registered");
        Unsubscribe {
            registry: Arc::downgrade(&self.registry),
            key,
            id,
        }
    }

    /// Receive every event
    pub fn subscribe<F>(&self, callback: F) -> Unsubscribe
    where
        F: Fn(&ChangeEvent) + Send + Sync + 'static,
    {
        self.register(ScopeKey::Global, Arc::new(callback))
    }

    /// Receive events for one artifact type
    pub fn subscribe_to_type<F>(&self, artifact_type: ArtifactType, callback: F) -> Unsubscribe
    where
        F: Fn(&ChangeEvent) + Send + Sync + 'static,
    {
        self.register(ScopeKey::Type(artifact_type), Arc::new(callback))
    }

    /// Receive events for one artifact
    pub fn subscribe_to_artifact<F>(
        &self,
        artifact_type: ArtifactType,
        artifact_id: impl Into<String>,
        callback: F,
    ) -> Unsubscribe
    where
        F: Fn(&ChangeEvent) + Send + Sync + 'static,
    {
        self.register(
            ScopeKey::Artifact(artifact_type, artifact_id.into()),
            Arc::new(callback),
        )
    }

    /// Notify matching subscribers; returns how many completed without panicking
    pub fn emit(&self, event: &ChangeEvent) -> usize {
        // snapshot under the lock so callbacks may (un)subscribe freely
        let targets: Vec<(ScopeKey, Subscriber)> = {
            let registry = self.registry.lock();
            ScopeKey::for_event(event.artifact_type, &event.artifact_id)
                .into_iter()
                .filter_map(|key| registry.scopes.get(&key).map(|set| (key, set)))
                .flat_map(|(key, set)| {
                    set.values()
                        .map(move |cb| (key.clone(), Arc::clone(cb)))
                        .collect::<Vec<_>>()
                })
                .collect()
        };

        let mut delivered = 0;
        for (scope, callback) in targets {
            match catch_unwind(AssertUnwindSafe(|| callback(event))) {
                Ok(()) => delivered += 1,
                Err(payload) => tracing::error!(
                    scope = %scope,
                    event = event.name(),
                    artifact_id = %event.artifact_id,
                    "subscriber panicked: {}",
                    panic_message(payload.as_ref())
                ),
            }
        }
        delivered
    }

    /// Counts per tier
    #[must_use]
    pub fn stats(&self) -> SubscriberStats {
        let registry = self.registry.lock();
        let mut stats = SubscriberStats {
            scopes: registry.scopes.len(),
            ..SubscriberStats::default()
        };
        for (key, set) in &registry.scopes {
            match key {
                ScopeKey::Global => stats.global += set.len(),
                ScopeKey::Type(_) => stats.by_type += set.len(),
                ScopeKey::Artifact(..) => stats.by_artifact += set.len(),
            }
        }
        stats
    }

    /// Check if a scope currently holds subscribers
    #[must_use]
    pub fn has_scope(&self, key: &ScopeKey) -> bool {
        self.registry.lock().scopes.contains_key(key)
    }

    /// Remove every subscription
    pub fn clear(&self) {
        self.registry.lock().scopes.clear();
    }
}

impl fmt::Debug for SubscriptionManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubscriptionManager")
            .field("stats", &self.stats())
            .finish()
    }
}

pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
