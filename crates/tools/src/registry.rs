//! The tool registry — the set of callable tools currently available.
//!
//! Providers register the tools they expose, keyed by `(server, name)`.
//! An orchestration round never reads the live registry: it takes a
//! `ToolSnapshot` once and resolves every call against that frozen view,
//! so no tool appears or disappears mid-round.

use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::Utc;
use tracing::{debug, info};

use chatforge_core::error::RegistryError;
use chatforge_core::event::{DomainEvent, EventBus};
use chatforge_core::tool::{ToolProvider, ToolRef, ToolSpec};

/// A tool resolved to its executable handle: the spec plus an `Arc` to the
/// owning provider. Snapshots hold these, so a provider deregistered
/// mid-round stays callable until the round finishes.
#[derive(Clone)]
pub struct ResolvedTool {
    pub spec: ToolSpec,
    pub provider: Arc<dyn ToolProvider>,
}

impl std::fmt::Debug for ResolvedTool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolvedTool")
            .field("spec", &self.spec)
            .field("provider", &self.provider.server())
            .finish()
    }
}

/// An immutable view of the registry fixed at a point in time, used for
/// the duration of one orchestrated turn.
#[derive(Clone)]
pub struct ToolSnapshot {
    entries: HashMap<ToolRef, ResolvedTool>,
}

impl ToolSnapshot {
    /// Resolve a tool reference against this snapshot.
    pub fn resolve(&self, tool: &ToolRef) -> Result<&ResolvedTool, RegistryError> {
        self.entries.get(tool).ok_or_else(|| RegistryError::UnknownTool {
            server: tool.server.clone(),
            name: tool.name.clone(),
        })
    }

    /// All specs in this snapshot, sorted by (server, name) for stable output.
    pub fn specs(&self) -> Vec<ToolSpec> {
        let mut specs: Vec<ToolSpec> = self.entries.values().map(|e| e.spec.clone()).collect();
        specs.sort_by(|a, b| (&a.server, &a.name).cmp(&(&b.server, &b.name)));
        specs
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// The live, mutable registry. Registration and deregistration may happen
/// concurrently with snapshot reads; the lock guarantees a snapshot taken
/// at time T reflects only registrations completed strictly before T.
pub struct ToolRegistry {
    entries: RwLock<HashMap<ToolRef, ResolvedTool>>,
    event_bus: Option<Arc<EventBus>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            event_bus: None,
        }
    }

    /// Publish `ProviderRegistered` events on this bus.
    pub fn with_event_bus(mut self, bus: Arc<EventBus>) -> Self {
        self.event_bus = Some(bus);
        self
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<ToolRef, ResolvedTool>> {
        self.entries.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<ToolRef, ResolvedTool>> {
        self.entries.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Register every tool a provider exposes. All-or-nothing: if any
    /// `(server, name)` is already present, nothing is registered and
    /// `DuplicateTool` is returned.
    pub fn register(&self, provider: Arc<dyn ToolProvider>) -> Result<(), RegistryError> {
        let specs = provider.tools();
        let mut entries = self.write();

        for spec in &specs {
            let key = spec.tool_ref();
            if entries.contains_key(&key) {
                return Err(RegistryError::DuplicateTool {
                    server: key.server,
                    name: key.name,
                });
            }
        }
        let count = specs.len();
        for spec in specs {
            let key = spec.tool_ref();
            debug!(tool = %key, "Registered tool");
            entries.insert(
                key,
                ResolvedTool {
                    spec,
                    provider: provider.clone(),
                },
            );
        }
        drop(entries);

        info!(server = provider.server(), tools = count, "Tool provider registered");
        if let Some(bus) = &self.event_bus {
            bus.publish(DomainEvent::ProviderRegistered {
                server: provider.server().to_string(),
                tool_count: count,
                timestamp: Utc::now(),
            });
        }
        Ok(())
    }

    /// Remove every tool owned by `server` (provider disconnect).
    /// Returns how many tools were removed.
    pub fn deregister(&self, server: &str) -> usize {
        let mut entries = self.write();
        let before = entries.len();
        entries.retain(|key, _| key.server != server);
        before - entries.len()
    }

    /// An immutable copy of all currently registered tools.
    pub fn snapshot(&self) -> ToolSnapshot {
        ToolSnapshot {
            entries: self.read().clone(),
        }
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chatforge_core::error::ToolError;

    struct StubProvider {
        server: String,
        tool_names: Vec<String>,
    }

    impl StubProvider {
        fn new(server: &str, tool_names: &[&str]) -> Arc<Self> {
            Arc::new(Self {
                server: server.into(),
                tool_names: tool_names.iter().map(|s| s.to_string()).collect(),
            })
        }
    }

    #[async_trait]
    impl ToolProvider for StubProvider {
        fn server(&self) -> &str {
            &self.server
        }

        fn tools(&self) -> Vec<ToolSpec> {
            self.tool_names
                .iter()
                .map(|name| ToolSpec {
                    server: self.server.clone(),
                    name: name.clone(),
                    description: format!("stub tool {name}"),
                    input_schema: serde_json::json!({"type": "object"}),
                })
                .collect()
        }

        async fn call_tool(
            &self,
            _name: &str,
            _arguments: serde_json::Value,
        ) -> Result<serde_json::Value, ToolError> {
            Ok(serde_json::json!({"ok": true}))
        }
    }

    #[test]
    fn register_and_resolve() {
        let registry = ToolRegistry::new();
        registry
            .register(StubProvider::new("web_search", &["search_web"]))
            .unwrap();

        let snapshot = registry.snapshot();
        let resolved = snapshot
            .resolve(&ToolRef::new("web_search", "search_web"))
            .unwrap();
        assert_eq!(resolved.spec.name, "search_web");
    }

    #[test]
    fn duplicate_registration_is_rejected_atomically() {
        let registry = ToolRegistry::new();
        registry
            .register(StubProvider::new("memory", &["store_memory"]))
            .unwrap();

        // Second provider exposes one fresh tool and one duplicate.
        let err = registry
            .register(StubProvider::new("memory", &["recall_memory", "store_memory"]))
            .unwrap_err();
        assert!(matches!(err, RegistryError::DuplicateTool { .. }));

        // The fresh tool from the failed registration must not leak in.
        let snapshot = registry.snapshot();
        assert_eq!(snapshot.len(), 1);
        assert!(snapshot.resolve(&ToolRef::new("memory", "recall_memory")).is_err());
    }

    #[test]
    fn unknown_tool_resolution_fails() {
        let registry = ToolRegistry::new();
        let snapshot = registry.snapshot();
        let err = snapshot.resolve(&ToolRef::new("nope", "missing")).unwrap_err();
        assert!(matches!(err, RegistryError::UnknownTool { .. }));
    }

    #[test]
    fn snapshot_is_isolated_from_later_registration() {
        let registry = ToolRegistry::new();
        registry
            .register(StubProvider::new("memory", &["store_memory"]))
            .unwrap();

        let before = registry.snapshot();
        registry
            .register(StubProvider::new("web_search", &["search_web"]))
            .unwrap();

        assert_eq!(before.len(), 1);
        assert!(before.resolve(&ToolRef::new("web_search", "search_web")).is_err());
        assert_eq!(registry.snapshot().len(), 2);
    }

    #[test]
    fn snapshots_are_consistent_under_concurrent_registration() {
        let registry = Arc::new(ToolRegistry::new());

        // Each provider exposes two tools; registration is all-or-nothing,
        // so every snapshot must hold either both of a server's tools or
        // neither, no matter when it races the writers.
        let servers = 8;
        let writers: Vec<_> = (0..servers)
            .map(|i| {
                let registry = registry.clone();
                std::thread::spawn(move || {
                    let server = format!("server{i}");
                    registry
                        .register(StubProvider::new(&server, &["first", "second"]))
                        .unwrap();
                })
            })
            .collect();

        for _ in 0..64 {
            let snapshot = registry.snapshot();
            assert_eq!(snapshot.len() % 2, 0);
            for spec in snapshot.specs() {
                let sibling = if spec.name == "first" { "second" } else { "first" };
                assert!(snapshot.resolve(&ToolRef::new(&spec.server, sibling)).is_ok());
            }
        }

        for writer in writers {
            writer.join().unwrap();
        }
        assert_eq!(registry.snapshot().len(), servers * 2);
    }

    #[test]
    fn snapshot_survives_deregistration() {
        let registry = ToolRegistry::new();
        registry
            .register(StubProvider::new("memory", &["store_memory"]))
            .unwrap();

        let snapshot = registry.snapshot();
        assert_eq!(registry.deregister("memory"), 1);

        // The round holding this snapshot can still resolve the tool.
        assert!(snapshot.resolve(&ToolRef::new("memory", "store_memory")).is_ok());
        assert!(registry.snapshot().is_empty());
    }

    #[test]
    fn specs_are_sorted() {
        let registry = ToolRegistry::new();
        registry
            .register(StubProvider::new("zeta", &["z_tool"]))
            .unwrap();
        registry
            .register(StubProvider::new("alpha", &["a_tool"]))
            .unwrap();

        let specs = registry.snapshot().specs();
        assert_eq!(specs[0].server, "alpha");
        assert_eq!(specs[1].server, "zeta");
    }
}
