//! The backend factory registry (spec.md §6): a process-wide, read-mostly
//! map from backend name to the hooks that create/open a [`Store`].

use crate::error::StoreResult;
use crate::options::Options;
use crate::store_trait::Store;
use std::collections::HashMap;
use std::sync::RwLock;

/// A backend's factory hooks. The core only ever calls through this trait
/// plus [`Store`] itself — it never depends on a concrete backend type.
pub trait BackendFactory: Send + Sync {
    /// Create the on-disk/in-memory layout at `address` if it does not
    /// already exist. Idempotent: calling `init` on an already-initialized
    /// address is a no-op.
    fn init(&self, address: &str, options: &Options) -> StoreResult<()>;

    /// Open a [`Store`] at `address`, which must already be initialized.
    fn open(&self, address: &str, options: &Options) -> StoreResult<Box<dyn Store>>;

    /// Migrate an existing store at `address` to this build's expected
    /// on-disk format version.
    fn upgrade(&self, address: &str, options: &Options) -> StoreResult<()>;

    /// Whether stores this factory opens survive process restart.
    fn is_persistent(&self) -> bool;
}

/// The process-wide registry of backend name to [`BackendFactory`].
///
/// Populated once at startup by each backend crate registering itself, then
/// treated as read-mostly (spec.md §6 "populated by component
/// initialization and read-only thereafter"). Kept as an explicit value
/// rather than only a global singleton so callers that want isolated
/// registries (tests, multiple configurations in one process) can build
/// their own.
#[derive(Default)]
pub struct Registry {
    factories: RwLock<HashMap<String, Box<dyn BackendFactory>>>,
}

impl Registry {
    pub fn new() -> Self {
        Registry { factories: RwLock::new(HashMap::new()) }
    }

    /// Register `factory` under `name`, replacing any prior registration.
    pub fn register(&self, name: impl Into<String>, factory: Box<dyn BackendFactory>) {
        self.factories.write().unwrap().insert(name.into(), factory);
    }

    pub fn init(&self, name: &str, address: &str, options: &Options) -> StoreResult<()> {
        self.with_factory(name, |f| f.init(address, options))
    }

    pub fn open(&self, name: &str, address: &str, options: &Options) -> StoreResult<Box<dyn Store>> {
        self.with_factory(name, |f| f.open(address, options))
    }

    pub fn upgrade(&self, name: &str, address: &str, options: &Options) -> StoreResult<()> {
        self.with_factory(name, |f| f.upgrade(address, options))
    }

    pub fn is_registered(&self, name: &str) -> bool {
        self.factories.read().unwrap().contains_key(name)
    }

    fn with_factory<T>(&self, name: &str, f: impl FnOnce(&dyn BackendFactory) -> StoreResult<T>) -> StoreResult<T> {
        let guard = self.factories.read().unwrap();
        let factory = guard
            .get(name)
            .ok_or_else(|| crate::error::StoreError::Invalid(format!("no backend registered under {name:?}")))?;
        f(factory.as_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inmemory::MemoryBackendFactory;

    #[test]
    fn unregistered_backend_is_an_error() {
        let registry = Registry::new();
        assert!(registry.open("nope", "addr", &Options::new()).is_err());
    }

    #[test]
    fn registered_backend_opens() {
        let registry = Registry::new();
        registry.register("memory", Box::new(MemoryBackendFactory));
        assert!(registry.is_registered("memory"));
        registry.init("memory", "unused", &Options::new()).unwrap();
        assert!(registry.open("memory", "unused", &Options::new()).is_ok());
    }
}
