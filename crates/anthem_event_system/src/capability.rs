//! String-keyed capability injection.
//!
//! The host exposes optional subsystems (cookies, audio, menus) as shared
//! interfaces looked up by key. Keys have drifted across host versions, so
//! resolution walks an ordered fallback list and binding happens once at
//! plugin startup; the resolved handles then travel inside the plugin's
//! own context instead of ambient globals.

use dashmap::DashMap;
use std::any::Any;
use std::sync::Arc;
use tracing::debug;

type Shared = Arc<dyn Any + Send + Sync>;

#[derive(Default)]
pub struct CapabilityRegistry {
    entries: DashMap<String, Shared>,
}

impl CapabilityRegistry {
    pub fn new() -> Self {
        Self { entries: DashMap::new() }
    }

    /// Publish a capability under a key. `T` is usually a trait object,
    /// e.g. `Arc<dyn CookieStore>`.
    pub fn provide<T: ?Sized + 'static>(&self, key: &str, value: Arc<T>)
    where
        Arc<T>: Send + Sync,
    {
        debug!("capability registered: {key}");
        self.entries.insert(key.to_string(), Arc::new(value));
    }

    pub fn has(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Resolve a capability, trying each key in order. Returns the first
    /// entry that exists under a given key *and* has the requested type;
    /// a key bound to a different type falls through to the next key.
    pub fn resolve<T: ?Sized + 'static>(&self, keys: &[&str]) -> Option<Arc<T>>
    where
        Arc<T>: Send + Sync,
    {
        for key in keys {
            if let Some(entry) = self.entries.get(*key) {
                if let Some(handle) = entry.value().downcast_ref::<Arc<T>>() {
                    return Some(Arc::clone(handle));
                }
            }
        }
        None
    }
}
