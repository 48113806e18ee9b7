//! Process-wide and dependency-injected directories of cache groups.
//!
//! [`Group::new`](crate::group::Group::new) registers itself into the
//! process-wide singleton returned by [`global`] by default, mirroring the
//! package-level `groups` map the original implementation keeps. Callers
//! that would rather avoid global state entirely can build their own
//! [`Registry`] and register groups into it explicitly with
//! [`Registry::register`], looking them up later with [`Registry::get`].

use crate::error::Error;
use crate::group::Group;
use parking_lot::RwLock;
use std::any::Any;
use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Arc, OnceLock};

/// A name-keyed directory of cache groups, type-erased so groups with
/// different `K`/`V` can share one directory.
pub struct Registry {
    groups: RwLock<HashMap<String, Arc<dyn Any + Send + Sync>>>,
}

impl Registry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Registry {
            groups: RwLock::new(HashMap::new()),
        }
    }

    /// Registers `group` under its own name, overwriting any previous
    /// group registered under that name.
    pub fn register<K, V>(&self, group: Arc<Group<K, V>>)
    where
        K: Send + Sync + 'static,
        V: Send + Sync + 'static,
    {
        let name = group.name().to_string();
        self.groups.write().insert(name, group);
    }

    /// Looks up the group registered under `name`, downcasting it to
    /// `Group<K, V>`. Returns [`Error::UnknownGroup`] if no group is
    /// registered under that name, or [`Error::BadRequest`] if one is but
    /// its key/value types don't match `K`/`V`.
    pub fn get<K, V>(&self, name: &str) -> Result<Arc<Group<K, V>>, Error>
    where
        K: Send + Sync + 'static,
        V: Send + Sync + 'static,
    {
        let groups = self.groups.read();
        let any = groups
            .get(name)
            .ok_or_else(|| Error::UnknownGroup(name.to_string()))?;
        Arc::clone(any)
            .downcast::<Group<K, V>>()
            .map_err(|_| Error::BadRequest(format!("group {name} has a different key/value type")))
    }

    /// Removes the group registered under `name`, if any.
    pub fn remove(&self, name: &str) {
        self.groups.write().remove(name);
    }

    /// Number of registered groups.
    pub fn len(&self) -> usize {
        self.groups.read().len()
    }

    /// Whether no groups are registered.
    pub fn is_empty(&self) -> bool {
        self.groups.read().is_empty()
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry").field("len", &self.len()).finish()
    }
}

static GLOBAL: OnceLock<Registry> = OnceLock::new();

/// The process-wide registry [`Group::new`](crate::group::Group::new)
/// registers into. Most binaries that only ever run one cache cluster
/// process can use this instead of threading a [`Registry`] through their
/// whole call graph.
pub fn global() -> &'static Registry {
    GLOBAL.get_or_init(Registry::new)
}

/// Convenience wrapper: loads `key` from the group named `name` in the
/// global registry, translating an unknown group into
/// [`Error::UnknownGroup`] rather than panicking.
pub fn get<K, V>(name: &str, key: K) -> Result<V, Error>
where
    K: Hash + Eq + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    global().get::<K, V>(name)?.get(key)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::peer::Loader;
    use std::sync::Arc;
    use std::time::Duration;

    fn make_group(name: &str) -> Arc<Group<String, String>> {
        let loader = Arc::new(|key: &String| Ok(format!("v-{key}")));
        Arc::new(Group::new_unregistered(
            name,
            10,
            Duration::ZERO,
            loader as Arc<dyn Loader<String, String>>,
        ))
    }

    #[test]
    fn register_and_get_roundtrip() {
        let registry = Registry::new();
        registry.register(make_group("roundtrip"));
        let group = registry.get::<String, String>("roundtrip").unwrap();
        assert_eq!(group.get("x".to_string()).unwrap(), "v-x");
    }

    #[test]
    fn unknown_group_is_an_error() {
        let registry = Registry::new();
        assert!(matches!(
            registry.get::<String, String>("nope"),
            Err(Error::UnknownGroup(_))
        ));
    }

    #[test]
    fn wrong_type_is_a_bad_request() {
        let registry = Registry::new();
        registry.register(make_group("typed"));
        assert!(matches!(
            registry.get::<u32, u32>("typed"),
            Err(Error::BadRequest(_))
        ));
    }
}
