use std::collections::HashMap;

use prefstore_base::{PrefsError, PrefsResult};

use crate::node::traits::{NodeHandle, PreferencesNode};

/// An in-memory preferences leaf with no persistence.
///
/// `flush` and `sync` are no-ops; state lives only as long as the node.
/// Unlike [`FilePreferences`](crate::FilePreferences), `keys()` returns the
/// real key set, making this the reference implementation of the trait and
/// the node of choice for tests that need no filesystem.
#[derive(Debug, Default)]
pub struct InMemoryPreferences {
    entries: HashMap<String, String>,
}

impl InMemoryPreferences {
    /// Create a new, empty in-memory node.
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }
}

impl PreferencesNode for InMemoryPreferences {
    fn name(&self) -> &str {
        ""
    }

    fn get(&self, key: &str) -> PrefsResult<Option<String>> {
        Ok(self.entries.get(key).cloned())
    }

    fn put(&mut self, key: &str, value: &str) -> PrefsResult<()> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> PrefsResult<()> {
        self.entries.remove(key);
        Ok(())
    }

    fn keys(&self) -> PrefsResult<Vec<String>> {
        let mut keys: Vec<String> = self.entries.keys().cloned().collect();
        keys.sort();
        Ok(keys)
    }

    fn children_names(&self) -> PrefsResult<Vec<String>> {
        Ok(Vec::new())
    }

    fn child(&mut self, _name: &str) -> PrefsResult<NodeHandle> {
        Err(Box::new(PrefsError::unsupported("child")))
    }

    fn remove_node(&mut self) -> PrefsResult<()> {
        Err(Box::new(PrefsError::unsupported("remove_node")))
    }

    fn sync(&mut self) -> PrefsResult<()> {
        Ok(())
    }

    fn flush(&mut self) -> PrefsResult<()> {
        Ok(())
    }
}
