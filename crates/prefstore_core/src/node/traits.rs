use std::sync::Arc;

use parking_lot::RwLock;

use prefstore_base::PrefsResult;

/// Leaf-node contract of a hierarchical preferences tree.
///
/// This is the slot a preferences framework drives: the framework owns the
/// public read/write API, caching and change notification; an implementation
/// of this trait supplies only the backing-store operations. Two
/// implementations are provided:
/// - [`FilePreferences`](crate::FilePreferences): persists to a properties file
/// - [`InMemoryPreferences`](crate::InMemoryPreferences): no persistence, for tests
///
/// `get`, `put` and `remove` touch only in-memory state and never perform
/// I/O; persistence happens on `flush`. All nodes here are leaves: `child`
/// and `remove_node` are hard failures, never no-ops, so a miswired caller
/// fails loudly instead of silently dropping data.
pub trait PreferencesNode: Send + Sync + 'static {
    /// The node's name within the tree. Root nodes have the empty name.
    fn name(&self) -> &str;

    /// Look up the value stored for `key`.
    ///
    /// # Returns
    /// * `Ok(Some(value))` - if the key is present
    /// * `Ok(None)` - if no value is stored for the key
    fn get(&self, key: &str) -> PrefsResult<Option<String>>;

    /// Store `value` under `key`, overwriting any prior value.
    fn put(&mut self, key: &str, value: &str) -> PrefsResult<()>;

    /// Delete the entry for `key`, if any.
    fn remove(&mut self, key: &str) -> PrefsResult<()>;

    /// Enumerate the stored keys.
    ///
    /// File-backed nodes return the empty sequence (see
    /// [`FilePreferences::keys`](crate::FilePreferences)); this is not an
    /// error condition.
    fn keys(&self) -> PrefsResult<Vec<String>>;

    /// Names of child nodes. Always empty for a leaf.
    fn children_names(&self) -> PrefsResult<Vec<String>>;

    /// Obtain the child node called `name`.
    ///
    /// Fails with `ErrorKind::Unsupported` on a leaf.
    fn child(&mut self, name: &str) -> PrefsResult<NodeHandle>;

    /// Remove this node from the tree.
    ///
    /// Fails with `ErrorKind::Unsupported` on a leaf.
    fn remove_node(&mut self) -> PrefsResult<()>;

    /// Reconcile in-memory state with external changes to the backing store.
    ///
    /// A no-op for single-writer backing stores.
    fn sync(&mut self) -> PrefsResult<()>;

    /// Persist the in-memory mapping to the backing store.
    fn flush(&mut self) -> PrefsResult<()>;
}

/// A thread-safe handle to a preferences node.
///
/// NodeHandle provides cheap cloning (via Arc) and interior mutability (via
/// RwLock), serializing all operations on the node. The node implementations
/// themselves add no synchronization; whatever serialization concurrent
/// callers need comes from this lock.
#[derive(Clone)]
pub struct NodeHandle(Arc<RwLock<dyn PreferencesNode>>);

impl std::fmt::Debug for NodeHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("NodeHandle").finish_non_exhaustive()
    }
}

impl NodeHandle {
    /// Create a new NodeHandle wrapping the given node implementation.
    pub fn new<N: PreferencesNode>(node: N) -> Self {
        Self(Arc::new(RwLock::new(node)))
    }

    /// Look up a value. See [`PreferencesNode::get`] for details.
    pub fn get(&self, key: &str) -> PrefsResult<Option<String>> {
        self.0.read().get(key)
    }

    /// Store a value. See [`PreferencesNode::put`] for details.
    pub fn put(&self, key: &str, value: &str) -> PrefsResult<()> {
        self.0.write().put(key, value)
    }

    /// Delete an entry. See [`PreferencesNode::remove`] for details.
    pub fn remove(&self, key: &str) -> PrefsResult<()> {
        self.0.write().remove(key)
    }

    /// Enumerate keys. See [`PreferencesNode::keys`] for details.
    pub fn keys(&self) -> PrefsResult<Vec<String>> {
        self.0.read().keys()
    }

    /// Names of child nodes. See [`PreferencesNode::children_names`] for details.
    pub fn children_names(&self) -> PrefsResult<Vec<String>> {
        self.0.read().children_names()
    }

    /// Obtain a child node. See [`PreferencesNode::child`] for details.
    pub fn child(&self, name: &str) -> PrefsResult<NodeHandle> {
        self.0.write().child(name)
    }

    /// Remove the node. See [`PreferencesNode::remove_node`] for details.
    pub fn remove_node(&self) -> PrefsResult<()> {
        self.0.write().remove_node()
    }

    /// Reconcile with the backing store. See [`PreferencesNode::sync`] for details.
    pub fn sync(&self) -> PrefsResult<()> {
        self.0.write().sync()
    }

    /// Persist the mapping. See [`PreferencesNode::flush`] for details.
    pub fn flush(&self) -> PrefsResult<()> {
        self.0.write().flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::memory::InMemoryPreferences;

    #[test]
    fn test_node_handle_clone_shares_state() {
        let handle = NodeHandle::new(InMemoryPreferences::new());
        handle.put("k", "v").unwrap();

        let clone = handle.clone();
        assert_eq!(clone.get("k").unwrap(), Some("v".to_string()));

        clone.remove("k").unwrap();
        assert_eq!(handle.get("k").unwrap(), None);
    }

    #[test]
    fn test_node_handle_leaf_operations_fail() {
        let handle = NodeHandle::new(InMemoryPreferences::new());
        assert!(handle.child("sub").is_err());
        assert!(handle.remove_node().is_err());
    }

    #[test]
    fn test_node_handle_sync_and_flush() {
        let handle = NodeHandle::new(InMemoryPreferences::new());
        handle.put("k", "v").unwrap();
        handle.sync().unwrap();
        handle.flush().unwrap();
        assert_eq!(handle.get("k").unwrap(), Some("v".to_string()));
    }
}
