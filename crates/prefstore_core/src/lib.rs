//! File-backed key/value preferences.
//!
//! A [`PreferencesNode`] is a leaf in a hierarchical preferences tree. The
//! main implementation, [`FilePreferences`], persists its mapping to a flat
//! properties file: values are loaded once at construction, mutated in
//! memory, and written back on an explicit `flush()`. Single-process only;
//! the backing file is treated as exclusively owned by one live node.

pub mod node;
pub mod properties;

pub use node::{FilePreferences, InMemoryPreferences, NodeHandle, PreferencesNode};
