//! Foundational error handling and tracing setup shared by all prefstore
//! crates. Keeping these in a separate base crate ensures consistent error
//! handling and prevents circular dependencies between crates.

pub mod error;
pub mod tracing;

// Re-export commonly used types for convenience
pub use error::{ErrorKind, PrefsError, PrefsResult, ResultExt};
