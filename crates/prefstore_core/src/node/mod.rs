pub mod file;
pub mod memory;
pub mod traits;

pub use file::FilePreferences;
pub use memory::InMemoryPreferences;
pub use traits::{NodeHandle, PreferencesNode};
