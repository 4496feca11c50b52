use std::collections::HashMap;
use std::fs;
use std::io::{BufReader, BufWriter, Read};
use std::path::{Path, PathBuf};

use tracing::{debug, instrument};

use prefstore_base::error::ErrorKind;
use prefstore_base::{PrefsError, PrefsResult, ResultExt};

use crate::node::traits::{NodeHandle, PreferencesNode};
use crate::properties;

/// Comment header written at the top of the backing file on flush.
const WRITER_COMMENT: &str = "Auto-generated by prefstore::FilePreferences";

/// A preferences leaf backed by a flat properties file.
///
/// The backing file is read once at construction; `put`/`remove` mutate only
/// the in-memory mapping, and `flush()` rewrites the file, creating missing
/// parent directories first. The in-memory mapping is the authoritative
/// state while the node is live.
///
/// IMPORTANT: this type does NOT support multiple processes using the file.
/// Flush truncates in place without locking; concurrent writers can lose
/// updates or leave a partial file.
#[derive(Debug)]
pub struct FilePreferences {
    path: PathBuf,
    entries: HashMap<String, String>,
}

impl FilePreferences {
    /// Open a preferences node over `path`.
    ///
    /// If `path` refers to an existing regular file its contents are parsed
    /// as properties text. A missing file yields an empty mapping and is not
    /// created until the first `flush()`.
    ///
    /// # Errors
    /// Fails if the file exists but cannot be read or parsed.
    pub fn open(path: impl Into<PathBuf>) -> PrefsResult<Self> {
        Self::load(path.into())
    }

    #[instrument(skip(path), fields(path = %path.display()))]
    fn load(path: PathBuf) -> PrefsResult<Self> {
        let mut entries = HashMap::new();

        if path.is_file() {
            debug!("loading preferences file");
            let file = fs::File::open(&path).map_err(|e| {
                Box::new(PrefsError::new(ErrorKind::FileError {
                    path: path.clone(),
                    source: e,
                }))
            })?;
            let mut text = String::new();
            BufReader::new(file).read_to_string(&mut text).map_err(|e| {
                Box::new(PrefsError::new(ErrorKind::FileError {
                    path: path.clone(),
                    source: e,
                }))
            })?;
            entries = properties::parse(&text)
                .with_context(|| format!("failed to load preferences from {}", path.display()))?;
            debug!(count = entries.len(), "preferences loaded");
        } else {
            debug!("no backing file, starting empty");
        }

        Ok(Self { path, entries })
    }

    /// The path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn backing_store_error(&self, source: std::io::Error) -> Box<PrefsError> {
        Box::new(PrefsError::new(ErrorKind::BackingStore {
            path: self.path.clone(),
            source: Some(source),
        }))
    }
}

impl PreferencesNode for FilePreferences {
    fn name(&self) -> &str {
        // Root node with no parent
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

    /// Intentional stub: values are present but not enumerable through the
    /// node. Callers read values by known keys.
    fn keys(&self) -> PrefsResult<Vec<String>> {
        Ok(Vec::new())
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

    /// No cross-process refresh: the file is assumed single-writer.
    fn sync(&mut self) -> PrefsResult<()> {
        Ok(())
    }

    #[instrument(skip(self), fields(path = %self.path.display()))]
    fn flush(&mut self) -> PrefsResult<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                debug!(parent = %parent.display(), "creating parent directories");
                fs::create_dir_all(parent).map_err(|e| {
                    debug!(error = %e, "failed to create parent directories");
                    Box::new(PrefsError::new(ErrorKind::BackingStore {
                        path: self.path.clone(),
                        source: None,
                    }))
                })?;
            }
        }

        let file = fs::File::create(&self.path)
            .map_err(|e| self.backing_store_error(e))?;
        let writer = BufWriter::new(file);
        properties::store(writer, &self.entries, Some(WRITER_COMMENT))
            .map_err(|e| self.backing_store_error(e))?;

        debug!(count = self.entries.len(), "preferences flushed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn setup() -> (TempDir, PathBuf) {
        let temp_dir = TempDir::new().expect("failed to create temp dir");
        let path = temp_dir.path().join("prefs.properties");
        (temp_dir, path)
    }

    #[test]
    fn test_open_missing_file_is_empty_and_creates_nothing() {
        let (_temp_dir, path) = setup();

        let prefs = FilePreferences::open(&path).unwrap();
        assert_eq!(prefs.get("x").unwrap(), None);
        assert!(!path.exists());
    }

    #[test]
    fn test_flush_of_empty_node_writes_header_only_file() {
        let (_temp_dir, path) = setup();

        let mut prefs = FilePreferences::open(&path).unwrap();
        assert_eq!(prefs.get("x").unwrap(), None);
        prefs.flush().unwrap();

        assert!(path.is_file());
        let content = fs::read_to_string(&path).unwrap();
        assert!(content.starts_with("#Auto-generated by prefstore::FilePreferences"));
        assert!(properties::parse(&content).unwrap().is_empty());
    }

    #[test]
    fn test_load_existing_put_flush_reload() {
        let (_temp_dir, path) = setup();
        fs::write(&path, "a=1\nb=2\n").unwrap();

        let mut prefs = FilePreferences::open(&path).unwrap();
        assert_eq!(prefs.get("a").unwrap(), Some("1".to_string()));
        assert_eq!(prefs.get("b").unwrap(), Some("2".to_string()));

        prefs.put("b", "3").unwrap();
        prefs.flush().unwrap();

        let reparsed = properties::parse(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(reparsed.get("a"), Some(&"1".to_string()));
        assert_eq!(reparsed.get("b"), Some(&"3".to_string()));
        assert_eq!(reparsed.len(), 2);
    }

    #[test]
    fn test_flush_creates_parent_directories() {
        let (temp_dir, _) = setup();
        let path = temp_dir.path().join("does/not/exist/prefs.properties");

        let mut prefs = FilePreferences::open(&path).unwrap();
        prefs.put("k", "v").unwrap();
        prefs.flush().unwrap();

        let reparsed = properties::parse(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(reparsed.get("k"), Some(&"v".to_string()));
    }

    #[test]
    fn test_child_fails_and_node_remains_usable() {
        let (_temp_dir, path) = setup();

        let mut prefs = FilePreferences::open(&path).unwrap();
        prefs.put("k", "v").unwrap();

        let err = prefs.child("sub").unwrap_err();
        match err.kind() {
            ErrorKind::Unsupported { operation } => assert_eq!(*operation, "child"),
            other => panic!("Expected Unsupported variant, got {:?}", other),
        }

        prefs.put("k2", "v2").unwrap();
        assert_eq!(prefs.get("k").unwrap(), Some("v".to_string()));
        assert_eq!(prefs.get("k2").unwrap(), Some("v2".to_string()));
    }

    #[test]
    fn test_remove_node_fails() {
        let (_temp_dir, path) = setup();

        let mut prefs = FilePreferences::open(&path).unwrap();
        let err = prefs.remove_node().unwrap_err();
        match err.kind() {
            ErrorKind::Unsupported { operation } => assert_eq!(*operation, "remove_node"),
            other => panic!("Expected Unsupported variant, got {:?}", other),
        }
    }

    #[test]
    fn test_malformed_file_fails_open() {
        let (_temp_dir, path) = setup();
        fs::write(&path, "bad=\\uZZZZ\n").unwrap();

        let err = FilePreferences::open(&path).unwrap_err();
        match err.kind() {
            ErrorKind::Syntax { line, .. } => assert_eq!(*line, 1),
            other => panic!("Expected Syntax variant, got {:?}", other),
        }
        assert!(err.to_string().contains("failed to load preferences"));
    }

    #[test]
    fn test_unflushed_changes_not_visible_to_second_node() {
        let (_temp_dir, path) = setup();

        let mut first = FilePreferences::open(&path).unwrap();
        first.put("k", "v").unwrap();

        let second = FilePreferences::open(&path).unwrap();
        assert_eq!(second.get("k").unwrap(), None);

        first.flush().unwrap();
        let third = FilePreferences::open(&path).unwrap();
        assert_eq!(third.get("k").unwrap(), Some("v".to_string()));
    }

    #[test]
    fn test_last_write_wins() {
        let (_temp_dir, path) = setup();

        let mut prefs = FilePreferences::open(&path).unwrap();
        prefs.put("k", "first").unwrap();
        prefs.put("k", "second").unwrap();
        prefs.put("k", "third").unwrap();
        assert_eq!(prefs.get("k").unwrap(), Some("third".to_string()));
    }

    #[test]
    fn test_remove_after_put_before_and_after_flush() {
        let (_temp_dir, path) = setup();

        let mut prefs = FilePreferences::open(&path).unwrap();
        prefs.put("k", "v").unwrap();
        prefs.remove("k").unwrap();
        assert_eq!(prefs.get("k").unwrap(), None);

        prefs.flush().unwrap();
        let reloaded = FilePreferences::open(&path).unwrap();
        assert_eq!(reloaded.get("k").unwrap(), None);
    }

    #[test]
    fn test_keys_and_children_names_are_empty() {
        let (_temp_dir, path) = setup();
        fs::write(&path, "a=1\nb=2\n").unwrap();

        let prefs = FilePreferences::open(&path).unwrap();
        // Values are present but not enumerable through the node
        assert_eq!(prefs.get("a").unwrap(), Some("1".to_string()));
        assert!(prefs.keys().unwrap().is_empty());
        assert!(prefs.children_names().unwrap().is_empty());
    }

    #[test]
    fn test_sync_is_a_noop() {
        let (_temp_dir, path) = setup();
        fs::write(&path, "a=1\n").unwrap();

        let mut prefs = FilePreferences::open(&path).unwrap();
        prefs.put("b", "2").unwrap();
        // External change after open
        fs::write(&path, "a=changed\n").unwrap();

        prefs.sync().unwrap();
        assert_eq!(prefs.get("a").unwrap(), Some("1".to_string()));
        assert_eq!(prefs.get("b").unwrap(), Some("2".to_string()));
    }

    #[test]
    fn test_name_is_empty_root() {
        let (_temp_dir, path) = setup();
        let prefs = FilePreferences::open(&path).unwrap();
        assert_eq!(prefs.name(), "");
    }

    #[test]
    fn test_round_trip_preserves_awkward_values() {
        let (_temp_dir, path) = setup();

        let mut prefs = FilePreferences::open(&path).unwrap();
        prefs.put("spaced key", "value with = and #").unwrap();
        prefs.put("unicode", "café 😀").unwrap();
        prefs.put("multiline", "a\nb\tc").unwrap();
        prefs.flush().unwrap();

        let reloaded = FilePreferences::open(&path).unwrap();
        assert_eq!(
            reloaded.get("spaced key").unwrap(),
            Some("value with = and #".to_string())
        );
        assert_eq!(reloaded.get("unicode").unwrap(), Some("café 😀".to_string()));
        assert_eq!(reloaded.get("multiline").unwrap(), Some("a\nb\tc".to_string()));
    }

    #[test]
    fn test_flush_overwrites_prior_content() {
        let (_temp_dir, path) = setup();
        fs::write(&path, "old=entry\nstale=data\n").unwrap();

        let mut prefs = FilePreferences::open(&path).unwrap();
        prefs.remove("old").unwrap();
        prefs.remove("stale").unwrap();
        prefs.put("fresh", "1").unwrap();
        prefs.flush().unwrap();

        let reparsed = properties::parse(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(reparsed.len(), 1);
        assert_eq!(reparsed.get("fresh"), Some(&"1".to_string()));
    }

    #[test]
    fn test_node_handle_over_file_preferences() {
        let (_temp_dir, path) = setup();

        let handle = NodeHandle::new(FilePreferences::open(&path).unwrap());
        handle.put("k", "v").unwrap();
        handle.flush().unwrap();

        let clone = handle.clone();
        assert_eq!(clone.get("k").unwrap(), Some("v".to_string()));

        let reloaded = FilePreferences::open(&path).unwrap();
        assert_eq!(reloaded.get("k").unwrap(), Some("v".to_string()));
    }

    #[test]
    fn test_flush_parent_directory_creation_failure() {
        let (temp_dir, _) = setup();
        // A regular file where a directory is needed blocks create_dir_all
        let blocked = temp_dir.path().join("blocked");
        fs::write(&blocked, "not a directory").unwrap();

        let path = blocked.join("sub").join("prefs.properties");
        let mut prefs = FilePreferences::open(&path).unwrap();
        prefs.put("k", "v").unwrap();

        let err = prefs.flush().unwrap_err();
        match err.kind() {
            ErrorKind::BackingStore { source: None, .. } => {}
            other => panic!("Expected BackingStore variant without cause, got {:?}", other),
        }
        assert!(err.to_string().contains("Could not create parent directories"));
    }
}
