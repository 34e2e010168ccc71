use std::collections::HashMap;
use std::io;
use std::path::PathBuf;

use thiserror::Error;
use tracing::warn;

use crate::document::{Document, Node};

/// Key the editor content is stored under.
pub const CONTENT_KEY: &str = "content";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("persistence failure: {0}")]
    Persistence(#[from] io::Error),
    #[error("malformed snapshot: {0}")]
    MalformedSnapshot(#[from] serde_json::Error),
}

/// String key-value snapshot storage. One serialized document per key;
/// writes overwrite whole values.
pub trait SnapshotStore {
    fn read(&self, key: &str) -> Result<Option<String>, StoreError>;
    fn write(&mut self, key: &str, value: &str) -> Result<(), StoreError>;
}

/// In-memory store, used in tests and as a scratch session store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: HashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SnapshotStore for MemoryStore {
    fn read(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.entries.get(key).cloned())
    }

    fn write(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Store backed by a directory of `{key}.json` files.
#[derive(Debug)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

impl SnapshotStore for FileStore {
    fn read(&self, key: &str) -> Result<Option<String>, StoreError> {
        match std::fs::read_to_string(self.path_for(key)) {
            Ok(value) => Ok(Some(value)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    fn write(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        std::fs::create_dir_all(&self.dir)?;
        std::fs::write(self.path_for(key), value)?;
        Ok(())
    }
}

/// The document shown on first launch or when no usable snapshot exists.
pub fn default_document() -> Document {
    Document::new(vec![Node::paragraph("A line of text in a paragraph.")])
}

/// Loads the content snapshot, falling back to the default document on a
/// missing key, an unreadable store, malformed JSON, or a snapshot that
/// fails validation. Load never errors out to the caller.
pub fn load_document(store: &dyn SnapshotStore) -> Document {
    let raw = match store.read(CONTENT_KEY) {
        Ok(Some(raw)) => raw,
        Ok(None) => return default_document(),
        Err(err) => {
            warn!(%err, "failed to read content snapshot, using default document");
            return default_document();
        }
    };

    let doc: Document = match serde_json::from_str(&raw) {
        Ok(doc) => doc,
        Err(err) => {
            warn!(%err, "malformed content snapshot, using default document");
            return default_document();
        }
    };

    if let Err(violation) = doc.validate() {
        warn!(%violation, "content snapshot violates nesting invariants, using default document");
        return default_document();
    }
    doc
}

/// Serializes and writes the content snapshot. Best effort: a failed
/// write is logged and swallowed so editing continues uninterrupted.
pub fn save_document(store: &mut dyn SnapshotStore, doc: &Document) {
    let serialized = match serde_json::to_string(doc) {
        Ok(serialized) => serialized,
        Err(err) => {
            warn!(%err, "failed to serialize document snapshot");
            return;
        }
    };
    if let Err(err) = store.write(CONTENT_KEY, &serialized) {
        warn!(%err, "failed to write content snapshot");
    }
}
