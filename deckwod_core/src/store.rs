//! Key-value persistence with file locking and debounced writes.
//!
//! Each settings slice is one JSON document under its own key. The file
//! store keeps one `<key>.json` per slice, written atomically through a
//! locked temp file. The write queue batches slice updates and flushes
//! them once changes have been quiet for the debounce delay.

use crate::{Error, Result};
use fs2::FileExt;
use std::collections::{BTreeMap, HashMap};
use std::fs::File;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tempfile::NamedTempFile;

/// String-keyed store of JSON documents
pub trait KvStore {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&mut self, key: &str, value: &str) -> Result<()>;
    fn remove(&mut self, key: &str) -> Result<()>;

    fn contains(&self, key: &str) -> bool {
        matches!(self.get(key), Ok(Some(_)))
    }
}

/// In-memory store, mainly for tests
#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    values: HashMap<String, String>,
    writes: usize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of `set` calls so far
    pub fn write_count(&self) -> usize {
        self.writes
    }
}

impl KvStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.values.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.writes += 1;
        self.values.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        self.values.remove(key);
        Ok(())
    }
}

/// Directory-backed store with one JSON file per key
#[derive(Clone, Debug)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the file backing `key`
    pub fn path_for(&self, key: &str) -> Result<PathBuf> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if !valid {
            return Err(Error::Store(format!("invalid key '{}'", key)));
        }
        Ok(self.dir.join(format!("{}.json", key)))
    }
}

impl KvStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let path = self.path_for(key)?;
        if !path.exists() {
            return Ok(None);
        }

        let file = File::open(&path)?;
        // Acquire shared lock for reading
        file.lock_shared()?;
        let mut contents = String::new();
        let read = std::io::BufReader::new(&file).read_to_string(&mut contents);
        file.unlock()?;
        read?;

        Ok(Some(contents))
    }

    /// Atomically replace the slice file: temp file, sync, rename
    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let path = self.path_for(key)?;
        std::fs::create_dir_all(&self.dir)?;

        let temp = NamedTempFile::new_in(&self.dir)?;
        temp.as_file().lock_exclusive()?;
        {
            let mut writer = std::io::BufWriter::new(temp.as_file());
            writer.write_all(value.as_bytes())?;
            writer.flush()?;
        }
        temp.as_file().sync_all()?;
        temp.as_file().unlock()?;

        temp.persist(&path).map_err(|e| Error::Io(e.error))?;
        tracing::debug!("Saved slice {} to {:?}", key, path);
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        let path = self.path_for(key)?;
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Debounced batch of pending slice writes
///
/// Staging a slice replaces any pending value for the same key and pushes
/// the deadline back, so a burst of changes becomes one write per slice.
#[derive(Debug)]
pub struct WriteQueue {
    delay: Duration,
    pending: BTreeMap<String, String>,
    last_change: Option<Instant>,
}

impl WriteQueue {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: BTreeMap::new(),
            last_change: None,
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    pub fn stage(&mut self, key: &str, value: String) {
        self.stage_at(key, value, Instant::now());
    }

    pub fn stage_at(&mut self, key: &str, value: String, now: Instant) {
        self.pending.insert(key.to_string(), value);
        self.last_change = Some(now);
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn pending_keys(&self) -> impl Iterator<Item = &str> {
        self.pending.keys().map(String::as_str)
    }

    /// True once the delay has passed since the last staged change
    pub fn is_due(&self, now: Instant) -> bool {
        match self.last_change {
            Some(last) => !self.pending.is_empty() && now.saturating_duration_since(last) >= self.delay,
            None => false,
        }
    }

    /// Flush if due; returns the number of slices written
    pub fn flush_due<S: KvStore + ?Sized>(&mut self, store: &mut S, now: Instant) -> usize {
        if self.is_due(now) {
            self.flush(store)
        } else {
            0
        }
    }

    /// Write every pending slice now
    ///
    /// Storage errors are logged and dropped; the in-memory state stays
    /// authoritative for the running session.
    pub fn flush<S: KvStore + ?Sized>(&mut self, store: &mut S) -> usize {
        let pending = std::mem::take(&mut self.pending);
        self.last_change = None;
        let mut written = 0;
        for (key, value) in pending {
            match store.set(&key, &value) {
                Ok(()) => written += 1,
                Err(e) => tracing::warn!("Failed to save slice {}: {}. Continuing.", key, e),
            }
        }
        if written > 0 {
            tracing::debug!("Flushed {} settings slices", written);
        }
        written
    }
}
