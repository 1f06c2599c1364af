//! Store Module
//!
//! The public handle binding one logical store to one `.jsonl` file.
//!
//! ## Responsibilities
//! - Resolve the file path and make sure the file exists
//! - Route reads through the coordinator's quiescence gate
//! - Route set/remove/clear through the coordinator's lanes
//! - Turn drained batches into rewrite passes

use std::fs::{self, File, OpenOptions};
use std::hash::Hash;
use std::path::{Path, PathBuf};

use crate::codec::{JsonLinesCodec, RecordCodec};
use crate::config::{temp_path_for, StoreConfig};
use crate::coordinator::MutationCoordinator;
use crate::error::{LineKvError, Result};
use crate::reader::{count_lines, Keys, Records};
use crate::rewrite::{RemoveBatch, RewriteEngine, SetBatch};

/// Store with string keys and arbitrary JSON values
pub type JsonStore = Store<String, serde_json::Value>;

/// A line-delimited key/value store backed by one file
///
/// ## Concurrency
/// The handle is `Send + Sync`; share it with `Arc` across threads. All
/// coordination is in-process: two handles (or two processes) on the same
/// file are not coordinated with each other.
///
/// ## Reads
/// Every read waits until no mutation is queued or running, then opens a
/// fresh handle on the file and streams it. A scan that is already open is
/// not affected by later rewrites (it keeps reading the file it opened).
pub struct Store<K, V, C = JsonLinesCodec> {
    /// Store configuration
    config: StoreConfig,

    /// Resolved `{folder}/{name}.jsonl`
    path: PathBuf,

    /// Line encoding
    codec: C,

    /// Serializes mutations and gates readers
    coordinator: MutationCoordinator<K, V>,
}

impl<K, V> Store<K, V, JsonLinesCodec>
where
    K: Eq + Hash + Clone,
    V: Clone,
    JsonLinesCodec: RecordCodec<K, V>,
{
    /// Open or create a store with the JSON lines codec
    pub fn open(config: StoreConfig) -> Result<Self> {
        Self::open_with_codec(config, JsonLinesCodec)
    }
}

impl<K, V, C> Store<K, V, C>
where
    K: Eq + Hash + Clone,
    V: Clone,
    C: RecordCodec<K, V>,
{
    /// Open or create a store with a custom codec
    ///
    /// On open:
    /// 1. Validate the config and resolve the path
    /// 2. Create the folder and an empty file if missing
    /// 3. Remove a temp file left behind by an interrupted rewrite
    pub fn open_with_codec(config: StoreConfig, codec: C) -> Result<Self> {
        // Step 1: Validate and resolve
        config.validate()?;
        let path = config.path();

        // Step 2: Ensure the file exists
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        OpenOptions::new().create(true).append(true).open(&path)?;

        // Step 3: A leftover temp file was never promoted; it is garbage
        let temp_path = temp_path_for(&path);
        if temp_path.exists() {
            tracing::warn!(path = %temp_path.display(), "removing stale rewrite temp file");
            fs::remove_file(&temp_path)?;
        }

        tracing::info!(path = %path.display(), "store opened");

        Ok(Self {
            config,
            path,
            codec,
            coordinator: MutationCoordinator::new(),
        })
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Value of the first record whose key equals `key`
    ///
    /// Stops scanning at the first match.
    pub fn get_item(&self, key: &K) -> Result<Option<V>> {
        self.scan_keys()?.find_value(key)
    }

    /// Key at 1-based position `index`; `None` if out of range
    pub fn key(&self, index: usize) -> Result<Option<K>> {
        if index < 1 {
            return Ok(None);
        }
        self.scan_keys()?.nth(index - 1).transpose()
    }

    /// All keys in file order
    pub fn keys(&self) -> Result<Vec<K>> {
        self.scan_keys()?.collect()
    }

    /// Number of records
    pub fn length(&self) -> Result<usize> {
        let file = self.coordinator.read(|| Ok(File::open(&self.path)?))?;
        count_lines(file)
    }

    /// True if the store holds no records
    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.length()? == 0)
    }

    /// True if some record has this key
    pub fn contains_key(&self, key: &K) -> Result<bool> {
        for found in self.scan_keys()? {
            if found? == *key {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Call `callback(value, key)` for every record in file order
    pub fn iterate<F>(&self, mut callback: F) -> Result<()>
    where
        F: FnMut(V, K),
    {
        self.try_iterate(|value, key| {
            callback(value, key);
            Ok(())
        })
    }

    /// Like `iterate`, but the callback can stop the scan with an error
    pub fn try_iterate<F>(&self, mut callback: F) -> Result<()>
    where
        F: FnMut(V, K) -> Result<()>,
    {
        for record in self.scan_records()? {
            let (key, value) = record?.into_pair();
            callback(value, key)?;
        }
        Ok(())
    }

    // =========================================================================
    // Mutations
    // =========================================================================

    /// Set `key` to `value`, returning the value given
    ///
    /// An existing record is patched in place; a new key is appended. If a
    /// set pass is already being driven by another caller this returns as
    /// soon as the entry is queued; any following read still observes it.
    pub fn set_item(&self, key: K, value: V) -> Result<V> {
        let engine = RewriteEngine::new(&self.codec, self.config.sync_on_rewrite);
        self.coordinator.set(key, value.clone(), |drained| {
            let batch: SetBatch<K, V> = drained.into_iter().collect();
            batch.apply(&engine, &self.path).map(|_| ())
        })?;
        Ok(value)
    }

    /// Remove every record for `key`; removing a missing key is a no-op
    pub fn remove_item(&self, key: &K) -> Result<()> {
        let engine = RewriteEngine::new(&self.codec, self.config.sync_on_rewrite);
        self.coordinator.remove(key.clone(), |drained| {
            let batch: RemoveBatch<K> = drained.into_iter().collect();
            batch.apply(&engine, &self.path).map(|_| ())
        })?;
        Ok(())
    }

    /// Replace the file with an empty one
    ///
    /// Does not touch queued sets/removes; those are applied afterwards by
    /// their drivers.
    pub fn clear(&self) -> Result<()> {
        self.coordinator
            .clear(|| {
                let temp_path = temp_path_for(&self.path);
                File::create(&temp_path)?;
                fs::rename(&temp_path, &self.path)?;
                Ok(())
            })
            .map_err(|e| LineKvError::rewrite_failed(&self.path, e))?;

        tracing::info!(path = %self.path.display(), "store cleared");
        Ok(())
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// Path of the backing file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Get the configuration
    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Rewrite passes run against this store since it was opened
    pub fn rewrite_passes(&self) -> u64 {
        self.coordinator.rewrite_passes()
    }

    /// True if no mutation is queued or running
    pub fn is_idle(&self) -> bool {
        self.coordinator.is_idle()
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    fn scan_keys(&self) -> Result<Keys<'_, K, V, C>> {
        self.coordinator.read(|| Keys::open(&self.path, &self.codec))
    }

    fn scan_records(&self) -> Result<Records<'_, K, V, C>> {
        self.coordinator.read(|| Records::open(&self.path, &self.codec))
    }
}
