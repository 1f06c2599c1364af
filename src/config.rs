//! Configuration for LineKV
//!
//! Binds a logical store name (and optional folder) to one file on disk.

use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf, MAIN_SEPARATOR};

use crate::error::{LineKvError, Result};

/// File extension of every store file
pub const STORE_EXTENSION: &str = ".jsonl";

/// Suffix that replaces the extension while a rewrite pass is running
pub const TEMP_SUFFIX: &str = "-temp.jsonl";

/// Store names may not end with this; `{name}-temp.jsonl` is another store's temp file
const TEMP_MARKER: &str = "-temp";

/// Configuration for a single store
#[derive(Debug, Clone)]
pub struct StoreConfig {
    // -------------------------------------------------------------------------
    // Location
    // -------------------------------------------------------------------------
    /// Logical store name; the file is `{name}.jsonl`
    pub name: String,

    /// Directory holding the store file. `None` means the working directory.
    pub folder: Option<PathBuf>,

    // -------------------------------------------------------------------------
    // Durability
    // -------------------------------------------------------------------------
    /// fsync the temporary file before it replaces the original
    pub sync_on_rewrite: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            name: "store".to_string(),
            folder: None,
            sync_on_rewrite: true,
        }
    }
}

impl StoreConfig {
    /// Create a new config builder
    pub fn builder() -> StoreConfigBuilder {
        StoreConfigBuilder::default()
    }

    /// Resolve the store file path
    ///
    /// `{folder}/{name}.jsonl` when a folder is set, otherwise `{name}.jsonl`.
    /// Runs of path separators are collapsed to one.
    pub fn path(&self) -> PathBuf {
        let mut file_name = OsString::from(&self.name);
        file_name.push(STORE_EXTENSION);

        let raw = match &self.folder {
            Some(folder) => folder.join(file_name),
            None => PathBuf::from(file_name),
        };
        raw.components().collect()
    }

    /// Check that the config names a usable file
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(LineKvError::Config("store name must not be empty".to_string()));
        }
        if self.name.contains('/') || self.name.contains(MAIN_SEPARATOR) {
            return Err(LineKvError::Config(format!(
                "store name {:?} must not contain a path separator",
                self.name
            )));
        }
        if self.name.ends_with(TEMP_MARKER) {
            return Err(LineKvError::Config(format!(
                "store name {:?} must not end with {:?}; that file is reserved for rewrites",
                self.name, TEMP_MARKER
            )));
        }
        Ok(())
    }
}

/// Temporary path used by a rewrite pass on `path`
///
/// "data/users.jsonl" → "data/users-temp.jsonl". Paths without the store
/// extension get the suffix appended, so the temp file always stays in the
/// same directory as the original.
pub fn temp_path_for(path: &Path) -> PathBuf {
    let is_store_file = path.extension() == Some(OsStr::new(&STORE_EXTENSION[1..]));

    let mut file_name = match path.file_stem() {
        Some(stem) if is_store_file => stem.to_os_string(),
        _ => path.file_name().map(OsStr::to_os_string).unwrap_or_default(),
    };
    file_name.push(TEMP_SUFFIX);
    path.with_file_name(file_name)
}

/// Builder for StoreConfig
#[derive(Default)]
pub struct StoreConfigBuilder {
    config: StoreConfig,
}

impl StoreConfigBuilder {
    /// Set the logical store name
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.config.name = name.into();
        self
    }

    /// Set the folder holding the store file
    pub fn folder(mut self, folder: impl Into<PathBuf>) -> Self {
        self.config.folder = Some(folder.into());
        self
    }

    /// Enable or disable fsync before the swap
    pub fn sync_on_rewrite(mut self, sync: bool) -> Self {
        self.config.sync_on_rewrite = sync;
        self
    }

    pub fn build(self) -> Result<StoreConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}
