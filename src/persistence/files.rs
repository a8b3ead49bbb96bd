use super::store::{publish_changes, KeyValueStore, StoreChange};
use crate::error::StoreError;
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::env;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tempfile::NamedTempFile;
use tokio::sync::broadcast;

/// Name of the per-project data directory
pub const DATA_DIR_NAME: &str = ".chronolog";

/// Name of the store document inside the data directory
pub const STORE_FILE_NAME: &str = "store.json";

/// Get the data directory - checks for local .chronolog first, then falls back to ~/.chronolog
pub fn get_data_dir() -> Result<PathBuf> {
    let current_dir = env::current_dir().context("Could not determine current directory")?;
    if let Some(local_dir) = find_local_data_dir(&current_dir) {
        return Ok(local_dir);
    }

    let home = dirs::home_dir().context("Could not determine home directory")?;
    Ok(home.join(DATA_DIR_NAME))
}

/// Find local .chronolog directory by walking up the directory tree
fn find_local_data_dir(start_dir: &Path) -> Option<PathBuf> {
    let mut current = start_dir;

    loop {
        let candidate = current.join(DATA_DIR_NAME);
        if candidate.is_dir() {
            return Some(candidate);
        }
        current = current.parent()?;
    }
}

/// Ensure the directory exists
pub fn ensure_dir(dir: &Path) -> Result<()> {
    if !dir.exists() {
        fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create directory: {}", dir.display()))?;
    }
    Ok(())
}

/// Initialize a local .chronolog directory in the current directory
pub fn init_local_data_dir() -> Result<PathBuf> {
    let current_dir = env::current_dir().context("Could not determine current directory")?;
    let data_dir = current_dir.join(DATA_DIR_NAME);

    if data_dir.exists() {
        anyhow::bail!("Chronolog directory already exists: {}", data_dir.display());
    }

    fs::create_dir_all(&data_dir)
        .with_context(|| format!("Failed to create directory: {}", data_dir.display()))?;

    Ok(data_dir)
}

/// Atomically write content to a file using temp file + rename
pub fn atomic_write<P: AsRef<Path>>(path: P, content: &str) -> Result<()> {
    let path = path.as_ref();
    let dir = match path.parent() {
        Some(dir) if dir.as_os_str().is_empty() => Path::new("."),
        Some(dir) => dir,
        None => anyhow::bail!("File path has no parent directory: {}", path.display()),
    };

    let mut temp_file = NamedTempFile::new_in(dir).context("Failed to create temporary file")?;

    temp_file
        .write_all(content.as_bytes())
        .context("Failed to write to temporary file")?;

    temp_file
        .as_file()
        .sync_all()
        .context("Failed to sync temporary file")?;

    temp_file
        .persist(path)
        .with_context(|| format!("Failed to persist file: {}", path.display()))?;

    Ok(())
}

/// Read file content, return empty string if file doesn't exist
pub fn read_file<P: AsRef<Path>>(path: P) -> Result<String> {
    let path = path.as_ref();
    if !path.exists() {
        return Ok(String::new());
    }
    fs::read_to_string(path).with_context(|| format!("Failed to read file: {}", path.display()))
}

/// Key-value store backed by a single JSON document on disk
///
/// Every call reads the document and every write replaces it whole, so two processes writing
/// the same file can lose each other's updates.
pub struct JsonFileStore {
    path: PathBuf,
    write_lock: Mutex<()>,
    changes: broadcast::Sender<StoreChange>,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let (changes, _) = broadcast::channel(64);
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
            changes,
        }
    }

    /// Store at `<dir>/store.json`, creating `dir` if needed
    pub fn in_dir(dir: &Path) -> Result<Self> {
        ensure_dir(dir)?;
        Ok(Self::new(dir.join(STORE_FILE_NAME)))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load_document(&self) -> Result<Map<String, Value>, StoreError> {
        let raw = read_file(&self.path).map_err(|e| StoreError::Unavailable(format!("{:#}", e)))?;
        if raw.trim().is_empty() {
            return Ok(Map::new());
        }
        serde_json::from_str(&raw).map_err(|source| StoreError::Corrupt {
            key: self.path.display().to_string(),
            source,
        })
    }

    fn save_document(&self, document: &Map<String, Value>) -> Result<(), StoreError> {
        let json = serde_json::to_string_pretty(document).map_err(|source| StoreError::Corrupt {
            key: self.path.display().to_string(),
            source,
        })?;
        atomic_write(&self.path, &json).map_err(|e| StoreError::Unavailable(format!("{:#}", e)))
    }
}

#[async_trait]
impl KeyValueStore for JsonFileStore {
    async fn get(&self, keys: &[&str]) -> Result<Map<String, Value>, StoreError> {
        let mut document = self.load_document()?;
        Ok(keys
            .iter()
            .filter_map(|k| document.remove(*k).map(|v| (k.to_string(), v)))
            .collect())
    }

    async fn set(&self, items: Map<String, Value>) -> Result<(), StoreError> {
        {
            let _guard = self.write_lock.lock().unwrap_or_else(|e| e.into_inner());
            let mut document = self.load_document()?;
            for (key, value) in &items {
                document.insert(key.clone(), value.clone());
            }
            self.save_document(&document)?;
        }
        tracing::debug!(path = %self.path.display(), keys = items.len(), "Store document written");
        publish_changes(&self.changes, &items);
        Ok(())
    }

    fn changes(&self) -> broadcast::Receiver<StoreChange> {
        self.changes.subscribe()
    }
}
