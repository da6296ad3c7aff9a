use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

/// Storage keys shared by the session store and the UI state.
pub mod keys {
    pub const USER: &str = "user";
    pub const ACCESS_TOKEN: &str = "accessToken";
    pub const REFRESH_TOKEN: &str = "refreshToken";
    pub const REMEMBER_ME: &str = "rememberMe";
    pub const ACTIVE_TAB: &str = "activeTab";
}

// 1. KeyValueStore Contract
/// KeyValueStore
///
/// The session repository interface. The console keeps two of them: a durable one
/// (survives restarts, used for "remember me" sessions) and an ephemeral one (lives as
/// long as the process). Swapping the implementation lets tests run against memory and
/// lets embedders back the session with whatever persistence they have.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;

    fn set(&self, key: &str, value: &str) -> Result<(), String>;

    fn remove(&self, key: &str) -> Result<(), String>;

    fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }
}

/// StorageState
///
/// The shared handle type used everywhere a store is injected.
pub type StorageState = Arc<dyn KeyValueStore>;

// 2. The Durable Implementation (JSON file)
/// FileStorage
///
/// Durable store backed by a single JSON object on disk. Every write rewrites the file;
/// the map is small (a handful of keys) so this stays cheap. On unix the file is created
/// with 0600 permissions since it holds bearer tokens.
#[derive(Debug)]
pub struct FileStorage {
    path: PathBuf,
    entries: Mutex<HashMap<String, String>>,
}

impl FileStorage {
    /// open
    ///
    /// Loads the store from `path`. A missing file is an empty store; a corrupt one is
    /// discarded with a warning rather than blocking startup.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, String> {
        let path = path.into();
        let entries = if path.exists() {
            let contents = fs::read_to_string(&path)
                .map_err(|e| format!("failed to read {}: {}", path.display(), e))?;
            match serde_json::from_str(&contents) {
                Ok(map) => map,
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "discarding unreadable session file");
                    HashMap::new()
                }
            }
        } else {
            HashMap::new()
        };

        Ok(Self { path, entries: Mutex::new(entries) })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self, entries: &HashMap<String, String>) -> Result<(), String> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| format!("failed to create {}: {}", parent.display(), e))?;
        }
        let contents = serde_json::to_string_pretty(entries).map_err(|e| e.to_string())?;
        fs::write(&self.path, contents)
            .map_err(|e| format!("failed to write {}: {}", self.path.display(), e))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&self.path, fs::Permissions::from_mode(0o600))
                .map_err(|e| format!("failed to restrict {}: {}", self.path.display(), e))?;
        }

        Ok(())
    }
}

impl KeyValueStore for FileStorage {
    fn get(&self, key: &str) -> Option<String> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<(), String> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.insert(key.to_string(), value.to_string());
        self.persist(&entries)
    }

    fn remove(&self, key: &str) -> Result<(), String> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        if entries.remove(key).is_some() {
            self.persist(&entries)?;
        }
        Ok(())
    }
}

// 3. The Ephemeral Implementation (also the test double)
/// MemoryStorage
///
/// In-process store. Serves as the session-scoped storage in production and as the
/// mock in tests; `new_failing` simulates a store that rejects every write.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: RwLock<HashMap<String, String>>,
    /// When true, all writes return a simulated failure.
    pub should_fail: bool,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn new_failing() -> Self {
        Self { entries: RwLock::default(), should_fail: true }
    }

    pub fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl KeyValueStore for MemoryStorage {
    fn get(&self, key: &str) -> Option<String> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<(), String> {
        if self.should_fail {
            return Err("simulated storage write failure".to_string());
        }
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), String> {
        if self.should_fail {
            return Err("simulated storage write failure".to_string());
        }
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key);
        Ok(())
    }
}
