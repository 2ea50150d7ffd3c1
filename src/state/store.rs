//! Session store: persisted access/refresh token slots.
//!
//! ARCHITECTURE
//! ============
//! Consumers see a small synchronous key/value interface ([`SessionStore`])
//! so the guard and flows can be handed a [`MemoryStore`] in tests and a
//! [`FileStore`] in the CLI. Only the two [`SessionKey`] slots exist; setting
//! a slot overwrites it.
//!
//! TRADE-OFFS
//! ==========
//! `get`/`set`/`remove`/`clear` never fail. [`FileStore`] keeps the in-memory
//! map authoritative for the process and logs write-through failures instead
//! of surfacing them. There is no cross-process locking: two processes
//! sharing one session file race, and the last writer wins.

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

// =============================================================================
// KEYS
// =============================================================================

/// The two session slots, named as they appear in persisted storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SessionKey {
    AccessToken,
    RefreshToken,
}

impl SessionKey {
    pub const ALL: [Self; 2] = [Self::AccessToken, Self::RefreshToken];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::AccessToken => "accessToken",
            Self::RefreshToken => "refreshToken",
        }
    }

    /// Inverse of [`SessionKey::as_str`].
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|key| key.as_str() == name)
    }
}

impl fmt::Display for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// TRAIT
// =============================================================================

/// Key/value storage for the current session's tokens.
pub trait SessionStore: Send + Sync {
    /// Current value for `key`, or `None` if unset.
    fn get(&self, key: SessionKey) -> Option<String>;

    /// Overwrite `key` with `value`.
    fn set(&self, key: SessionKey, value: &str);

    /// Remove a single slot.
    fn remove(&self, key: SessionKey);

    /// Remove every session slot.
    fn clear(&self);
}

impl<T: SessionStore + ?Sized> SessionStore for Arc<T> {
    fn get(&self, key: SessionKey) -> Option<String> {
        (**self).get(key)
    }

    fn set(&self, key: SessionKey, value: &str) {
        (**self).set(key, value);
    }

    fn remove(&self, key: SessionKey) {
        (**self).remove(key);
    }

    fn clear(&self) {
        (**self).clear();
    }
}

type Slots = BTreeMap<SessionKey, String>;

fn lock(slots: &Mutex<Slots>) -> MutexGuard<'_, Slots> {
    // Slots are plain strings; a panic mid-update cannot leave them torn.
    slots.lock().unwrap_or_else(PoisonError::into_inner)
}

// =============================================================================
// MEMORY STORE
// =============================================================================

/// Process-lifetime store. Values are lost when the process exits.
#[derive(Debug, Default)]
pub struct MemoryStore {
    slots: Mutex<Slots>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStore for MemoryStore {
    fn get(&self, key: SessionKey) -> Option<String> {
        lock(&self.slots).get(&key).cloned()
    }

    fn set(&self, key: SessionKey, value: &str) {
        lock(&self.slots).insert(key, value.to_owned());
    }

    fn remove(&self, key: SessionKey) {
        lock(&self.slots).remove(&key);
    }

    fn clear(&self) {
        lock(&self.slots).clear();
    }
}

// =============================================================================
// FILE STORE
// =============================================================================

/// Errors loading a persisted session file.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("session file I/O failed for {path}: {source}")]
    Io { path: PathBuf, source: io::Error },
    #[error("session file {path} is not valid JSON: {source}")]
    Json { path: PathBuf, source: serde_json::Error },
}

/// JSON-file-backed store that survives restarts.
///
/// The file holds a flat object, e.g. `{"accessToken": "...", "refreshToken": "..."}`.
/// Every mutation is written through via a temp file and rename.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    slots: Mutex<Slots>,
}

impl FileStore {
    /// Load the store from `path`. A missing file yields an empty store.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the file exists but cannot be read or parsed.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let slots = match fs::read_to_string(&path) {
            Ok(raw) if raw.trim().is_empty() => Slots::new(),
            Ok(raw) => {
                let stored = serde_json::from_str::<BTreeMap<String, String>>(&raw)
                    .map_err(|source| StoreError::Json { path: path.clone(), source })?;
                // Unknown entries are dropped; only the session slots are kept.
                stored
                    .into_iter()
                    .filter_map(|(name, value)| SessionKey::from_name(&name).map(|key| (key, value)))
                    .collect()
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Slots::new(),
            Err(source) => return Err(StoreError::Io { path, source }),
        };
        Ok(Self { path, slots: Mutex::new(slots) })
    }

    /// Like [`FileStore::open`], but an unreadable file is treated as a
    /// signed-out session instead of an error.
    #[must_use]
    pub fn open_or_empty(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        match Self::open(path.clone()) {
            Ok(store) => store,
            Err(e) => {
                tracing::warn!(error = %e, "session file unreadable; starting signed out");
                Self { path, slots: Mutex::new(Slots::new()) }
            }
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self, slots: &Slots) {
        let result = if slots.is_empty() { remove_file(&self.path) } else { write_atomic(&self.path, slots) };
        if let Err(e) = result {
            tracing::warn!(path = %self.path.display(), error = %e, "session file write failed");
        }
    }
}

impl SessionStore for FileStore {
    fn get(&self, key: SessionKey) -> Option<String> {
        lock(&self.slots).get(&key).cloned()
    }

    fn set(&self, key: SessionKey, value: &str) {
        let mut slots = lock(&self.slots);
        slots.insert(key, value.to_owned());
        self.persist(&slots);
    }

    fn remove(&self, key: SessionKey) {
        let mut slots = lock(&self.slots);
        if slots.remove(&key).is_some() {
            self.persist(&slots);
        }
    }

    fn clear(&self) {
        let mut slots = lock(&self.slots);
        slots.clear();
        self.persist(&slots);
    }
}

fn remove_file(path: &Path) -> io::Result<()> {
    match fs::remove_file(path) {
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        other => other,
    }
}

fn write_atomic(path: &Path, slots: &Slots) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let named = slots
        .iter()
        .map(|(key, value)| (key.as_str(), value.as_str()))
        .collect::<BTreeMap<_, _>>();
    let json = serde_json::to_vec_pretty(&named).map_err(io::Error::other)?;
    let tmp = path.with_extension("json.tmp");
    {
        let mut file = open_private(&tmp)?;
        file.write_all(&json)?;
        file.sync_all()?;
    }
    fs::rename(&tmp, path)
}

/// Token files are readable by the owner only.
#[cfg(unix)]
fn open_private(path: &Path) -> io::Result<fs::File> {
    use std::os::unix::fs::OpenOptionsExt;
    fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(0o600)
        .open(path)
}

#[cfg(not(unix))]
fn open_private(path: &Path) -> io::Result<fs::File> {
    fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(path)
}

#[cfg(test)]
#[path = "store_test.rs"]
mod tests;
