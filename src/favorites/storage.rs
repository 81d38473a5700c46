// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::collections::HashMap;
use std::fs::File;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::error::PersistenceError;

/// Storage key for favorited show IDs
pub const FAVORITES_KEY: &str = "favorites";

/// Storage key for favorited episode keys
pub const EPISODE_FAVORITES_KEY: &str = "episodeFavorites";

/// Durable key-value storage for favorite sets
///
/// Values are JSON documents. A missing key is not an error.
pub trait FavoritesStorage: Send + Sync {
    /// Read the value stored under `key`
    fn load(&self, key: &str) -> Result<Option<String>, PersistenceError>;

    /// Store `value` under `key`, replacing any previous value
    fn save(&self, key: &str, value: &str) -> Result<(), PersistenceError>;

    /// Delete `key`; deleting a missing key succeeds
    fn remove(&self, key: &str) -> Result<(), PersistenceError>;
}

/// Stores each key as `{dir}/{key}.json`
///
/// Writes go to a `.partial` sibling first and are renamed into place, so an
/// interrupted write never leaves a truncated value behind.
#[derive(Debug, Clone)]
pub struct JsonFileStorage {
    dir: PathBuf,
}

impl JsonFileStorage {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", key))
    }
}

impl FavoritesStorage for JsonFileStorage {
    fn load(&self, key: &str) -> Result<Option<String>, PersistenceError> {
        let path = self.path_for(key);

        match std::fs::read_to_string(&path) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(PersistenceError::Read { path, source: e }),
        }
    }

    fn save(&self, key: &str, value: &str) -> Result<(), PersistenceError> {
        std::fs::create_dir_all(&self.dir).map_err(|e| PersistenceError::CreateDirectory {
            path: self.dir.clone(),
            source: e,
        })?;

        let path = self.path_for(key);
        let partial = self.dir.join(format!("{}.json.partial", key));

        write_synced(&partial, value).map_err(|e| PersistenceError::Write {
            path: partial.clone(),
            source: e,
        })?;

        std::fs::rename(&partial, &path).map_err(|e| PersistenceError::Write { path, source: e })
    }

    fn remove(&self, key: &str) -> Result<(), PersistenceError> {
        let path = self.path_for(key);

        match std::fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(PersistenceError::Remove { path, source: e }),
        }
    }
}

/// Write `value` to `path` and flush it to disk before returning
fn write_synced(path: &Path, value: &str) -> std::io::Result<()> {
    let mut file = File::create(path)?;
    file.write_all(value.as_bytes())?;
    file.sync_all()
}

/// Volatile storage, for sessions that should not touch the disk and for tests
///
/// Writes can be made to fail on demand to exercise error paths.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    values: Mutex<HashMap<String, String>>,
    fail_writes: AtomicBool,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current raw value of `key`
    pub fn get(&self, key: &str) -> Option<String> {
        self.values
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(key)
            .cloned()
    }

    /// Make every subsequent save and remove fail (or succeed again)
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    fn check_writable(&self) -> Result<(), PersistenceError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(PersistenceError::Unavailable(
                "memory storage is read-only".to_string(),
            ));
        }
        Ok(())
    }
}

impl FavoritesStorage for MemoryStorage {
    fn load(&self, key: &str) -> Result<Option<String>, PersistenceError> {
        Ok(self.get(key))
    }

    fn save(&self, key: &str, value: &str) -> Result<(), PersistenceError> {
        self.check_writable()?;
        self.values
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), PersistenceError> {
        self.check_writable()?;
        self.values
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(key);
        Ok(())
    }
}

impl<T: FavoritesStorage + ?Sized> FavoritesStorage for std::sync::Arc<T> {
    fn load(&self, key: &str) -> Result<Option<String>, PersistenceError> {
        (**self).load(key)
    }

    fn save(&self, key: &str, value: &str) -> Result<(), PersistenceError> {
        (**self).save(key, value)
    }

    fn remove(&self, key: &str) -> Result<(), PersistenceError> {
        (**self).remove(key)
    }
}
