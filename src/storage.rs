//! Durable key-value storage for the bearer credential.
//!
//! The session keeps exactly one entry here, keyed by a fixed name
//! (`access_token` unless configured otherwise). Absence of the entry
//! means logged out.

use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::error::Error;

/// Default key under which the bearer token is persisted.
pub const DEFAULT_TOKEN_KEY: &str = "access_token";

/// Consumer-provided credential persistence.
///
/// Operations are synchronous: a login must be durable before the next
/// request is issued.
///
/// # Example
///
/// ```rust,ignore
/// impl CredentialStorage for Keyring {
///     fn load(&self, key: &str) -> Result<Option<String>, Error> {
///         self.entry(key).get_password().map(Some).or_else(|_| Ok(None))
///     }
///     // ...
/// }
/// ```
pub trait CredentialStorage: Send + Sync + 'static {
    /// Read the value stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Storage`] if the backing store cannot be read.
    fn load(&self, key: &str) -> Result<Option<String>, Error>;

    /// Write `value` under `key`, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Storage`] if the value cannot be persisted.
    fn save(&self, key: &str, value: &str) -> Result<(), Error>;

    /// Erase `key`. Erasing an absent key succeeds.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Storage`] if the backing store cannot be updated.
    fn remove(&self, key: &str) -> Result<(), Error>;
}

/// In-process storage. Nothing survives the process.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: Mutex<BTreeMap<String, String>>,
}

impl MemoryStorage {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Storage pre-seeded with one entry, as if left by a previous run.
    #[must_use]
    pub fn with_entry(key: impl Into<String>, value: impl Into<String>) -> Self {
        let storage = Self::default();
        lock(&storage.entries).insert(key.into(), value.into());
        storage
    }
}

fn lock(
    entries: &Mutex<BTreeMap<String, String>>,
) -> std::sync::MutexGuard<'_, BTreeMap<String, String>> {
    entries
        .lock()
        .unwrap_or_else(std::sync::PoisonError::into_inner)
}

impl CredentialStorage for MemoryStorage {
    fn load(&self, key: &str) -> Result<Option<String>, Error> {
        Ok(lock(&self.entries).get(key).cloned())
    }

    fn save(&self, key: &str, value: &str) -> Result<(), Error> {
        lock(&self.entries).insert(key.to_owned(), value.to_owned());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), Error> {
        lock(&self.entries).remove(key);
        Ok(())
    }
}

/// JSON-object file storage: `{ "access_token": "..." }`.
///
/// A missing file reads as empty. Parent directories are created on first
/// write. Writes go to a temporary file in the same directory that is then
/// renamed over the target, so a crash never leaves a half-written file.
/// On unix the file is readable by its owner only.
#[derive(Debug)]
pub struct FileStorage {
    path: PathBuf,
    // Serializes read-modify-write cycles within this process.
    guard: Mutex<()>,
}

impl FileStorage {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            guard: Mutex::new(()),
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_raw(&self) -> Result<Option<String>, Error> {
        match std::fs::read_to_string(&self.path) {
            Ok(raw) if raw.trim().is_empty() => Ok(None),
            Ok(raw) => Ok(Some(raw)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(Error::Storage(format!("{}: {e}", self.path.display()))),
        }
    }

    fn read_all(&self) -> Result<BTreeMap<String, String>, Error> {
        let Some(raw) = self.read_raw()? else {
            return Ok(BTreeMap::new());
        };
        serde_json::from_str(&raw).map_err(|e| {
            Error::Storage(format!("{}: malformed credentials: {e}", self.path.display()))
        })
    }

    /// Entries to start a write from. A malformed file is discarded so the
    /// write replaces it; the flag reports that it was.
    fn read_for_update(&self) -> Result<(BTreeMap<String, String>, bool), Error> {
        let Some(raw) = self.read_raw()? else {
            return Ok((BTreeMap::new(), false));
        };
        match serde_json::from_str(&raw) {
            Ok(entries) => Ok((entries, false)),
            Err(e) => {
                tracing::warn!(
                    path = %self.path.display(),
                    error = %e,
                    "Discarding malformed credentials file"
                );
                Ok((BTreeMap::new(), true))
            }
        }
    }

    fn write_all(&self, entries: &BTreeMap<String, String>) -> Result<(), Error> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        std::fs::create_dir_all(dir)
            .map_err(|e| Error::Storage(format!("{}: {e}", dir.display())))?;

        let body = serde_json::to_string_pretty(entries)
            .map_err(|e| Error::Storage(e.to_string()))?;
        let io_err = |e: std::io::Error| Error::Storage(format!("{}: {e}", self.path.display()));

        let mut file = tempfile::NamedTempFile::new_in(dir).map_err(io_err)?;
        restrict_permissions(file.as_file()).map_err(io_err)?;
        file.write_all(body.as_bytes()).map_err(io_err)?;
        file.as_file().sync_all().map_err(io_err)?;
        file.persist(&self.path).map_err(|e| io_err(e.error))?;
        Ok(())
    }
}

#[cfg(unix)]
fn restrict_permissions(file: &std::fs::File) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    file.set_permissions(std::fs::Permissions::from_mode(0o600))
}

#[cfg(not(unix))]
fn restrict_permissions(_: &std::fs::File) -> std::io::Result<()> {
    Ok(())
}

impl CredentialStorage for FileStorage {
    fn load(&self, key: &str) -> Result<Option<String>, Error> {
        let _guard = self.guard.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        Ok(self.read_all()?.remove(key))
    }

    fn save(&self, key: &str, value: &str) -> Result<(), Error> {
        let _guard = self.guard.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        let (mut entries, _) = self.read_for_update()?;
        entries.insert(key.to_owned(), value.to_owned());
        self.write_all(&entries)
    }

    fn remove(&self, key: &str) -> Result<(), Error> {
        let _guard = self.guard.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        let (mut entries, malformed) = self.read_for_update()?;
        if entries.remove(key).is_none() && !malformed {
            return Ok(());
        }
        self.write_all(&entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_storage_round_trip() {
        let storage = MemoryStorage::new();
        assert_eq!(storage.load(DEFAULT_TOKEN_KEY).unwrap(), None);

        storage.save(DEFAULT_TOKEN_KEY, "tok").unwrap();
        assert_eq!(storage.load(DEFAULT_TOKEN_KEY).unwrap().as_deref(), Some("tok"));

        storage.remove(DEFAULT_TOKEN_KEY).unwrap();
        assert_eq!(storage.load(DEFAULT_TOKEN_KEY).unwrap(), None);
    }

    #[test]
    fn removing_absent_key_is_ok() {
        let storage = MemoryStorage::new();
        assert!(storage.remove("missing").is_ok());
    }

    #[test]
    fn file_storage_missing_file_reads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::new(dir.path().join("credentials.json"));
        assert_eq!(storage.load(DEFAULT_TOKEN_KEY).unwrap(), None);
        assert!(storage.remove(DEFAULT_TOKEN_KEY).is_ok());
        assert!(!storage.path().exists());
    }

    #[test]
    fn file_storage_persists_across_instances() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("credentials.json");

        FileStorage::new(&path).save(DEFAULT_TOKEN_KEY, "abc123").unwrap();

        let reopened = FileStorage::new(&path);
        assert_eq!(reopened.load(DEFAULT_TOKEN_KEY).unwrap().as_deref(), Some("abc123"));
    }

    #[test]
    fn file_storage_remove_keeps_other_keys() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::new(dir.path().join("credentials.json"));
        storage.save("theme", "dark").unwrap();
        storage.save(DEFAULT_TOKEN_KEY, "tok").unwrap();

        storage.remove(DEFAULT_TOKEN_KEY).unwrap();

        assert_eq!(storage.load(DEFAULT_TOKEN_KEY).unwrap(), None);
        assert_eq!(storage.load("theme").unwrap().as_deref(), Some("dark"));
    }

    #[test]
    fn file_storage_rejects_malformed_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("credentials.json");
        std::fs::write(&path, "not json").unwrap();

        let err = FileStorage::new(&path).load(DEFAULT_TOKEN_KEY).unwrap_err();
        assert!(matches!(err, Error::Storage(_)));
    }

    #[test]
    fn file_storage_save_replaces_truncated_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("credentials.json");
        std::fs::write(&path, r#"{"access_tok"#).unwrap();
        let storage = FileStorage::new(&path);

        storage.save(DEFAULT_TOKEN_KEY, "fresh").unwrap();

        assert_eq!(storage.load(DEFAULT_TOKEN_KEY).unwrap().as_deref(), Some("fresh"));
    }

    #[test]
    fn file_storage_remove_repairs_truncated_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("credentials.json");
        std::fs::write(&path, r#"{"access_tok"#).unwrap();
        let storage = FileStorage::new(&path);

        storage.remove(DEFAULT_TOKEN_KEY).unwrap();

        assert_eq!(storage.load(DEFAULT_TOKEN_KEY).unwrap(), None);
    }

    #[test]
    fn file_storage_leaves_no_temporary_files() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::new(dir.path().join("credentials.json"));
        storage.save(DEFAULT_TOKEN_KEY, "a").unwrap();
        storage.save(DEFAULT_TOKEN_KEY, "b").unwrap();

        let names: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|entry| entry.unwrap().file_name())
            .collect();
        assert_eq!(names, vec![std::ffi::OsString::from("credentials.json")]);
    }

    #[cfg(unix)]
    #[test]
    fn file_storage_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::new(dir.path().join("credentials.json"));
        storage.save(DEFAULT_TOKEN_KEY, "secret").unwrap();

        let mode = std::fs::metadata(storage.path()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }
}
