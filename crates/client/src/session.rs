//! Persistent session storage.
//!
//! The session is kept as a flat JSON object of namespaced string keys so it
//! survives restarts. Storage is best-effort: read and write failures are
//! logged and treated as "no session", never returned to the caller.

use deck_notes_core::Session;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

/// Key holding the bearer token.
pub const TOKEN_KEY: &str = "deck_notes.token";

/// Key holding the username.
pub const USER_KEY: &str = "deck_notes.user";

type Entries = BTreeMap<String, String>;

/// Holds the current credential and username.
#[derive(Debug)]
pub struct SessionStore {
    /// Backing file; `None` keeps the session in memory only.
    path: Option<PathBuf>,

    /// Loaded lazily on first access.
    entries: Mutex<Option<Entries>>,
}

impl SessionStore {
    /// A store backed by the file at `path`.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
            entries: Mutex::new(None),
        }
    }

    /// A store that never touches disk.
    pub fn in_memory() -> Self {
        Self {
            path: None,
            entries: Mutex::new(Some(Entries::new())),
        }
    }

    /// Backing file, if any.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// The current session, if a token is stored.
    pub fn get(&self) -> Option<Session> {
        let mut guard = self.lock();
        let entries = self.loaded(&mut guard);
        let token = entries.get(TOKEN_KEY).filter(|t| !t.is_empty())?;
        let username = entries.get(USER_KEY).cloned().unwrap_or_default();
        Some(Session::new(token.clone(), username))
    }

    /// Stored bearer token.
    pub fn token(&self) -> Option<String> {
        self.get().map(|s| s.token)
    }

    /// Stored username.
    pub fn username(&self) -> Option<String> {
        self.get()
            .map(|s| s.username)
            .filter(|name| !name.is_empty())
    }

    /// Record a new session, replacing any previous one.
    pub fn set(&self, token: &str, username: &str) {
        let mut guard = self.lock();
        let entries = self.loaded(&mut guard);
        entries.insert(TOKEN_KEY.to_string(), token.to_string());
        entries.insert(USER_KEY.to_string(), username.to_string());
        self.persist(entries);
    }

    /// Forget the session.
    pub fn clear(&self) {
        let mut guard = self.lock();
        let entries = self.loaded(&mut guard);
        entries.remove(TOKEN_KEY);
        entries.remove(USER_KEY);
        self.persist(entries);
    }

    fn lock(&self) -> MutexGuard<'_, Option<Entries>> {
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn loaded<'a>(&self, guard: &'a mut MutexGuard<'_, Option<Entries>>) -> &'a mut Entries {
        guard.get_or_insert_with(|| self.read_entries())
    }

    fn read_entries(&self) -> Entries {
        let Some(path) = &self.path else {
            return Entries::new();
        };
        if !path.exists() {
            return Entries::new();
        }

        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) => {
                log::warn!("Failed to read session file {}: {}", path.display(), e);
                return Entries::new();
            }
        };

        match serde_json::from_str::<Entries>(&content) {
            Ok(entries) => entries,
            Err(e) => {
                log::warn!("Ignoring unreadable session file {}: {}", path.display(), e);
                Entries::new()
            }
        }
    }

    fn persist(&self, entries: &Entries) {
        let Some(path) = &self.path else {
            return;
        };
        if let Err(e) = write_atomic(path, entries) {
            log::warn!("Failed to save session to {}: {}", path.display(), e);
        }
    }
}

/// Write via a temporary file and rename so a crash never leaves half a file.
fn write_atomic(path: &Path, entries: &Entries) -> std::io::Result<()> {
    let dir = match path.parent().filter(|p| !p.as_os_str().is_empty()) {
        Some(parent) => {
            std::fs::create_dir_all(parent)?;
            parent
        }
        None => Path::new("."),
    };
    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    serde_json::to_writer_pretty(&mut tmp, entries)?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_save_leaves_only_session_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("session.json");
        let store = SessionStore::open(&path);
        store.set("tok", "alice");
        store.set("tok-2", "alice");

        let names: Vec<_> = std::fs::read_dir(path.parent().unwrap())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(names, vec![std::ffi::OsString::from("session.json")]);
        assert_eq!(SessionStore::open(&path).token().as_deref(), Some("tok-2"));
    }

    #[test]
    fn test_empty_store_has_no_session() {
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::open(dir.path().join("session.json"));
        assert_eq!(store.get(), None);
    }

    #[test]
    fn test_session_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("session.json");

        SessionStore::open(&path).set("tok-1", "alice");

        let reopened = SessionStore::open(&path);
        assert_eq!(reopened.get(), Some(Session::new("tok-1", "alice")));
        assert_eq!(reopened.username().as_deref(), Some("alice"));
    }

    #[test]
    fn test_file_uses_namespaced_keys() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        SessionStore::open(&path).set("tok", "bob");

        let raw: Entries = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(raw.get(TOKEN_KEY).map(String::as_str), Some("tok"));
        assert_eq!(raw.get(USER_KEY).map(String::as_str), Some("bob"));
    }

    #[test]
    fn test_clear_removes_session() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        let store = SessionStore::open(&path);
        store.set("tok", "carol");
        store.clear();
        assert_eq!(store.get(), None);
        assert_eq!(SessionStore::open(&path).get(), None);
    }

    #[test]
    fn test_corrupt_file_degrades_to_no_session() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        std::fs::write(&path, "{not json").unwrap();

        let store = SessionStore::open(&path);
        assert_eq!(store.get(), None);

        store.set("fresh", "dave");
        assert_eq!(SessionStore::open(&path).token().as_deref(), Some("fresh"));
    }

    #[test]
    fn test_unwritable_location_does_not_fail() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("file");
        std::fs::write(&blocker, "x").unwrap();

        // Parent is a regular file, so every write fails
        let store = SessionStore::open(blocker.join("session.json"));
        store.set("tok", "erin");
        assert_eq!(store.token().as_deref(), Some("tok"));
        store.clear();
        assert_eq!(store.get(), None);
    }

    #[test]
    fn test_in_memory_store() {
        let store = SessionStore::in_memory();
        assert!(store.path().is_none());
        store.set("t", "");
        assert_eq!(store.get(), Some(Session::new("t", "")));
        assert_eq!(store.username(), None);
    }
}
