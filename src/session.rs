//! Session persistence and role resolution.
//!
//! The stored value is the user object exactly as the backend returned it,
//! under a single key. Anything unreadable is treated as "logged out".

use crate::model::User;
use anyhow::{Context, Result};
use std::cell::RefCell;
use std::path::{Path, PathBuf};

pub const SESSION_KEY: &str = "currentUser";

/// Persistence primitive behind the session
pub trait SessionStore {
    fn get(&self) -> Result<Option<String>>;
    /// Replace the stored value
    fn set(&self, value: &str) -> Result<()>;
    /// Remove the stored value; removing nothing is not an error
    fn clear(&self) -> Result<()>;
}

/// Stores the session as `<dir>/currentUser.json`
pub struct FileStore {
    path: PathBuf,
}

/// Session file for `SESSION_KEY` inside `dir`
pub fn file_in(dir: &Path) -> PathBuf {
    dir.join(format!("{}.json", SESSION_KEY))
}

impl FileStore {
    pub fn at(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SessionStore for FileStore {
    fn get(&self) -> Result<Option<String>> {
        match std::fs::read_to_string(&self.path) {
            Ok(s) => Ok(Some(s)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e).with_context(|| format!("Failed to read {}", self.path.display())),
        }
    }

    fn set(&self, value: &str) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        // Write then rename so a reader never sees a half-written file
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, value)
            .with_context(|| format!("Failed to write {}", tmp.display()))?;
        std::fs::rename(&tmp, &self.path)
            .with_context(|| format!("Failed to replace {}", self.path.display()))?;
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e).with_context(|| format!("Failed to remove {}", self.path.display())),
        }
    }
}

/// Process-local store, nothing survives exit
#[derive(Default)]
pub struct MemoryStore {
    value: RefCell<Option<String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStore for MemoryStore {
    fn get(&self) -> Result<Option<String>> {
        Ok(self.value.borrow().clone())
    }

    fn set(&self, value: &str) -> Result<()> {
        *self.value.borrow_mut() = Some(value.to_string());
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        *self.value.borrow_mut() = None;
        Ok(())
    }
}

/// Answers "who is logged in" from the store.
///
/// Role checks here only gate what the client offers; the backend has to
/// authorize admin requests on its own.
pub struct Sessions {
    store: Box<dyn SessionStore>,
}

impl Sessions {
    pub fn new(store: Box<dyn SessionStore>) -> Self {
        Self { store }
    }

    pub fn current(&self) -> Option<User> {
        let raw = self.store.get().ok().flatten()?;
        let user: User = serde_json::from_str(&raw).ok()?;
        if user.username.trim().is_empty() {
            return None;
        }
        Some(user)
    }

    pub fn is_authenticated(&self) -> bool {
        self.current().is_some()
    }

    pub fn is_admin(&self) -> bool {
        self.current().is_some_and(|u| u.is_admin())
    }

    /// Persist the serialized user object, replacing any previous session
    pub fn remember(&self, raw_user: &str) -> Result<()> {
        self.store.set(raw_user)
    }

    pub fn logout(&self) -> Result<()> {
        self.store.clear()
    }

    #[cfg(test)]
    pub fn raw(&self) -> Option<String> {
        self.store.get().ok().flatten()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Role;
    use tempfile::TempDir;

    #[test]
    fn test_empty_store_is_logged_out() {
        let sessions = Sessions::new(Box::new(MemoryStore::new()));
        assert!(sessions.current().is_none());
        assert!(!sessions.is_authenticated());
        assert!(!sessions.is_admin());
    }

    #[test]
    fn test_admin_detection() {
        let sessions = Sessions::new(Box::new(MemoryStore::new()));
        sessions
            .remember(r#"{"id":1,"username":"root","role":"admin"}"#)
            .unwrap();
        assert!(sessions.is_authenticated());
        assert!(sessions.is_admin());

        sessions.remember(r#"{"id":2,"username":"alice"}"#).unwrap();
        let user = sessions.current().unwrap();
        assert_eq!(user.role, Role::User);
        assert!(!sessions.is_admin());
    }

    #[test]
    fn test_corrupt_value_is_logged_out() {
        let sessions = Sessions::new(Box::new(MemoryStore::new()));
        for raw in [
            "{not json",
            r#"{"id":1,"username":"","role":"user"}"#,
            r#"{"id":1,"username":"x","role":"superuser"}"#,
            r#"[1,2,3]"#,
        ] {
            sessions.remember(raw).unwrap();
            assert!(!sessions.is_authenticated(), "accepted {}", raw);
        }
    }

    #[test]
    fn test_null_role_session_is_regular_user() {
        let sessions = Sessions::new(Box::new(MemoryStore::new()));
        sessions
            .remember(r#"{"id":1,"username":"alice","role":null}"#)
            .unwrap();
        assert!(sessions.is_authenticated());
        assert!(!sessions.is_admin());
        assert_eq!(sessions.current().unwrap().role, Role::User);
    }

    #[test]
    fn test_logout_is_idempotent() {
        let sessions = Sessions::new(Box::new(MemoryStore::new()));
        assert!(sessions.logout().is_ok());
        sessions.remember(r#"{"id":1,"username":"a"}"#).unwrap();
        sessions.logout().unwrap();
        assert!(!sessions.is_authenticated());
        assert!(sessions.logout().is_ok());
    }

    #[test]
    fn test_file_store_roundtrip() {
        let dir = TempDir::new().unwrap();
        let store = FileStore::at(&file_in(&dir.path().join("state")));
        assert_eq!(store.get().unwrap(), None);

        store.set(r#"{"id":1,"username":"a"}"#).unwrap();
        assert!(store.path().ends_with("currentUser.json"));
        assert_eq!(store.get().unwrap().as_deref(), Some(r#"{"id":1,"username":"a"}"#));

        store.set(r#"{"id":2,"username":"b"}"#).unwrap();
        assert_eq!(store.get().unwrap().as_deref(), Some(r#"{"id":2,"username":"b"}"#));

        store.clear().unwrap();
        store.clear().unwrap();
        assert_eq!(store.get().unwrap(), None);
    }

    #[test]
    fn test_file_store_read_error_is_logged_out() {
        let dir = TempDir::new().unwrap();
        // A directory where the file should be makes reads fail
        let path = dir.path().join("currentUser.json");
        std::fs::create_dir_all(&path).unwrap();
        let sessions = Sessions::new(Box::new(FileStore::at(&path)));
        assert!(!sessions.is_authenticated());
    }
}
