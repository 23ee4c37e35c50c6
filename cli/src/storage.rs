//! Session persistence in a small JSON file.
//!
//! The file holds `{"username": ..., "token": ...}`. A missing or unreadable
//! file means "not logged in".

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use todo_core::{ApiError, Session, SessionStore};
use tracing::warn;

pub struct FileSessionStore {
    path: PathBuf,
}

impl FileSessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SessionStore for FileSessionStore {
    fn load(&self) -> Result<Option<Session>, ApiError> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(ApiError::storage(format!("{}: {e}", self.path.display()))),
        };
        match serde_json::from_str(&content) {
            Ok(session) => Ok(Some(session)),
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "ignoring corrupt session file");
                Ok(None)
            }
        }
    }

    fn save(&self, session: &Session) -> Result<(), ApiError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| ApiError::storage(e.to_string()))?;
        }
        let json = serde_json::to_string_pretty(session).map_err(|e| ApiError::storage(e.to_string()))?;
        fs::write(&self.path, json).map_err(|e| ApiError::storage(e.to_string()))?;
        restrict_permissions(&self.path)
    }

    fn clear(&self) -> Result<(), ApiError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(ApiError::storage(e.to_string())),
        }
    }
}

/// The file holds a bearer token; keep it owner-readable only.
#[cfg(unix)]
fn restrict_permissions(path: &Path) -> Result<(), ApiError> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o600)).map_err(|e| ApiError::storage(e.to_string()))
}

#[cfg(not(unix))]
fn restrict_permissions(_path: &Path) -> Result<(), ApiError> {
    Ok(())
}
