//! Session state: who is logged in and with which bearer token.
//!
//! # Design
//! The session is an explicit object handed to the controller at
//! construction rather than ambient global state. `SessionContext` holds the
//! in-memory copy and writes through to a `SessionStore`, which the host
//! implements (a JSON file in the CLI, memory in tests).

use std::fmt;
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};

use crate::error::ApiError;

/// Opaque bearer credential. `Debug` never prints the full value.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AuthToken(String);

impl AuthToken {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Token with everything but the first and last four characters hidden.
    pub fn masked(&self) -> String {
        let chars: Vec<char> = self.0.chars().collect();
        if chars.len() <= 10 {
            return "*".repeat(chars.len());
        }
        let prefix: String = chars[..4].iter().collect();
        let suffix: String = chars[chars.len() - 4..].iter().collect();
        format!("{prefix}...{suffix}")
    }
}

impl fmt::Debug for AuthToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("AuthToken").field(&self.masked()).finish()
    }
}

/// A logged-in user. The persisted form keeps the token under `token`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub username: String,
    pub token: AuthToken,
}

/// Persistence for the current session.
pub trait SessionStore {
    fn load(&self) -> Result<Option<Session>, ApiError>;

    fn save(&self, session: &Session) -> Result<(), ApiError>;

    fn clear(&self) -> Result<(), ApiError>;
}

/// Session store kept in process memory.
///
/// Clones share the same slot, so a test can keep a handle and inspect what
/// the controller persisted.
#[derive(Debug, Clone, Default)]
pub struct MemorySessionStore {
    slot: Arc<Mutex<Option<Session>>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_session(session: Session) -> Self {
        Self {
            slot: Arc::new(Mutex::new(Some(session))),
        }
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Option<Session>>, ApiError> {
        self.slot
            .lock()
            .map_err(|_| ApiError::storage("session store poisoned"))
    }
}

impl SessionStore for MemorySessionStore {
    fn load(&self) -> Result<Option<Session>, ApiError> {
        Ok(self.lock()?.clone())
    }

    fn save(&self, session: &Session) -> Result<(), ApiError> {
        *self.lock()? = Some(session.clone());
        Ok(())
    }

    fn clear(&self) -> Result<(), ApiError> {
        *self.lock()? = None;
        Ok(())
    }
}

/// The controller's view of the session plus the store backing it.
pub struct SessionContext {
    store: Box<dyn SessionStore>,
    current: Option<Session>,
}

impl SessionContext {
    /// Wrap `store` without reading it. Call [`SessionContext::restore`] to
    /// adopt a previously persisted session.
    pub fn new(store: impl SessionStore + 'static) -> Self {
        Self {
            store: Box::new(store),
            current: None,
        }
    }

    /// Adopt whatever the store holds. Returns whether a session was found.
    pub fn restore(&mut self) -> Result<bool, ApiError> {
        self.current = self.store.load()?;
        Ok(self.current.is_some())
    }

    pub fn begin(&mut self, session: Session) -> Result<(), ApiError> {
        self.store.save(&session)?;
        self.current = Some(session);
        Ok(())
    }

    /// Drop the session from memory, then from the store. Memory is cleared
    /// even when the store fails.
    pub fn end(&mut self) -> Result<(), ApiError> {
        self.current = None;
        self.store.clear()
    }

    pub fn current(&self) -> Option<&Session> {
        self.current.as_ref()
    }

    pub fn token(&self) -> Option<&AuthToken> {
        self.current.as_ref().map(|s| &s.token)
    }

    pub fn is_active(&self) -> bool {
        self.current.is_some()
    }
}

impl fmt::Debug for SessionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionContext")
            .field("current", &self.current)
            .finish_non_exhaustive()
    }
}
