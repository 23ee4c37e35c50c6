//! Error types for the todo API client.
//!
//! # Design
//! `NotFound` and `Unauthorized` get dedicated variants because callers react
//! to them differently from "the server returned an unexpected status". All
//! other non-2xx responses land in `HttpError` with the raw status code and
//! body. Client-side failures (no session, bad index, store I/O) have their
//! own variants so the shell can tell them apart from server answers.

use thiserror::Error;

/// Errors returned by `TodoClient`, `TodoController` and session stores.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The server returned 404, or the id is not in the local list.
    #[error("resource not found")]
    NotFound,

    /// The server rejected the bearer token or the credentials (401).
    #[error("unauthorized")]
    Unauthorized,

    /// An authenticated operation was attempted without a session.
    #[error("not logged in")]
    NotAuthenticated,

    /// The server returned a non-2xx status other than 401/404.
    #[error("HTTP {status}: {body}")]
    HttpError { status: u16, body: String },

    /// The response body could not be deserialized into the expected type.
    #[error("deserialization failed: {0}")]
    DeserializationError(String),

    /// The request payload could not be serialized to JSON.
    #[error("serialization failed: {0}")]
    SerializationError(String),

    /// No response was received.
    #[error("transport failed: {0}")]
    Transport(String),

    /// The session store could not be read or written.
    #[error("session storage failed: {0}")]
    Storage(String),

    #[error("index {index} out of range for list of {len}")]
    IndexOutOfRange { index: usize, len: usize },
}

impl ApiError {
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport(message.into())
    }

    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage(message.into())
    }
}
