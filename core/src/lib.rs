//! Client core for the todo service.
//!
//! # Overview
//! Builds `HttpRequest` values and parses `HttpResponse` values without
//! touching the network (host-does-IO pattern). On top of that sits
//! `TodoController`, which mirrors the remote list, tracks the session and the
//! single-item edit state, and applies optimistic updates.
//!
//! # Design
//! - `TodoClient` is stateless; it holds only `base_url`.
//! - Each endpoint is split into `build_*` and `parse_*`, so the I/O boundary
//!   is explicit. The controller crosses it through the `Transport` trait.
//! - The session is an explicit `SessionContext` passed in at construction,
//!   backed by a host-provided `SessionStore`.
//! - DTOs are defined independently from the mock-server crate; integration
//!   tests catch schema drift.

pub mod client;
pub mod controller;
pub mod error;
pub mod http;
pub mod session;
pub mod types;

pub use client::TodoClient;
pub use controller::{move_item, EditState, TodoController, View};
pub use error::ApiError;
pub use http::{HttpMethod, HttpRequest, HttpResponse, Transport};
pub use session::{AuthToken, MemorySessionStore, Session, SessionContext, SessionStore};
pub use types::{CreateTodo, Credentials, LoginResponse, ReorderTodos, Todo, UpdateTodo};
