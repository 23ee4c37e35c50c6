//! Stateful controller mirroring the remote todo list.
//!
//! # Design
//! `TodoController` owns the cached list, the single-item edit state and the
//! session context. Every network round-trip goes through the injected
//! [`Transport`]; request shapes come from the stateless [`TodoClient`].
//!
//! Updates are optimistic where the product wants them to be: `toggle` flips
//! locally whatever the server says, and `reorder` moves the item before the
//! request is sent and never rolls back. Local and remote order may therefore
//! diverge until the next `load`.

use tracing::{debug, info, warn};

use crate::client::TodoClient;
use crate::error::ApiError;
use crate::http::{HttpRequest, HttpResponse, Transport};
use crate::session::{AuthToken, Session, SessionContext};
use crate::types::{CreateTodo, Credentials, Todo, UpdateTodo};

/// Which screen the shell should show.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    Unauthenticated,
    Authenticated,
}

/// The item currently being edited and its draft text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditState {
    pub id: String,
    pub text: String,
}

pub struct TodoController<T> {
    client: TodoClient,
    transport: T,
    session: SessionContext,
    todos: Vec<Todo>,
    edit: Option<EditState>,
}

impl<T: Transport> TodoController<T> {
    pub fn new(client: TodoClient, transport: T, session: SessionContext) -> Self {
        Self {
            client,
            transport,
            session,
            todos: Vec::new(),
            edit: None,
        }
    }

    pub fn view(&self) -> View {
        if self.session.is_active() {
            View::Authenticated
        } else {
            View::Unauthenticated
        }
    }

    pub fn todos(&self) -> &[Todo] {
        &self.todos
    }

    pub fn edit_state(&self) -> Option<&EditState> {
        self.edit.as_ref()
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.current()
    }

    // -----------------------------------------------------------------------
    // Session
    // -----------------------------------------------------------------------

    pub fn register(&self, username: &str, password: &str) -> Result<(), ApiError> {
        let request = self.client.build_register(&credentials(username, password))?;
        self.client.parse_register(self.send(request)?)?;
        info!(username, "registered");
        Ok(())
    }

    /// Log in, persist the session and fetch the list once.
    pub fn login(&mut self, username: &str, password: &str) -> Result<(), ApiError> {
        let request = self.client.build_login(&credentials(username, password))?;
        let login = self.client.parse_login(self.send(request)?)?;

        self.todos.clear();
        self.edit = None;
        self.session.begin(Session {
            username: username.to_string(),
            token: AuthToken::new(login.token),
        })?;
        info!(username, "logged in");

        self.load()
    }

    /// Adopt a previously persisted session and load its list.
    ///
    /// Returns `Ok(false)` when the store holds no session.
    pub fn resume(&mut self) -> Result<bool, ApiError> {
        if !self.session.restore()? {
            return Ok(false);
        }
        self.load()?;
        Ok(true)
    }

    pub fn logout(&mut self) -> Result<(), ApiError> {
        self.todos.clear();
        self.edit = None;
        if let Some(session) = self.session.current() {
            info!(username = %session.username, "logged out");
        }
        self.session.end()
    }

    // -----------------------------------------------------------------------
    // List
    // -----------------------------------------------------------------------

    /// Replace the local cache with the server's list.
    ///
    /// Any failure is treated as an expired session: the session and the
    /// cache are dropped and the error is returned.
    pub fn load(&mut self) -> Result<(), ApiError> {
        let token = self.token()?;
        let request = self.client.build_list_todos(&token);
        let fetched = self
            .send(request)
            .and_then(|response| self.client.parse_list_todos(response));

        match fetched {
            Ok(todos) => {
                info!(count = todos.len(), "list loaded");
                self.todos = todos;
                Ok(())
            }
            Err(err) => {
                warn!(error = %err, "list fetch failed, ending session");
                if let Err(store_err) = self.logout() {
                    warn!(error = %store_err, "could not clear stored session");
                }
                Err(err)
            }
        }
    }

    /// Create a todo. Blank text is ignored without contacting the server.
    pub fn add(&mut self, text: &str) -> Result<Option<Todo>, ApiError> {
        if text.trim().is_empty() {
            return Ok(None);
        }
        let token = self.token()?;
        let input = CreateTodo {
            text: text.to_string(),
            completed: false,
        };
        let request = self.client.build_create_todo(&token, &input)?;
        let created = self.client.parse_create_todo(self.send(request)?)?;
        self.todos.push(created.clone());
        Ok(Some(created))
    }

    /// Flip `completed` on the server, then locally.
    ///
    /// The local flip is applied even if the request fails; the request's
    /// error is still returned.
    pub fn toggle(&mut self, id: &str) -> Result<(), ApiError> {
        let token = self.token()?;
        let flipped = !self.find(id).ok_or(ApiError::NotFound)?.completed;

        let request = self
            .client
            .build_update_todo(&token, id, &UpdateTodo::completed(flipped))?;
        let result = self
            .send(request)
            .and_then(|response| self.client.parse_update_todo(response));

        if let Some(todo) = self.todos.iter_mut().find(|t| t.id == id) {
            todo.completed = flipped;
        }
        if let Err(err) = &result {
            warn!(id, error = %err, "toggle not confirmed by server");
        }
        result
    }

    pub fn remove(&mut self, id: &str) -> Result<(), ApiError> {
        let token = self.token()?;
        let request = self.client.build_delete_todo(&token, id);
        self.client.parse_delete_todo(self.send(request)?)?;

        if let Some(index) = self.todos.iter().position(|t| t.id == id) {
            self.todos.remove(index);
        }
        if self.edit.as_ref().is_some_and(|e| e.id == id) {
            self.edit = None;
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Editing
    // -----------------------------------------------------------------------

    /// Enter edit mode for `id`, replacing any edit already in progress.
    pub fn start_edit(&mut self, id: &str, current_text: &str) {
        self.edit = Some(EditState {
            id: id.to_string(),
            text: current_text.to_string(),
        });
    }

    pub fn set_edit_text(&mut self, text: &str) {
        if let Some(edit) = self.edit.as_mut() {
            edit.text = text.to_string();
        }
    }

    pub fn cancel_edit(&mut self) {
        self.edit = None;
    }

    /// Send the draft text for `id` and leave edit mode.
    ///
    /// Returns `Ok(false)` without sending anything when no edit is in
    /// progress or the draft is blank; the edit state is kept in that case.
    pub fn save(&mut self, id: &str) -> Result<bool, ApiError> {
        let text = match &self.edit {
            Some(edit) if !edit.text.trim().is_empty() => edit.text.clone(),
            _ => return Ok(false),
        };
        let token = self.token()?;
        let request = self
            .client
            .build_update_todo(&token, id, &UpdateTodo::text(text.clone()))?;
        self.client.parse_update_todo(self.send(request)?)?;

        if let Some(todo) = self.todos.iter_mut().find(|t| t.id == id) {
            todo.text = text;
        }
        self.edit = None;
        Ok(true)
    }

    // -----------------------------------------------------------------------
    // Ordering
    // -----------------------------------------------------------------------

    /// Move the item at `source` to `dest` locally, then persist the whole
    /// list.
    ///
    /// Returns `Ok(true)` when the server acknowledged the new order and
    /// `Ok(false)` when persisting failed. A failure is logged and the local
    /// order is kept.
    pub fn reorder(&mut self, source: usize, dest: usize) -> Result<bool, ApiError> {
        let token = self.token()?;
        move_item(&mut self.todos, source, dest)?;

        let persisted = self
            .client
            .build_reorder_todos(&token, &self.todos)
            .and_then(|request| self.send(request))
            .and_then(|response| self.client.parse_reorder_todos(response));

        match persisted {
            Ok(()) => Ok(true),
            Err(err) => {
                warn!(source, dest, error = %err, "reorder not persisted, keeping local order");
                Ok(false)
            }
        }
    }

    fn find(&self, id: &str) -> Option<&Todo> {
        self.todos.iter().find(|t| t.id == id)
    }

    fn token(&self) -> Result<String, ApiError> {
        self.session
            .token()
            .map(|t| t.as_str().to_string())
            .ok_or(ApiError::NotAuthenticated)
    }

    fn send(&self, request: HttpRequest) -> Result<HttpResponse, ApiError> {
        debug!(method = request.method.as_str(), path = %request.path, "sending request");
        let response = self.transport.execute(request)?;
        debug!(status = response.status, "received response");
        Ok(response)
    }
}

/// Remove the element at `source` and reinsert it at `dest`.
pub fn move_item<I>(items: &mut Vec<I>, source: usize, dest: usize) -> Result<(), ApiError> {
    let len = items.len();
    for index in [source, dest] {
        if index >= len {
            return Err(ApiError::IndexOutOfRange { index, len });
        }
    }
    let item = items.remove(source);
    items.insert(dest, item);
    Ok(())
}

fn credentials(username: &str, password: &str) -> Credentials {
    Credentials {
        username: username.to_string(),
        password: password.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::mock::ScriptedTransport;
    use crate::http::HttpMethod;
    use crate::session::{MemorySessionStore, SessionStore};

    const LIST: &str = r#"[
        {"_id":"a","text":"alpha","completed":false},
        {"_id":"b","text":"bravo","completed":false},
        {"_id":"c","text":"charlie","completed":true}
    ]"#;

    fn stored_session() -> Session {
        Session {
            username: "ann".to_string(),
            token: AuthToken::new("tok-123"),
        }
    }

    fn controller(transport: &ScriptedTransport, store: MemorySessionStore) -> TodoController<&ScriptedTransport> {
        TodoController::new(
            TodoClient::new("http://api.test"),
            transport,
            SessionContext::new(store),
        )
    }

    /// Controller resumed from a stored session with `LIST` loaded.
    fn loaded(transport: &ScriptedTransport) -> (TodoController<&ScriptedTransport>, MemorySessionStore) {
        let store = MemorySessionStore::with_session(stored_session());
        transport.respond(200, LIST);
        let mut c = controller(transport, store.clone());
        assert!(c.resume().unwrap());
        (c, store)
    }

    fn ids<T: Transport>(c: &TodoController<T>) -> Vec<&str> {
        c.todos().iter().map(|t| t.id.as_str()).collect()
    }

    // --- session ---

    #[test]
    fn login_persists_token_and_loads_once() {
        let transport = ScriptedTransport::new();
        transport.respond(200, r#"{"token":"fresh"}"#).respond(200, LIST);
        let store = MemorySessionStore::new();
        let mut c = controller(&transport, store.clone());

        c.login("ann", "pw").unwrap();

        assert_eq!(c.view(), View::Authenticated);
        assert_eq!(store.load().unwrap().unwrap().token.as_str(), "fresh");
        let list_fetches = transport
            .requests()
            .iter()
            .filter(|r| r.method == HttpMethod::Get && r.path.ends_with("/todos"))
            .count();
        assert_eq!(list_fetches, 1);
        assert_eq!(transport.requests()[1].header("authorization"), Some("Bearer fresh"));
        assert_eq!(ids(&c), ["a", "b", "c"]);
    }

    #[test]
    fn rejected_login_stays_unauthenticated() {
        let transport = ScriptedTransport::new();
        transport.respond(401, "bad credentials");
        let store = MemorySessionStore::new();
        let mut c = controller(&transport, store.clone());

        let err = c.login("ann", "wrong").unwrap_err();

        assert!(matches!(err, ApiError::Unauthorized));
        assert_eq!(c.view(), View::Unauthenticated);
        assert!(store.load().unwrap().is_none());
        assert_eq!(transport.request_count(), 1);
    }

    #[test]
    fn register_changes_no_local_state() {
        let transport = ScriptedTransport::new();
        transport.respond(201, r#"{"message":"User registered"}"#);
        let c = controller(&transport, MemorySessionStore::new());

        c.register("ann", "pw").unwrap();

        assert_eq!(c.view(), View::Unauthenticated);
        assert!(c.todos().is_empty());
        assert!(transport.requests()[0].path.ends_with("/register"));
    }

    #[test]
    fn logout_clears_session_list_and_edit() {
        let transport = ScriptedTransport::new();
        let (mut c, store) = loaded(&transport);
        c.start_edit("a", "alpha");

        c.logout().unwrap();

        assert_eq!(c.view(), View::Unauthenticated);
        assert!(c.todos().is_empty());
        assert!(c.edit_state().is_none());
        assert!(store.load().unwrap().is_none());
    }

    #[test]
    fn resume_without_stored_session_sends_nothing() {
        let transport = ScriptedTransport::new();
        let mut c = controller(&transport, MemorySessionStore::new());
        assert!(!c.resume().unwrap());
        assert_eq!(transport.request_count(), 0);
    }

    #[test]
    fn unauthorized_list_fetch_ends_session() {
        let transport = ScriptedTransport::new();
        let (mut c, store) = loaded(&transport);
        transport.respond(401, "expired");

        let err = c.load().unwrap_err();

        assert!(matches!(err, ApiError::Unauthorized));
        assert_eq!(c.view(), View::Unauthenticated);
        assert!(c.todos().is_empty());
        assert!(store.load().unwrap().is_none());
    }

    #[test]
    fn any_failed_list_fetch_ends_session() {
        let transport = ScriptedTransport::new();
        let (mut c, store) = loaded(&transport);
        transport.fail("connection refused");

        assert!(c.load().is_err());
        assert_eq!(c.view(), View::Unauthenticated);
        assert!(store.load().unwrap().is_none());
    }

    #[test]
    fn operations_without_session_send_nothing() {
        let transport = ScriptedTransport::new();
        let mut c = controller(&transport, MemorySessionStore::new());

        assert!(matches!(c.load(), Err(ApiError::NotAuthenticated)));
        assert!(matches!(c.add("x"), Err(ApiError::NotAuthenticated)));
        assert!(matches!(c.remove("a"), Err(ApiError::NotAuthenticated)));
        assert!(matches!(c.reorder(0, 0), Err(ApiError::NotAuthenticated)));
        assert_eq!(transport.request_count(), 0);
    }

    // --- add ---

    #[test]
    fn blank_add_sends_nothing() {
        let transport = ScriptedTransport::new();
        let (mut c, _) = loaded(&transport);
        let before = transport.request_count();

        assert!(c.add("").unwrap().is_none());
        assert!(c.add("   \t\n").unwrap().is_none());

        assert_eq!(transport.request_count(), before);
        assert_eq!(ids(&c), ["a", "b", "c"]);
    }

    #[test]
    fn add_appends_server_representation() {
        let transport = ScriptedTransport::new();
        let (mut c, _) = loaded(&transport);
        transport.respond(201, r#"{"_id":"srv-9","text":"delta","completed":false}"#);

        let created = c.add("delta").unwrap().unwrap();

        assert_eq!(created.id, "srv-9");
        assert_eq!(ids(&c), ["a", "b", "c", "srv-9"]);
        let body: serde_json::Value =
            serde_json::from_str(transport.requests().last().unwrap().body.as_deref().unwrap()).unwrap();
        assert_eq!(body["text"], "delta");
        assert_eq!(body["completed"], false);
    }

    #[test]
    fn failed_add_leaves_list_unchanged() {
        let transport = ScriptedTransport::new();
        let (mut c, _) = loaded(&transport);
        transport.respond(500, "boom");

        assert!(c.add("delta").is_err());
        assert_eq!(ids(&c), ["a", "b", "c"]);
    }

    // --- toggle ---

    #[test]
    fn toggle_flips_only_target() {
        let transport = ScriptedTransport::new();
        let (mut c, _) = loaded(&transport);
        transport.respond(200, "{}");

        c.toggle("b").unwrap();

        let completed: Vec<bool> = c.todos().iter().map(|t| t.completed).collect();
        assert_eq!(completed, [false, true, true]);
        let body: serde_json::Value =
            serde_json::from_str(transport.requests().last().unwrap().body.as_deref().unwrap()).unwrap();
        assert_eq!(body, serde_json::json!({"completed": true}));
    }

    #[test]
    fn toggle_applies_locally_even_when_request_fails() {
        let transport = ScriptedTransport::new();
        let (mut c, _) = loaded(&transport);
        transport.respond(500, "boom");

        assert!(c.toggle("c").is_err());
        assert!(!c.todos()[2].completed);
        assert_eq!(c.view(), View::Authenticated);
    }

    #[test]
    fn toggle_unknown_id_sends_nothing() {
        let transport = ScriptedTransport::new();
        let (mut c, _) = loaded(&transport);
        let before = transport.request_count();

        assert!(matches!(c.toggle("zzz"), Err(ApiError::NotFound)));
        assert_eq!(transport.request_count(), before);
    }

    // --- remove ---

    #[test]
    fn remove_keeps_order_of_rest() {
        let transport = ScriptedTransport::new();
        let (mut c, _) = loaded(&transport);
        transport.respond(200, r#"{"message":"Todo deleted"}"#);

        c.remove("b").unwrap();

        assert_eq!(ids(&c), ["a", "c"]);
        let req = transport.requests().last().cloned().unwrap();
        assert_eq!(req.method, HttpMethod::Delete);
        assert_eq!(req.path, "http://api.test/todos/b");
    }

    #[test]
    fn failed_remove_keeps_item() {
        let transport = ScriptedTransport::new();
        let (mut c, _) = loaded(&transport);
        transport.respond(404, "");

        assert!(matches!(c.remove("b"), Err(ApiError::NotFound)));
        assert_eq!(ids(&c), ["a", "b", "c"]);
    }

    // --- edit ---

    #[test]
    fn start_edit_replaces_previous_edit() {
        let transport = ScriptedTransport::new();
        let (mut c, _) = loaded(&transport);

        c.start_edit("a", "alpha");
        c.start_edit("b", "bravo");

        assert_eq!(
            c.edit_state(),
            Some(&EditState {
                id: "b".to_string(),
                text: "bravo".to_string()
            })
        );
    }

    #[test]
    fn blank_save_is_noop_and_keeps_edit() {
        let transport = ScriptedTransport::new();
        let (mut c, _) = loaded(&transport);
        let before = transport.request_count();
        c.start_edit("a", "alpha");
        c.set_edit_text("  ");

        assert!(!c.save("a").unwrap());

        assert_eq!(transport.request_count(), before);
        assert_eq!(c.todos()[0].text, "alpha");
        assert!(c.edit_state().is_some());
    }

    #[test]
    fn save_without_edit_is_noop() {
        let transport = ScriptedTransport::new();
        let (mut c, _) = loaded(&transport);
        let before = transport.request_count();

        assert!(!c.save("a").unwrap());
        assert_eq!(transport.request_count(), before);
    }

    #[test]
    fn save_updates_text_and_clears_edit() {
        let transport = ScriptedTransport::new();
        let (mut c, _) = loaded(&transport);
        transport.respond(200, r#"{"_id":"a","text":"ALPHA","completed":false}"#);
        c.start_edit("a", "alpha");
        c.set_edit_text("ALPHA");

        assert!(c.save("a").unwrap());

        assert_eq!(c.todos()[0].text, "ALPHA");
        assert_eq!(c.todos()[1].text, "bravo");
        assert!(c.edit_state().is_none());
        let body: serde_json::Value =
            serde_json::from_str(transport.requests().last().unwrap().body.as_deref().unwrap()).unwrap();
        assert_eq!(body, serde_json::json!({"text": "ALPHA"}));
    }

    #[test]
    fn failed_save_keeps_edit_and_text() {
        let transport = ScriptedTransport::new();
        let (mut c, _) = loaded(&transport);
        transport.respond(500, "boom");
        c.start_edit("a", "new");

        assert!(c.save("a").is_err());
        assert_eq!(c.todos()[0].text, "alpha");
        assert!(c.edit_state().is_some());
    }

    // --- reorder ---

    #[test]
    fn reorder_moves_locally_and_persists_full_list() {
        let transport = ScriptedTransport::new();
        let (mut c, _) = loaded(&transport);
        transport.respond(200, r#"{"message":"ok"}"#);

        assert!(c.reorder(0, 2).unwrap());

        assert_eq!(ids(&c), ["b", "c", "a"]);
        let req = transport.requests().last().cloned().unwrap();
        assert_eq!(req.method, HttpMethod::Put);
        assert!(req.path.ends_with("/todos/reorder"));
        let body: serde_json::Value = serde_json::from_str(req.body.as_deref().unwrap()).unwrap();
        let sent: Vec<&str> = body["updatedTodos"]
            .as_array()
            .unwrap()
            .iter()
            .map(|t| t["_id"].as_str().unwrap())
            .collect();
        assert_eq!(sent, ["b", "c", "a"]);
    }

    #[test]
    fn reorder_failure_keeps_local_order() {
        let transport = ScriptedTransport::new();
        let (mut c, _) = loaded(&transport);
        transport.respond(500, "boom");

        assert!(!c.reorder(2, 0).unwrap());

        assert_eq!(ids(&c), ["c", "a", "b"]);
        assert_eq!(c.view(), View::Authenticated);
    }

    #[test]
    fn reorder_transport_failure_keeps_local_order() {
        let transport = ScriptedTransport::new();
        let (mut c, _) = loaded(&transport);
        transport.fail("reset by peer");

        assert!(!c.reorder(1, 0).unwrap());
        assert_eq!(ids(&c), ["b", "a", "c"]);
    }

    #[test]
    fn reorder_out_of_range_sends_nothing() {
        let transport = ScriptedTransport::new();
        let (mut c, _) = loaded(&transport);
        let before = transport.request_count();

        let err = c.reorder(0, 3).unwrap_err();

        assert!(matches!(err, ApiError::IndexOutOfRange { index: 3, len: 3 }));
        assert_eq!(ids(&c), ["a", "b", "c"]);
        assert_eq!(transport.request_count(), before);
    }

    #[test]
    fn move_item_matches_remove_then_insert() {
        let cases = [(0, 3), (3, 0), (1, 2), (2, 1), (2, 2)];
        for (source, dest) in cases {
            let mut moved = vec![10, 20, 30, 40];
            move_item(&mut moved, source, dest).unwrap();

            let mut expected = vec![10, 20, 30, 40];
            let item = expected.remove(source);
            expected.insert(dest, item);

            assert_eq!(moved, expected, "move {source} -> {dest}");
        }
    }

    #[test]
    fn move_item_rejects_empty_list() {
        let mut empty: Vec<u8> = Vec::new();
        assert!(matches!(
            move_item(&mut empty, 0, 0),
            Err(ApiError::IndexOutOfRange { index: 0, len: 0 })
        ));
    }
}
