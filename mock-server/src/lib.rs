use std::{collections::HashMap, sync::Arc};

use axum::{
    extract::{FromRequestParts, Path, State},
    http::{header::AUTHORIZATION, request::Parts, StatusCode},
    routing::{get, post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tokio::{net::TcpListener, sync::RwLock};
use tracing::{debug, info};
use uuid::Uuid;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Todo {
    #[serde(rename = "_id")]
    pub id: String,
    pub text: String,
    pub completed: bool,
}

#[derive(Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LoginResponse {
    pub token: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Message {
    pub message: String,
}

#[derive(Deserialize)]
pub struct CreateTodo {
    pub text: String,
    #[serde(default)]
    pub completed: bool,
}

#[derive(Deserialize)]
pub struct UpdateTodo {
    pub text: Option<String>,
    pub completed: Option<bool>,
}

/// Only the ids of `updatedTodos` matter; other fields are ignored.
#[derive(Deserialize)]
pub struct ReorderTodos {
    #[serde(rename = "updatedTodos")]
    pub updated_todos: Vec<TodoRef>,
}

#[derive(Deserialize)]
pub struct TodoRef {
    #[serde(rename = "_id")]
    pub id: String,
}

#[derive(Default)]
pub struct Store {
    passwords: HashMap<String, String>,
    sessions: HashMap<String, String>,
    todos: HashMap<String, Vec<Todo>>,
}

pub type Db = Arc<RwLock<Store>>;

/// Username behind a valid `Authorization: Bearer` header.
pub struct AuthUser(pub String);

impl FromRequestParts<Db> for AuthUser {
    type Rejection = StatusCode;

    async fn from_request_parts(parts: &mut Parts, db: &Db) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .map(str::to_owned)
            .ok_or(StatusCode::UNAUTHORIZED)?;
        let store = db.read().await;
        store
            .sessions
            .get(&token)
            .cloned()
            .map(AuthUser)
            .ok_or(StatusCode::UNAUTHORIZED)
    }
}

pub fn app() -> Router {
    let db = Db::default();
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/todos", get(list_todos).post(create_todo))
        .route("/todos/reorder", put(reorder_todos))
        .route("/todos/{id}", put(update_todo).delete(delete_todo))
        .with_state(db)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

fn message(text: &str) -> Json<Message> {
    Json(Message {
        message: text.to_string(),
    })
}

async fn register(
    State(db): State<Db>,
    Json(input): Json<Credentials>,
) -> Result<(StatusCode, Json<Message>), StatusCode> {
    if input.username.trim().is_empty() || input.password.is_empty() {
        return Err(StatusCode::BAD_REQUEST);
    }
    let mut store = db.write().await;
    if store.passwords.contains_key(&input.username) {
        return Err(StatusCode::CONFLICT);
    }
    info!(username = %input.username, "user registered");
    store.passwords.insert(input.username, input.password);
    Ok((StatusCode::CREATED, message("User registered")))
}

async fn login(
    State(db): State<Db>,
    Json(input): Json<Credentials>,
) -> Result<Json<LoginResponse>, StatusCode> {
    let mut store = db.write().await;
    match store.passwords.get(&input.username) {
        Some(password) if *password == input.password => {}
        _ => return Err(StatusCode::UNAUTHORIZED),
    }
    let token = Uuid::new_v4().simple().to_string();
    store.sessions.insert(token.clone(), input.username.clone());
    info!(username = %input.username, "session issued");
    Ok(Json(LoginResponse { token }))
}

async fn list_todos(AuthUser(user): AuthUser, State(db): State<Db>) -> Json<Vec<Todo>> {
    let store = db.read().await;
    Json(store.todos.get(&user).cloned().unwrap_or_default())
}

async fn create_todo(
    AuthUser(user): AuthUser,
    State(db): State<Db>,
    Json(input): Json<CreateTodo>,
) -> Result<(StatusCode, Json<Todo>), StatusCode> {
    if input.text.trim().is_empty() {
        return Err(StatusCode::BAD_REQUEST);
    }
    let todo = Todo {
        id: Uuid::new_v4().simple().to_string(),
        text: input.text,
        completed: input.completed,
    };
    debug!(%user, id = %todo.id, "todo created");
    db.write().await.todos.entry(user).or_default().push(todo.clone());
    Ok((StatusCode::CREATED, Json(todo)))
}

async fn update_todo(
    AuthUser(user): AuthUser,
    State(db): State<Db>,
    Path(id): Path<String>,
    Json(input): Json<UpdateTodo>,
) -> Result<Json<Todo>, StatusCode> {
    let mut store = db.write().await;
    let todo = store
        .todos
        .get_mut(&user)
        .and_then(|todos| todos.iter_mut().find(|t| t.id == id))
        .ok_or(StatusCode::NOT_FOUND)?;
    if let Some(text) = input.text {
        todo.text = text;
    }
    if let Some(completed) = input.completed {
        todo.completed = completed;
    }
    Ok(Json(todo.clone()))
}

async fn delete_todo(
    AuthUser(user): AuthUser,
    State(db): State<Db>,
    Path(id): Path<String>,
) -> Result<Json<Message>, StatusCode> {
    let mut store = db.write().await;
    let todos = store.todos.get_mut(&user).ok_or(StatusCode::NOT_FOUND)?;
    let index = todos.iter().position(|t| t.id == id).ok_or(StatusCode::NOT_FOUND)?;
    todos.remove(index);
    debug!(%user, %id, "todo deleted");
    Ok(message("Todo deleted"))
}

/// Rewrite the user's order from `updatedTodos`. Unknown ids are skipped and
/// items the body does not mention keep their relative order at the end.
async fn reorder_todos(
    AuthUser(user): AuthUser,
    State(db): State<Db>,
    Json(input): Json<ReorderTodos>,
) -> Json<Message> {
    let mut store = db.write().await;
    let todos = store.todos.entry(user).or_default();
    let mut reordered = Vec::with_capacity(todos.len());
    for wanted in input.updated_todos {
        if let Some(index) = todos.iter().position(|t| t.id == wanted.id) {
            reordered.push(todos.remove(index));
        }
    }
    reordered.append(todos);
    *todos = reordered;
    message("Todos reordered")
}
