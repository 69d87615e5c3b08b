use axum::{
    extract::State,
    http::StatusCode,
    middleware,
    routing::get,
    Json, Router,
};
use tracing::{info, instrument};
use uuid::Uuid;

use super::{
    dto::{CreateTodoRequest, UpdateTodoRequest},
    repo_types::{Todo, TodoChanges},
};
use crate::{
    auth::{require_session, SessionUser},
    error::{not_found, AppError},
    extract::{ApiJson, ApiPath},
    state::AppState,
};

/// Todo routes, all behind the session check. Mounted under `/api/todos`.
/// Unknown paths below the mount require a session too.
pub fn todo_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/", get(list_todos).post(create_todo))
        .route("/:id", get(get_todo).patch(update_todo).delete(delete_todo))
        .fallback(not_found)
        .layer(middleware::from_fn_with_state(state, require_session))
}

fn non_blank_title(title: Option<String>) -> Result<Option<String>, AppError> {
    match title.map(|t| t.trim().to_string()) {
        Some(t) if t.is_empty() => Err(AppError::Validation("Title must not be empty".into())),
        other => Ok(other),
    }
}

fn todo_not_found() -> AppError {
    AppError::NotFound("Todo not found".into())
}

#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn list_todos(
    State(state): State<AppState>,
    user: SessionUser,
) -> Result<Json<Vec<Todo>>, AppError> {
    Ok(Json(state.todos.list(user.id).await?))
}

#[instrument(skip(state, user, payload), fields(user_id = %user.id))]
pub async fn create_todo(
    State(state): State<AppState>,
    user: SessionUser,
    ApiJson(payload): ApiJson<CreateTodoRequest>,
) -> Result<(StatusCode, Json<Todo>), AppError> {
    let title = non_blank_title(payload.title)?
        .ok_or_else(|| AppError::Validation("Title is required".into()))?;
    let todo = state.todos.create(user.id, &title).await?;
    info!(todo_id = %todo.id, "todo created");
    Ok((StatusCode::CREATED, Json(todo)))
}

#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn get_todo(
    State(state): State<AppState>,
    user: SessionUser,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<Todo>, AppError> {
    state
        .todos
        .get(user.id, id)
        .await?
        .map(Json)
        .ok_or_else(todo_not_found)
}

#[instrument(skip(state, user, payload), fields(user_id = %user.id))]
pub async fn update_todo(
    State(state): State<AppState>,
    user: SessionUser,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(payload): ApiJson<UpdateTodoRequest>,
) -> Result<Json<Todo>, AppError> {
    let changes = TodoChanges {
        title: non_blank_title(payload.title)?,
        completed: payload.completed,
    };
    state
        .todos
        .update(user.id, id, changes)
        .await?
        .map(Json)
        .ok_or_else(todo_not_found)
}

#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn delete_todo(
    State(state): State<AppState>,
    user: SessionUser,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<StatusCode, AppError> {
    if state.todos.delete(user.id, id).await? {
        info!(todo_id = %id, "todo deleted");
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(todo_not_found())
    }
}
