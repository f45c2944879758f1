use chrono::Utc;
use domain::{apply_filters, Todo, TodoDraft, TodoFilters, TodoId, TodoPatch, TodoStats};
use lambda_http::{Body, Response};
use tracing::info;

use crate::error::ApiError;
use crate::responses::{empty_response, json_response, TodoView};
use crate::AppState;

/// 所有者の ToDo 一覧を絞り込み・並び替えつきで返す
pub async fn list_todos(
    state: &AppState,
    owner_id: &str,
    filters: TodoFilters,
) -> Result<Response<Body>, ApiError> {
    let todos = state.store.list_for_owner(owner_id).await?;
    let todos = apply_filters(todos, &filters);

    let now = Utc::now();
    let views: Vec<TodoView> = todos
        .iter()
        .map(|todo| TodoView::from_todo(todo, now))
        .collect();
    json_response(200, &views)
}

pub async fn create_todo(
    state: &AppState,
    owner_id: &str,
    draft: TodoDraft,
) -> Result<Response<Body>, ApiError> {
    let now = Utc::now();
    let todo = Todo::create(owner_id, draft, now)?;
    state.store.insert(&todo).await?;

    info!(todo_id = %todo.id, "todo created");
    json_response(201, &TodoView::from_todo(&todo, now))
}

pub async fn get_todo(
    state: &AppState,
    owner_id: &str,
    todo_id: &TodoId,
) -> Result<Response<Body>, ApiError> {
    let todo = state
        .store
        .get(owner_id, todo_id)
        .await?
        .ok_or(ApiError::NotFound)?;
    json_response(200, &TodoView::from_todo(&todo, Utc::now()))
}

/// 全項目更新（PUT）。タイトルは必須、省略された任意項目は変更されない。
pub async fn update_todo(
    state: &AppState,
    owner_id: &str,
    todo_id: &TodoId,
    draft: TodoDraft,
) -> Result<Response<Body>, ApiError> {
    apply_update(state, owner_id, todo_id, TodoPatch::from(draft)).await
}

/// 部分更新（PATCH）
pub async fn patch_todo(
    state: &AppState,
    owner_id: &str,
    todo_id: &TodoId,
    patch: TodoPatch,
) -> Result<Response<Body>, ApiError> {
    apply_update(state, owner_id, todo_id, patch).await
}

async fn apply_update(
    state: &AppState,
    owner_id: &str,
    todo_id: &TodoId,
    patch: TodoPatch,
) -> Result<Response<Body>, ApiError> {
    let current = state
        .store
        .get(owner_id, todo_id)
        .await?
        .ok_or(ApiError::NotFound)?;

    let now = Utc::now();
    let updated = current.apply_patch(patch, now)?;
    state.store.replace(&updated, current.updated_at).await?;

    json_response(200, &TodoView::from_todo(&updated, now))
}

/// 完了状態の反転。読み取り時点の updated_at を条件に CAS で書き込む。
pub async fn toggle_complete(
    state: &AppState,
    owner_id: &str,
    todo_id: &TodoId,
) -> Result<Response<Body>, ApiError> {
    let current = state
        .store
        .get(owner_id, todo_id)
        .await?
        .ok_or(ApiError::NotFound)?;

    let now = Utc::now();
    let toggled = current.toggled(now);
    state.store.replace(&toggled, current.updated_at).await?;

    info!(todo_id = %todo_id, completed = toggled.completed, "todo toggled");
    json_response(200, &TodoView::from_todo(&toggled, now))
}

pub async fn delete_todo(
    state: &AppState,
    owner_id: &str,
    todo_id: &TodoId,
) -> Result<Response<Body>, ApiError> {
    state.store.delete(owner_id, todo_id).await?;
    info!(todo_id = %todo_id, "todo deleted");
    empty_response(204)
}

pub async fn todo_stats(state: &AppState, owner_id: &str) -> Result<Response<Body>, ApiError> {
    let todos = state.store.list_for_owner(owner_id).await?;
    let stats = TodoStats::collect(&todos);
    json_response(200, &stats)
}
