use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use domain::{Todo, TodoId};
use shared::AppError;

use crate::directory::{UserDirectory, UserProfile};
use crate::store::TodoStore;

/// 開発・テスト用のインメモリ実装。
/// 単一の Mutex 配下で各操作が原子的に行われる。
#[derive(Default)]
pub struct InMemoryTodoStore {
    todos: Mutex<HashMap<(String, String), Todo>>,
}

impl InMemoryTodoStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn key(owner_id: &str, todo_id: &TodoId) -> (String, String) {
        (owner_id.to_string(), todo_id.to_string())
    }
}

#[async_trait]
impl TodoStore for InMemoryTodoStore {
    async fn insert(&self, todo: &Todo) -> Result<(), AppError> {
        let mut todos = self.todos.lock().unwrap();
        let key = Self::key(&todo.owner_id, &todo.id);
        if todos.contains_key(&key) {
            return Err(AppError::ConcurrentModification);
        }
        todos.insert(key, todo.clone());
        Ok(())
    }

    async fn get(&self, owner_id: &str, todo_id: &TodoId) -> Result<Option<Todo>, AppError> {
        let todos = self.todos.lock().unwrap();
        Ok(todos.get(&Self::key(owner_id, todo_id)).cloned())
    }

    async fn list_for_owner(&self, owner_id: &str) -> Result<Vec<Todo>, AppError> {
        let todos = self.todos.lock().unwrap();
        Ok(todos
            .values()
            .filter(|todo| todo.owner_id == owner_id)
            .cloned()
            .collect())
    }

    async fn replace(
        &self,
        todo: &Todo,
        expected_updated_at: DateTime<Utc>,
    ) -> Result<(), AppError> {
        let mut todos = self.todos.lock().unwrap();
        let key = Self::key(&todo.owner_id, &todo.id);
        match todos.get(&key) {
            Some(current) if current.updated_at == expected_updated_at => {
                todos.insert(key, todo.clone());
                Ok(())
            }
            Some(_) | None => Err(AppError::ConcurrentModification),
        }
    }

    async fn delete(&self, owner_id: &str, todo_id: &TodoId) -> Result<(), AppError> {
        let mut todos = self.todos.lock().unwrap();
        todos
            .remove(&Self::key(owner_id, todo_id))
            .map(|_| ())
            .ok_or_else(|| AppError::NotFound(todo_id.to_string()))
    }

    async fn scan_reminder_candidates(&self) -> Result<Vec<Todo>, AppError> {
        let todos = self.todos.lock().unwrap();
        Ok(todos
            .values()
            .filter(|todo| !todo.completed && !todo.reminder_sent && todo.due_datetime.is_some())
            .cloned()
            .collect())
    }

    async fn scan_followup_candidates(&self) -> Result<Vec<Todo>, AppError> {
        let todos = self.todos.lock().unwrap();
        Ok(todos
            .values()
            .filter(|todo| !todo.completed && todo.reminder_sent && !todo.followup_email_sent)
            .cloned()
            .collect())
    }

    async fn mark_reminder_sent(
        &self,
        owner_id: &str,
        todo_id: &TodoId,
        now: DateTime<Utc>,
    ) -> Result<bool, AppError> {
        let mut todos = self.todos.lock().unwrap();
        match todos.get_mut(&Self::key(owner_id, todo_id)) {
            Some(todo)
                if !todo.reminder_sent && !todo.completed && todo.due_datetime.is_some() =>
            {
                todo.reminder_sent = true;
                todo.updated_at = now;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn mark_followup_sent(
        &self,
        owner_id: &str,
        todo_id: &TodoId,
        now: DateTime<Utc>,
    ) -> Result<bool, AppError> {
        let mut todos = self.todos.lock().unwrap();
        match todos.get_mut(&Self::key(owner_id, todo_id)) {
            Some(todo) if todo.reminder_sent && !todo.followup_email_sent && !todo.completed => {
                todo.followup_email_sent = true;
                todo.updated_at = now;
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

/// 開発・テスト用のインメモリユーザーディレクトリ
#[derive(Default)]
pub struct InMemoryUserDirectory {
    profiles: Mutex<HashMap<String, UserProfile>>,
}

impl InMemoryUserDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, profile: UserProfile) {
        let mut profiles = self.profiles.lock().unwrap();
        profiles.insert(profile.user_id.clone(), profile);
    }
}

#[async_trait]
impl UserDirectory for InMemoryUserDirectory {
    async fn lookup(&self, user_id: &str) -> Result<Option<UserProfile>, AppError> {
        let profiles = self.profiles.lock().unwrap();
        Ok(profiles.get(user_id).cloned())
    }
}
