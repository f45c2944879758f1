use chrono::{DateTime, NaiveDate, Utc};
use domain::{Priority, Todo};
use lambda_http::{Body, Response};
use serde::{Deserialize, Serialize};

use crate::error::ApiError;

/// API レスポンス用の ToDo 表現。
/// `is_overdue` は保存されず、返却のたびに導出される。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TodoView {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    pub completed: bool,
    pub priority: Priority,
    pub due_date: Option<NaiveDate>,
    pub due_datetime: Option<DateTime<Utc>>,
    pub is_overdue: bool,
    pub reminder_sent: bool,
    pub followup_email_sent: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TodoView {
    pub fn from_todo(todo: &Todo, now: DateTime<Utc>) -> Self {
        Self {
            id: todo.id.to_string(),
            title: todo.title.clone(),
            description: todo.description.clone(),
            completed: todo.completed,
            priority: todo.priority,
            due_date: todo.due_date,
            due_datetime: todo.due_datetime,
            is_overdue: todo.is_overdue(now),
            reminder_sent: todo.reminder_sent,
            followup_email_sent: todo.followup_email_sent,
            created_at: todo.created_at,
            updated_at: todo.updated_at,
        }
    }
}

pub fn json_response(status: u16, body: &impl Serialize) -> Result<Response<Body>, ApiError> {
    let json = serde_json::to_string(body).map_err(|e| ApiError::Internal(e.to_string()))?;
    Ok(Response::builder()
        .status(status)
        .header("Content-Type", "application/json")
        .body(Body::from(json))
        .unwrap())
}

pub fn empty_response(status: u16) -> Result<Response<Body>, ApiError> {
    Ok(Response::builder().status(status).body(Body::Empty).unwrap())
}
