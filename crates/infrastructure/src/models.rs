use std::collections::HashMap;

use aws_sdk_dynamodb::types::AttributeValue;
use chrono::{DateTime, NaiveDate, Utc};
use domain::{Priority, Todo, TodoId};
use shared::AppError;

use crate::directory::UserProfile;

/// DynamoDB アイテムのエンティティタイプ
pub const ENTITY_TODO: &str = "Todo";
pub const ENTITY_PROFILE: &str = "UserProfile";

/// Single Table Design のキー構造。
/// 所有者パーティション（PK = USER#{owner_id}）がそのまま
/// 「所有者の全 ToDo」を引くためのインデックスになる。
#[derive(Debug, Clone)]
pub struct ItemKeys {
    pub pk: String,
    pub sk: String,
}

impl ItemKeys {
    pub fn for_todo(owner_id: &str, todo_id: &TodoId) -> Self {
        Self {
            pk: format!("USER#{owner_id}"),
            sk: format!("TODO#{todo_id}"),
        }
    }

    pub fn for_profile(user_id: &str) -> Self {
        Self {
            pk: format!("USER#{user_id}"),
            sk: "PROFILE".to_string(),
        }
    }
}

/// Todo を DynamoDB アイテムへ変換する
pub fn todo_to_item(todo: &Todo) -> HashMap<String, AttributeValue> {
    let keys = ItemKeys::for_todo(&todo.owner_id, &todo.id);
    let mut item = HashMap::new();
    item.insert("PK".to_string(), AttributeValue::S(keys.pk));
    item.insert("SK".to_string(), AttributeValue::S(keys.sk));
    item.insert(
        "EntityType".to_string(),
        AttributeValue::S(ENTITY_TODO.to_string()),
    );
    item.insert("id".to_string(), AttributeValue::S(todo.id.to_string()));
    item.insert(
        "owner_id".to_string(),
        AttributeValue::S(todo.owner_id.clone()),
    );
    item.insert("title".to_string(), AttributeValue::S(todo.title.clone()));
    if let Some(description) = &todo.description {
        item.insert(
            "description".to_string(),
            AttributeValue::S(description.clone()),
        );
    }
    item.insert("completed".to_string(), AttributeValue::Bool(todo.completed));
    item.insert(
        "priority".to_string(),
        AttributeValue::S(todo.priority.as_str().to_string()),
    );
    if let Some(due_date) = todo.due_date {
        item.insert(
            "due_date".to_string(),
            AttributeValue::S(due_date.to_string()),
        );
    }
    if let Some(due_datetime) = todo.due_datetime {
        item.insert(
            "due_datetime".to_string(),
            AttributeValue::S(due_datetime.to_rfc3339()),
        );
    }
    item.insert(
        "reminder_sent".to_string(),
        AttributeValue::Bool(todo.reminder_sent),
    );
    item.insert(
        "followup_email_sent".to_string(),
        AttributeValue::Bool(todo.followup_email_sent),
    );
    item.insert(
        "created_at".to_string(),
        AttributeValue::S(todo.created_at.to_rfc3339()),
    );
    item.insert(
        "updated_at".to_string(),
        AttributeValue::S(todo.updated_at.to_rfc3339()),
    );
    item
}

/// DynamoDB アイテムを Todo へ変換する
pub fn todo_from_item(item: &HashMap<String, AttributeValue>) -> Result<Todo, AppError> {
    Ok(Todo {
        id: TodoId::from_string(string_attr(item, "id")?),
        owner_id: string_attr(item, "owner_id")?,
        title: string_attr(item, "title")?,
        description: optional_string_attr(item, "description"),
        completed: bool_attr(item, "completed")?,
        priority: string_attr(item, "priority")?
            .parse::<Priority>()
            .map_err(|e| AppError::Deserialization(e.to_string()))?,
        due_date: optional_string_attr(item, "due_date")
            .map(|raw| raw.parse::<NaiveDate>())
            .transpose()
            .map_err(|e| AppError::Deserialization(format!("due_date: {e}")))?,
        due_datetime: optional_string_attr(item, "due_datetime")
            .map(|raw| parse_instant("due_datetime", &raw))
            .transpose()?,
        reminder_sent: bool_attr(item, "reminder_sent")?,
        followup_email_sent: bool_attr(item, "followup_email_sent")?,
        created_at: parse_instant("created_at", &string_attr(item, "created_at")?)?,
        updated_at: parse_instant("updated_at", &string_attr(item, "updated_at")?)?,
    })
}

/// UserProfile を DynamoDB アイテムへ変換する
pub fn profile_to_item(profile: &UserProfile) -> HashMap<String, AttributeValue> {
    let keys = ItemKeys::for_profile(&profile.user_id);
    let mut item = HashMap::new();
    item.insert("PK".to_string(), AttributeValue::S(keys.pk));
    item.insert("SK".to_string(), AttributeValue::S(keys.sk));
    item.insert(
        "EntityType".to_string(),
        AttributeValue::S(ENTITY_PROFILE.to_string()),
    );
    item.insert(
        "user_id".to_string(),
        AttributeValue::S(profile.user_id.clone()),
    );
    item.insert("email".to_string(), AttributeValue::S(profile.email.clone()));
    item.insert(
        "display_name".to_string(),
        AttributeValue::S(profile.display_name.clone()),
    );
    item
}

/// DynamoDB アイテムを UserProfile へ変換する
pub fn profile_from_item(item: &HashMap<String, AttributeValue>) -> Result<UserProfile, AppError> {
    Ok(UserProfile {
        user_id: string_attr(item, "user_id")?,
        email: string_attr(item, "email")?,
        display_name: string_attr(item, "display_name")?,
    })
}

fn string_attr(item: &HashMap<String, AttributeValue>, name: &str) -> Result<String, AppError> {
    item.get(name)
        .and_then(|value| value.as_s().ok())
        .cloned()
        .ok_or_else(|| AppError::Deserialization(format!("missing string attribute: {name}")))
}

fn optional_string_attr(item: &HashMap<String, AttributeValue>, name: &str) -> Option<String> {
    item.get(name).and_then(|value| value.as_s().ok()).cloned()
}

fn bool_attr(item: &HashMap<String, AttributeValue>, name: &str) -> Result<bool, AppError> {
    item.get(name)
        .and_then(|value| value.as_bool().ok())
        .copied()
        .ok_or_else(|| AppError::Deserialization(format!("missing bool attribute: {name}")))
}

fn parse_instant(name: &str, raw: &str) -> Result<DateTime<Utc>, AppError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|parsed| parsed.with_timezone(&Utc))
        .map_err(|e| AppError::Deserialization(format!("{name}: {e}")))
}
