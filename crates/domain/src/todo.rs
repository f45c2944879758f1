use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::due::parse_due_datetime;
use crate::errors::DomainError;

/// タイトルの最大文字数
pub const TITLE_MAX_CHARS: usize = 200;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TodoId(String);

impl TodoId {
    pub fn new() -> Self {
        Self(ulid::Ulid::new().to_string())
    }

    pub fn from_string(id: String) -> Self {
        Self(id)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for TodoId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for TodoId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// ToDo の優先度。並び替えは low < medium < high の意味順。
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    Medium,
    High,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
        }
    }
}

impl std::str::FromStr for Priority {
    type Err = DomainError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw {
            "low" => Ok(Priority::Low),
            "medium" => Ok(Priority::Medium),
            "high" => Ok(Priority::High),
            _ => Err(DomainError::InvalidPriority(raw.to_string())),
        }
    }
}

impl Default for Priority {
    fn default() -> Self {
        Priority::Medium
    }
}

/// ユーザー所有の ToDo アイテム
///
/// `reminder_sent` / `followup_email_sent` は単調な通知フラグで、
/// リマインダースケジューラのみが false → true に遷移させる。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Todo {
    pub id: TodoId,
    pub owner_id: String,
    pub title: String,
    pub description: Option<String>,
    pub completed: bool,
    pub priority: Priority,
    pub due_date: Option<NaiveDate>,
    pub due_datetime: Option<DateTime<Utc>>,
    pub reminder_sent: bool,
    pub followup_email_sent: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// 新規作成・全項目更新の入力フィールド
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TodoDraft {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub completed: Option<bool>,
    #[serde(default)]
    pub priority: Option<Priority>,
    #[serde(default)]
    pub due_date: Option<NaiveDate>,
    #[serde(default)]
    pub due_datetime: Option<String>,
}

/// 部分更新の入力フィールド（未指定 = 変更なし）
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TodoPatch {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub completed: Option<bool>,
    #[serde(default)]
    pub priority: Option<Priority>,
    #[serde(default)]
    pub due_date: Option<NaiveDate>,
    #[serde(default)]
    pub due_datetime: Option<String>,
}

impl From<TodoDraft> for TodoPatch {
    fn from(draft: TodoDraft) -> Self {
        Self {
            title: Some(draft.title),
            description: draft.description,
            completed: draft.completed,
            priority: draft.priority,
            due_date: draft.due_date,
            due_datetime: draft.due_datetime,
        }
    }
}

impl Todo {
    /// 入力を検証して新しい ToDo を作成する
    pub fn create(owner_id: &str, draft: TodoDraft, now: DateTime<Utc>) -> Result<Self, DomainError> {
        validate_title(&draft.title)?;
        let due_datetime = draft
            .due_datetime
            .as_deref()
            .map(parse_due_datetime)
            .transpose()?;

        Ok(Self {
            id: TodoId::new(),
            owner_id: owner_id.to_string(),
            title: draft.title,
            description: draft.description,
            completed: draft.completed.unwrap_or(false),
            priority: draft.priority.unwrap_or_default(),
            due_date: draft.due_date,
            due_datetime,
            reminder_sent: false,
            followup_email_sent: false,
            created_at: now,
            updated_at: now,
        })
    }

    /// フィールドを部分的に更新した新しい値を返す。
    /// id / owner_id / created_at / 通知フラグは変更されない。
    pub fn apply_patch(&self, patch: TodoPatch, now: DateTime<Utc>) -> Result<Self, DomainError> {
        let mut updated = self.clone();
        if let Some(title) = patch.title {
            validate_title(&title)?;
            updated.title = title;
        }
        if let Some(description) = patch.description {
            updated.description = Some(description);
        }
        if let Some(completed) = patch.completed {
            updated.completed = completed;
        }
        if let Some(priority) = patch.priority {
            updated.priority = priority;
        }
        if let Some(due_date) = patch.due_date {
            updated.due_date = Some(due_date);
        }
        if let Some(raw) = patch.due_datetime.as_deref() {
            updated.due_datetime = Some(parse_due_datetime(raw)?);
        }
        updated.updated_at = now;
        Ok(updated)
    }

    /// 完了状態を反転した新しい値を返す
    pub fn toggled(&self, now: DateTime<Utc>) -> Self {
        let mut toggled = self.clone();
        toggled.completed = !toggled.completed;
        toggled.updated_at = now;
        toggled
    }

    /// 期限超過判定。保存されない導出値。
    ///
    /// 完了済みは常に false。`due_datetime` が設定されていれば
    /// `due_date` より優先される。
    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        if self.completed {
            return false;
        }
        if let Some(due) = self.due_datetime {
            return now > due;
        }
        if let Some(date) = self.due_date {
            return now.date_naive() > date;
        }
        false
    }
}

fn validate_title(title: &str) -> Result<(), DomainError> {
    let chars = title.chars().count();
    if chars == 0 {
        return Err(DomainError::Validation("Title cannot be empty.".to_string()));
    }
    if chars > TITLE_MAX_CHARS {
        return Err(DomainError::Validation(
            "Title cannot exceed 200 characters.".to_string(),
        ));
    }
    Ok(())
}
