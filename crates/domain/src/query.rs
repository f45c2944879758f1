use std::cmp::Ordering;

use crate::todo::{Priority, Todo};

/// 一覧取得の絞り込み・並び替え条件
///
/// すべて任意で、条件は AND で合成される。
#[derive(Debug, Clone, Default)]
pub struct TodoFilters {
    pub completed: Option<bool>,
    pub priority: Option<Priority>,
    pub search: Option<String>,
    pub sort_by: Option<SortKey>,
}

/// `sort_by` クエリパラメータで指定できる並び順。
/// 先頭の `-` は降順を表す。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortKey {
    CreatedAt,
    CreatedAtDesc,
    DueDate,
    DueDateDesc,
    Priority,
    PriorityDesc,
}

impl SortKey {
    /// 未知のキーは None（既定の並び順にフォールバック）
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "created_at" => Some(Self::CreatedAt),
            "-created_at" => Some(Self::CreatedAtDesc),
            "due_date" => Some(Self::DueDate),
            "-due_date" => Some(Self::DueDateDesc),
            "priority" => Some(Self::Priority),
            "-priority" => Some(Self::PriorityDesc),
            _ => None,
        }
    }
}

/// 所有者の ToDo 一覧へ絞り込みと並び替えを適用する。
///
/// search はタイトルと説明に対する大文字小文字を区別しない部分一致の OR。
/// 既定の並び順は作成日時の新しい順。明示的な並び替えは安定ソートなので
/// 同順位は新しい順を保つ。
pub fn apply_filters(todos: Vec<Todo>, filters: &TodoFilters) -> Vec<Todo> {
    let mut result: Vec<Todo> = todos
        .into_iter()
        .filter(|todo| matches_filters(todo, filters))
        .collect();

    result.sort_by(|a, b| b.created_at.cmp(&a.created_at));

    match filters.sort_by {
        None | Some(SortKey::CreatedAtDesc) => {}
        Some(SortKey::CreatedAt) => result.sort_by(|a, b| a.created_at.cmp(&b.created_at)),
        Some(SortKey::DueDate) => result.sort_by(|a, b| cmp_due_date(a, b, false)),
        Some(SortKey::DueDateDesc) => result.sort_by(|a, b| cmp_due_date(a, b, true)),
        Some(SortKey::Priority) => result.sort_by(|a, b| a.priority.cmp(&b.priority)),
        Some(SortKey::PriorityDesc) => result.sort_by(|a, b| b.priority.cmp(&a.priority)),
    }

    result
}

fn matches_filters(todo: &Todo, filters: &TodoFilters) -> bool {
    if let Some(completed) = filters.completed {
        if todo.completed != completed {
            return false;
        }
    }
    if let Some(priority) = filters.priority {
        if todo.priority != priority {
            return false;
        }
    }
    if let Some(search) = filters.search.as_deref() {
        if !matches_search(todo, search) {
            return false;
        }
    }
    true
}

fn matches_search(todo: &Todo, search: &str) -> bool {
    let needle = search.to_lowercase();
    if todo.title.to_lowercase().contains(&needle) {
        return true;
    }
    todo.description
        .as_deref()
        .map(|description| description.to_lowercase().contains(&needle))
        .unwrap_or(false)
}

/// 期日未設定の ToDo は昇順・降順のどちらでも末尾に並べる
fn cmp_due_date(a: &Todo, b: &Todo, descending: bool) -> Ordering {
    match (a.due_date, b.due_date) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Greater,
        (Some(_), None) => Ordering::Less,
        (Some(x), Some(y)) => {
            if descending {
                y.cmp(&x)
            } else {
                x.cmp(&y)
            }
        }
    }
}
