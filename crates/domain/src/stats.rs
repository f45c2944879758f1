use serde::{Deserialize, Serialize};

use crate::todo::{Priority, Todo};

/// 所有者の ToDo 件数集計
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TodoStats {
    pub total: usize,
    pub completed: usize,
    pub pending: usize,
    pub high_priority: usize,
    pub medium_priority: usize,
    pub low_priority: usize,
}

impl TodoStats {
    /// 副作用なしの読み取り集計。pending = total - completed。
    pub fn collect(todos: &[Todo]) -> Self {
        let mut stats = Self {
            total: todos.len(),
            ..Self::default()
        };
        for todo in todos {
            if todo.completed {
                stats.completed += 1;
            }
            match todo.priority {
                Priority::High => stats.high_priority += 1,
                Priority::Medium => stats.medium_priority += 1,
                Priority::Low => stats.low_priority += 1,
            }
        }
        stats.pending = stats.total - stats.completed;
        stats
    }
}
