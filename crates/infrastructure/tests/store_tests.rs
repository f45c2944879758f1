use chrono::{Duration, TimeZone, Utc};
use domain::{Todo, TodoDraft, TodoPatch};
use infrastructure::{InMemoryTodoStore, InMemoryUserDirectory, TodoStore, UserDirectory, UserProfile};
use shared::AppError;
use std::sync::Arc;

fn base_time() -> chrono::DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()
}

fn make_todo(owner_id: &str, title: &str) -> Todo {
    Todo::create(
        owner_id,
        TodoDraft {
            title: title.to_string(),
            ..TodoDraft::default()
        },
        base_time(),
    )
    .unwrap()
}

#[tokio::test]
async fn test_insert_and_get_round_trip() {
    let store = InMemoryTodoStore::new();
    let todo = make_todo("user-a", "Task");

    store.insert(&todo).await.unwrap();
    let loaded = store.get("user-a", &todo.id).await.unwrap();

    assert_eq!(loaded, Some(todo));
}

#[tokio::test]
async fn test_get_with_wrong_owner_returns_none() {
    // 他の所有者のキーでは同じ id でも到達できない
    let store = InMemoryTodoStore::new();
    let todo = make_todo("user-a", "Task");
    store.insert(&todo).await.unwrap();

    let loaded = store.get("user-b", &todo.id).await.unwrap();
    assert_eq!(loaded, None);
}

#[tokio::test]
async fn test_list_is_scoped_to_owner() {
    let store = InMemoryTodoStore::new();
    store.insert(&make_todo("user-a", "a1")).await.unwrap();
    store.insert(&make_todo("user-a", "a2")).await.unwrap();
    store.insert(&make_todo("user-b", "b1")).await.unwrap();

    let listed = store.list_for_owner("user-a").await.unwrap();

    assert_eq!(listed.len(), 2);
    assert!(listed.iter().all(|todo| todo.owner_id == "user-a"));
}

#[tokio::test]
async fn test_duplicate_insert_is_rejected() {
    let store = InMemoryTodoStore::new();
    let todo = make_todo("user-a", "Task");

    store.insert(&todo).await.unwrap();
    let err = store.insert(&todo).await.unwrap_err();

    assert!(matches!(err, AppError::ConcurrentModification));
}

#[tokio::test]
async fn test_replace_uses_compare_and_swap() {
    let store = InMemoryTodoStore::new();
    let todo = make_todo("user-a", "Task");
    store.insert(&todo).await.unwrap();

    let updated = todo
        .apply_patch(
            TodoPatch {
                title: Some("Renamed".to_string()),
                ..TodoPatch::default()
            },
            base_time() + Duration::minutes(1),
        )
        .unwrap();

    // 読み取り時点の updated_at が一致すれば成功
    store.replace(&updated, todo.updated_at).await.unwrap();

    // 古い updated_at での二度目の置き換えは競合になる
    let stale = todo
        .apply_patch(
            TodoPatch {
                title: Some("Stale".to_string()),
                ..TodoPatch::default()
            },
            base_time() + Duration::minutes(2),
        )
        .unwrap();
    let err = store.replace(&stale, todo.updated_at).await.unwrap_err();
    assert!(matches!(err, AppError::ConcurrentModification));

    let loaded = store.get("user-a", &todo.id).await.unwrap().unwrap();
    assert_eq!(loaded.title, "Renamed");
}

#[tokio::test]
async fn test_concurrent_replaces_allow_exactly_one_winner() {
    // 同じ読み取りスナップショットから並行に置き換えると勝者は一人だけ
    let store = Arc::new(InMemoryTodoStore::new());
    let todo = make_todo("user-a", "Task");
    store.insert(&todo).await.unwrap();

    let attempts = (0..8).map(|i| {
        let store = store.clone();
        let base = todo.clone();
        async move {
            let updated = base
                .apply_patch(
                    TodoPatch {
                        title: Some(format!("attempt-{i}")),
                        ..TodoPatch::default()
                    },
                    base_time() + Duration::seconds(i + 1),
                )
                .unwrap();
            store.replace(&updated, base.updated_at).await
        }
    });

    let results = futures::future::join_all(attempts).await;
    let winners = results.iter().filter(|result| result.is_ok()).count();

    assert_eq!(winners, 1);
}

#[tokio::test]
async fn test_delete_missing_record_is_not_found() {
    let store = InMemoryTodoStore::new();
    let todo = make_todo("user-a", "Task");
    store.insert(&todo).await.unwrap();

    store.delete("user-a", &todo.id).await.unwrap();
    let err = store.delete("user-a", &todo.id).await.unwrap_err();

    assert!(matches!(err, AppError::NotFound(_)));
}

#[tokio::test]
async fn test_scan_reminder_candidates_applies_preconditions() {
    let store = InMemoryTodoStore::new();

    let mut due = make_todo("user-a", "due");
    due.due_datetime = Some(base_time());
    store.insert(&due).await.unwrap();

    // 期日なしは対象外
    store.insert(&make_todo("user-a", "no due")).await.unwrap();

    // 完了済みは対象外
    let mut done = make_todo("user-a", "done");
    done.due_datetime = Some(base_time());
    done.completed = true;
    store.insert(&done).await.unwrap();

    // 送信済みは対象外
    let mut sent = make_todo("user-b", "sent");
    sent.due_datetime = Some(base_time());
    sent.reminder_sent = true;
    store.insert(&sent).await.unwrap();

    let candidates = store.scan_reminder_candidates().await.unwrap();

    assert_eq!(candidates.len(), 1);
    assert_eq!(candidates[0].title, "due");
}

#[tokio::test]
async fn test_mark_reminder_sent_is_idempotent() {
    let store = InMemoryTodoStore::new();
    let mut todo = make_todo("user-a", "due");
    todo.due_datetime = Some(base_time());
    store.insert(&todo).await.unwrap();

    let first = store
        .mark_reminder_sent("user-a", &todo.id, base_time())
        .await
        .unwrap();
    let second = store
        .mark_reminder_sent("user-a", &todo.id, base_time())
        .await
        .unwrap();

    assert!(first);
    assert!(!second);

    let loaded = store.get("user-a", &todo.id).await.unwrap().unwrap();
    assert!(loaded.reminder_sent);
}

#[tokio::test]
async fn test_mark_reminder_requires_due_datetime_and_open_state() {
    let store = InMemoryTodoStore::new();

    // 期日なしの ToDo にはフラグを立てられない
    let without_due = make_todo("user-a", "no due");
    store.insert(&without_due).await.unwrap();
    let marked = store
        .mark_reminder_sent("user-a", &without_due.id, base_time())
        .await
        .unwrap();
    assert!(!marked);

    // 完了済みの ToDo にも立てられない
    let mut done = make_todo("user-a", "done");
    done.due_datetime = Some(base_time());
    done.completed = true;
    store.insert(&done).await.unwrap();
    let marked = store
        .mark_reminder_sent("user-a", &done.id, base_time())
        .await
        .unwrap();
    assert!(!marked);
}

#[tokio::test]
async fn test_mark_followup_requires_reminder_first() {
    let store = InMemoryTodoStore::new();
    let mut todo = make_todo("user-a", "due");
    todo.due_datetime = Some(base_time());
    store.insert(&todo).await.unwrap();

    // reminder_sent が false のうちはフォローアップへ遷移できない
    let premature = store
        .mark_followup_sent("user-a", &todo.id, base_time())
        .await
        .unwrap();
    assert!(!premature);

    store
        .mark_reminder_sent("user-a", &todo.id, base_time())
        .await
        .unwrap();
    let marked = store
        .mark_followup_sent("user-a", &todo.id, base_time())
        .await
        .unwrap();
    assert!(marked);

    let loaded = store.get("user-a", &todo.id).await.unwrap().unwrap();
    assert!(loaded.reminder_sent && loaded.followup_email_sent);
}

#[tokio::test]
async fn test_user_directory_lookup() {
    let directory = InMemoryUserDirectory::new();
    directory.insert(UserProfile {
        user_id: "user-a".to_string(),
        email: "a@example.com".to_string(),
        display_name: "Alice".to_string(),
    });

    let found = directory.lookup("user-a").await.unwrap();
    assert_eq!(found.unwrap().email, "a@example.com");

    let missing = directory.lookup("user-x").await.unwrap();
    assert!(missing.is_none());
}
