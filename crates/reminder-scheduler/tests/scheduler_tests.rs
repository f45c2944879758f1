use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use domain::{Priority, Todo, TodoDraft};
use infrastructure::{InMemoryTodoStore, InMemoryUserDirectory, TodoStore, UserProfile};
use reminder_scheduler::{run_tick, Notifier};
use shared::AppError;

/// 送信内容を記録するテスト用 Notifier。
/// `failing_recipients` に含まれる宛先への送信は失敗させる。
#[derive(Default)]
struct RecordingNotifier {
    sent: Mutex<Vec<SentMail>>,
    failing_recipients: Mutex<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct SentMail {
    recipient: String,
    subject: String,
}

impl RecordingNotifier {
    fn sent(&self) -> Vec<SentMail> {
        self.sent.lock().unwrap().clone()
    }

    fn fail_for(&self, recipient: &str) {
        self.failing_recipients
            .lock()
            .unwrap()
            .push(recipient.to_string());
    }

    fn recover(&self) {
        self.failing_recipients.lock().unwrap().clear();
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, recipient: &str, subject: &str, _body: &str) -> Result<(), AppError> {
        if self
            .failing_recipients
            .lock()
            .unwrap()
            .iter()
            .any(|failing| failing == recipient)
        {
            return Err(AppError::NotificationDispatch(format!(
                "smtp unavailable for {recipient}"
            )));
        }
        self.sent.lock().unwrap().push(SentMail {
            recipient: recipient.to_string(),
            subject: subject.to_string(),
        });
        Ok(())
    }
}

struct Fixture {
    store: InMemoryTodoStore,
    directory: InMemoryUserDirectory,
    notifier: RecordingNotifier,
}

impl Fixture {
    fn new() -> Self {
        let fixture = Self {
            store: InMemoryTodoStore::new(),
            directory: InMemoryUserDirectory::new(),
            notifier: RecordingNotifier::default(),
        };
        fixture.directory.insert(UserProfile {
            user_id: "user-a".to_string(),
            email: "alice@example.com".to_string(),
            display_name: "Alice".to_string(),
        });
        fixture.directory.insert(UserProfile {
            user_id: "user-b".to_string(),
            email: "bob@example.com".to_string(),
            display_name: "Bob".to_string(),
        });
        fixture
    }

    async fn insert_todo(&self, owner_id: &str, title: &str, due: Option<DateTime<Utc>>) -> Todo {
        let todo = Todo::create(
            owner_id,
            TodoDraft {
                title: title.to_string(),
                priority: Some(Priority::High),
                due_datetime: due.map(|due| due.to_rfc3339()),
                ..TodoDraft::default()
            },
            due.unwrap_or_else(base_time) - Duration::hours(1),
        )
        .unwrap();
        self.store.insert(&todo).await.unwrap();
        todo
    }

    async fn run(&self, now: DateTime<Utc>) -> reminder_scheduler::TickOutcome {
        run_tick(&self.store, &self.directory, &self.notifier, now)
            .await
            .unwrap()
    }

    async fn reload(&self, todo: &Todo) -> Todo {
        self.store
            .get(&todo.owner_id, &todo.id)
            .await
            .unwrap()
            .unwrap()
    }
}

fn base_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()
}

#[tokio::test]
async fn test_full_reminder_followup_scenario() {
    // 「Pay rent」を期日ちょうどに作成し、模擬時計を進めながら tick を回す
    let fixture = Fixture::new();
    let due = base_time();
    let todo = fixture.insert_todo("user-a", "Pay rent", Some(due)).await;

    // 30秒後の tick でリマインダーが 1 通送られる
    let outcome = fixture.run(due + Duration::seconds(30)).await;
    assert_eq!(outcome.reminders_sent, 1);
    assert_eq!(outcome.followups_sent, 0);
    assert_eq!(outcome.failures, 0);

    let reloaded = fixture.reload(&todo).await;
    assert!(reloaded.reminder_sent);
    assert!(!reloaded.followup_email_sent);

    let sent = fixture.notifier.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].recipient, "alice@example.com");
    assert_eq!(sent[0].subject, "Reminder: Pay rent");

    // さらに 24 時間後の tick でフォローアップが送られる
    let outcome = fixture.run(due + Duration::hours(24) + Duration::seconds(30)).await;
    assert_eq!(outcome.reminders_sent, 0);
    assert_eq!(outcome.followups_sent, 1);

    let reloaded = fixture.reload(&todo).await;
    assert!(reloaded.followup_email_sent);

    let sent = fixture.notifier.sent();
    assert_eq!(sent.len(), 2);
    assert_eq!(sent[1].subject, "Action Required: Overdue Task - Pay rent");
}

#[tokio::test]
async fn test_second_run_in_same_window_is_noop() {
    let fixture = Fixture::new();
    let due = base_time();
    fixture.insert_todo("user-a", "Pay rent", Some(due)).await;

    let now = due + Duration::seconds(30);
    let first = fixture.run(now).await;
    let second = fixture.run(now).await;

    assert_eq!(first.reminders_sent, 1);
    assert_eq!(second.reminders_sent, 0);
    // 同一ウィンドウ内の再実行でも通知は高々一度
    assert_eq!(fixture.notifier.sent().len(), 1);
}

#[tokio::test]
async fn test_reminder_window_boundaries() {
    let fixture = Fixture::new();
    let now = base_time();

    // 期日ちょうど（上端・含む）
    let at_now = fixture.insert_todo("user-a", "at now", Some(now)).await;
    // 59秒前（区間内）
    let inside = fixture
        .insert_todo("user-a", "inside", Some(now - Duration::seconds(59)))
        .await;
    // ちょうど1分前（下端・含まない）
    let lower_edge = fixture
        .insert_todo("user-a", "lower edge", Some(now - Duration::seconds(60)))
        .await;
    // 10分前（tick を逃した ToDo はリマインドされない）
    let missed = fixture
        .insert_todo("user-a", "missed", Some(now - Duration::minutes(10)))
        .await;
    // 未来の期日はまだ対象外
    let future = fixture
        .insert_todo("user-a", "future", Some(now + Duration::seconds(1)))
        .await;

    let outcome = fixture.run(now).await;

    assert_eq!(outcome.reminders_sent, 2);
    assert!(fixture.reload(&at_now).await.reminder_sent);
    assert!(fixture.reload(&inside).await.reminder_sent);
    assert!(!fixture.reload(&lower_edge).await.reminder_sent);
    assert!(!fixture.reload(&missed).await.reminder_sent);
    assert!(!fixture.reload(&future).await.reminder_sent);
}

#[tokio::test]
async fn test_completed_todo_is_never_reminded() {
    let fixture = Fixture::new();
    let due = base_time();
    let todo = fixture.insert_todo("user-a", "done already", Some(due)).await;

    let completed = todo.toggled(due);
    fixture.store.replace(&completed, todo.updated_at).await.unwrap();

    let outcome = fixture.run(due + Duration::seconds(30)).await;

    assert_eq!(outcome.reminders_sent, 0);
    assert!(fixture.notifier.sent().is_empty());
}

#[tokio::test]
async fn test_dispatch_failure_leaves_flag_unset_and_continues() {
    let fixture = Fixture::new();
    let due = base_time();
    let failing = fixture.insert_todo("user-a", "failing", Some(due)).await;
    let working = fixture.insert_todo("user-b", "working", Some(due)).await;

    fixture.notifier.fail_for("alice@example.com");
    let outcome = fixture.run(due + Duration::seconds(30)).await;

    // 1件の失敗はバッチ全体を止めない
    assert_eq!(outcome.reminders_sent, 1);
    assert_eq!(outcome.failures, 1);
    assert!(!fixture.reload(&failing).await.reminder_sent);
    assert!(fixture.reload(&working).await.reminder_sent);

    // 宛先が復旧すれば次の tick で再試行される
    fixture.notifier.recover();
    let outcome = fixture.run(due + Duration::seconds(45)).await;
    assert_eq!(outcome.reminders_sent, 1);
    assert!(fixture.reload(&failing).await.reminder_sent);
}

#[tokio::test]
async fn test_missing_profile_counts_as_failure() {
    let fixture = Fixture::new();
    let due = base_time();
    let orphan = fixture.insert_todo("user-x", "orphan", Some(due)).await;

    let outcome = fixture.run(due + Duration::seconds(30)).await;

    assert_eq!(outcome.reminders_sent, 0);
    assert_eq!(outcome.failures, 1);
    assert!(!fixture.reload(&orphan).await.reminder_sent);
}

#[tokio::test]
async fn test_followup_requires_24_hours_elapsed() {
    let fixture = Fixture::new();
    let due = base_time();
    let todo = fixture.insert_todo("user-a", "reminded", Some(due)).await;
    fixture
        .store
        .mark_reminder_sent("user-a", &todo.id, due)
        .await
        .unwrap();

    // 23時間では送られない
    let outcome = fixture.run(due + Duration::hours(23)).await;
    assert_eq!(outcome.followups_sent, 0);

    // 25時間で送られる
    let outcome = fixture.run(due + Duration::hours(25)).await;
    assert_eq!(outcome.followups_sent, 1);
    assert!(fixture.reload(&todo).await.followup_email_sent);
}

#[tokio::test]
async fn test_followup_never_precedes_reminder() {
    let fixture = Fixture::new();
    let due = base_time();
    // リマインダー未送信のまま 25 時間経過した ToDo
    let todo = fixture.insert_todo("user-a", "never reminded", Some(due)).await;

    let outcome = fixture.run(due + Duration::hours(25)).await;

    // リマインダーのウィンドウは過ぎ、フォローアップの前提も満たさない
    assert_eq!(outcome.reminders_sent, 0);
    assert_eq!(outcome.followups_sent, 0);
    let reloaded = fixture.reload(&todo).await;
    assert!(!reloaded.reminder_sent);
    assert!(!reloaded.followup_email_sent);
}

#[tokio::test]
async fn test_completed_after_reminder_gets_no_followup() {
    let fixture = Fixture::new();
    let due = base_time();
    let todo = fixture.insert_todo("user-a", "finished late", Some(due)).await;
    fixture
        .store
        .mark_reminder_sent("user-a", &todo.id, due)
        .await
        .unwrap();

    // リマインダー後に完了した
    let reminded = fixture.reload(&todo).await;
    let completed = reminded.toggled(due + Duration::hours(1));
    fixture
        .store
        .replace(&completed, reminded.updated_at)
        .await
        .unwrap();

    let outcome = fixture.run(due + Duration::hours(25)).await;

    assert_eq!(outcome.followups_sent, 0);
    assert!(!fixture.reload(&todo).await.followup_email_sent);
}
