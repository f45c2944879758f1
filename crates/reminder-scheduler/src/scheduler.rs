use chrono::{DateTime, Duration, Utc};
use domain::Todo;
use infrastructure::{TodoStore, UserDirectory, UserProfile};
use serde::Serialize;
use shared::AppError;
use tracing::{error, info};

use crate::emails::{followup_email, reminder_email};
use crate::notifier::Notifier;

/// リマインダー対象とする期日の遡り幅（1 tick 分）
const REMINDER_WINDOW_MINUTES: i64 = 1;
/// フォローアップまでに期日から経過していなければならない時間
const FOLLOWUP_DELAY_HOURS: i64 = 24;

/// 1 tick 分のバッチ結果。Lambda のレスポンスとしても返す。
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct TickOutcome {
    pub reminders_sent: usize,
    pub followups_sent: usize,
    pub failures: usize,
}

/// スケジューラの 1 tick を実行する。
///
/// 各 ToDo は `NONE → REMINDED → FOLLOWED_UP` の一方向に遷移する。
/// フラグ設定は条件付き書き込みで行われるため、同じ tick を再実行しても
/// 通知は高々一度しか送られない。1 件の送信失敗はログに残し、
/// フラグを立てずに残りの処理を続ける（次の tick で再試行される）。
pub async fn run_tick(
    store: &dyn TodoStore,
    directory: &dyn UserDirectory,
    notifier: &dyn Notifier,
    now: DateTime<Utc>,
) -> Result<TickOutcome, AppError> {
    let mut outcome = TickOutcome::default();

    // 遷移1: NONE → REMINDED
    for todo in store.scan_reminder_candidates().await? {
        let Some(due) = todo.due_datetime else {
            continue;
        };
        // 半開区間 (now - 1分, now] に入った期日だけが対象。
        // tick を逃した ToDo はリマインドされないままになる（許容される欠落）。
        let in_window = due > now - Duration::minutes(REMINDER_WINDOW_MINUTES) && due <= now;
        if !in_window {
            continue;
        }

        match send_reminder(store, directory, notifier, &todo, now).await {
            Ok(true) => {
                info!(todo_id = %todo.id, owner_id = %todo.owner_id, "reminder sent");
                outcome.reminders_sent += 1;
            }
            Ok(false) => {}
            Err(e) => {
                error!(todo_id = %todo.id, error = %e, "failed to send reminder");
                outcome.failures += 1;
            }
        }
    }

    // 遷移2: REMINDED → FOLLOWED_UP
    for todo in store.scan_followup_candidates().await? {
        let Some(due) = todo.due_datetime else {
            continue;
        };
        if now - due < Duration::hours(FOLLOWUP_DELAY_HOURS) {
            continue;
        }

        match send_followup(store, directory, notifier, &todo, now).await {
            Ok(true) => {
                info!(todo_id = %todo.id, owner_id = %todo.owner_id, "follow-up sent");
                outcome.followups_sent += 1;
            }
            Ok(false) => {}
            Err(e) => {
                error!(todo_id = %todo.id, error = %e, "failed to send follow-up");
                outcome.failures += 1;
            }
        }
    }

    info!(
        reminders = outcome.reminders_sent,
        followups = outcome.followups_sent,
        failures = outcome.failures,
        "scheduler tick finished"
    );
    Ok(outcome)
}

/// 宛先を解決してリマインダーを送り、成功したらフラグを立てる
async fn send_reminder(
    store: &dyn TodoStore,
    directory: &dyn UserDirectory,
    notifier: &dyn Notifier,
    todo: &Todo,
    now: DateTime<Utc>,
) -> Result<bool, AppError> {
    let profile = resolve_recipient(directory, todo).await?;
    let (subject, body) = reminder_email(todo, &profile);
    notifier.send(&profile.email, &subject, &body).await?;

    store.mark_reminder_sent(&todo.owner_id, &todo.id, now).await
}

async fn send_followup(
    store: &dyn TodoStore,
    directory: &dyn UserDirectory,
    notifier: &dyn Notifier,
    todo: &Todo,
    now: DateTime<Utc>,
) -> Result<bool, AppError> {
    let profile = resolve_recipient(directory, todo).await?;
    let (subject, body) = followup_email(todo, &profile);
    notifier.send(&profile.email, &subject, &body).await?;

    store.mark_followup_sent(&todo.owner_id, &todo.id, now).await
}

async fn resolve_recipient(
    directory: &dyn UserDirectory,
    todo: &Todo,
) -> Result<UserProfile, AppError> {
    directory.lookup(&todo.owner_id).await?.ok_or_else(|| {
        AppError::NotificationDispatch(format!("no profile found for owner {}", todo.owner_id))
    })
}
