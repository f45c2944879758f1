use async_trait::async_trait;
use aws_sdk_dynamodb::types::AttributeValue;
use chrono::{DateTime, Utc};
use domain::{Todo, TodoId};
use shared::AppError;
use tracing::{debug, error};

use crate::dynamodb::DynamoDbClient;
use crate::models::{todo_from_item, todo_to_item, ItemKeys, ENTITY_TODO};
use crate::retry::{retry_storage_operation, RetryConfig};

/// ToDo の永続化境界。
///
/// すべての読み書きは所有者パーティションに対して行われるため、
/// リクエスト経路からは他の所有者のレコードに構造的に到達できない。
/// スキャン系の操作はスケジューラ専用。
#[async_trait]
pub trait TodoStore: Send + Sync {
    /// 新規レコードを保存する（既存キーの上書きは拒否）
    async fn insert(&self, todo: &Todo) -> Result<(), AppError>;

    async fn get(&self, owner_id: &str, todo_id: &TodoId) -> Result<Option<Todo>, AppError>;

    /// 所有者の全 ToDo を返す
    async fn list_for_owner(&self, owner_id: &str) -> Result<Vec<Todo>, AppError>;

    /// 読み取り時点の `updated_at` を条件とする compare-and-swap 更新。
    /// 条件不一致は `ConcurrentModification`。
    async fn replace(
        &self,
        todo: &Todo,
        expected_updated_at: DateTime<Utc>,
    ) -> Result<(), AppError>;

    /// 削除。レコードが存在しなければ `NotFound`。
    async fn delete(&self, owner_id: &str, todo_id: &TodoId) -> Result<(), AppError>;

    /// 未完了・リマインダー未送信・期日つきの ToDo を全所有者から収集する
    async fn scan_reminder_candidates(&self) -> Result<Vec<Todo>, AppError>;

    /// 未完了・リマインダー送信済み・フォローアップ未送信の ToDo を収集する
    async fn scan_followup_candidates(&self) -> Result<Vec<Todo>, AppError>;

    /// `reminder_sent` を false → true へ条件付きで遷移させる。
    /// 遷移できるのは期日つき・未完了のレコードだけ。
    /// すでに true（または削除済み・条件不成立）なら Ok(false)。
    async fn mark_reminder_sent(
        &self,
        owner_id: &str,
        todo_id: &TodoId,
        now: DateTime<Utc>,
    ) -> Result<bool, AppError>;

    /// `followup_email_sent` を false → true へ条件付きで遷移させる。
    async fn mark_followup_sent(
        &self,
        owner_id: &str,
        todo_id: &TodoId,
        now: DateTime<Utc>,
    ) -> Result<bool, AppError>;
}

/// DynamoDB 実装。条件式で原子的な read-modify-write を保証する。
#[derive(Clone)]
pub struct DynamoDbTodoStore {
    db: DynamoDbClient,
    retry: RetryConfig,
}

impl DynamoDbTodoStore {
    pub fn new(db: DynamoDbClient) -> Self {
        Self {
            db,
            retry: RetryConfig::default(),
        }
    }

    pub fn with_retry(db: DynamoDbClient, retry: RetryConfig) -> Self {
        Self { db, retry }
    }

    /// フィルタ式に一致する ToDo アイテムを全ページ走査で収集する。
    /// 復元できないアイテムはログに残してスキップする。
    async fn scan_todos(
        &self,
        filter: &str,
        values: Vec<(&str, AttributeValue)>,
    ) -> Result<Vec<Todo>, AppError> {
        let mut todos = Vec::new();
        let mut exclusive_start_key = None;

        loop {
            let mut request = self
                .db
                .client()
                .scan()
                .table_name(self.db.table_name())
                .filter_expression(filter)
                .expression_attribute_values(":todo", AttributeValue::S(ENTITY_TODO.to_string()));
            for (name, value) in &values {
                request = request.expression_attribute_values(*name, value.clone());
            }
            request = request.set_exclusive_start_key(exclusive_start_key.take());

            let result = request
                .send()
                .await
                .map_err(|e| AppError::Storage(e.into_service_error().to_string()))?;

            for item in result.items.unwrap_or_default() {
                match todo_from_item(&item) {
                    Ok(todo) => todos.push(todo),
                    Err(e) => error!(error = %e, "skipping corrupt todo item during scan"),
                }
            }

            match result.last_evaluated_key {
                Some(key) if !key.is_empty() => exclusive_start_key = Some(key),
                _ => break,
            }
        }

        Ok(todos)
    }

    /// 通知フラグを条件付きで false → true に更新する
    async fn mark_flag(
        &self,
        owner_id: &str,
        todo_id: &TodoId,
        update: &str,
        condition: &str,
        now: DateTime<Utc>,
    ) -> Result<bool, AppError> {
        let keys = ItemKeys::for_todo(owner_id, todo_id);

        let result = self
            .db
            .client()
            .update_item()
            .table_name(self.db.table_name())
            .key("PK", AttributeValue::S(keys.pk))
            .key("SK", AttributeValue::S(keys.sk))
            .update_expression(update)
            .condition_expression(condition)
            .expression_attribute_values(":sent", AttributeValue::Bool(true))
            .expression_attribute_values(":not_sent", AttributeValue::Bool(false))
            .expression_attribute_values(":not_done", AttributeValue::Bool(false))
            .expression_attribute_values(":now", AttributeValue::S(now.to_rfc3339()))
            .send()
            .await;

        match result {
            Ok(_) => Ok(true),
            Err(e) => {
                let service_error = e.into_service_error();
                if service_error.is_conditional_check_failed_exception() {
                    // フラグが既に true、またはレコードが消えている。
                    // 単調フラグなので再処理は no-op として扱う。
                    debug!(%todo_id, "notification flag already set, skipping");
                    Ok(false)
                } else {
                    Err(AppError::Storage(service_error.to_string()))
                }
            }
        }
    }
}

#[async_trait]
impl TodoStore for DynamoDbTodoStore {
    async fn insert(&self, todo: &Todo) -> Result<(), AppError> {
        let item = todo_to_item(todo);

        retry_storage_operation(
            || async {
                self.db
                    .client()
                    .put_item()
                    .table_name(self.db.table_name())
                    .set_item(Some(item.clone()))
                    .condition_expression("attribute_not_exists(PK) AND attribute_not_exists(SK)")
                    .send()
                    .await
                    .map_err(|e| {
                        let service_error = e.into_service_error();
                        if service_error.is_conditional_check_failed_exception() {
                            AppError::ConcurrentModification
                        } else {
                            AppError::Storage(service_error.to_string())
                        }
                    })?;
                Ok(())
            },
            &self.retry,
        )
        .await
    }

    async fn get(&self, owner_id: &str, todo_id: &TodoId) -> Result<Option<Todo>, AppError> {
        let keys = ItemKeys::for_todo(owner_id, todo_id);

        let result = retry_storage_operation(
            || async {
                self.db
                    .client()
                    .get_item()
                    .table_name(self.db.table_name())
                    .key("PK", AttributeValue::S(keys.pk.clone()))
                    .key("SK", AttributeValue::S(keys.sk.clone()))
                    .send()
                    .await
                    .map_err(|e| AppError::Storage(e.into_service_error().to_string()))
            },
            &self.retry,
        )
        .await?;

        result.item.as_ref().map(todo_from_item).transpose()
    }

    async fn list_for_owner(&self, owner_id: &str) -> Result<Vec<Todo>, AppError> {
        let pk = format!("USER#{owner_id}");

        retry_storage_operation(
            || async {
                let mut todos = Vec::new();
                let mut exclusive_start_key = None;

                loop {
                    let result = self
                        .db
                        .client()
                        .query()
                        .table_name(self.db.table_name())
                        .key_condition_expression("PK = :pk AND begins_with(SK, :sk_prefix)")
                        .expression_attribute_values(":pk", AttributeValue::S(pk.clone()))
                        .expression_attribute_values(
                            ":sk_prefix",
                            AttributeValue::S("TODO#".to_string()),
                        )
                        .set_exclusive_start_key(exclusive_start_key.take())
                        .send()
                        .await
                        .map_err(|e| AppError::Storage(e.into_service_error().to_string()))?;

                    for item in result.items.unwrap_or_default() {
                        match todo_from_item(&item) {
                            Ok(todo) => todos.push(todo),
                            Err(e) => {
                                error!(error = %e, "skipping corrupt todo item in owner listing")
                            }
                        }
                    }

                    match result.last_evaluated_key {
                        Some(key) if !key.is_empty() => exclusive_start_key = Some(key),
                        _ => break,
                    }
                }

                Ok(todos)
            },
            &self.retry,
        )
        .await
    }

    async fn replace(
        &self,
        todo: &Todo,
        expected_updated_at: DateTime<Utc>,
    ) -> Result<(), AppError> {
        let item = todo_to_item(todo);

        self.db
            .client()
            .put_item()
            .table_name(self.db.table_name())
            .set_item(Some(item))
            .condition_expression("updated_at = :expected")
            .expression_attribute_values(
                ":expected",
                AttributeValue::S(expected_updated_at.to_rfc3339()),
            )
            .send()
            .await
            .map_err(|e| {
                let service_error = e.into_service_error();
                if service_error.is_conditional_check_failed_exception() {
                    AppError::ConcurrentModification
                } else {
                    AppError::Storage(service_error.to_string())
                }
            })?;

        Ok(())
    }

    async fn delete(&self, owner_id: &str, todo_id: &TodoId) -> Result<(), AppError> {
        let keys = ItemKeys::for_todo(owner_id, todo_id);

        self.db
            .client()
            .delete_item()
            .table_name(self.db.table_name())
            .key("PK", AttributeValue::S(keys.pk))
            .key("SK", AttributeValue::S(keys.sk))
            .condition_expression("attribute_exists(SK)")
            .send()
            .await
            .map_err(|e| {
                let service_error = e.into_service_error();
                if service_error.is_conditional_check_failed_exception() {
                    AppError::NotFound(todo_id.to_string())
                } else {
                    AppError::Storage(service_error.to_string())
                }
            })?;

        Ok(())
    }

    async fn scan_reminder_candidates(&self) -> Result<Vec<Todo>, AppError> {
        retry_storage_operation(
            || async {
                self.scan_todos(
                    "EntityType = :todo AND completed = :not_done \
                     AND reminder_sent = :not_sent AND attribute_exists(due_datetime)",
                    vec![
                        (":not_done", AttributeValue::Bool(false)),
                        (":not_sent", AttributeValue::Bool(false)),
                    ],
                )
                .await
            },
            &self.retry,
        )
        .await
    }

    async fn scan_followup_candidates(&self) -> Result<Vec<Todo>, AppError> {
        retry_storage_operation(
            || async {
                self.scan_todos(
                    "EntityType = :todo AND completed = :not_done \
                     AND reminder_sent = :sent AND followup_email_sent = :not_sent",
                    vec![
                        (":not_done", AttributeValue::Bool(false)),
                        (":sent", AttributeValue::Bool(true)),
                        (":not_sent", AttributeValue::Bool(false)),
                    ],
                )
                .await
            },
            &self.retry,
        )
        .await
    }

    async fn mark_reminder_sent(
        &self,
        owner_id: &str,
        todo_id: &TodoId,
        now: DateTime<Utc>,
    ) -> Result<bool, AppError> {
        self.mark_flag(
            owner_id,
            todo_id,
            "SET reminder_sent = :sent, updated_at = :now",
            "attribute_exists(SK) AND reminder_sent = :not_sent \
             AND attribute_exists(due_datetime) AND completed = :not_done",
            now,
        )
        .await
    }

    async fn mark_followup_sent(
        &self,
        owner_id: &str,
        todo_id: &TodoId,
        now: DateTime<Utc>,
    ) -> Result<bool, AppError> {
        self.mark_flag(
            owner_id,
            todo_id,
            "SET followup_email_sent = :sent, updated_at = :now",
            "attribute_exists(SK) AND followup_email_sent = :not_sent \
             AND reminder_sent = :sent AND completed = :not_done",
            now,
        )
        .await
    }
}
