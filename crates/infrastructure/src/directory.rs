use async_trait::async_trait;
use aws_sdk_dynamodb::types::AttributeValue;
use serde::{Deserialize, Serialize};
use shared::AppError;

use crate::dynamodb::DynamoDbClient;
use crate::models::{profile_from_item, ItemKeys};

/// 認証コラボレータが登録時に書き込むユーザープロファイルの読み取りモデル。
/// コアは通知の宛先解決にのみ使用する。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub user_id: String,
    pub email: String,
    pub display_name: String,
}

/// 通知の宛先解決に使うユーザーディレクトリ
#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn lookup(&self, user_id: &str) -> Result<Option<UserProfile>, AppError>;
}

/// DynamoDB 実装。PK = USER#{id}, SK = PROFILE のレコードを読む。
#[derive(Clone)]
pub struct DynamoDbUserDirectory {
    db: DynamoDbClient,
}

impl DynamoDbUserDirectory {
    pub fn new(db: DynamoDbClient) -> Self {
        Self { db }
    }
}

#[async_trait]
impl UserDirectory for DynamoDbUserDirectory {
    async fn lookup(&self, user_id: &str) -> Result<Option<UserProfile>, AppError> {
        let keys = ItemKeys::for_profile(user_id);

        let result = self
            .db
            .client()
            .get_item()
            .table_name(self.db.table_name())
            .key("PK", AttributeValue::S(keys.pk))
            .key("SK", AttributeValue::S(keys.sk))
            .send()
            .await
            .map_err(|e| AppError::Storage(e.into_service_error().to_string()))?;

        result.item.as_ref().map(profile_from_item).transpose()
    }
}
