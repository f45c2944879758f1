use std::env;

/// 環境変数から読み込むアプリケーション設定
///
/// `DYNAMODB_ENDPOINT` はローカル開発・テストで DynamoDB Local を
/// 指すための上書き。未設定なら既定の AWS エンドポイントを使う。
#[derive(Debug, Clone)]
pub struct Config {
    pub dynamodb_table: String,
    pub dynamodb_endpoint: Option<String>,
    pub environment: String,
    pub aws_region: String,
    pub mail_from_address: String,
}

impl Config {
    pub fn from_env() -> Self {
        Config {
            dynamodb_table: env::var("DYNAMODB_TABLE")
                .unwrap_or_else(|_| "todo-tracker-dev".to_string()),
            dynamodb_endpoint: env::var("DYNAMODB_ENDPOINT").ok(),
            environment: env::var("ENVIRONMENT").unwrap_or_else(|_| "dev".to_string()),
            aws_region: env::var("AWS_REGION").unwrap_or_else(|_| "ap-northeast-1".to_string()),
            mail_from_address: env::var("MAIL_FROM_ADDRESS")
                .unwrap_or_else(|_| "noreply@todo-tracker.example".to_string()),
        }
    }
}
