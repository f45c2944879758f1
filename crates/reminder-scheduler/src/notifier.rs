use async_trait::async_trait;
use shared::AppError;

/// 通知コラボレータの境界。
/// 失敗はすべて `NotificationDispatch` として呼び出し側へ返す。
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, recipient: &str, subject: &str, body: &str) -> Result<(), AppError>;
}

/// Amazon SES によるメール送信
pub struct SesNotifier {
    client: aws_sdk_ses::Client,
    source: String,
}

impl SesNotifier {
    pub fn new(client: aws_sdk_ses::Client, source: String) -> Self {
        Self { client, source }
    }

    fn content(data: &str) -> Result<aws_sdk_ses::types::Content, AppError> {
        aws_sdk_ses::types::Content::builder()
            .data(data)
            .charset("UTF-8")
            .build()
            .map_err(|e| AppError::NotificationDispatch(e.to_string()))
    }
}

#[async_trait]
impl Notifier for SesNotifier {
    async fn send(&self, recipient: &str, subject: &str, body: &str) -> Result<(), AppError> {
        self.client
            .send_email()
            .source(&self.source)
            .destination(
                aws_sdk_ses::types::Destination::builder()
                    .to_addresses(recipient)
                    .build(),
            )
            .message(
                aws_sdk_ses::types::Message::builder()
                    .subject(Self::content(subject)?)
                    .body(
                        aws_sdk_ses::types::Body::builder()
                            .text(Self::content(body)?)
                            .build(),
                    )
                    .build(),
            )
            .send()
            .await
            .map_err(|e| AppError::NotificationDispatch(e.into_service_error().to_string()))?;

        Ok(())
    }
}
