use std::time::Duration;

use shared::AppError;
use tokio::time::sleep;
use tracing::{debug, warn};

/// リトライ設定
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// 最大試行回数
    pub max_attempts: u32,
    /// 初期待機時間（ミリ秒）
    pub initial_delay_ms: u64,
    /// 指数バックオフの倍率
    pub backoff_multiplier: f64,
    /// 最大待機時間（ミリ秒）
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay_ms: 100,
            backoff_multiplier: 2.0,
            max_delay_ms: 5000,
        }
    }
}

/// 一時的なストレージエラーを指数バックオフ付きで再試行する。
/// `AppError::is_transient` が false のエラーは即座に返す。
pub async fn retry_storage_operation<F, Fut, T>(
    operation: F,
    config: &RetryConfig,
) -> Result<T, AppError>
where
    F: Fn() -> Fut,
    Fut: std::future::Future<Output = Result<T, AppError>>,
{
    let mut attempt = 0;
    let mut delay = config.initial_delay_ms;

    loop {
        attempt += 1;

        match operation().await {
            Ok(value) => {
                if attempt > 1 {
                    debug!(attempt, "storage operation succeeded after retry");
                }
                return Ok(value);
            }
            Err(error) if attempt < config.max_attempts && error.is_transient() => {
                warn!(%error, attempt, delay_ms = delay, "transient storage error, retrying");
                sleep(Duration::from_millis(delay)).await;
                delay = (((delay as f64) * config.backoff_multiplier) as u64).min(config.max_delay_ms);
            }
            Err(error) => return Err(error),
        }
    }
}
