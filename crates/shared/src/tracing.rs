use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// トレーシングサブスクライバーを初期化する。
/// CloudWatch 向けに JSON 形式の構造化ログを出力する。
/// 各バイナリの起動時に一度だけ呼ぶこと。
pub fn init_tracing() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_target(false).json())
        .with(EnvFilter::from_default_env())
        .init();
}
