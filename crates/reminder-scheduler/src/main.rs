use std::sync::Arc;

use chrono::Utc;
use infrastructure::{DynamoDbClient, DynamoDbTodoStore, DynamoDbUserDirectory};
use lambda_runtime::{run, service_fn, Error, LambdaEvent};
use reminder_scheduler::{run_tick, SesNotifier};
use serde_json::Value;
use shared::{init_tracing, Config};

/// スケジュール実行ごとに使い回す依存の束
struct SchedulerState {
    store: DynamoDbTodoStore,
    directory: DynamoDbUserDirectory,
    notifier: SesNotifier,
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    init_tracing();

    let config = Config::from_env();
    let db = DynamoDbClient::new(&config).await;
    let aws_config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;

    let state = Arc::new(SchedulerState {
        store: DynamoDbTodoStore::new(db.clone()),
        directory: DynamoDbUserDirectory::new(db),
        notifier: SesNotifier::new(
            aws_sdk_ses::Client::new(&aws_config),
            config.mail_from_address.clone(),
        ),
    });

    // EventBridge の rate(1 minute) スケジュールから起動される。
    // イベントペイロード自体は使わない。
    run(service_fn(move |_event: LambdaEvent<Value>| {
        let state = Arc::clone(&state);
        async move {
            let outcome = run_tick(&state.store, &state.directory, &state.notifier, Utc::now())
                .await
                .map_err(|e| Error::from(e.to_string().as_str()))?;
            Ok::<Value, Error>(serde_json::to_value(&outcome)?)
        }
    }))
    .await
}
