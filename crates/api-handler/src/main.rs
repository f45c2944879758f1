use std::sync::Arc;

use api_handler::{router, AppState};
use infrastructure::{DynamoDbClient, DynamoDbTodoStore};
use lambda_http::{run, service_fn, Error, Request};
use shared::{init_tracing, Config};

#[tokio::main]
async fn main() -> Result<(), Error> {
    init_tracing();

    let config = Config::from_env();
    let db = DynamoDbClient::new(&config).await;
    let state = AppState::new(Arc::new(DynamoDbTodoStore::new(db)));

    run(service_fn(move |req: Request| {
        let state = state.clone();
        async move { router::route(req, &state).await }
    }))
    .await
}
