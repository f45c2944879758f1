use std::sync::Arc;

use infrastructure::TodoStore;

pub mod error;
pub mod handlers;
pub mod responses;
pub mod router;

/// アプリケーションの共有状態
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn TodoStore>,
}

impl AppState {
    pub fn new(store: Arc<dyn TodoStore>) -> Self {
        Self { store }
    }
}
