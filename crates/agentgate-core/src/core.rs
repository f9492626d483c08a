use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};

use crate::gateway::Gateway;
use crate::handler::{chat_handler, health_handler};

pub struct CoreState {
    pub gateway: Gateway,
}

pub struct Core {
    state: Arc<CoreState>,
}

impl Core {
    pub fn new(gateway: Gateway) -> Self {
        Self {
            state: Arc::new(CoreState { gateway }),
        }
    }

    pub fn router(&self) -> Router {
        Router::new()
            .route("/api/chat", post(chat_handler))
            .route("/health", get(health_handler))
            .with_state(self.state.clone())
    }

    pub fn state(&self) -> Arc<CoreState> {
        self.state.clone()
    }
}
