//! One-time CA-RAG session bootstrap.
//!
//! Every conversation must be announced to the backend with `POST /init`
//! before its first `/call`. Successful initializations are remembered in an
//! [`InitStore`] for the lifetime of the store, so later turns skip the call.
//!
//! Two concurrent first turns of the same conversation can both miss the
//! store and both call `/init`. The only guarantee is that no call is made
//! once a success has been recorded; the backend's `/init` is assumed to
//! tolerate a repeat.

use std::collections::HashSet;
use std::sync::Arc;

use agentgate_protocol::DEFAULT_CONVERSATION_ID;
use async_trait::async_trait;
use bytes::Bytes;
use serde_json::json;
use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::error::GatewayError;
use crate::upstream_client::{UpstreamClient, UpstreamHttpRequest};

/// Set of conversation keys whose `/init` succeeded. Implementations backed
/// by a shared cache make the guarantee hold across proxy instances.
#[async_trait]
pub trait InitStore: Send + Sync {
    async fn contains(&self, key: &str) -> bool;
    async fn insert(&self, key: String);
}

#[derive(Debug, Default)]
pub struct MemoryInitStore {
    keys: RwLock<HashSet<String>>,
}

impl MemoryInitStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn initialized_count(&self) -> usize {
        self.keys.read().await.len()
    }
}

#[async_trait]
impl InitStore for MemoryInitStore {
    async fn contains(&self, key: &str) -> bool {
        self.keys.read().await.contains(key)
    }

    async fn insert(&self, key: String) {
        self.keys.write().await.insert(key);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitOutcome {
    AlreadyInitialized,
    Initialized,
}

pub struct SessionInitializer {
    rag_uuid: String,
    store: Arc<dyn InitStore>,
}

impl SessionInitializer {
    pub fn new(rag_uuid: impl Into<String>, store: Arc<dyn InitStore>) -> Self {
        Self {
            rag_uuid: rag_uuid.into(),
            store,
        }
    }

    pub fn init_key(&self, conversation_id: Option<&str>) -> String {
        let conversation_id = conversation_id
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .unwrap_or(DEFAULT_CONVERSATION_ID);
        format!("{}-{}", self.rag_uuid, conversation_id)
    }

    /// `init_url` must already have passed the outbound allow-list.
    pub async fn ensure_initialized(
        &self,
        client: &dyn UpstreamClient,
        init_url: &str,
        conversation_id: Option<&str>,
        trace_id: &str,
    ) -> Result<InitOutcome, GatewayError> {
        let key = self.init_key(conversation_id);
        if self.store.contains(&key).await {
            return Ok(InitOutcome::AlreadyInitialized);
        }

        let body = Bytes::from(json!({ "uuid": self.rag_uuid }).to_string());
        let response = client
            .send(UpstreamHttpRequest::json(init_url, body, false))
            .await
            .map_err(|err| {
                warn!(event = "ca_rag_init", trace_id = %trace_id, key = %key, error = %err);
                GatewayError::InitializationFailed(err.to_string())
            })?;

        if !response.is_success() {
            let status = response.status;
            let body = response.body.collect().await;
            let body = String::from_utf8_lossy(&body).to_string();
            warn!(
                event = "ca_rag_init",
                trace_id = %trace_id,
                key = %key,
                status = status,
                error_body = %body
            );
            return Err(GatewayError::InitializationFailed(format!(
                "/init returned status {status}: {body}"
            )));
        }

        self.store.insert(key.clone()).await;
        info!(event = "ca_rag_init", trace_id = %trace_id, key = %key, status = response.status);
        Ok(InitOutcome::Initialized)
    }
}
