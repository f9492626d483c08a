use std::sync::Arc;
use std::time::Instant;

use agentgate_common::GlobalConfig;
use agentgate_protocol::{ChatRequest, EndpointFamily, EndpointId};
use agentgate_transform::{
    Extracted, GenerationParameters, StreamVariant, UrlPolicy, build_payload, extract_response,
    parse_generation_parameters,
};
use bytes::Bytes;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{info, warn};

use crate::error::GatewayError;
use crate::session::{InitStore, SessionInitializer};
use crate::stream::spawn_transform;
use crate::upstream_client::{UpstreamClient, UpstreamHttpRequest};

const INIT_PATH: &str = "/init";

/// What the handler sends back to the browser on success.
#[derive(Debug)]
pub enum GatewayResponse {
    Stream(ReceiverStream<Bytes>),
    Body(Extracted),
}

struct Backend {
    base_url: String,
    policy: UrlPolicy,
}

/// Composes validation, payload construction, CA-RAG bootstrap, the upstream
/// call and response translation for one chat request. Holds no per-request
/// state; the session store is the only thing shared between requests.
pub struct Gateway {
    backend: Option<Backend>,
    client: Arc<dyn UpstreamClient>,
    sessions: SessionInitializer,
}

impl Gateway {
    pub fn new(
        config: &GlobalConfig,
        client: Arc<dyn UpstreamClient>,
        store: Arc<dyn InitStore>,
    ) -> Result<Self, GatewayError> {
        let backend = match config.backend_url.as_deref() {
            Some(base_url) => {
                let policy = UrlPolicy::for_backend(base_url, config.production)
                    .map_err(|err| GatewayError::Config(err.to_string()))?;
                Some(Backend {
                    base_url: base_url.trim_end_matches('/').to_string(),
                    policy,
                })
            }
            None => None,
        };
        Ok(Self {
            backend,
            client,
            sessions: SessionInitializer::new(config.rag_uuid.clone(), store),
        })
    }

    pub async fn handle(
        &self,
        request: ChatRequest,
        trace_id: &str,
    ) -> Result<GatewayResponse, GatewayError> {
        let backend = self.backend.as_ref().ok_or(GatewayError::MissingBackend)?;
        let endpoint = request.http_endpoint;

        // Runs first so a rejected parameter object never reaches the builder.
        let params = match endpoint.family() {
            EndpointFamily::Chat => {
                parse_generation_parameters(&request.optional_generation_parameters)?
            }
            EndpointFamily::Generate | EndpointFamily::CaRag => GenerationParameters::default(),
        };
        let payload = build_payload(endpoint, &request.messages, &params)?;
        let url = self.outbound_url(backend, endpoint.path(), trace_id)?;

        if endpoint == EndpointId::ChatCaRag {
            let init_url = self.outbound_url(backend, INIT_PATH, trace_id)?;
            self.sessions
                .ensure_initialized(
                    self.client.as_ref(),
                    &init_url,
                    request.conversation_id.as_deref(),
                    trace_id,
                )
                .await?;
        }

        let started_at = Instant::now();
        let body = Bytes::from(payload.to_string());
        let response = self
            .client
            .send(UpstreamHttpRequest::json(&url, body, endpoint.is_stream()))
            .await
            .map_err(|err| {
                warn!(
                    event = "upstream_responded",
                    trace_id = %trace_id,
                    url = %url,
                    error_kind = err.kind.as_str(),
                    error = %err.message,
                    elapsed_ms = started_at.elapsed().as_millis()
                );
                GatewayError::Transport(err)
            })?;

        if !response.is_success() {
            let status = response.status;
            let body = response.body.collect().await;
            let body = String::from_utf8_lossy(&body).to_string();
            warn!(
                event = "upstream_responded",
                trace_id = %trace_id,
                url = %url,
                status = status,
                error_body = %body,
                elapsed_ms = started_at.elapsed().as_millis()
            );
            return Err(GatewayError::UpstreamStatus { status, body });
        }

        info!(
            event = "upstream_responded",
            trace_id = %trace_id,
            url = %url,
            status = response.status,
            elapsed_ms = started_at.elapsed().as_millis(),
            is_stream = endpoint.is_stream()
        );

        match StreamVariant::for_endpoint(endpoint) {
            Some(variant) => Ok(GatewayResponse::Stream(spawn_transform(
                response.body,
                variant,
                request.additional_props.enable_intermediate_steps,
                trace_id.to_string(),
            ))),
            None => {
                let body = response.body.collect().await;
                let text = String::from_utf8_lossy(&body);
                Ok(GatewayResponse::Body(extract_response(
                    &text,
                    endpoint.family(),
                )))
            }
        }
    }

    fn outbound_url(
        &self,
        backend: &Backend,
        path: &str,
        trace_id: &str,
    ) -> Result<String, GatewayError> {
        let raw = format!("{}{}", backend.base_url, path);
        match backend.policy.validate(&raw) {
            Ok(url) => Ok(url.to_string()),
            Err(rejection) => {
                warn!(event = "upstream_rejected", trace_id = %trace_id, reason = %rejection);
                Err(GatewayError::UrlRejected(rejection))
            }
        }
    }
}
