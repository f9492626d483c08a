use std::convert::Infallible;
use std::sync::Arc;
use std::time::Instant;

use agentgate_protocol::ChatRequest;
use axum::body::Body;
use axum::extract::State;
use axum::http::{HeaderMap, HeaderValue};
use axum::response::Response;
use bytes::Bytes;
use futures_util::StreamExt;
use http::header::{CACHE_CONTROL, CONTENT_TYPE};
use tracing::{info, warn};
use uuid::Uuid;

use crate::core::CoreState;
use crate::error::{GatewayError, ProxyError};
use crate::gateway::GatewayResponse;

pub const REQUEST_ID_HEADER: &str = "x-agentgate-request-id";
pub const CONVERSATION_ID_HEADER: &str = "conversation-id";

const STREAM_CONTENT_TYPE: &str = "text/plain; charset=utf-8";

pub async fn chat_handler(
    State(state): State<Arc<CoreState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let trace_id = Uuid::new_v4().to_string();
    let started_at = Instant::now();

    let mut request: ChatRequest = match serde_json::from_slice(&body) {
        Ok(request) => request,
        Err(err) => {
            let err = GatewayError::InvalidBody(err.to_string());
            warn!(
                event = "downstream_responded",
                trace_id = %trace_id,
                status = %err.status().as_u16(),
                error_kind = err.kind(),
                error = %err
            );
            return error_response(ProxyError::from(err), &trace_id);
        }
    };
    if request.conversation_id.is_none() {
        request.conversation_id = conversation_id(&headers);
    }

    let endpoint = request.http_endpoint;
    info!(
        event = "downstream_received",
        trace_id = %trace_id,
        endpoint = endpoint.as_str(),
        conversation_id = ?request.conversation_id,
        messages = request.messages.len(),
        is_stream = endpoint.is_stream()
    );

    match state.gateway.handle(request, &trace_id).await {
        Ok(response) => {
            info!(
                event = "downstream_responded",
                trace_id = %trace_id,
                endpoint = endpoint.as_str(),
                status = 200u16,
                elapsed_ms = started_at.elapsed().as_millis(),
                is_stream = endpoint.is_stream()
            );
            gateway_response(response, &trace_id)
        }
        Err(err) => {
            warn!(
                event = "downstream_responded",
                trace_id = %trace_id,
                endpoint = endpoint.as_str(),
                status = %err.status().as_u16(),
                error_kind = err.kind(),
                error = %err,
                elapsed_ms = started_at.elapsed().as_millis(),
                is_stream = endpoint.is_stream()
            );
            error_response(ProxyError::from(err), &trace_id)
        }
    }
}

pub async fn health_handler() -> &'static str {
    "ok"
}

fn gateway_response(response: GatewayResponse, trace_id: &str) -> Response {
    let mut resp = match response {
        GatewayResponse::Stream(stream) => {
            let mut resp = Response::new(Body::from_stream(stream.map(Ok::<_, Infallible>)));
            resp.headers_mut()
                .insert(CONTENT_TYPE, HeaderValue::from_static(STREAM_CONTENT_TYPE));
            resp.headers_mut()
                .insert(CACHE_CONTROL, HeaderValue::from_static("no-cache"));
            resp
        }
        GatewayResponse::Body(extracted) => {
            let content_type = extracted.content_type();
            let mut resp = Response::new(Body::from(extracted.into_body()));
            resp.headers_mut()
                .insert(CONTENT_TYPE, HeaderValue::from_static(content_type));
            resp
        }
    };
    insert_request_id(&mut resp, trace_id);
    resp
}

fn error_response(err: ProxyError, trace_id: &str) -> Response {
    let mut resp = Response::new(Body::from(err.body));
    *resp.status_mut() = err.status;
    resp.headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static(STREAM_CONTENT_TYPE));
    insert_request_id(&mut resp, trace_id);
    resp
}

fn insert_request_id(resp: &mut Response, trace_id: &str) {
    if let Ok(value) = HeaderValue::from_str(trace_id) {
        resp.headers_mut().insert(REQUEST_ID_HEADER, value);
    }
}

fn conversation_id(headers: &HeaderMap) -> Option<String> {
    headers
        .get(CONVERSATION_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(|value| value.to_string())
}
