#![allow(dead_code)]

use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};

use agentgate_common::{GlobalConfig, GlobalConfigPatch};
use agentgate_core::{
    Core, Gateway, MemoryInitStore, UpstreamBody, UpstreamClient, UpstreamFailure,
    UpstreamHttpRequest, UpstreamHttpResponse, UpstreamTransportErrorKind,
};
use bytes::Bytes;

pub const BACKEND: &str = "http://127.0.0.1:8000";

/// Canned reply for one outbound call.
#[derive(Debug, Clone)]
pub struct Scripted {
    pub status: u16,
    pub chunks: Vec<Bytes>,
    /// When set, the call fails before any response arrives.
    pub failure: Option<UpstreamFailure>,
}

impl Scripted {
    pub fn ok(body: &str) -> Self {
        Self::chunks(&[body])
    }

    pub fn chunks(chunks: &[&str]) -> Self {
        Self {
            status: 200,
            chunks: chunks
                .iter()
                .map(|chunk| Bytes::copy_from_slice(chunk.as_bytes()))
                .collect(),
            failure: None,
        }
    }

    pub fn status(status: u16, body: &str) -> Self {
        Self {
            status,
            chunks: vec![Bytes::copy_from_slice(body.as_bytes())],
            failure: None,
        }
    }

    pub fn unreachable(message: &str) -> Self {
        Self {
            status: 0,
            chunks: Vec::new(),
            failure: Some(UpstreamFailure {
                kind: UpstreamTransportErrorKind::Connect,
                message: message.to_string(),
            }),
        }
    }
}

type Responder = dyn Fn(&UpstreamHttpRequest) -> Scripted + Send + Sync;

/// Records every outbound request and answers from a routing closure.
pub struct FakeUpstream {
    requests: Mutex<Vec<UpstreamHttpRequest>>,
    responder: Box<Responder>,
}

impl FakeUpstream {
    pub fn new(
        responder: impl Fn(&UpstreamHttpRequest) -> Scripted + Send + Sync + 'static,
    ) -> Arc<Self> {
        Arc::new(Self {
            requests: Mutex::new(Vec::new()),
            responder: Box::new(responder),
        })
    }

    pub fn always(reply: Scripted) -> Arc<Self> {
        Self::new(move |_| reply.clone())
    }

    pub fn requests(&self) -> Vec<UpstreamHttpRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn urls(&self) -> Vec<String> {
        self.requests().into_iter().map(|req| req.url).collect()
    }

    pub fn calls_to(&self, path: &str) -> usize {
        self.urls().iter().filter(|url| url.ends_with(path)).count()
    }
}

impl UpstreamClient for FakeUpstream {
    fn send<'a>(
        &'a self,
        req: UpstreamHttpRequest,
    ) -> Pin<Box<dyn Future<Output = Result<UpstreamHttpResponse, UpstreamFailure>> + Send + 'a>>
    {
        Box::pin(async move {
            let reply = (self.responder)(&req);
            let is_stream = req.is_stream;
            self.requests.lock().unwrap().push(req);
            if let Some(failure) = reply.failure {
                return Err(failure);
            }

            let body = if is_stream && (200..300).contains(&reply.status) {
                let (tx, rx) = tokio::sync::mpsc::channel(reply.chunks.len().max(1));
                for chunk in reply.chunks {
                    tx.try_send(chunk).unwrap();
                }
                UpstreamBody::Stream(rx)
            } else {
                UpstreamBody::Bytes(Bytes::from(reply.chunks.concat()))
            };
            Ok(UpstreamHttpResponse {
                status: reply.status,
                body,
            })
        })
    }
}

pub fn config(backend_url: Option<&str>, production: bool) -> GlobalConfig {
    GlobalConfigPatch {
        backend_url: backend_url.map(str::to_string),
        production: Some(production),
        ..Default::default()
    }
    .into_config()
    .unwrap()
}

pub fn gateway(config: &GlobalConfig, upstream: Arc<FakeUpstream>) -> Gateway {
    Gateway::new(config, upstream, Arc::new(MemoryInitStore::new())).unwrap()
}

pub fn build_core(config: &GlobalConfig, upstream: Arc<FakeUpstream>) -> Core {
    Core::new(gateway(config, upstream))
}
