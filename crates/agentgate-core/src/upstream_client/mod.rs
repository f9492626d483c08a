use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use agentgate_common::GlobalConfig;
use bytes::Bytes;
use futures_util::{Stream, StreamExt};
use tracing::debug;
use wreq::{Client, Proxy};

pub type Headers = Vec<(String, String)>;
pub type ByteStream = tokio::sync::mpsc::Receiver<Bytes>;
type ByteSender = tokio::sync::mpsc::Sender<Bytes>;

/// Outbound POST to the agent backend. The URL has already passed the
/// allow-list.
#[derive(Debug, Clone)]
pub struct UpstreamHttpRequest {
    pub url: String,
    pub headers: Headers,
    pub body: Bytes,
    pub is_stream: bool,
}

impl UpstreamHttpRequest {
    pub fn json(url: impl Into<String>, body: Bytes, is_stream: bool) -> Self {
        let mut headers = vec![("content-type".to_string(), "application/json".to_string())];
        if is_stream {
            headers.push(("accept".to_string(), "text/event-stream".to_string()));
        }
        Self {
            url: url.into(),
            headers,
            body,
            is_stream,
        }
    }
}

#[derive(Debug)]
pub enum UpstreamBody {
    Bytes(Bytes),
    /// Chunks pumped by a background reader. Dropping the receiver stops the
    /// reader and releases the upstream connection.
    Stream(ByteStream),
}

impl UpstreamBody {
    /// Collects the whole body.
    pub async fn collect(self) -> Bytes {
        match self {
            UpstreamBody::Bytes(bytes) => bytes,
            UpstreamBody::Stream(mut rx) => {
                let mut buf = Vec::new();
                while let Some(chunk) = rx.recv().await {
                    buf.extend_from_slice(&chunk);
                }
                Bytes::from(buf)
            }
        }
    }
}

#[derive(Debug)]
pub struct UpstreamHttpResponse {
    pub status: u16,
    pub body: UpstreamBody,
}

impl UpstreamHttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpstreamTransportErrorKind {
    Timeout,
    ReadTimeout,
    Connect,
    Dns,
    Tls,
    Other,
}

impl UpstreamTransportErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            UpstreamTransportErrorKind::Timeout => "timeout",
            UpstreamTransportErrorKind::ReadTimeout => "read_timeout",
            UpstreamTransportErrorKind::Connect => "connect",
            UpstreamTransportErrorKind::Dns => "dns",
            UpstreamTransportErrorKind::Tls => "tls",
            UpstreamTransportErrorKind::Other => "other",
        }
    }
}

/// Transport-level failure (no HTTP response).
#[derive(Debug, Clone)]
pub struct UpstreamFailure {
    pub kind: UpstreamTransportErrorKind,
    pub message: String,
}

impl fmt::Display for UpstreamFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} error: {}", self.kind.as_str(), self.message)
    }
}

impl std::error::Error for UpstreamFailure {}

pub trait UpstreamClient: Send + Sync {
    fn send<'a>(
        &'a self,
        req: UpstreamHttpRequest,
    ) -> Pin<Box<dyn Future<Output = Result<UpstreamHttpResponse, UpstreamFailure>> + Send + 'a>>;
}

#[derive(Debug, Clone)]
pub struct UpstreamClientConfig {
    pub proxy: Option<String>,
    pub connect_timeout: Duration,
    /// Whole-call limit for non-streaming requests.
    pub request_timeout: Duration,
    /// Longest gap allowed between two streamed chunks.
    pub stream_idle_timeout: Duration,
}

impl UpstreamClientConfig {
    pub fn from_global(global: &GlobalConfig) -> Self {
        Self {
            proxy: global.proxy.clone(),
            connect_timeout: global.connect_timeout(),
            request_timeout: global.request_timeout(),
            stream_idle_timeout: global.stream_idle_timeout(),
        }
    }
}

impl Default for UpstreamClientConfig {
    fn default() -> Self {
        Self {
            proxy: None,
            connect_timeout: Duration::from_secs(5),
            request_timeout: Duration::from_secs(300),
            stream_idle_timeout: Duration::from_secs(120),
        }
    }
}

#[derive(Clone)]
pub struct WreqUpstreamClient {
    config: UpstreamClientConfig,
    client: Client,
}

impl WreqUpstreamClient {
    pub fn new(config: UpstreamClientConfig) -> Result<Self, wreq::Error> {
        let proxy = normalize_proxy(config.proxy.clone());
        let client = build_client(&config, proxy.as_deref())?;
        Ok(Self { config, client })
    }
}

fn normalize_proxy(value: Option<String>) -> Option<String> {
    value
        .map(|item| item.trim().to_string())
        .filter(|item| !item.is_empty())
}

fn build_client(config: &UpstreamClientConfig, proxy: Option<&str>) -> Result<Client, wreq::Error> {
    let mut builder = Client::builder()
        .connect_timeout(config.connect_timeout)
        .read_timeout(config.stream_idle_timeout);

    if let Some(proxy) = proxy {
        builder = builder.proxy(Proxy::all(proxy)?);
    }

    builder.build()
}

impl UpstreamClient for WreqUpstreamClient {
    fn send<'a>(
        &'a self,
        req: UpstreamHttpRequest,
    ) -> Pin<Box<dyn Future<Output = Result<UpstreamHttpResponse, UpstreamFailure>> + Send + 'a>>
    {
        Box::pin(async move {
            let mut builder = self.client.post(&req.url);
            for (k, v) in &req.headers {
                builder = builder.header(k, v);
            }
            if !req.is_stream {
                // Streams are bounded by the idle timeout instead.
                builder = builder.timeout(self.config.request_timeout);
            }
            builder = builder.body(req.body);

            let resp = builder.send().await.map_err(map_wreq_error)?;
            convert_response(resp, req.is_stream, self.config.stream_idle_timeout).await
        })
    }
}

async fn convert_response(
    resp: wreq::Response,
    want_stream: bool,
    stream_idle_timeout: Duration,
) -> Result<UpstreamHttpResponse, UpstreamFailure> {
    let status = resp.status().as_u16();

    let is_success = (200..300).contains(&status);
    if !is_success || !want_stream {
        let body = resp.bytes().await.map_err(map_wreq_error)?;
        return Ok(UpstreamHttpResponse {
            status,
            body: UpstreamBody::Bytes(body),
        });
    }

    let (tx, rx) = tokio::sync::mpsc::channel::<Bytes>(16);
    tokio::spawn(pump_stream(resp.bytes_stream(), tx, stream_idle_timeout));

    Ok(UpstreamHttpResponse {
        status,
        body: UpstreamBody::Stream(rx),
    })
}

/// Forwards upstream chunks until the body ends, errors, goes idle for
/// `idle_timeout`, or the receiver is dropped. Returning drops `stream`, which
/// releases the upstream connection.
async fn pump_stream<S, E>(stream: S, tx: ByteSender, idle_timeout: Duration)
where
    S: Stream<Item = Result<Bytes, E>>,
    E: fmt::Display,
{
    let mut stream = std::pin::pin!(stream);
    loop {
        let next = tokio::select! {
            _ = tx.closed() => {
                debug!(event = "upstream_stream_released");
                break;
            }
            next = tokio::time::timeout(idle_timeout, stream.next()) => next,
        };
        let item = match next {
            Ok(item) => item,
            Err(_) => {
                debug!(event = "upstream_stream_idle_timeout");
                break;
            }
        };
        let Some(item) = item else {
            break;
        };
        let chunk = match item {
            Ok(chunk) => chunk,
            Err(err) => {
                debug!(event = "upstream_stream_error", error = %err);
                break;
            }
        };
        if tx.send(chunk).await.is_err() {
            break;
        }
    }
}

fn map_wreq_error(err: wreq::Error) -> UpstreamFailure {
    let kind = classify_wreq_error(&err);
    UpstreamFailure {
        kind,
        message: err.to_string(),
    }
}

fn classify_wreq_error(err: &wreq::Error) -> UpstreamTransportErrorKind {
    let message = err.to_string().to_ascii_lowercase();
    if err.is_timeout() {
        if message.contains("read") || message.contains("idle") {
            return UpstreamTransportErrorKind::ReadTimeout;
        }
        return UpstreamTransportErrorKind::Timeout;
    }
    if err.is_connect() {
        if message.contains("dns") || message.contains("resolve") {
            return UpstreamTransportErrorKind::Dns;
        }
        if message.contains("tls") || message.contains("ssl") {
            return UpstreamTransportErrorKind::Tls;
        }
        return UpstreamTransportErrorKind::Connect;
    }
    if message.contains("tls") || message.contains("ssl") {
        return UpstreamTransportErrorKind::Tls;
    }
    UpstreamTransportErrorKind::Other
}
