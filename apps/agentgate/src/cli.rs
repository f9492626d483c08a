use agentgate_common::GlobalConfigPatch;
use clap::Parser;

#[derive(Debug, Parser)]
#[command(name = "agentgate", version, about)]
pub(crate) struct Cli {
    #[arg(long, env = "AGENTGATE_HOST", default_value = "127.0.0.1")]
    pub(crate) host: String,
    #[arg(long, env = "AGENTGATE_PORT", default_value_t = 3000)]
    pub(crate) port: u16,
    /// Origin of the agent backend, e.g. `http://127.0.0.1:8000`.
    #[arg(long, env = "AGENTGATE_BACKEND_URL")]
    pub(crate) backend_url: Option<String>,
    /// Only https/wss outbound URLs are allowed.
    #[arg(long, env = "AGENTGATE_PRODUCTION")]
    pub(crate) production: bool,
    #[arg(long, env = "AGENTGATE_RAG_UUID", default_value = "123456")]
    pub(crate) rag_uuid: String,
    /// Outbound HTTP proxy for backend calls.
    #[arg(long, env = "AGENTGATE_PROXY")]
    pub(crate) proxy: Option<String>,
    #[arg(long, default_value_t = 5)]
    pub(crate) connect_timeout_secs: u64,
    #[arg(long, default_value_t = 300)]
    pub(crate) request_timeout_secs: u64,
    #[arg(long, default_value_t = 120)]
    pub(crate) stream_idle_timeout_secs: u64,
}

impl Cli {
    pub(crate) fn into_patch(self) -> GlobalConfigPatch {
        GlobalConfigPatch {
            host: Some(self.host),
            port: Some(self.port),
            backend_url: self.backend_url,
            production: Some(self.production),
            rag_uuid: Some(self.rag_uuid),
            proxy: self.proxy,
            connect_timeout_secs: Some(self.connect_timeout_secs),
            request_timeout_secs: Some(self.request_timeout_secs),
            stream_idle_timeout_secs: Some(self.stream_idle_timeout_secs),
        }
    }
}
