use std::time::Duration;

use url::Url;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GlobalConfigError {
    #[error("invalid global config field {field}: {reason}")]
    InvalidField { field: &'static str, reason: String },
}

/// Validated configuration used by the running process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GlobalConfig {
    pub host: String,
    pub port: u16,
    /// Origin of the agent backend, without a trailing slash. `None` is
    /// accepted at startup and reported on every chat request instead.
    pub backend_url: Option<String>,
    /// Requires `https`/`wss` for every outbound call.
    pub production: bool,
    /// Identifier sent to the backend's `/init` for CA-RAG sessions.
    pub rag_uuid: String,
    /// Optional outbound proxy (for upstream egress).
    pub proxy: Option<String>,
    pub connect_timeout_secs: u64,
    pub request_timeout_secs: u64,
    pub stream_idle_timeout_secs: u64,
}

impl GlobalConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn stream_idle_timeout(&self) -> Duration {
        Duration::from_secs(self.stream_idle_timeout_secs)
    }
}

/// Raw settings as collected from the command line and environment. Unset
/// fields fall back to defaults in [`GlobalConfigPatch::into_config`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GlobalConfigPatch {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub backend_url: Option<String>,
    pub production: Option<bool>,
    pub rag_uuid: Option<String>,
    pub proxy: Option<String>,
    pub connect_timeout_secs: Option<u64>,
    pub request_timeout_secs: Option<u64>,
    pub stream_idle_timeout_secs: Option<u64>,
}

impl GlobalConfigPatch {
    pub fn into_config(self) -> Result<GlobalConfig, GlobalConfigError> {
        let port = self.port.unwrap_or(3000);
        if port == 0 {
            return Err(GlobalConfigError::InvalidField {
                field: "port",
                reason: "must be non-zero".to_string(),
            });
        }
        let backend_url = match non_empty(self.backend_url) {
            Some(raw) => Some(normalize_backend_url(&raw)?),
            None => None,
        };
        Ok(GlobalConfig {
            host: self.host.unwrap_or_else(|| "127.0.0.1".to_string()),
            port,
            backend_url,
            production: self.production.unwrap_or(false),
            rag_uuid: non_empty(self.rag_uuid).unwrap_or_else(|| "123456".to_string()),
            proxy: non_empty(self.proxy),
            connect_timeout_secs: positive("connect_timeout_secs", self.connect_timeout_secs, 5)?,
            request_timeout_secs: positive("request_timeout_secs", self.request_timeout_secs, 300)?,
            stream_idle_timeout_secs: positive(
                "stream_idle_timeout_secs",
                self.stream_idle_timeout_secs,
                120,
            )?,
        })
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|item| item.trim().to_string())
        .filter(|item| !item.is_empty())
}

fn positive(field: &'static str, value: Option<u64>, default: u64) -> Result<u64, GlobalConfigError> {
    match value {
        Some(0) => Err(GlobalConfigError::InvalidField {
            field,
            reason: "must be greater than zero".to_string(),
        }),
        Some(value) => Ok(value),
        None => Ok(default),
    }
}

/// The backend must be a bare origin: endpoint paths are appended verbatim
/// and checked against a fixed allow-list.
fn normalize_backend_url(raw: &str) -> Result<String, GlobalConfigError> {
    let invalid = |reason: String| GlobalConfigError::InvalidField {
        field: "backend_url",
        reason,
    };
    let url = Url::parse(raw).map_err(|err| invalid(err.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(invalid(format!("unsupported scheme {}", url.scheme())));
    }
    if url.host_str().is_none() {
        return Err(invalid("missing host".to_string()));
    }
    if url.path() != "/" || url.query().is_some() || url.fragment().is_some() {
        return Err(invalid("must not carry a path, query or fragment".to_string()));
    }
    Ok(url.as_str().trim_end_matches('/').to_string())
}
