/// Rejections raised while turning a browser request into an upstream body.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PayloadError {
    #[error("invalid optionalGenerationParameters JSON: {0}")]
    InvalidJson(String),
    #[error("optionalGenerationParameters cannot override reserved field(s): {}", .0.join(", "))]
    ReservedFieldOverride(Vec<String>),
    #[error("invalid request: {0}")]
    InvalidRequest(&'static str),
}

/// Why an outbound URL failed the allow-list.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UrlRejection {
    #[error("invalid url {url}: {reason}")]
    Unparseable { url: String, reason: String },
    #[error("url {0} embeds credentials")]
    EmbeddedCredentials(String),
    #[error("url {url} targets {found}, expected backend host {expected}")]
    HostMismatch {
        url: String,
        found: String,
        expected: String,
    },
    #[error("url {url} uses protocol {scheme}, which is not allowed in {mode} mode")]
    Protocol {
        url: String,
        scheme: String,
        mode: &'static str,
    },
    #[error("url {url} resolves to path {path}, which is not an allowed endpoint")]
    PathNotAllowed { url: String, path: String },
}
