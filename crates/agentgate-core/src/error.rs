use agentgate_transform::{PayloadError, UrlRejection};
use bytes::Bytes;
use http::StatusCode;

use crate::upstream_client::UpstreamFailure;

/// Everything that can stop a chat request before or while it is forwarded.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("backend url is not configured")]
    MissingBackend,
    #[error("invalid backend configuration: {0}")]
    Config(String),
    #[error("invalid request body: {0}")]
    InvalidBody(String),
    #[error(transparent)]
    Payload(#[from] PayloadError),
    #[error("outbound url rejected: {0}")]
    UrlRejected(#[from] UrlRejection),
    #[error("CA-RAG session initialization failed: {0}")]
    InitializationFailed(String),
    #[error("upstream returned status {status}")]
    UpstreamStatus { status: u16, body: String },
    #[error("upstream request failed: {0}")]
    Transport(#[from] UpstreamFailure),
}

impl GatewayError {
    pub fn status(&self) -> StatusCode {
        match self {
            GatewayError::InvalidBody(_) | GatewayError::Payload(_) => StatusCode::BAD_REQUEST,
            GatewayError::UrlRejected(_) => StatusCode::FORBIDDEN,
            GatewayError::MissingBackend
            | GatewayError::Config(_)
            | GatewayError::InitializationFailed(_)
            | GatewayError::UpstreamStatus { .. }
            | GatewayError::Transport(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Short label for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            GatewayError::MissingBackend | GatewayError::Config(_) => "config",
            GatewayError::InvalidBody(_)
            | GatewayError::Payload(_)
            | GatewayError::UrlRejected(_) => "validation",
            GatewayError::InitializationFailed(_)
            | GatewayError::UpstreamStatus { .. }
            | GatewayError::Transport(_) => "upstream",
        }
    }
}

#[derive(Debug)]
pub struct ProxyError {
    pub status: StatusCode,
    pub body: Bytes,
}

impl From<GatewayError> for ProxyError {
    fn from(err: GatewayError) -> Self {
        let status = err.status();
        let body = match err {
            // Forward what the backend said; fall back to the status line.
            GatewayError::UpstreamStatus { status, body } if body.trim().is_empty() => {
                format!("upstream returned status {status}")
            }
            GatewayError::UpstreamStatus { body, .. } => body,
            other => other.to_string(),
        };
        Self {
            status,
            body: Bytes::from(body),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_mapping() {
        let reserved = GatewayError::from(PayloadError::ReservedFieldOverride(vec![
            "messages".to_string(),
        ]));
        let err = ProxyError::from(reserved);
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        assert!(String::from_utf8_lossy(&err.body).contains("messages"));

        let rejected = GatewayError::from(UrlRejection::PathNotAllowed {
            url: "http://h/admin".to_string(),
            path: "/admin".to_string(),
        });
        assert_eq!(rejected.status(), StatusCode::FORBIDDEN);
        assert_eq!(GatewayError::MissingBackend.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn upstream_body_is_forwarded_verbatim() {
        let err = ProxyError::from(GatewayError::UpstreamStatus {
            status: 502,
            body: "model overloaded".to_string(),
        });
        assert_eq!(err.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(&err.body[..], b"model overloaded");

        let err = ProxyError::from(GatewayError::UpstreamStatus {
            status: 404,
            body: String::new(),
        });
        assert_eq!(&err.body[..], b"upstream returned status 404");
    }
}
