use serde::{Deserialize, Serialize};

/// Conversation id used when the client does not send one.
pub const DEFAULT_CONVERSATION_ID: &str = "default";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Backend endpoint selected by the client. Closed set; each variant maps to
/// exactly one upstream path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EndpointId {
    Chat,
    ChatStream,
    Generate,
    GenerateStream,
    ChatCaRag,
}

/// Payload-construction strategy shared by one or more endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EndpointFamily {
    Chat,
    Generate,
    CaRag,
}

impl EndpointId {
    pub const ALL: [EndpointId; 5] = [
        EndpointId::Chat,
        EndpointId::ChatStream,
        EndpointId::Generate,
        EndpointId::GenerateStream,
        EndpointId::ChatCaRag,
    ];

    pub fn path(self) -> &'static str {
        match self {
            EndpointId::Chat => "/chat",
            EndpointId::ChatStream => "/chat/stream",
            EndpointId::Generate => "/generate",
            EndpointId::GenerateStream => "/generate/stream",
            EndpointId::ChatCaRag => "/call",
        }
    }

    pub fn family(self) -> EndpointFamily {
        match self {
            EndpointId::Chat | EndpointId::ChatStream => EndpointFamily::Chat,
            EndpointId::Generate | EndpointId::GenerateStream => EndpointFamily::Generate,
            EndpointId::ChatCaRag => EndpointFamily::CaRag,
        }
    }

    pub fn is_stream(self) -> bool {
        matches!(self, EndpointId::ChatStream | EndpointId::GenerateStream)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            EndpointId::Chat => "CHAT",
            EndpointId::ChatStream => "CHAT_STREAM",
            EndpointId::Generate => "GENERATE",
            EndpointId::GenerateStream => "GENERATE_STREAM",
            EndpointId::ChatCaRag => "CHAT_CA_RAG",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdditionalProps {
    #[serde(default = "default_true")]
    pub enable_intermediate_steps: bool,
}

impl Default for AdditionalProps {
    fn default() -> Self {
        Self {
            enable_intermediate_steps: true,
        }
    }
}

fn default_true() -> bool {
    true
}

/// Body accepted from the browser for one chat turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    pub messages: Vec<Message>,
    pub http_endpoint: EndpointId,
    /// Raw JSON object text, or empty.
    #[serde(default)]
    pub optional_generation_parameters: String,
    #[serde(default)]
    pub additional_props: AdditionalProps,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conversation_id: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_deserializes_from_browser_shape() {
        let raw = r#"{
            "messages": [{"role": "user", "content": "hi"}],
            "httpEndpoint": "GENERATE_STREAM",
            "optionalGenerationParameters": "",
            "additionalProps": {"enableIntermediateSteps": false}
        }"#;
        let req: ChatRequest = serde_json::from_str(raw).unwrap();
        assert_eq!(req.http_endpoint, EndpointId::GenerateStream);
        assert!(!req.additional_props.enable_intermediate_steps);
        assert_eq!(req.conversation_id, None);
        assert_eq!(req.messages.last(), Some(&Message::user("hi")));
    }

    #[test]
    fn missing_optional_fields_take_defaults() {
        let raw = r#"{"messages": [], "httpEndpoint": "CHAT_CA_RAG"}"#;
        let req: ChatRequest = serde_json::from_str(raw).unwrap();
        assert!(req.optional_generation_parameters.is_empty());
        assert!(req.additional_props.enable_intermediate_steps);
    }

    #[test]
    fn unknown_endpoint_is_rejected() {
        let raw = r#"{"messages": [], "httpEndpoint": "ADMIN"}"#;
        assert!(serde_json::from_str::<ChatRequest>(raw).is_err());
    }

    #[test]
    fn endpoint_table() {
        for endpoint in EndpointId::ALL {
            let json = serde_json::to_string(&endpoint).unwrap();
            assert_eq!(json, format!("\"{}\"", endpoint.as_str()));
        }
        assert_eq!(EndpointId::ChatCaRag.path(), "/call");
        assert_eq!(EndpointId::GenerateStream.family(), EndpointFamily::Generate);
        assert!(EndpointId::ChatStream.is_stream());
        assert!(!EndpointId::ChatCaRag.is_stream());
    }
}
