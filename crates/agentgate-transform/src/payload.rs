use agentgate_protocol::{EndpointFamily, EndpointId, Message, Role};
use serde_json::{Map, Value as JsonValue, json};

use crate::error::PayloadError;

/// Keys the client may not set through `optionalGenerationParameters`.
pub const RESERVED_FIELDS: [&str; 3] = ["messages", "stream", "input_message"];

/// Extra top-level fields merged into chat payloads.
///
/// Only obtainable through [`parse_generation_parameters`], so a value of this
/// type never holds a reserved key.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GenerationParameters(Map<String, JsonValue>);

impl GenerationParameters {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }
}

/// Parses the raw parameter text sent by the browser.
///
/// Blank input and JSON that is not an object (arrays, null, scalars) yield no
/// parameters. Any reserved key rejects the whole object.
pub fn parse_generation_parameters(raw: &str) -> Result<GenerationParameters, PayloadError> {
    if raw.trim().is_empty() {
        return Ok(GenerationParameters::default());
    }
    let value: JsonValue =
        serde_json::from_str(raw).map_err(|err| PayloadError::InvalidJson(err.to_string()))?;
    let JsonValue::Object(map) = value else {
        return Ok(GenerationParameters::default());
    };

    let mut reserved: Vec<String> = map
        .keys()
        .filter(|key| RESERVED_FIELDS.contains(&key.as_str()))
        .cloned()
        .collect();
    if !reserved.is_empty() {
        reserved.sort();
        reserved.dedup();
        return Err(PayloadError::ReservedFieldOverride(reserved));
    }
    Ok(GenerationParameters(map))
}

/// Builds the upstream JSON body for `endpoint`.
///
/// Generation parameters only apply to the chat family.
pub fn build_payload(
    endpoint: EndpointId,
    messages: &[Message],
    params: &GenerationParameters,
) -> Result<JsonValue, PayloadError> {
    match endpoint.family() {
        EndpointFamily::Chat => {
            let mut body = Map::new();
            body.insert("messages".to_string(), json!(messages));
            body.insert(
                "stream".to_string(),
                JsonValue::Bool(endpoint == EndpointId::ChatStream),
            );
            for (key, value) in &params.0 {
                body.insert(key.clone(), value.clone());
            }
            Ok(JsonValue::Object(body))
        }
        EndpointFamily::Generate => {
            let question = last_user_content(messages)?;
            Ok(json!({ "input_message": question }))
        }
        EndpointFamily::CaRag => {
            let question = last_user_content(messages)?;
            Ok(json!({ "state": { "chat": { "question": question } } }))
        }
    }
}

fn last_user_content(messages: &[Message]) -> Result<&str, PayloadError> {
    match messages.last() {
        Some(message) if message.role == Role::User => Ok(message.content.as_str()),
        Some(_) => Err(PayloadError::InvalidRequest("last message must be a user turn")),
        None => Err(PayloadError::InvalidRequest("messages must not be empty")),
    }
}
