use agentgate_protocol::EndpointFamily;
use serde_json::Value as JsonValue;

use crate::probe::{CA_RAG_PROBES, GENERATE_PROBES, first_content};

/// Body returned to the browser for a non-streaming call.
#[derive(Debug, Clone, PartialEq)]
pub enum Extracted {
    Text(String),
    Json(JsonValue),
}

impl Extracted {
    pub fn content_type(&self) -> &'static str {
        match self {
            Extracted::Text(_) => "text/plain; charset=utf-8",
            Extracted::Json(_) => "application/json",
        }
    }

    pub fn into_body(self) -> String {
        match self {
            Extracted::Text(text) => text,
            Extracted::Json(value) => value.to_string(),
        }
    }
}

/// Flattens one upstream response body. Never fails: anything that is not
/// recognisable JSON comes back as the original text.
pub fn extract_response(body: &str, family: EndpointFamily) -> Extracted {
    let Ok(value) = serde_json::from_str::<JsonValue>(body) else {
        return Extracted::Text(body.to_string());
    };

    let probes = match family {
        EndpointFamily::CaRag => CA_RAG_PROBES,
        EndpointFamily::Generate | EndpointFamily::Chat => GENERATE_PROBES,
    };
    if let Some(text) = first_content(&value, probes) {
        return Extracted::Text(text.to_string());
    }

    match family {
        EndpointFamily::Generate => Extracted::Text(body.to_string()),
        EndpointFamily::Chat | EndpointFamily::CaRag if is_structured(&value) => {
            Extracted::Json(value)
        }
        EndpointFamily::Chat | EndpointFamily::CaRag => Extracted::Text(body.to_string()),
    }
}

fn is_structured(value: &JsonValue) -> bool {
    matches!(value, JsonValue::Object(_) | JsonValue::Array(_))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn generate_probes_in_order() {
        let body = r#"{"output": "b", "answer": "c"}"#;
        assert_eq!(
            extract_response(body, EndpointFamily::Generate),
            Extracted::Text("b".to_string())
        );
        let body = r#"{"choices": [{"message": {"content": "m"}}]}"#;
        assert_eq!(
            extract_response(body, EndpointFamily::Generate),
            Extracted::Text("m".to_string())
        );
    }

    #[test]
    fn generate_without_match_returns_raw_text() {
        let body = r#"{"unexpected": true}"#;
        assert_eq!(
            extract_response(body, EndpointFamily::Generate),
            Extracted::Text(body.to_string())
        );
    }

    #[test]
    fn chat_without_match_returns_parsed_json() {
        let body = r#"{"id": "x", "object": "chat.completion"}"#;
        let extracted = extract_response(body, EndpointFamily::Chat);
        assert_eq!(
            extracted,
            Extracted::Json(json!({"id": "x", "object": "chat.completion"}))
        );
        assert_eq!(extracted.content_type(), "application/json");
    }

    #[test]
    fn ca_rag_prefers_result_then_choices() {
        let body = r#"{"result": "from rag", "value": "ignored"}"#;
        assert_eq!(
            extract_response(body, EndpointFamily::CaRag),
            Extracted::Text("from rag".to_string())
        );
        let body = r#"{"choices": [{"message": {"content": "m"}}]}"#;
        assert_eq!(
            extract_response(body, EndpointFamily::CaRag),
            Extracted::Text("m".to_string())
        );
        let body = r#"{"value": "not a rag field"}"#;
        assert!(matches!(
            extract_response(body, EndpointFamily::CaRag),
            Extracted::Json(_)
        ));
    }

    #[test]
    fn non_json_is_returned_unchanged_and_idempotent() {
        for family in [EndpointFamily::Chat, EndpointFamily::Generate, EndpointFamily::CaRag] {
            let first = extract_response("plain answer", family).into_body();
            assert_eq!(first, "plain answer");
            let second = extract_response(&first, family).into_body();
            assert_eq!(second, first);
        }
    }

    #[test]
    fn extracted_scalar_text_survives_a_second_pass() {
        let first = extract_response(r#"{"output": "42"}"#, EndpointFamily::Generate).into_body();
        assert_eq!(first, "42");
        assert_eq!(
            extract_response(&first, EndpointFamily::Generate).into_body(),
            "42"
        );
        assert_eq!(extract_response(&first, EndpointFamily::Chat).into_body(), "42");
    }
}
