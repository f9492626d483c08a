//! Ordered content probes.
//!
//! Backend releases have put the answer text under different keys. Each list
//! below is tried front to back and the first non-empty string wins, so the
//! precedence is data rather than a chain of lookups.

use serde_json::Value as JsonValue;

#[derive(Clone, Copy)]
pub struct ContentProbe {
    pub name: &'static str,
    extract: for<'a> fn(&'a JsonValue) -> Option<&'a str>,
}

impl ContentProbe {
    const fn new(
        name: &'static str,
        extract: for<'a> fn(&'a JsonValue) -> Option<&'a str>,
    ) -> Self {
        Self { name, extract }
    }

    pub fn probe<'a>(&self, value: &'a JsonValue) -> Option<&'a str> {
        (self.extract)(value).filter(|text| !text.is_empty())
    }
}

impl std::fmt::Debug for ContentProbe {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name)
    }
}

pub const VALUE: ContentProbe = ContentProbe::new("value", value_field);
pub const OUTPUT: ContentProbe = ContentProbe::new("output", output_field);
pub const ANSWER: ContentProbe = ContentProbe::new("answer", answer_field);
pub const RESULT: ContentProbe = ContentProbe::new("result", result_field);
pub const CHOICE_MESSAGE: ContentProbe =
    ContentProbe::new("choices[0].message.content", choice_message);
pub const CHOICE_DELTA: ContentProbe = ContentProbe::new("choices[0].delta.content", choice_delta);

fn value_field(v: &JsonValue) -> Option<&str> {
    v.get("value")?.as_str()
}

fn output_field(v: &JsonValue) -> Option<&str> {
    v.get("output")?.as_str()
}

fn answer_field(v: &JsonValue) -> Option<&str> {
    v.get("answer")?.as_str()
}

fn result_field(v: &JsonValue) -> Option<&str> {
    v.get("result")?.as_str()
}

fn choice_message(v: &JsonValue) -> Option<&str> {
    v.get("choices")?.get(0)?.get("message")?.get("content")?.as_str()
}

fn choice_delta(v: &JsonValue) -> Option<&str> {
    v.get("choices")?.get(0)?.get("delta")?.get("content")?.as_str()
}

/// Probes for `data:` frames and the generate-stream whole-body fallback.
pub const STREAM_PROBES: &[ContentProbe] = &[VALUE, OUTPUT, ANSWER, CHOICE_MESSAGE, CHOICE_DELTA];

/// Probes for non-streaming generate and chat responses.
pub const GENERATE_PROBES: &[ContentProbe] = &[VALUE, OUTPUT, ANSWER, CHOICE_MESSAGE];

pub const CA_RAG_PROBES: &[ContentProbe] = &[RESULT, CHOICE_MESSAGE];

pub fn first_content<'a>(value: &'a JsonValue, probes: &[ContentProbe]) -> Option<&'a str> {
    probes.iter().find_map(|probe| probe.probe(value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn earlier_probe_wins() {
        let value = json!({"answer": "c", "output": "b", "value": "a"});
        assert_eq!(first_content(&value, STREAM_PROBES), Some("a"));
        let value = json!({"answer": "c", "output": "b"});
        assert_eq!(first_content(&value, STREAM_PROBES), Some("b"));
    }

    #[test]
    fn empty_and_non_string_fields_are_skipped() {
        let value = json!({"value": "", "output": 42, "answer": "yes"});
        assert_eq!(first_content(&value, STREAM_PROBES), Some("yes"));
    }

    #[test]
    fn choice_shapes() {
        let message = json!({"choices": [{"message": {"content": "m"}}]});
        let delta = json!({"choices": [{"delta": {"content": "d"}}]});
        assert_eq!(first_content(&message, GENERATE_PROBES), Some("m"));
        assert_eq!(first_content(&delta, STREAM_PROBES), Some("d"));
        assert_eq!(first_content(&delta, GENERATE_PROBES), None);
        assert_eq!(first_content(&json!({"choices": []}), STREAM_PROBES), None);
    }

    #[test]
    fn ca_rag_prefers_result() {
        let value = json!({"result": "r", "choices": [{"message": {"content": "m"}}]});
        assert_eq!(first_content(&value, CA_RAG_PROBES), Some("r"));
        assert_eq!(first_content(&json!({"value": "v"}), CA_RAG_PROBES), None);
    }
}
