use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

pub const STEP_OPEN_TAG: &str = "<intermediatestep>";
pub const STEP_CLOSE_TAG: &str = "</intermediatestep>";

/// Progress event (tool call, reasoning step) sent inline with the answer
/// text of a streaming response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntermediateStepEvent {
    pub id: String,
    pub status: String,
    pub error: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub parent_id: String,
    pub intermediate_parent_id: String,
    pub content: StepContent,
    /// Seconds since the epoch, or whatever the backend reported.
    pub time_stamp: JsonValue,
    /// Per-response sequence number assigned by this proxy.
    pub index: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepContent {
    pub name: String,
    pub payload: String,
}

impl IntermediateStepEvent {
    /// Serializes the event wrapped in step tags, ready for the browser.
    pub fn to_tagged(&self) -> Option<String> {
        let json = serde_json::to_string(self).ok()?;
        Some(format!("{STEP_OPEN_TAG}{json}{STEP_CLOSE_TAG}"))
    }
}

/// True when `line` carries a complete, pre-formatted step marker.
pub fn contains_tagged_step(line: &str) -> bool {
    match line.find(STEP_OPEN_TAG) {
        Some(start) => line[start + STEP_OPEN_TAG.len()..].contains(STEP_CLOSE_TAG),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tagged_output_wraps_json() {
        let event = IntermediateStepEvent {
            id: "a".to_string(),
            status: "complete".to_string(),
            error: String::new(),
            kind: "system_intermediate".to_string(),
            parent_id: "default".to_string(),
            intermediate_parent_id: "default".to_string(),
            content: StepContent {
                name: "search".to_string(),
                payload: "found 3".to_string(),
            },
            time_stamp: JsonValue::from(1.5),
            index: 7,
        };
        let tagged = event.to_tagged().unwrap();
        assert!(tagged.starts_with(STEP_OPEN_TAG));
        assert!(tagged.ends_with(STEP_CLOSE_TAG));
        let inner = &tagged[STEP_OPEN_TAG.len()..tagged.len() - STEP_CLOSE_TAG.len()];
        let parsed: IntermediateStepEvent = serde_json::from_str(inner).unwrap();
        assert_eq!(parsed, event);
    }

    #[test]
    fn tag_pair_detection() {
        assert!(contains_tagged_step("x<intermediatestep>{}</intermediatestep>y"));
        assert!(!contains_tagged_step("<intermediatestep>{}"));
        assert!(!contains_tagged_step("</intermediatestep><intermediatestep>"));
        assert!(!contains_tagged_step("plain"));
    }
}
