//! Incremental decoder for agent backend streams.
//!
//! Upstream bodies mix two line-prefixed framings: `data: {json}` frames
//! carrying answer text (terminated by `data: [DONE]`) and intermediate step
//! frames, either as `intermediate_data: {json}` or as lines already wrapped
//! in `<intermediatestep>` tags. The transformer turns them into one byte
//! stream of answer text interleaved with tagged step markers.

use agentgate_protocol::{
    EndpointId, IntermediateStepEvent, LineFramer, StepContent, contains_tagged_step,
};
use bytes::Bytes;
use serde_json::Value as JsonValue;
use time::OffsetDateTime;
use tracing::debug;
use uuid::Uuid;

use crate::probe::{STREAM_PROBES, first_content};

const DATA_PREFIX: &str = "data:";
const STEP_PREFIX: &str = "intermediate_data:";
const DONE_SENTINEL: &str = "[DONE]";

const STEP_KIND: &str = "system_intermediate";
const DEFAULT_STATUS: &str = "in_progress";
const DEFAULT_PARENT: &str = "default";
const DEFAULT_STEP_NAME: &str = "Step";
const DEFAULT_STEP_PAYLOAD: &str = "No details";

/// Protocol variant of the upstream stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamVariant {
    /// `/chat/stream`: no recovery when `[DONE]` is missing.
    Chat,
    /// `/generate/stream`: may answer with one plain JSON document instead of
    /// framed lines; recovered when the stream ends.
    Generate,
}

impl StreamVariant {
    pub fn for_endpoint(endpoint: EndpointId) -> Option<Self> {
        match endpoint {
            EndpointId::ChatStream => Some(StreamVariant::Chat),
            EndpointId::GenerateStream => Some(StreamVariant::Generate),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamState {
    Reading,
    Draining,
    Closed,
}

/// Classification of one complete upstream line.
#[derive(Debug, Clone, PartialEq)]
pub enum LineEvent {
    /// `data: [DONE]`.
    Done,
    Content(String),
    /// Pre-formatted step marker, forwarded verbatim.
    PassThrough(String),
    /// Raw `intermediate_data` payload, still to be normalized and indexed.
    Step(JsonValue),
    Ignored,
}

/// A line that looked like a frame but could not be used. The transformer
/// drops it and keeps streaming.
#[derive(Debug, thiserror::Error)]
pub enum LineError {
    #[error("malformed json in {prefix} frame: {source}")]
    Json {
        prefix: &'static str,
        #[source]
        source: serde_json::Error,
    },
    #[error("data frame carries no content field")]
    NoContent,
}

/// Classifies one line. First match wins: `data:` frames, then tagged step
/// lines, then `intermediate_data:` frames. Step lines are only recognised when
/// `enable_steps` is set.
pub fn parse_line(line: &str, enable_steps: bool) -> Result<LineEvent, LineError> {
    if let Some(rest) = line.strip_prefix(DATA_PREFIX) {
        let rest = rest.trim();
        if rest == DONE_SENTINEL {
            return Ok(LineEvent::Done);
        }
        let value: JsonValue = serde_json::from_str(rest).map_err(|source| LineError::Json {
            prefix: DATA_PREFIX,
            source,
        })?;
        return first_content(&value, STREAM_PROBES)
            .map(|text| LineEvent::Content(text.to_string()))
            .ok_or(LineError::NoContent);
    }

    if !enable_steps {
        return Ok(LineEvent::Ignored);
    }

    if contains_tagged_step(line) {
        return Ok(LineEvent::PassThrough(line.to_string()));
    }

    if let Some(rest) = line.strip_prefix(STEP_PREFIX) {
        let value: JsonValue =
            serde_json::from_str(rest.trim()).map_err(|source| LineError::Json {
                prefix: STEP_PREFIX,
                source,
            })?;
        return Ok(LineEvent::Step(value));
    }

    Ok(LineEvent::Ignored)
}

/// Counters for one transformed response.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StreamStats {
    pub lines: u64,
    pub dropped: u64,
    pub content_chunks: u64,
    pub steps: u64,
    pub done_seen: bool,
    pub fallback_used: bool,
}

/// Output of one [`StreamTransformer::push`].
#[derive(Debug, Default)]
pub struct Pushed {
    pub chunks: Vec<Bytes>,
    /// The transformer reached `Closed`; stop reading upstream.
    pub closed: bool,
}

/// Per-response decode state. One instance per upstream body.
#[derive(Debug)]
pub struct StreamTransformer {
    variant: StreamVariant,
    enable_steps: bool,
    framer: LineFramer,
    raw: String,
    sequence: u64,
    final_emitted: bool,
    /// A prefixed frame was seen, so the body is not one bare JSON document.
    framed: bool,
    state: StreamState,
    stats: StreamStats,
}

impl StreamTransformer {
    pub fn new(variant: StreamVariant, enable_steps: bool) -> Self {
        Self {
            variant,
            enable_steps,
            framer: LineFramer::new(),
            raw: String::new(),
            sequence: 0,
            final_emitted: false,
            framed: false,
            state: StreamState::Reading,
            stats: StreamStats::default(),
        }
    }

    pub fn state(&self) -> StreamState {
        self.state
    }

    pub fn stats(&self) -> StreamStats {
        self.stats
    }

    /// Feeds one upstream chunk. Lines after a `[DONE]` sentinel in the same
    /// chunk are discarded.
    pub fn push(&mut self, chunk: &[u8]) -> Pushed {
        let mut out = Pushed::default();
        if self.state != StreamState::Reading {
            out.closed = self.state == StreamState::Closed;
            return out;
        }

        let text = self.framer.decode(chunk);
        if self.fallback_possible() {
            self.raw.push_str(&text);
        }
        for line in self.framer.push_str(&text) {
            if self.dispatch(&line, &mut out.chunks) {
                self.close();
                out.closed = true;
                return out;
            }
        }
        out
    }

    /// Called once upstream has ended. Flushes the unterminated tail and, for
    /// the generate variant, tries the whole-body JSON fallback.
    pub fn finish(&mut self) -> Vec<Bytes> {
        let mut out = Vec::new();
        if self.state != StreamState::Reading {
            return out;
        }
        self.state = StreamState::Draining;

        if let Some(tail) = self.framer.finish() {
            if self.dispatch(&tail, &mut out) {
                self.close();
                return out;
            }
        }

        if self.fallback_possible() {
            if let Some(answer) = whole_body_answer(&self.raw) {
                self.stats.fallback_used = true;
                self.stats.content_chunks += 1;
                self.final_emitted = true;
                out.push(Bytes::from(answer));
            }
        }

        self.close();
        out
    }

    fn fallback_possible(&self) -> bool {
        self.variant == StreamVariant::Generate
            && !self.framed
            && !self.final_emitted
            && !self.stats.done_seen
    }

    fn close(&mut self) {
        self.state = StreamState::Closed;
        self.raw = String::new();
    }

    /// Returns true on the `[DONE]` sentinel.
    fn dispatch(&mut self, line: &str, out: &mut Vec<Bytes>) -> bool {
        self.stats.lines += 1;
        if !self.framed && is_framed(line) {
            self.framed = true;
            self.raw = String::new();
        }
        match parse_line(line, self.enable_steps) {
            Ok(LineEvent::Done) => {
                self.stats.done_seen = true;
                return true;
            }
            Ok(LineEvent::Content(text)) => {
                self.final_emitted = true;
                self.stats.content_chunks += 1;
                self.raw.clear();
                out.push(Bytes::from(text));
            }
            Ok(LineEvent::PassThrough(line)) => {
                self.stats.steps += 1;
                out.push(Bytes::from(line));
            }
            Ok(LineEvent::Step(payload)) => {
                let event = self.step_event(&payload);
                match event.to_tagged() {
                    Some(tagged) => {
                        self.stats.steps += 1;
                        out.push(Bytes::from(tagged));
                    }
                    None => {
                        debug!(event = "stream_line_dropped", error = "unserializable step");
                        self.stats.dropped += 1;
                    }
                }
            }
            Ok(LineEvent::Ignored) => {}
            Err(err) => {
                debug!(event = "stream_line_dropped", error = %err);
                self.stats.dropped += 1;
            }
        }
        false
    }

    fn step_event(&mut self, payload: &JsonValue) -> IntermediateStepEvent {
        let index = self.sequence;
        self.sequence += 1;
        let content = payload.get("content");
        IntermediateStepEvent {
            id: text_field(payload.get("id")).unwrap_or_else(|| Uuid::new_v4().to_string()),
            status: text_field(payload.get("status")).unwrap_or_else(|| DEFAULT_STATUS.to_string()),
            error: text_field(payload.get("error")).unwrap_or_default(),
            kind: STEP_KIND.to_string(),
            parent_id: text_field(payload.get("parent_id"))
                .unwrap_or_else(|| DEFAULT_PARENT.to_string()),
            intermediate_parent_id: text_field(payload.get("intermediate_parent_id"))
                .unwrap_or_else(|| DEFAULT_PARENT.to_string()),
            content: StepContent {
                name: text_field(payload.get("name"))
                    .or_else(|| text_field(content.and_then(|c| c.get("name"))))
                    .unwrap_or_else(|| DEFAULT_STEP_NAME.to_string()),
                payload: text_field(payload.get("payload"))
                    .or_else(|| text_field(content.and_then(|c| c.get("payload"))))
                    .unwrap_or_else(|| DEFAULT_STEP_PAYLOAD.to_string()),
            },
            time_stamp: payload
                .get("time_stamp")
                .filter(|value| !value.is_null())
                .cloned()
                .unwrap_or_else(now_epoch_seconds),
            index,
        }
    }
}

/// Non-empty strings are taken as-is; other non-null values are serialized.
fn text_field(value: Option<&JsonValue>) -> Option<String> {
    match value? {
        JsonValue::Null => None,
        JsonValue::String(text) if text.is_empty() => None,
        JsonValue::String(text) => Some(text.clone()),
        other => Some(other.to_string()),
    }
}

fn now_epoch_seconds() -> JsonValue {
    let nanos = OffsetDateTime::now_utc().unix_timestamp_nanos();
    JsonValue::from(nanos as f64 / 1_000_000_000.0)
}

fn is_framed(line: &str) -> bool {
    line.starts_with(DATA_PREFIX) || line.starts_with(STEP_PREFIX) || contains_tagged_step(line)
}

fn whole_body_answer(raw: &str) -> Option<String> {
    let value: JsonValue = serde_json::from_str(raw.trim()).ok()?;
    let answer = first_content(&value, STREAM_PROBES)?.trim();
    if answer.is_empty() {
        None
    } else {
        Some(answer.to_string())
    }
}
