//! Pure translation between the browser chat request and the agent backend.
//!
//! Nothing in this crate performs IO: the URL guard, payload builder,
//! stream transformer and response extractor are plain functions and state
//! machines so that `agentgate-core` can drive them from any transport.

pub mod error;
pub mod extract;
pub mod payload;
pub mod probe;
pub mod stream;
pub mod url_guard;

pub use error::{PayloadError, UrlRejection};
pub use extract::{Extracted, extract_response};
pub use payload::{
    GenerationParameters, RESERVED_FIELDS, build_payload, parse_generation_parameters,
};
pub use probe::{CA_RAG_PROBES, ContentProbe, GENERATE_PROBES, STREAM_PROBES, first_content};
pub use stream::{
    LineError, LineEvent, Pushed, StreamState, StreamStats, StreamTransformer, StreamVariant,
    parse_line,
};
pub use url_guard::{ENDPOINT_PATHS, UrlPolicy, WEBSOCKET_PATH};
