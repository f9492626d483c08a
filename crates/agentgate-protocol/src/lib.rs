//! Wire types shared between the browser-facing handler and the upstream
//! agent backend, plus the newline framer used to decode upstream streams.

pub mod chat;
pub mod lines;
pub mod step;

pub use chat::{
    AdditionalProps, ChatRequest, DEFAULT_CONVERSATION_ID, EndpointFamily, EndpointId, Message,
    Role,
};
pub use lines::LineFramer;
pub use step::{
    IntermediateStepEvent, STEP_CLOSE_TAG, STEP_OPEN_TAG, StepContent, contains_tagged_step,
};
