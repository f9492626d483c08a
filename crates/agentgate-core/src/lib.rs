pub mod core;
pub mod error;
pub mod gateway;
pub mod handler;
pub mod session;
pub mod stream;
pub mod upstream_client;

pub use core::{Core, CoreState};
pub use error::{GatewayError, ProxyError};
pub use gateway::{Gateway, GatewayResponse};
pub use handler::{CONVERSATION_ID_HEADER, REQUEST_ID_HEADER};
pub use session::{InitOutcome, InitStore, MemoryInitStore, SessionInitializer};
pub use stream::spawn_transform;
pub use upstream_client::{
    UpstreamBody, UpstreamClient, UpstreamClientConfig, UpstreamFailure, UpstreamHttpRequest,
    UpstreamHttpResponse, UpstreamTransportErrorKind, WreqUpstreamClient,
};
