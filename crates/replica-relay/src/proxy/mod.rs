mod cors;
mod error;
mod forwarder;
mod server;
mod target;

pub use cors::{ALLOWED_HEADERS, ALLOWED_METHODS, CorsPolicy, MAX_AGE_SECS};
pub use error::{ErrorEnvelope, ForwardError};
pub use forwarder::{CBOR_CONTENT_TYPE, Forwarder, outbound_headers};
pub use server::{AppState, RelayServer, create_router};
pub use target::UpstreamEndpoint;
