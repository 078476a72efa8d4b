mod actor;
mod auth;
mod canister;
mod client;
mod identity;
mod registry;
mod timeout;

pub use actor::{ActorHandle, MethodKind, MethodSpec, ServiceBinder, ServiceDescription};
pub use auth::{AuthClient, AuthProvider, LoginOptions, StaticProvider, UnavailableProvider};
pub use canister::{CanisterId, CanisterIdError};
pub use client::{ReplicaClient, Route, STATUS_PATH};
pub use identity::{AnonymousIdentity, BasicIdentity, Identity, Principal};
pub use registry::{ClientState, ConnectionRegistry};
pub use timeout::{DEFAULT_CALL_TIMEOUT, TimeoutError, with_timeout};
