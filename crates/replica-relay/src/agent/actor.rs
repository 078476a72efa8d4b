//! Binding typed service interfaces to canisters
//!
//! A [`ServiceDescription`] declares a method table and how to wrap an
//! [`ActorHandle`] into its typed interface. [`ServiceBinder`] is the one
//! place where the two meet; every method call on the resulting interface
//! funnels through [`ActorHandle::invoke`].

use std::sync::Arc;

use bytes::Bytes;

use super::canister::CanisterId;
use super::client::ReplicaClient;
use super::identity::Principal;
use crate::error::{RelayError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MethodKind {
    /// Read-only, answered by a single replica
    Query,
    /// State-changing, goes through consensus
    Update,
}

/// One entry of a service's method table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MethodSpec {
    pub name: &'static str,
    pub kind: MethodKind,
}

impl MethodSpec {
    pub const fn query(name: &'static str) -> Self {
        Self {
            name,
            kind: MethodKind::Query,
        }
    }

    pub const fn update(name: &'static str) -> Self {
        Self {
            name,
            kind: MethodKind::Update,
        }
    }
}

/// A remote service interface
///
/// # Example
/// ```
/// use replica_relay::agent::{ActorHandle, MethodSpec, ServiceDescription};
///
/// struct Profiles;
///
/// struct ProfilesActor(ActorHandle);
///
/// impl ServiceDescription for Profiles {
///     type Interface = ProfilesActor;
///
///     fn name(&self) -> &str {
///         "profiles"
///     }
///
///     fn methods(&self) -> &[MethodSpec] {
///         const METHODS: &[MethodSpec] =
///             &[MethodSpec::query("get_profile"), MethodSpec::update("set_bio")];
///         METHODS
///     }
///
///     fn bind(&self, handle: ActorHandle) -> ProfilesActor {
///         ProfilesActor(handle)
///     }
/// }
/// ```
pub trait ServiceDescription: Send + Sync {
    type Interface;

    fn name(&self) -> &str;

    fn methods(&self) -> &[MethodSpec];

    fn bind(&self, handle: ActorHandle) -> Self::Interface;
}

/// What every actor holds: one canister, one client, one method table
#[derive(Debug, Clone)]
pub struct ActorHandle {
    canister_id: CanisterId,
    client: Arc<ReplicaClient>,
    service: Arc<str>,
    methods: Arc<[MethodSpec]>,
}

impl ActorHandle {
    pub fn canister_id(&self) -> &CanisterId {
        &self.canister_id
    }

    pub fn client(&self) -> &Arc<ReplicaClient> {
        &self.client
    }

    pub fn service(&self) -> &str {
        &self.service
    }

    pub fn sender(&self) -> Principal {
        self.client.sender()
    }

    pub fn method(&self, name: &str) -> Option<MethodSpec> {
        self.methods.iter().find(|m| m.name == name).copied()
    }

    /// Send an encoded envelope for `method`, dispatching on its kind
    pub async fn invoke(&self, method: &str, envelope: Bytes) -> Result<Bytes> {
        let spec = self.method(method).ok_or_else(|| RelayError::UnknownMethod {
            service: self.service.to_string(),
            method: method.to_string(),
        })?;

        tracing::debug!(
            service = %self.service,
            canister = %self.canister_id,
            method,
            kind = ?spec.kind,
            sender = %self.sender(),
            "Invoking actor method"
        );

        match spec.kind {
            MethodKind::Query => self.client.query(&self.canister_id, envelope).await,
            MethodKind::Update => self.client.call(&self.canister_id, envelope).await,
        }
    }

    /// Poll the status of an update call
    pub async fn read_state(&self, envelope: Bytes) -> Result<Bytes> {
        self.client.read_state(&self.canister_id, envelope).await
    }
}

/// Turns a service description plus a client into its typed interface
pub struct ServiceBinder<'a, S: ServiceDescription> {
    service: &'a S,
}

impl<'a, S: ServiceDescription> ServiceBinder<'a, S> {
    pub fn new(service: &'a S) -> Self {
        Self { service }
    }

    pub fn bind(&self, canister_id: CanisterId, client: Arc<ReplicaClient>) -> S::Interface {
        let handle = ActorHandle {
            canister_id,
            client,
            service: Arc::from(self.service.name()),
            methods: Arc::from(self.service.methods()),
        };
        self.service.bind(handle)
    }
}
