//! Process-wide connection state
//!
//! A [`ConnectionRegistry`] owns the shared anonymous client and the lazily
//! created [`AuthClient`], which holds the current identity. Identity-bound
//! clients are built fresh on every request and never stored, so
//! authenticated and anonymous flows cannot leak into each other.
//!
//! State is only touched inside short synchronous sections; client
//! construction and the root-key bootstrap run with no lock held.

use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use url::Url;

use super::actor::{ServiceBinder, ServiceDescription};
use super::auth::{AuthClient, AuthProvider, LoginOptions, UnavailableProvider};
use super::canister::CanisterId;
use super::client::ReplicaClient;
use super::identity::Identity;
use super::timeout::{DEFAULT_CALL_TIMEOUT, with_timeout};
use crate::config::{Config, DeploymentMode};
use crate::error::{RelayError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientState {
    NoClient,
    SharedClientReady,
    IdentityBoundClientReady,
}

struct RegistryState {
    phase: ClientState,
    shared: Option<Arc<ReplicaClient>>,
    auth_client: Option<Arc<AuthClient>>,
}

impl Default for RegistryState {
    fn default() -> Self {
        Self {
            phase: ClientState::NoClient,
            shared: None,
            auth_client: None,
        }
    }
}

pub struct ConnectionRegistry {
    mode: DeploymentMode,
    host: Url,
    relay: Option<Url>,
    http: reqwest::Client,
    call_timeout: Duration,
    login_options: LoginOptions,
    auth_provider: Arc<dyn AuthProvider>,
    state: Mutex<RegistryState>,
}

impl ConnectionRegistry {
    pub fn new(host: Url, mode: DeploymentMode) -> Self {
        Self {
            mode,
            host,
            relay: None,
            http: reqwest::Client::new(),
            call_timeout: DEFAULT_CALL_TIMEOUT,
            login_options: LoginOptions::default(),
            auth_provider: Arc::new(UnavailableProvider),
            state: Mutex::new(RegistryState::default()),
        }
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        let host_str = config.agent_host();
        let host = Url::parse(host_str)
            .map_err(|e| RelayError::Config(format!("Invalid agent host '{host_str}': {e}")))?;

        let http = reqwest::Client::builder()
            .timeout(config.agent.request_timeout())
            .build()
            .map_err(|e| RelayError::Config(format!("Failed to create HTTP client: {e}")))?;

        let mut registry = Self::new(host, config.mode)
            .with_http_client(http)
            .with_default_call_timeout(config.agent.call_timeout())
            .with_login_options(LoginOptions::from_config(&config.agent));

        if let Some(relay) = &config.agent.relay_url {
            let relay = Url::parse(relay)
                .map_err(|e| RelayError::Config(format!("Invalid relay URL '{relay}': {e}")))?;
            registry = registry.with_relay(relay);
        }

        Ok(registry)
    }

    /// Route non-production clients through a forwarder
    pub fn with_relay(mut self, relay: Url) -> Self {
        self.relay = Some(relay);
        self
    }

    pub fn with_http_client(mut self, http: reqwest::Client) -> Self {
        self.http = http;
        self
    }

    pub fn with_default_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = timeout;
        self
    }

    pub fn with_login_options(mut self, options: LoginOptions) -> Self {
        self.login_options = options;
        self
    }

    pub fn with_auth_provider(mut self, provider: Arc<dyn AuthProvider>) -> Self {
        self.auth_provider = provider;
        self
    }

    pub fn mode(&self) -> DeploymentMode {
        self.mode
    }

    pub fn host(&self) -> &Url {
        &self.host
    }

    pub fn call_timeout(&self) -> Duration {
        self.call_timeout
    }

    pub fn state(&self) -> ClientState {
        self.lock().phase
    }

    /// Identity of the live session, without counting as activity
    pub fn current_identity(&self) -> Option<Arc<dyn Identity>> {
        let auth = self.lock().auth_client.clone()?;
        auth.current()
    }

    /// Shared anonymous client, or a fresh client bound to `identity`
    pub async fn get_client(&self, identity: Option<Arc<dyn Identity>>) -> Arc<ReplicaClient> {
        if let Some(identity) = identity {
            let client = Arc::new(self.build_client(Some(identity)).await);
            self.lock().phase = ClientState::IdentityBoundClientReady;
            return client;
        }

        {
            let mut state = self.lock();
            if let Some(shared) = state.shared.clone() {
                state.phase = ClientState::SharedClientReady;
                return shared;
            }
        }

        let built = Arc::new(self.build_client(None).await);
        let mut state = self.lock();
        state.phase = ClientState::SharedClientReady;
        // another task may have finished first; keep whichever landed
        state.shared.get_or_insert(built).clone()
    }

    /// Bind `service` to `canister_id`. Actors are not cached.
    pub async fn create_actor<S: ServiceDescription>(
        &self,
        canister_id: &CanisterId,
        service: &S,
        identity: Option<Arc<dyn Identity>>,
    ) -> S::Interface {
        let client = self.get_client(identity).await;
        tracing::debug!(
            service = service.name(),
            canister = %canister_id,
            sender = %client.sender(),
            "Creating actor"
        );
        ServiceBinder::new(service).bind(canister_id.clone(), client)
    }

    /// [`with_timeout`] using this registry's configured deadline
    pub async fn with_call_timeout<F, T>(&self, call: F) -> Result<T>
    where
        F: Future<Output = Result<T>> + Send + 'static,
        T: Send + 'static,
    {
        with_timeout(call, self.call_timeout).await
    }

    pub async fn is_authenticated(&self) -> bool {
        self.auth_client().await.is_authenticated()
    }

    pub async fn get_identity(&self) -> Option<Arc<dyn Identity>> {
        self.auth_client().await.identity()
    }

    /// Run the login flow. Failures are logged and come back as `None`.
    pub async fn login(&self) -> Option<Arc<dyn Identity>> {
        let auth = self.auth_client().await;

        match auth.login().await {
            Ok(identity) => {
                tracing::info!(principal = %identity.principal(), "Login succeeded");
                Some(identity)
            }
            Err(e) => {
                tracing::warn!(error = %e, "Login failed");
                None
            }
        }
    }

    /// End the session and drop every cached client and identity
    pub async fn logout(&self) {
        let auth = self.auth_client().await;
        if let Err(e) = auth.logout().await {
            tracing::warn!(error = %e, "Failed to end auth session");
        }
        self.clear_cache();
    }

    /// Full reset without contacting the identity provider.
    ///
    /// Clients already handed out stay usable by whoever holds them.
    pub fn clear_cache(&self) {
        *self.lock() = RegistryState::default();
        tracing::debug!("Connection registry reset");
    }

    async fn auth_client(&self) -> Arc<AuthClient> {
        if let Some(existing) = self.lock().auth_client.clone() {
            return existing;
        }

        let created = Arc::new(
            AuthClient::create(self.auth_provider.clone(), self.login_options.clone()).await,
        );
        self.lock().auth_client.get_or_insert(created).clone()
    }

    async fn build_client(&self, identity: Option<Arc<dyn Identity>>) -> ReplicaClient {
        let mut client = ReplicaClient::new(self.http.clone(), self.host.clone());

        if !self.mode.is_production() {
            if let Some(relay) = &self.relay {
                client = client.with_relay(relay.clone());
            }
        }
        if let Some(identity) = identity {
            client = client.with_identity(identity);
        }

        if !self.mode.is_production() {
            if let Err(e) = client.fetch_root_key().await {
                tracing::warn!(
                    error = %e,
                    host = %self.host,
                    "Root key bootstrap failed; continuing without it"
                );
            }
        }

        client
    }

    fn lock(&self) -> MutexGuard<'_, RegistryState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl std::fmt::Debug for ConnectionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionRegistry")
            .field("mode", &self.mode)
            .field("host", &self.host.as_str())
            .field("relay", &self.relay.as_ref().map(Url::as_str))
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}
