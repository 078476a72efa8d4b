//! Authentication client and session lifetime
//!
//! The interactive flow itself belongs to an [`AuthProvider`]; this module
//! keeps the resulting session and expires it after its maximum lifetime or
//! after it has been idle for too long.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;

use super::identity::Identity;
use crate::config::AgentConfig;
use crate::error::{RelayError, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginOptions {
    /// Identity provider the flow is opened against
    pub identity_provider: String,
    /// Hard cap on session lifetime
    pub max_time_to_live: Duration,
    /// Session ends after this long without activity
    pub idle_timeout: Duration,
}

impl Default for LoginOptions {
    fn default() -> Self {
        Self::from_config(&AgentConfig::default())
    }
}

impl LoginOptions {
    pub fn from_config(config: &AgentConfig) -> Self {
        Self {
            identity_provider: config.identity_provider.clone(),
            max_time_to_live: config.max_time_to_live(),
            idle_timeout: config.idle_timeout(),
        }
    }
}

/// Runs the interactive login flow
#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// A session persisted from an earlier run, if any
    async fn restore(&self) -> Result<Option<Arc<dyn Identity>>> {
        Ok(None)
    }

    async fn authenticate(&self, options: &LoginOptions) -> Result<Arc<dyn Identity>>;

    async fn end_session(&self) -> Result<()> {
        Ok(())
    }
}

/// Provider used when none is configured; every login fails
#[derive(Debug, Clone, Copy, Default)]
pub struct UnavailableProvider;

#[async_trait]
impl AuthProvider for UnavailableProvider {
    async fn authenticate(&self, _options: &LoginOptions) -> Result<Arc<dyn Identity>> {
        Err(RelayError::Authentication(
            "no identity provider configured".to_string(),
        ))
    }
}

/// Provider that always logs in as one fixed identity
#[derive(Debug, Clone)]
pub struct StaticProvider {
    identity: Arc<dyn Identity>,
}

impl StaticProvider {
    pub fn new(identity: Arc<dyn Identity>) -> Self {
        Self { identity }
    }
}

#[async_trait]
impl AuthProvider for StaticProvider {
    async fn authenticate(&self, _options: &LoginOptions) -> Result<Arc<dyn Identity>> {
        Ok(self.identity.clone())
    }
}

#[derive(Debug)]
struct AuthSession {
    identity: Arc<dyn Identity>,
    started: Instant,
    last_activity: Instant,
}

/// Holds the current login session
pub struct AuthClient {
    provider: Arc<dyn AuthProvider>,
    options: LoginOptions,
    session: Mutex<Option<AuthSession>>,
}

impl AuthClient {
    /// Create the client, picking up any session the provider restores
    pub async fn create(provider: Arc<dyn AuthProvider>, options: LoginOptions) -> Self {
        let session = match provider.restore().await {
            Ok(Some(identity)) => {
                tracing::debug!(principal = %identity.principal(), "Restored auth session");
                let now = Instant::now();
                Some(AuthSession {
                    identity,
                    started: now,
                    last_activity: now,
                })
            }
            Ok(None) => None,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to restore auth session");
                None
            }
        };

        Self {
            provider,
            options,
            session: Mutex::new(session),
        }
    }

    pub fn options(&self) -> &LoginOptions {
        &self.options
    }

    pub fn is_authenticated(&self) -> bool {
        self.live_identity(false).is_some()
    }

    /// Current identity without touching the idle timer
    pub fn current(&self) -> Option<Arc<dyn Identity>> {
        self.live_identity(false)
    }

    /// Current identity; counts as session activity
    pub fn identity(&self) -> Option<Arc<dyn Identity>> {
        self.live_identity(true)
    }

    pub async fn login(&self) -> Result<Arc<dyn Identity>> {
        let identity = self.provider.authenticate(&self.options).await?;
        let now = Instant::now();
        *self.lock() = Some(AuthSession {
            identity: identity.clone(),
            started: now,
            last_activity: now,
        });
        Ok(identity)
    }

    pub async fn logout(&self) -> Result<()> {
        self.lock().take();
        self.provider.end_session().await
    }

    fn live_identity(&self, touch: bool) -> Option<Arc<dyn Identity>> {
        let mut slot = self.lock();
        let now = Instant::now();

        let session = slot.as_mut()?;
        let expired = now.duration_since(session.started) >= self.options.max_time_to_live;
        let idle = now.duration_since(session.last_activity) >= self.options.idle_timeout;
        if expired || idle {
            tracing::info!(
                principal = %session.identity.principal(),
                expired,
                idle,
                "Auth session ended"
            );
            *slot = None;
            return None;
        }

        if touch {
            session.last_activity = now;
        }
        Some(session.identity.clone())
    }

    fn lock(&self) -> MutexGuard<'_, Option<AuthSession>> {
        self.session.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl std::fmt::Debug for AuthClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthClient")
            .field("options", &self.options)
            .field("authenticated", &self.is_authenticated())
            .finish_non_exhaustive()
    }
}
