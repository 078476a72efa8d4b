//! Network client for the replica HTTP interface
//!
//! The client only moves bytes. Request envelopes arrive already encoded and
//! responses are returned undecoded; the actor layer above owns the wire
//! format.

use std::sync::Arc;

use bytes::Bytes;
use reqwest::{Method, header};
use url::Url;

use super::canister::CanisterId;
use super::identity::{Identity, Principal};
use crate::error::{RelayError, Result};
use crate::proxy::CBOR_CONTENT_TYPE;

pub const STATUS_PATH: &str = "/api/v2/status";

/// Where requests are sent
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    /// Straight to the replica host
    Direct,
    /// Through a binary forwarder; the replica path travels in `?url=`
    Relay(Url),
}

/// A client for one replica host, optionally carrying an identity
#[derive(Debug)]
pub struct ReplicaClient {
    http: reqwest::Client,
    host: Url,
    route: Route,
    identity: Option<Arc<dyn Identity>>,
    root_key: Option<Bytes>,
}

impl ReplicaClient {
    pub fn new(http: reqwest::Client, host: Url) -> Self {
        Self {
            http,
            host,
            route: Route::Direct,
            identity: None,
            root_key: None,
        }
    }

    pub fn with_identity(mut self, identity: Arc<dyn Identity>) -> Self {
        self.identity = Some(identity);
        self
    }

    pub fn with_relay(mut self, relay: Url) -> Self {
        self.route = Route::Relay(relay);
        self
    }

    pub fn host(&self) -> &Url {
        &self.host
    }

    pub fn route(&self) -> &Route {
        &self.route
    }

    pub fn identity(&self) -> Option<&Arc<dyn Identity>> {
        self.identity.as_ref()
    }

    /// Principal calls are attributed to
    pub fn sender(&self) -> Principal {
        self.identity
            .as_ref()
            .map(|identity| identity.principal())
            .unwrap_or_else(Principal::anonymous)
    }

    /// Sign with the bound identity, for envelope encoders
    pub fn sign(&self, content: &[u8]) -> Result<Vec<u8>> {
        match &self.identity {
            Some(identity) => identity.sign(content),
            None => Err(RelayError::Identity(
                "client has no identity bound".to_string(),
            )),
        }
    }

    /// Status payload captured by the root-key bootstrap, undecoded
    pub fn root_key(&self) -> Option<&Bytes> {
        self.root_key.as_ref()
    }

    /// Trust bootstrap for non-production networks
    pub async fn fetch_root_key(&mut self) -> Result<()> {
        let status = self.status().await?;
        tracing::debug!(bytes = status.len(), host = %self.host, "Fetched root key material");
        self.root_key = Some(status);
        Ok(())
    }

    /// URL a replica path is sent to under the current route
    pub fn endpoint(&self, path: &str) -> Result<Url> {
        match &self.route {
            Route::Direct => self
                .host
                .join(path)
                .map_err(|e| RelayError::Config(format!("Invalid replica path '{path}': {e}"))),
            Route::Relay(relay) => {
                let mut url = relay.clone();
                url.query_pairs_mut().clear().append_pair("url", path);
                Ok(url)
            }
        }
    }

    pub async fn status(&self) -> Result<Bytes> {
        self.send(Method::GET, STATUS_PATH, None).await
    }

    pub async fn query(&self, canister_id: &CanisterId, envelope: Bytes) -> Result<Bytes> {
        self.send(Method::POST, &canister_path(canister_id, "query"), Some(envelope))
            .await
    }

    pub async fn call(&self, canister_id: &CanisterId, envelope: Bytes) -> Result<Bytes> {
        self.send(Method::POST, &canister_path(canister_id, "call"), Some(envelope))
            .await
    }

    pub async fn read_state(&self, canister_id: &CanisterId, envelope: Bytes) -> Result<Bytes> {
        self.send(
            Method::POST,
            &canister_path(canister_id, "read_state"),
            Some(envelope),
        )
        .await
    }

    async fn send(&self, method: Method, path: &str, body: Option<Bytes>) -> Result<Bytes> {
        let url = self.endpoint(path)?;

        let mut request = self
            .http
            .request(method, url)
            .header(header::ACCEPT, CBOR_CONTENT_TYPE);
        if let Some(body) = body {
            request = request
                .header(header::CONTENT_TYPE, CBOR_CONTENT_TYPE)
                .body(body);
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                RelayError::Network(format!("Request timed out: {e}"))
            } else if e.is_connect() {
                RelayError::Network(format!("Failed to connect to replica: {e}"))
            } else {
                RelayError::Network(format!("Request failed: {e}"))
            }
        })?;

        let status = response.status();
        let payload = response
            .bytes()
            .await
            .map_err(|e| RelayError::Network(format!("Failed to read response body: {e}")))?;

        if !status.is_success() {
            return Err(RelayError::Upstream {
                status: status.as_u16(),
                message: String::from_utf8_lossy(&payload).into_owned(),
            });
        }

        Ok(payload)
    }
}

fn canister_path(canister_id: &CanisterId, endpoint: &str) -> String {
    format!("/api/v2/canister/{canister_id}/{endpoint}")
}
