//! Binary forwarder
//!
//! Relays one request to the trusted replica and relays the answer back.
//! Bodies are opaque CBOR and are never decoded: what comes in goes out
//! byte for byte, in both directions.

use std::time::Duration;

use axum::{
    body::Body,
    http::{HeaderMap, HeaderName, HeaderValue, Method, Response, header},
};
use bytes::Bytes;

use super::cors::CorsPolicy;
use super::error::ForwardError;
use super::target::UpstreamEndpoint;
use crate::config::Config;
use crate::error::{RelayError, Result};

pub const CBOR_CONTENT_TYPE: &str = "application/cbor";

/// Inbound headers copied to the upstream on every method
const PASSTHROUGH_HEADERS: &[&str] = &["x-request-id", "x-ic-api-version", "accept"];

/// Extra inbound headers copied on POST
const POST_PASSTHROUGH_HEADERS: &[&str] = &["content-type"];

/// Relayed payloads may carry time-sensitive auth material
const NO_STORE: &str = "no-store, no-cache, must-revalidate, proxy-revalidate";

/// Stateless relay to one upstream
#[derive(Debug, Clone)]
pub struct Forwarder {
    upstream: UpstreamEndpoint,
    cors: CorsPolicy,
    client: reqwest::Client,
}

impl Forwarder {
    pub fn new(upstream: UpstreamEndpoint, cors: CorsPolicy, client: reqwest::Client) -> Self {
        Self {
            upstream,
            cors,
            client,
        }
    }

    /// Build a forwarder from configuration
    pub fn from_config(config: &Config) -> Result<Self> {
        let upstream = UpstreamEndpoint::parse(&config.relay.upstream_url)?;
        let cors = CorsPolicy::new(config.mode, config.relay.allowed_origins.clone());
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.relay.timeout_secs))
            .build()
            .map_err(|e| RelayError::Proxy(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self::new(upstream, cors, client))
    }

    pub fn upstream(&self) -> &UpstreamEndpoint {
        &self.upstream
    }

    pub fn cors(&self) -> &CorsPolicy {
        &self.cors
    }

    /// Answer an OPTIONS request for the proxy route
    pub fn preflight(&self, origin: Option<&str>) -> Response<Body> {
        self.cors.preflight(origin)
    }

    /// Relay one request, turning every failure into a JSON error response
    pub async fn forward(
        &self,
        method: Method,
        url_param: Option<&str>,
        headers: &HeaderMap,
        body: Bytes,
        origin: Option<&str>,
    ) -> Response<Body> {
        match self.try_forward(method, url_param, headers, body, origin).await {
            Ok(response) => response,
            Err(e) => {
                match &e {
                    ForwardError::InvalidDestination { target, .. } => tracing::warn!(
                        error_type = e.category(),
                        origin = origin.unwrap_or(""),
                        target = %target,
                        "Rejected forward to destination outside upstream"
                    ),
                    ForwardError::MissingParameter => tracing::debug!(
                        error_type = e.category(),
                        "Forward request without url parameter"
                    ),
                    _ => tracing::error!(
                        error_type = e.category(),
                        error_message = %e,
                        "Forwarding failed"
                    ),
                }
                e.into_response(self.cors.headers(origin))
            }
        }
    }

    async fn try_forward(
        &self,
        method: Method,
        url_param: Option<&str>,
        headers: &HeaderMap,
        body: Bytes,
        origin: Option<&str>,
    ) -> std::result::Result<Response<Body>, ForwardError> {
        let param = url_param
            .filter(|p| !p.is_empty())
            .ok_or(ForwardError::MissingParameter)?;
        let target = self.upstream.resolve(param)?;

        tracing::debug!(%method, target = %target, bytes = body.len(), "Forwarding to upstream");

        let mut request = self
            .client
            .request(method.clone(), target)
            .headers(outbound_headers(&method, headers));
        if method != Method::GET && method != Method::HEAD {
            request = request.body(body);
        }

        let upstream = request
            .send()
            .await
            .map_err(|e| ForwardError::UpstreamUnavailable(e.to_string()))?;

        let status = upstream.status();
        let content_type = upstream
            .headers()
            .get(header::CONTENT_TYPE)
            .cloned()
            .unwrap_or_else(|| HeaderValue::from_static(CBOR_CONTENT_TYPE));

        let payload = upstream
            .bytes()
            .await
            .map_err(|e| ForwardError::ResponseProcessing(e.to_string()))?;

        tracing::debug!(status = status.as_u16(), bytes = payload.len(), "Upstream responded");

        let mut response = Response::new(Body::from(payload));
        *response.status_mut() = status;
        let response_headers = response.headers_mut();
        response_headers.insert(header::CONTENT_TYPE, content_type);
        response_headers.extend(self.cors.headers(origin));
        response_headers.insert(header::CACHE_CONTROL, HeaderValue::from_static(NO_STORE));
        response_headers.insert(header::PRAGMA, HeaderValue::from_static("no-cache"));
        response_headers.insert(header::EXPIRES, HeaderValue::from_static("0"));

        Ok(response)
    }
}

/// Headers sent upstream: CBOR defaults overridden by the inbound whitelist
///
/// Nothing outside the whitelist is copied, so cookies and authorization
/// never reach the replica.
pub fn outbound_headers(method: &Method, inbound: &HeaderMap) -> HeaderMap {
    let mut outbound = HeaderMap::new();
    outbound.insert(header::ACCEPT, HeaderValue::from_static(CBOR_CONTENT_TYPE));

    let is_post = method == Method::POST;
    if is_post {
        let content_type = inbound
            .get(header::CONTENT_TYPE)
            .cloned()
            .unwrap_or_else(|| HeaderValue::from_static(CBOR_CONTENT_TYPE));
        outbound.insert(header::CONTENT_TYPE, content_type);
    }

    let extra: &[&str] = if is_post { POST_PASSTHROUGH_HEADERS } else { &[] };
    for name in PASSTHROUGH_HEADERS.iter().chain(extra) {
        if let Some(value) = inbound.get(*name) {
            outbound.insert(HeaderName::from_static(*name), value.clone());
        }
    }

    outbound
}
