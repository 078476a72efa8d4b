//! Per-origin CORS policy
//!
//! Outside production every origin is allowed. In production only the
//! configured origins are, compared case-sensitively. An origin that is not
//! allowed gets no CORS headers at all and the browser does the rest.

use axum::{
    body::Body,
    http::{HeaderMap, HeaderValue, Response, StatusCode, header},
};

use crate::config::DeploymentMode;

pub const ALLOWED_METHODS: &str = "GET, POST, PUT, DELETE, OPTIONS";
pub const ALLOWED_HEADERS: &str = "X-Requested-With, Content-Type, Accept";
pub const MAX_AGE_SECS: u64 = 86_400;

#[derive(Debug, Clone)]
pub struct CorsPolicy {
    mode: DeploymentMode,
    allowed_origins: Vec<String>,
}

impl CorsPolicy {
    pub fn new(mode: DeploymentMode, allowed_origins: Vec<String>) -> Self {
        Self {
            mode,
            allowed_origins,
        }
    }

    pub fn mode(&self) -> DeploymentMode {
        self.mode
    }

    /// The `Access-Control-Allow-Origin` value for a request, if any
    pub fn permitted_origin(&self, origin: Option<&str>) -> Option<String> {
        let origin = origin.filter(|o| !o.is_empty());

        if !self.mode.is_production() {
            return Some(origin.unwrap_or("*").to_string());
        }

        origin
            .filter(|o| self.allowed_origins.iter().any(|allowed| allowed == o))
            .map(str::to_string)
    }

    /// Full CORS header set for an origin; empty when the origin is refused
    pub fn headers(&self, origin: Option<&str>) -> HeaderMap {
        let mut headers = HeaderMap::new();

        let Some(allowed) = self.permitted_origin(origin) else {
            return headers;
        };
        // origins come from a request header, so they are valid header bytes
        let Ok(allow_origin) = HeaderValue::from_str(&allowed) else {
            return headers;
        };

        headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, allow_origin);
        headers.insert(
            header::ACCESS_CONTROL_ALLOW_METHODS,
            HeaderValue::from_static(ALLOWED_METHODS),
        );
        headers.insert(
            header::ACCESS_CONTROL_ALLOW_HEADERS,
            HeaderValue::from_static(ALLOWED_HEADERS),
        );
        headers.insert(
            header::ACCESS_CONTROL_ALLOW_CREDENTIALS,
            HeaderValue::from_static("true"),
        );
        headers.insert(header::ACCESS_CONTROL_MAX_AGE, HeaderValue::from(MAX_AGE_SECS));
        headers
    }

    /// Answer an OPTIONS request
    pub fn preflight(&self, origin: Option<&str>) -> Response<Body> {
        let headers = self.headers(origin);

        if headers.is_empty() {
            tracing::warn!(
                origin = origin.unwrap_or(""),
                "Preflight rejected: origin not allowed"
            );
            let mut response = Response::new(Body::from("Not allowed by CORS"));
            *response.status_mut() = StatusCode::FORBIDDEN;
            return response;
        }

        let mut response = Response::new(Body::empty());
        *response.status_mut() = StatusCode::NO_CONTENT;
        response.headers_mut().extend(headers);
        response
    }
}
