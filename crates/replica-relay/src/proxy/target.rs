//! Destination resolution for the binary forwarder
//!
//! Every forwarded request names its target through the `url` query
//! parameter. The parameter may be absolute or a bare path; either way the
//! resolved URL has to stay underneath the single trusted upstream.

use url::Url;

use super::error::ForwardError;
use crate::error::{RelayError, Result};

/// The single trusted replica base URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpstreamEndpoint {
    base: Url,
}

impl UpstreamEndpoint {
    /// Parse the configured upstream URL
    ///
    /// Only http and https are accepted, and the URL must carry a host.
    /// The stored form is normalized by the `url` crate, so a bare origin
    /// like `http://127.0.0.1:4943` becomes `http://127.0.0.1:4943/`.
    pub fn parse(raw: &str) -> Result<Self> {
        let base = Url::parse(raw)
            .map_err(|e| RelayError::Config(format!("Invalid upstream URL '{raw}': {e}")))?;

        let scheme = base.scheme();
        if scheme != "http" && scheme != "https" {
            return Err(RelayError::Config(format!(
                "Unsupported upstream scheme '{scheme}': only http and https are allowed"
            )));
        }

        if base.host_str().is_none() {
            return Err(RelayError::Config(format!(
                "Upstream URL '{raw}' has no host"
            )));
        }

        Ok(Self { base })
    }

    pub fn url(&self) -> &Url {
        &self.base
    }

    pub fn as_str(&self) -> &str {
        self.base.as_str()
    }

    /// Resolve a `url` parameter to an absolute URL under this upstream
    ///
    /// A parameter that does not parse as absolute is not an error; it is
    /// joined against the base instead. Whatever comes out must start with
    /// the base's string form or the request is refused.
    pub fn resolve(&self, param: &str) -> std::result::Result<Url, ForwardError> {
        let resolved = match Url::parse(param) {
            Ok(url) => url,
            Err(_) => self
                .base
                .join(param)
                .map_err(|e| ForwardError::InvalidDestination {
                    target: param.to_string(),
                    reason: format!("could not resolve against {}: {e}", self.base),
                })?,
        };

        if !resolved.as_str().starts_with(self.base.as_str()) {
            return Err(ForwardError::InvalidDestination {
                target: param.to_string(),
                reason: format!("target must start with {}", self.base),
            });
        }

        Ok(resolved)
    }
}

impl std::fmt::Display for UpstreamEndpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.base)
    }
}
