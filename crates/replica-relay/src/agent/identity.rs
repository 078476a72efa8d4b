//! Signing identities bound into replica clients

use std::fmt;

use ed25519_dalek::{Signer, SigningKey};

use crate::error::{RelayError, Result};

/// Textual principal of a caller
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Principal(String);

impl Principal {
    /// Textual form of the anonymous principal
    pub const ANONYMOUS: &'static str = "2vxsx-fae";

    pub fn anonymous() -> Self {
        Principal(Self::ANONYMOUS.to_string())
    }

    pub fn from_text(text: impl Into<String>) -> Self {
        Principal(text.into())
    }

    pub fn is_anonymous(&self) -> bool {
        self.0 == Self::ANONYMOUS
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Principal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An authentication/signing context
///
/// Implementations must be cheap to share; clients hold them behind `Arc`.
pub trait Identity: Send + Sync + fmt::Debug {
    fn principal(&self) -> Principal;

    /// Raw public key, if the identity has one
    fn public_key(&self) -> Option<Vec<u8>>;

    fn sign(&self, content: &[u8]) -> Result<Vec<u8>>;
}

/// The identity of unauthenticated callers. It cannot sign.
#[derive(Debug, Clone, Copy, Default)]
pub struct AnonymousIdentity;

impl Identity for AnonymousIdentity {
    fn principal(&self) -> Principal {
        Principal::anonymous()
    }

    fn public_key(&self) -> Option<Vec<u8>> {
        None
    }

    fn sign(&self, _content: &[u8]) -> Result<Vec<u8>> {
        Err(RelayError::Identity(
            "anonymous identity cannot sign".to_string(),
        ))
    }
}

/// An ed25519 key pair
pub struct BasicIdentity {
    key: SigningKey,
}

impl BasicIdentity {
    pub fn generate() -> Self {
        let mut rng = rand::rngs::OsRng;
        Self {
            key: SigningKey::generate(&mut rng),
        }
    }

    pub fn from_seed(seed: &[u8; 32]) -> Self {
        Self {
            key: SigningKey::from_bytes(seed),
        }
    }
}

impl fmt::Debug for BasicIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BasicIdentity")
            .field("principal", &self.principal())
            .finish_non_exhaustive()
    }
}

impl Identity for BasicIdentity {
    fn principal(&self) -> Principal {
        Principal(hex::encode(self.key.verifying_key().as_bytes()))
    }

    fn public_key(&self) -> Option<Vec<u8>> {
        Some(self.key.verifying_key().to_bytes().to_vec())
    }

    fn sign(&self, content: &[u8]) -> Result<Vec<u8>> {
        Ok(self.key.sign(content).to_bytes().to_vec())
    }
}
