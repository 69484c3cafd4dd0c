//! Authenticator implementations for chatforge.
//!
//! The core only knows the `Authenticator` trait: credential in, principal
//! or rejection out. Two implementations live here:
//! - [`StaticTokenAuthenticator`] — a configured map of bearer tokens to
//!   principals, compared via SHA-256 digests.
//! - [`DevAuthenticator`] — accepts anything and maps it to a fixed
//!   development principal. Never the default when tokens are configured.

use std::collections::HashMap;

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use chatforge_core::auth::Authenticator;
use chatforge_core::error::AuthError;
use chatforge_core::turn::PrincipalId;

fn digest(token: &str) -> [u8; 32] {
    Sha256::digest(token.as_bytes()).into()
}

/// Validates bearer tokens against a configured token → principal map.
///
/// Tokens are stored and compared as SHA-256 digests, so lookup time does
/// not depend on how much of a guessed token matches.
pub struct StaticTokenAuthenticator {
    principals: HashMap<[u8; 32], PrincipalId>,
}

impl StaticTokenAuthenticator {
    /// Build from (token, principal) pairs.
    pub fn new<I, T, P>(tokens: I) -> Self
    where
        I: IntoIterator<Item = (T, P)>,
        T: AsRef<str>,
        P: Into<PrincipalId>,
    {
        Self {
            principals: tokens
                .into_iter()
                .map(|(token, principal)| (digest(token.as_ref()), principal.into()))
                .collect(),
        }
    }
}

#[async_trait]
impl Authenticator for StaticTokenAuthenticator {
    async fn authenticate(&self, credential: &str) -> Result<PrincipalId, AuthError> {
        match self.principals.get(&digest(credential)) {
            Some(principal) => {
                debug!(principal = %principal, "Credential accepted");
                Ok(principal.clone())
            }
            None => {
                warn!("Credential rejected: unknown token");
                Err(AuthError::Rejected("unknown token".into()))
            }
        }
    }
}

/// Development-only authenticator: every credential resolves to one fixed
/// principal.
pub struct DevAuthenticator {
    principal: PrincipalId,
}

impl DevAuthenticator {
    pub fn new(principal: impl Into<PrincipalId>) -> Self {
        Self {
            principal: principal.into(),
        }
    }
}

#[async_trait]
impl Authenticator for DevAuthenticator {
    async fn authenticate(&self, _credential: &str) -> Result<PrincipalId, AuthError> {
        Ok(self.principal.clone())
    }
}
