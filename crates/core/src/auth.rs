//! Authenticator trait — the auth collaborator.
//!
//! Given a raw credential, return the authenticated principal or a
//! rejection. Token-format mechanics (JWT, OIDC, static tokens) are an
//! implementation detail of the collaborator; the core trusts the
//! principal once given.

use async_trait::async_trait;

use crate::error::AuthError;
use crate::turn::PrincipalId;

/// Validates a raw credential and resolves it to a principal.
#[async_trait]
pub trait Authenticator: Send + Sync {
    async fn authenticate(
        &self,
        credential: &str,
    ) -> std::result::Result<PrincipalId, AuthError>;
}
