//! Driven port resolving bearer tokens to user identities.

use async_trait::async_trait;

use crate::domain::UserId;

use super::define_port_error;

define_port_error! {
    /// Errors raised by token verifiers.
    pub enum TokenVerifierError {
        /// The token is unknown, expired, or malformed.
        Rejected => "token rejected",
        /// The verifier could not reach its backing service.
        Unavailable { message: String } => "token verifier unavailable: {message}",
    }
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TokenVerifier: Send + Sync {
    async fn verify(&self, token: &str) -> Result<UserId, TokenVerifierError>;
}

/// Verifier that rejects every token; used where authentication is unused.
#[derive(Debug, Default, Clone, Copy)]
pub struct FixtureTokenVerifier;

#[async_trait]
impl TokenVerifier for FixtureTokenVerifier {
    async fn verify(&self, _token: &str) -> Result<UserId, TokenVerifierError> {
        Err(TokenVerifierError::rejected())
    }
}
