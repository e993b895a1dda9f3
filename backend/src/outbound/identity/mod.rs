//! Token verifier backed by a fixed token table from configuration.
//!
//! Suitable for service-to-service callers and development. Session tokens
//! issued by an external identity provider need their own adapter.

use std::collections::HashMap;

use async_trait::async_trait;

use crate::domain::ports::{TokenVerifier, TokenVerifierError};
use crate::domain::{UserId, UserIdValidationError};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TokenTableError {
    #[error("entry {entry} is not of the form token=user_id")]
    Malformed { entry: usize },
    #[error("entry {entry} has an empty token")]
    EmptyToken { entry: usize },
    #[error("entry {entry} has an invalid user id: {source}")]
    InvalidUser {
        entry: usize,
        source: UserIdValidationError,
    },
}

#[derive(Debug, Clone, Default)]
pub struct StaticTokenVerifier {
    tokens: HashMap<String, UserId>,
}

impl StaticTokenVerifier {
    /// Parse `token=user_id` pairs separated by commas.
    ///
    /// # Examples
    /// ```
    /// use pramana::outbound::identity::StaticTokenVerifier;
    ///
    /// let verifier = StaticTokenVerifier::parse("abc=alice, def=bob").expect("valid table");
    /// assert_eq!(verifier.len(), 2);
    /// assert!(StaticTokenVerifier::parse("abc").is_err());
    /// ```
    pub fn parse(table: &str) -> Result<Self, TokenTableError> {
        let mut tokens = HashMap::new();
        let entries = table
            .split(',')
            .map(str::trim)
            .filter(|entry| !entry.is_empty());
        for (entry, pair) in entries.enumerate() {
            let (token, user) = pair
                .split_once('=')
                .ok_or(TokenTableError::Malformed { entry })?;
            let token = token.trim();
            if token.is_empty() {
                return Err(TokenTableError::EmptyToken { entry });
            }
            let user = UserId::new(user.trim())
                .map_err(|source| TokenTableError::InvalidUser { entry, source })?;
            tokens.insert(token.to_owned(), user);
        }
        Ok(Self { tokens })
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

#[async_trait]
impl TokenVerifier for StaticTokenVerifier {
    async fn verify(&self, token: &str) -> Result<UserId, TokenVerifierError> {
        self.tokens
            .get(token)
            .cloned()
            .ok_or_else(TokenVerifierError::rejected)
    }
}
