//! Test utilities shared by unit tests (in `src/`) and integration tests (in
//! `tests/`).
//!
//! Compiled for `cfg(test)` and behind the `test-support` feature.

use std::net::SocketAddr;
use std::sync::Arc;

use chrono::{DateTime, Local, Utc};
use mockable::Clock;

use crate::domain::ports::{ObjectStorage, TokenVerifier};
use crate::outbound::storage::ObjectStoreStorage;
use crate::server::ServerConfig;

/// Clock frozen at a single instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn local(&self) -> DateTime<Local> {
        self.0.with_timezone(&Local)
    }

    fn utc(&self) -> DateTime<Utc> {
        self.0
    }
}

/// Server configuration over a fresh in-memory bucket.
///
/// Returns the storage handle too, so tests can seed or inspect objects
/// behind the server's back.
///
/// # Examples
/// ```
/// use std::sync::Arc;
/// use pramana::domain::ports::FixtureTokenVerifier;
/// use pramana::test_support::in_memory_config;
///
/// let (config, _storage) = in_memory_config(Arc::new(FixtureTokenVerifier));
/// assert_eq!(config.bind_addr().port(), 0);
/// ```
pub fn in_memory_config(tokens: Arc<dyn TokenVerifier>) -> (ServerConfig, Arc<ObjectStoreStorage>) {
    let storage = Arc::new(ObjectStoreStorage::in_memory());
    let addr = SocketAddr::from(([127, 0, 0, 1], 0));
    let shared: Arc<dyn ObjectStorage> = storage.clone();
    let config = ServerConfig::new(addr, shared, tokens);
    (config, storage)
}
