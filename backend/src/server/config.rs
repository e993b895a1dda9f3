//! Server configuration assembled from [`AppSettings`].

use std::net::{AddrParseError, SocketAddr};
use std::sync::Arc;

use mockable::{Clock, DefaultClock};
use tracing::{info, warn};

use crate::config::AppSettings;
use crate::domain::ports::{ObjectStorage, ObjectStorageError, TokenVerifier};
use crate::middleware::RateLimiter;
use crate::outbound::identity::{StaticTokenVerifier, TokenTableError};
use crate::outbound::storage::ObjectStoreStorage;

/// Reasons the server cannot be configured.
#[derive(Debug, thiserror::Error)]
pub enum ServerConfigError {
    #[error("invalid bind address: {0}")]
    BindAddr(#[from] AddrParseError),
    #[error("object storage: {0}")]
    Storage(#[from] ObjectStorageError),
    #[error("auth token table: {0}")]
    Tokens(#[from] TokenTableError),
}

/// Caps and pool sizes bounding the cost of scans.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanLimits {
    pub scan_workers: usize,
    pub stats_scan_cap: usize,
    pub data_rights_scan_cap: usize,
    pub day_scan_cap: usize,
    pub max_range_days: u32,
}

impl From<&AppSettings> for ScanLimits {
    fn from(settings: &AppSettings) -> Self {
        Self {
            scan_workers: settings.scan_workers(),
            stats_scan_cap: settings.stats_scan_cap(),
            data_rights_scan_cap: settings.data_rights_scan_cap(),
            day_scan_cap: settings.day_scan_cap(),
            max_range_days: settings.max_range_days(),
        }
    }
}

impl Default for ScanLimits {
    fn default() -> Self {
        Self::from(&AppSettings::default())
    }
}

/// Everything needed to build the HTTP server.
#[derive(Clone)]
pub struct ServerConfig {
    pub(crate) bind_addr: SocketAddr,
    pub(crate) storage: Arc<dyn ObjectStorage>,
    pub(crate) tokens: Arc<dyn TokenVerifier>,
    pub(crate) clock: Arc<dyn Clock>,
    pub(crate) limits: ScanLimits,
    pub(crate) rate_limiter: Arc<RateLimiter>,
}

impl ServerConfig {
    /// Configuration with default limits and rate limiting.
    #[must_use]
    pub fn new(
        bind_addr: SocketAddr,
        storage: Arc<dyn ObjectStorage>,
        tokens: Arc<dyn TokenVerifier>,
    ) -> Self {
        let defaults = AppSettings::default();
        Self {
            bind_addr,
            storage,
            tokens,
            clock: Arc::new(DefaultClock),
            limits: ScanLimits::default(),
            rate_limiter: Arc::new(RateLimiter::new(
                defaults.rate_limit_max_requests(),
                defaults.rate_limit_window(),
            )),
        }
    }

    /// Build the configuration, connecting to S3 when credentials are set.
    pub fn from_settings(settings: &AppSettings) -> Result<Self, ServerConfigError> {
        let storage: Arc<dyn ObjectStorage> = match settings.s3_settings() {
            Some(s3) => {
                info!(bucket = %s3.bucket, region = %s3.region, "using S3-compatible storage");
                Arc::new(ObjectStoreStorage::s3(&s3)?)
            }
            None => {
                warn!("storage bucket or credentials missing; submissions are kept in memory");
                Arc::new(ObjectStoreStorage::in_memory())
            }
        };
        let tokens = StaticTokenVerifier::parse(settings.auth_tokens())?;
        if tokens.is_empty() {
            warn!("no auth tokens configured; every bearer token will be rejected");
        }
        Ok(Self::new(settings.bind_addr()?, storage, Arc::new(tokens))
            .with_limits(ScanLimits::from(settings))
            .with_rate_limiter(Arc::new(RateLimiter::new(
                settings.rate_limit_max_requests(),
                settings.rate_limit_window(),
            ))))
    }

    #[must_use]
    pub fn with_limits(mut self, limits: ScanLimits) -> Self {
        self.limits = limits;
        self
    }

    #[must_use]
    pub fn with_rate_limiter(mut self, rate_limiter: Arc<RateLimiter>) -> Self {
        self.rate_limiter = rate_limiter;
        self
    }

    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    #[must_use]
    pub fn bind_addr(&self) -> SocketAddr {
        self.bind_addr
    }

    #[must_use]
    pub fn limits(&self) -> ScanLimits {
        self.limits
    }
}
