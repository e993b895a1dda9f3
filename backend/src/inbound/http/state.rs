//! Shared HTTP adapter state.
//!
//! Handlers receive this through `actix_web::web::Data` and only see domain
//! ports, so they can be exercised with fixtures or mocks and no storage.

use std::sync::Arc;

use mockable::{Clock, DefaultClock};

use crate::domain::ports::{
    DataRightsCommand, FixtureDataRightsCommand, FixtureSubmissionCommand,
    FixtureSubmissionStatsQuery, FixtureTokenVerifier, SubmissionCommand, SubmissionStatsQuery,
    TokenVerifier,
};

/// Default span accepted by date-range queries.
pub const DEFAULT_MAX_RANGE_DAYS: u32 = 366;

/// Port implementations used by the handlers.
#[derive(Clone)]
pub struct HttpStatePorts {
    pub submissions: Arc<dyn SubmissionCommand>,
    pub stats: Arc<dyn SubmissionStatsQuery>,
    pub data_rights: Arc<dyn DataRightsCommand>,
    pub tokens: Arc<dyn TokenVerifier>,
}

impl Default for HttpStatePorts {
    fn default() -> Self {
        Self {
            submissions: Arc::new(FixtureSubmissionCommand),
            stats: Arc::new(FixtureSubmissionStatsQuery),
            data_rights: Arc::new(FixtureDataRightsCommand),
            tokens: Arc::new(FixtureTokenVerifier),
        }
    }
}

/// Dependency bundle for HTTP handlers.
#[derive(Clone)]
pub struct HttpState {
    pub submissions: Arc<dyn SubmissionCommand>,
    pub stats: Arc<dyn SubmissionStatsQuery>,
    pub data_rights: Arc<dyn DataRightsCommand>,
    pub tokens: Arc<dyn TokenVerifier>,
    /// Source of "today" for default chart ranges.
    pub clock: Arc<dyn Clock>,
    pub max_range_days: u32,
}

impl HttpState {
    pub fn new(ports: HttpStatePorts) -> Self {
        let HttpStatePorts {
            submissions,
            stats,
            data_rights,
            tokens,
        } = ports;
        Self {
            submissions,
            stats,
            data_rights,
            tokens,
            clock: Arc::new(DefaultClock),
            max_range_days: DEFAULT_MAX_RANGE_DAYS,
        }
    }

    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    #[must_use]
    pub fn with_max_range_days(mut self, days: u32) -> Self {
        self.max_range_days = days;
        self
    }
}

impl From<HttpStatePorts> for HttpState {
    fn from(ports: HttpStatePorts) -> Self {
        Self::new(ports)
    }
}
