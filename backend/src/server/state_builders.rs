//! Wiring of domain services behind the HTTP state ports.

use std::sync::Arc;

use crate::domain::ports::BatchCodec;
use crate::domain::{
    BatchWriter, DataRightsOperator, PartitionScanner, SubmissionService, SubmissionStatsService,
    WorkerPool,
};
use crate::inbound::http::state::{HttpState, HttpStatePorts};
use crate::outbound::codec::ParquetBatchCodec;

use super::ServerConfig;

/// Build the handler state over the configured storage.
///
/// One [`WorkerPool`] backs every scan, so the download bound holds across
/// concurrent requests rather than per request.
pub fn build_http_state(config: &ServerConfig) -> HttpState {
    let codec: Arc<dyn BatchCodec> = Arc::new(ParquetBatchCodec);
    let limits = config.limits;
    let scanner = PartitionScanner::new(
        Arc::clone(&config.storage),
        Arc::clone(&codec),
        WorkerPool::new(limits.scan_workers),
        limits.day_scan_cap,
    );
    let writer = BatchWriter::new(
        Arc::clone(&config.storage),
        codec,
        Arc::clone(&config.clock),
    );

    HttpState::new(HttpStatePorts {
        submissions: Arc::new(SubmissionService::new(writer, Arc::clone(&config.clock))),
        stats: Arc::new(SubmissionStatsService::new(
            scanner.clone(),
            limits.stats_scan_cap,
        )),
        data_rights: Arc::new(DataRightsOperator::new(scanner, limits.data_rights_scan_cap)),
        tokens: Arc::clone(&config.tokens),
    })
    .with_clock(Arc::clone(&config.clock))
    .with_max_range_days(limits.max_range_days)
}
