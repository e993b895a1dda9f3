//! Ports at the edge of the hexagon.
//!
//! Driving ports (`*Command`, `*Query`) are what inbound adapters call.
//! Driven ports (`ObjectStorage`, `BatchCodec`, `TokenVerifier`) are what the
//! domain needs from infrastructure; each exposes a typed error enum.

mod macros;
pub(crate) use macros::define_port_error;

mod batch_codec;
mod data_rights_command;
mod object_storage;
mod submission_command;
mod submission_stats_query;
mod token_verifier;

#[cfg(test)]
pub use batch_codec::MockBatchCodec;
pub use batch_codec::{BatchCodec, BatchCodecError};
#[cfg(test)]
pub use data_rights_command::MockDataRightsCommand;
pub use data_rights_command::{
    DataRightsAction, DataRightsCommand, DataRightsOutcome, FixtureDataRightsCommand,
};
#[cfg(test)]
pub use object_storage::MockObjectStorage;
pub use object_storage::{DeleteSummary, KeyListing, ObjectStorage, ObjectStorageError};
#[cfg(test)]
pub use submission_command::MockSubmissionCommand;
pub use submission_command::{
    BatchItemOutcome, BatchReceipt, BatchStatus, FixtureSubmissionCommand, SubmissionCommand,
    SubmissionReceipt, SubmissionStatus, SubmitBatchRequest, SubmitRequest,
};
#[cfg(test)]
pub use submission_stats_query::MockSubmissionStatsQuery;
pub use submission_stats_query::{ChartRequest, FixtureSubmissionStatsQuery, SubmissionStatsQuery};
#[cfg(test)]
pub use token_verifier::MockTokenVerifier;
pub use token_verifier::{FixtureTokenVerifier, TokenVerifier, TokenVerifierError};
