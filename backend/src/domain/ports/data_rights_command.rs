//! Driving port for erasing or anonymising a user's stored data.

use async_trait::async_trait;

use crate::domain::{Error, UserId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataRightsAction {
    Deleted,
    Anonymized,
}

impl DataRightsAction {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Deleted => "deleted",
            Self::Anonymized => "anonymized",
        }
    }
}

/// Files touched by a data-rights operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DataRightsOutcome {
    pub action: DataRightsAction,
    /// Files deleted or moved.
    pub files_affected: usize,
    /// Files that matched but could not be processed.
    pub files_failed: usize,
    /// The listing hit its cap, so older files may remain.
    pub truncated: bool,
}

impl DataRightsOutcome {
    pub fn empty(action: DataRightsAction) -> Self {
        Self {
            action,
            files_affected: 0,
            files_failed: 0,
            truncated: false,
        }
    }
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DataRightsCommand: Send + Sync {
    /// Delete every batch file in the user's partitions.
    async fn erase(&self, user: &UserId) -> Result<DataRightsOutcome, Error>;

    /// Move every batch file in the user's partitions to the anonymous partition.
    async fn anonymize(&self, user: &UserId) -> Result<DataRightsOutcome, Error>;
}

/// Command for a user with no stored data.
#[derive(Debug, Default, Clone, Copy)]
pub struct FixtureDataRightsCommand;

#[async_trait]
impl DataRightsCommand for FixtureDataRightsCommand {
    async fn erase(&self, _user: &UserId) -> Result<DataRightsOutcome, Error> {
        Ok(DataRightsOutcome::empty(DataRightsAction::Deleted))
    }

    async fn anonymize(&self, _user: &UserId) -> Result<DataRightsOutcome, Error> {
        Ok(DataRightsOutcome::empty(DataRightsAction::Anonymized))
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[tokio::test]
    async fn fixture_touches_nothing() {
        let user = UserId::new("u").expect("valid user");
        let outcome = FixtureDataRightsCommand
            .anonymize(&user)
            .await
            .expect("fixture succeeds");
        assert_eq!(outcome, DataRightsOutcome::empty(DataRightsAction::Anonymized));
    }
}
