//! Submitter identity and the user segment of partition keys.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Partition value recorded for submissions without an authenticated user.
pub const ANONYMOUS_USER: &str = "anonymous";

const USER_ID_MAX: usize = 128;

/// Characters that survive object-store path encoding unchanged and never
/// act as a key or segment delimiter.
fn is_key_safe(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '@' | '+' | ':')
}

/// Validation errors returned by [`UserId::new`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UserIdValidationError {
    #[error("user id must not be empty")]
    Empty,
    #[error("user id must be at most {max} characters")]
    TooLong { max: usize },
    #[error("user id may only contain ASCII letters, digits and '-', '_', '.', '@', '+', ':'")]
    InvalidCharacter,
    #[error("user id is reserved")]
    Reserved,
}

/// Identifier of an authenticated user.
///
/// The value is safe to embed as the `user=` segment of an object key: it
/// is restricted to characters object stores keep verbatim, so it never
/// contains path or key-value delimiters, and it never equals
/// [`ANONYMOUS_USER`].
///
/// # Examples
/// ```
/// use pramana::domain::UserId;
///
/// let id = UserId::new("user-42").expect("valid id");
/// assert_eq!(id.as_ref(), "user-42");
/// assert!(UserId::new("anonymous").is_err());
/// assert!(UserId::new("a/b").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    pub fn new(value: impl Into<String>) -> Result<Self, UserIdValidationError> {
        let value = value.into();
        if value.is_empty() {
            return Err(UserIdValidationError::Empty);
        }
        if value.chars().count() > USER_ID_MAX {
            return Err(UserIdValidationError::TooLong { max: USER_ID_MAX });
        }
        if !value.chars().all(is_key_safe) {
            return Err(UserIdValidationError::InvalidCharacter);
        }
        if matches!(value.as_str(), ANONYMOUS_USER | "." | "..") {
            return Err(UserIdValidationError::Reserved);
        }
        Ok(Self(value))
    }
}

impl AsRef<str> for UserId {
    fn as_ref(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for UserId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        Self::new(raw).map_err(serde::de::Error::custom)
    }
}

/// Who a submission is attributed to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Submitter {
    Anonymous,
    User(UserId),
}

impl Submitter {
    /// Value written to the `user_id` column and the `user=` key segment.
    pub fn partition_value(&self) -> &str {
        match self {
            Self::Anonymous => ANONYMOUS_USER,
            Self::User(id) => id.as_ref(),
        }
    }

    pub fn user_id(&self) -> Option<&UserId> {
        match self {
            Self::Anonymous => None,
            Self::User(id) => Some(id),
        }
    }
}

impl From<Option<UserId>> for Submitter {
    fn from(value: Option<UserId>) -> Self {
        value.map_or(Self::Anonymous, Self::User)
    }
}

impl fmt::Display for Submitter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.partition_value())
    }
}
