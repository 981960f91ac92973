//! Error taxonomy shared by every layer.
//!
//! Remote failures are converted into `Load` or `Mutation` at the hook
//! boundary; `message()` is what the dashboard shows.

use thiserror::Error;

use crate::form::FieldErrors;

pub type SyncResult<T> = Result<T, SyncError>;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SyncError {
    /// Initial load or refetch failed. Prior data stays visible.
    #[error("{0}")]
    Load(String),
    /// Create, update or delete failed. Local state is left as it was.
    #[error("{0}")]
    Mutation(String),
    /// Schema violation. Never reaches the network.
    #[error("{0}")]
    Validation(FieldErrors),
    #[error("no signed-in user")]
    Unauthenticated,
    #[error("not found: {0}")]
    NotFound(String),
    #[error("transport error: {0}")]
    Transport(String),
    #[error("decode error: {0}")]
    Decode(String),
    #[error("configuration error: {0}")]
    Config(String),
}

impl SyncError {
    pub fn load(message: impl Into<String>) -> Self {
        Self::Load(message.into())
    }

    pub fn mutation(message: impl Into<String>) -> Self {
        Self::Mutation(message.into())
    }

    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport(message.into())
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Human-readable message for the presentation layer
    pub fn message(&self) -> String {
        match self {
            SyncError::Load(msg) | SyncError::Mutation(msg) => msg.clone(),
            SyncError::Transport(msg) | SyncError::Decode(msg) => msg.clone(),
            other => other.to_string(),
        }
    }

    /// Reclassify a gateway failure as a load failure
    pub(crate) fn into_load(self) -> Self {
        match self {
            SyncError::Load(_) | SyncError::Unauthenticated => self,
            other => SyncError::Load(other.message()),
        }
    }

    /// Reclassify a gateway failure as a mutation failure
    pub(crate) fn into_mutation(self) -> Self {
        match self {
            SyncError::Mutation(_) | SyncError::Validation(_) | SyncError::Unauthenticated => self,
            other => SyncError::Mutation(other.message()),
        }
    }
}

impl From<reqwest::Error> for SyncError {
    fn from(err: reqwest::Error) -> Self {
        SyncError::Transport(err.to_string())
    }
}

impl From<serde_json::Error> for SyncError {
    fn from(err: serde_json::Error) -> Self {
        SyncError::Decode(err.to_string())
    }
}
