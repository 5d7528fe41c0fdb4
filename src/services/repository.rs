use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::models::{DeploymentConfig, HistoryRecord, MatchGroup, Participant, PersistedMatch};

/// Errors raised by storage collaborators
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("SQLx error: {0}")]
    SqlxError(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    MigrateError(#[from] sqlx::migrate::MigrateError),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

/// Source of participants eligible for matching
#[async_trait]
pub trait ParticipantSource: Send + Sync {
    /// Active, non-paused participants of a deployment
    async fn get_eligible(&self, deployment_id: &str) -> Result<Vec<Participant>, StoreError>;
}

/// Source of past matches
#[async_trait]
pub trait HistorySource: Send + Sync {
    /// Matches of a deployment created at or after `since`
    async fn get_history(
        &self,
        deployment_id: &str,
        since: DateTime<Utc>,
    ) -> Result<Vec<HistoryRecord>, StoreError>;
}

/// Source of per-deployment configuration
#[async_trait]
pub trait ConfigSource: Send + Sync {
    async fn get_config(&self, deployment_id: &str) -> Result<Option<DeploymentConfig>, StoreError>;
}

/// Sink that stores created match groups
#[async_trait]
pub trait MatchSink: Send + Sync {
    /// Store a group, assigning its id and creation time
    async fn create(&self, group: MatchGroup) -> Result<PersistedMatch, StoreError>;
}
