use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use crate::models::{
    DeploymentConfig, HistoryRecord, MatchGroup, MatchStatus, Participant, PersistedMatch,
};
use crate::services::repository::{ConfigSource, HistorySource, MatchSink, ParticipantSource, StoreError};

/// In-process store implementing every collaborator trait
///
/// Used by tests and local runs without a database. Data is partitioned
/// by deployment id just like the Postgres store.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    participants: RwLock<Vec<Participant>>,
    configs: RwLock<HashMap<String, DeploymentConfig>>,
    matches: RwLock<Vec<PersistedMatch>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add_participant(&self, participant: Participant) {
        self.participants.write().await.push(participant);
    }

    pub async fn set_config(&self, config: DeploymentConfig) {
        self.configs
            .write()
            .await
            .insert(config.deployment_id.clone(), config);
    }

    /// Insert an already-stored match, e.g. to seed history
    pub async fn add_match(&self, stored: PersistedMatch) {
        self.matches.write().await.push(stored);
    }

    pub async fn matches(&self, deployment_id: &str) -> Vec<PersistedMatch> {
        self.matches
            .read()
            .await
            .iter()
            .filter(|m| m.deployment_id == deployment_id)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl ParticipantSource for InMemoryStore {
    async fn get_eligible(&self, deployment_id: &str) -> Result<Vec<Participant>, StoreError> {
        Ok(self
            .participants
            .read()
            .await
            .iter()
            .filter(|p| p.deployment_id == deployment_id && p.is_eligible())
            .cloned()
            .collect())
    }
}

#[async_trait]
impl HistorySource for InMemoryStore {
    async fn get_history(
        &self,
        deployment_id: &str,
        since: DateTime<Utc>,
    ) -> Result<Vec<HistoryRecord>, StoreError> {
        Ok(self
            .matches
            .read()
            .await
            .iter()
            .filter(|m| m.deployment_id == deployment_id && m.created_at >= since)
            .cloned()
            .map(HistoryRecord::from)
            .collect())
    }
}

#[async_trait]
impl ConfigSource for InMemoryStore {
    async fn get_config(&self, deployment_id: &str) -> Result<Option<DeploymentConfig>, StoreError> {
        Ok(self.configs.read().await.get(deployment_id).cloned())
    }
}

#[async_trait]
impl MatchSink for InMemoryStore {
    async fn create(&self, group: MatchGroup) -> Result<PersistedMatch, StoreError> {
        if group.participants.len() < 2 {
            return Err(StoreError::InvalidInput(
                "a match must have at least 2 participants".to_string(),
            ));
        }

        let stored = PersistedMatch {
            id: uuid::Uuid::new_v4().to_string(),
            deployment_id: group.deployment_id,
            participants: group.participants,
            scheduled_at: group.scheduled_at,
            status: MatchStatus::Pending,
            created_at: Utc::now(),
            notification_sent: false,
        };

        self.matches.write().await.push(stored.clone());
        Ok(stored)
    }
}
