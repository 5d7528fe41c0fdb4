use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use rand::rngs::StdRng;
use rand::SeedableRng;
use thiserror::Error;
use validator::Validate;

use crate::core::history::build_history_graph;
use crate::core::partition::{GroupPartitioner, MIN_GROUP_SIZE};
use crate::core::scoring::{CompatibilityScorer, PreferenceScorer};
use crate::models::{MatchGroup, Participant, PersistedMatch};
use crate::services::{ConfigSource, HistorySource, MatchSink, ParticipantSource, StoreError};

/// Lookback window used when a deployment does not configure one
pub const DEFAULT_LOOKBACK_DAYS: u32 = 30;

/// Errors that abort a matching run
///
/// Too few participants and missing configuration are not errors; a run
/// in that state returns no matches.
#[derive(Debug, Error)]
pub enum MatchingError {
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

/// Main matching orchestrator
///
/// # Pipeline Stages
/// 1. Load eligible participants
/// 2. Load deployment configuration
/// 3. Build the recency-weighted history graph
/// 4. Partition participants into groups
/// 5. Hand each group to the match sink
///
/// Holds no mutable state, so runs for different deployments may execute
/// concurrently on clones of the same engine.
#[derive(Clone)]
pub struct MatchingEngine {
    participants: Arc<dyn ParticipantSource>,
    history: Arc<dyn HistorySource>,
    configs: Arc<dyn ConfigSource>,
    sink: Arc<dyn MatchSink>,
    scorer: Arc<dyn CompatibilityScorer + Send + Sync>,
    partitioner: GroupPartitioner,
    default_lookback_days: u32,
    seed: Option<u64>,
}

impl MatchingEngine {
    pub fn new(
        participants: Arc<dyn ParticipantSource>,
        history: Arc<dyn HistorySource>,
        configs: Arc<dyn ConfigSource>,
        sink: Arc<dyn MatchSink>,
    ) -> Self {
        Self {
            participants,
            history,
            configs,
            sink,
            scorer: Arc::new(PreferenceScorer::default()),
            partitioner: GroupPartitioner::default(),
            default_lookback_days: DEFAULT_LOOKBACK_DAYS,
            seed: None,
        }
    }

    /// Build an engine whose four collaborators are the same store
    pub fn from_store<S>(store: Arc<S>) -> Self
    where
        S: ParticipantSource + HistorySource + ConfigSource + MatchSink + 'static,
    {
        Self::new(store.clone(), store.clone(), store.clone(), store)
    }

    pub fn with_configs(mut self, configs: Arc<dyn ConfigSource>) -> Self {
        self.configs = configs;
        self
    }

    pub fn with_scorer<S>(mut self, scorer: S) -> Self
    where
        S: CompatibilityScorer + Send + Sync + 'static,
    {
        self.scorer = Arc::new(scorer);
        self
    }

    pub fn with_partitioner(mut self, partitioner: GroupPartitioner) -> Self {
        self.partitioner = partitioner;
        self
    }

    pub fn with_default_lookback_days(mut self, days: u32) -> Self {
        self.default_lookback_days = days;
        self
    }

    /// Fix the shuffle seed so runs are reproducible
    pub fn with_seed(mut self, seed: Option<u64>) -> Self {
        self.seed = seed;
        self
    }

    /// Run matching for a deployment, scheduled now
    pub async fn run(&self, deployment_id: &str) -> Result<Vec<PersistedMatch>, MatchingError> {
        self.run_at(deployment_id, Utc::now()).await
    }

    /// Run matching for a deployment and store the resulting groups
    ///
    /// `now` is both the reference time for history recency and the
    /// scheduled timestamp of every created match. A store failure while
    /// saving aborts the run; groups saved before it stay saved.
    pub async fn run_at(
        &self,
        deployment_id: &str,
        now: DateTime<Utc>,
    ) -> Result<Vec<PersistedMatch>, MatchingError> {
        let groups = self.plan_at(deployment_id, now).await?;

        let mut created = Vec::with_capacity(groups.len());
        for group in groups {
            let stored = self.sink.create(group).await?;
            tracing::debug!(
                "Match {}: {} participants",
                stored.id,
                stored.participants.len()
            );
            created.push(stored);
        }

        tracing::info!(
            "Created {} matches for deployment {}",
            created.len(),
            deployment_id
        );

        Ok(created)
    }

    /// Compute the groups for a deployment without storing them
    pub async fn plan_at(
        &self,
        deployment_id: &str,
        now: DateTime<Utc>,
    ) -> Result<Vec<MatchGroup>, MatchingError> {
        let participants: Vec<Participant> = self
            .participants
            .get_eligible(deployment_id)
            .await?
            .into_iter()
            .filter(Participant::is_eligible)
            .collect();

        if participants.len() < MIN_GROUP_SIZE {
            tracing::warn!(
                "Not enough eligible participants for matching in deployment {} ({})",
                deployment_id,
                participants.len()
            );
            return Ok(Vec::new());
        }

        let Some(config) = self.configs.get_config(deployment_id).await? else {
            tracing::error!("No configuration found for deployment {}", deployment_id);
            return Ok(Vec::new());
        };

        if let Err(errors) = config.validate() {
            tracing::error!(
                "Invalid configuration for deployment {}: {}",
                deployment_id,
                errors
            );
            return Ok(Vec::new());
        }

        let group_size = config.meeting_size as usize;
        if participants.len() < group_size {
            tracing::warn!(
                "Not enough eligible participants in deployment {}: {} for meeting size {}",
                deployment_id,
                participants.len(),
                group_size
            );
            return Ok(Vec::new());
        }

        tracing::info!(
            "Starting matching for {} participants in deployment {} (meeting size {})",
            participants.len(),
            deployment_id,
            group_size
        );

        let lookback_days = config.lookback_days.unwrap_or(self.default_lookback_days);
        let since = now - Duration::days(i64::from(lookback_days));
        let records = self.history.get_history(deployment_id, since).await?;
        let graph = build_history_graph(&records, lookback_days, now);

        let mut rng = match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };

        let groups = self.partitioner.partition(
            &participants,
            &graph,
            group_size,
            self.scorer.as_ref(),
            &mut rng,
        );

        Ok(groups
            .into_iter()
            .map(|participants| MatchGroup {
                deployment_id: deployment_id.to_string(),
                participants,
                scheduled_at: now,
            })
            .collect())
    }
}
