use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgPool, Row};
use std::time::Duration;

use crate::models::{
    DeploymentConfig, HistoryRecord, MatchGroup, MatchStatus, Participant, PersistedMatch,
    Preferences,
};
use crate::services::repository::{ConfigSource, HistorySource, MatchSink, ParticipantSource, StoreError};

/// PostgreSQL store for participants, deployment configs and matches
///
/// Implements every collaborator trait the matching engine consumes.
/// Participant and config writes are owned by the surrounding API; this
/// client only reads them and writes new matches.
pub struct PostgresClient {
    pool: PgPool,
}

impl PostgresClient {
    /// Create a new PostgreSQL client from a connection string
    pub async fn new(
        database_url: &str,
        max_connections: u32,
        min_connections: u32,
        acquire_timeout: Duration,
        idle_timeout: Duration,
    ) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .min_connections(min_connections)
            .acquire_timeout(acquire_timeout)
            .idle_timeout(idle_timeout)
            .test_before_acquire(true)
            .connect(database_url)
            .await?;

        // Run migrations on startup
        sqlx::migrate!("./migrations").run(&pool).await?;

        Ok(Self { pool })
    }

    /// Create a new PostgreSQL client from settings
    pub async fn from_settings(
        url: &str,
        max_connections: Option<u32>,
        min_connections: Option<u32>,
        acquire_timeout_secs: Option<u64>,
        idle_timeout_secs: Option<u64>,
    ) -> Result<Self, StoreError> {
        tracing::info!("Connecting to PostgreSQL");

        Self::new(
            url,
            max_connections.unwrap_or(10),
            min_connections.unwrap_or(1),
            Duration::from_secs(acquire_timeout_secs.unwrap_or(5)),
            Duration::from_secs(idle_timeout_secs.unwrap_or(600)),
        )
        .await
    }

    /// Health check for the database connection
    pub async fn health_check(&self) -> Result<bool, StoreError> {
        sqlx::query("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .map(|_| true)
            .map_err(Into::into)
    }
}

fn participant_from_row(row: &PgRow) -> Result<Participant, sqlx::Error> {
    let session_length: Option<i32> = row.try_get("session_length_minutes")?;

    Ok(Participant {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        email: row.try_get("email")?,
        deployment_id: row.try_get("deployment_id")?,
        preferences: Preferences {
            topics: row.try_get("topics")?,
            availability: row.try_get("availability")?,
            session_length_minutes: session_length.and_then(|v| u16::try_from(v).ok()),
        },
        is_active: row.try_get("is_active")?,
        is_paused: row.try_get("is_paused")?,
    })
}

fn match_from_row(row: &PgRow) -> Result<PersistedMatch, StoreError> {
    let id: uuid::Uuid = row.try_get("id")?;
    let status: String = row.try_get("status")?;
    let status = MatchStatus::parse(&status)
        .ok_or_else(|| StoreError::InvalidInput(format!("unknown match status {}", status)))?;

    Ok(PersistedMatch {
        id: id.to_string(),
        deployment_id: row.try_get("deployment_id")?,
        participants: row.try_get("participants")?,
        scheduled_at: row.try_get("scheduled_at")?,
        status,
        created_at: row.try_get("created_at")?,
        notification_sent: row.try_get("notification_sent")?,
    })
}

#[async_trait]
impl ParticipantSource for PostgresClient {
    async fn get_eligible(&self, deployment_id: &str) -> Result<Vec<Participant>, StoreError> {
        let query = r#"
            SELECT id, name, email, deployment_id, topics, availability,
                   session_length_minutes, is_active, is_paused
            FROM participants
            WHERE deployment_id = $1 AND is_active = TRUE AND is_paused = FALSE
        "#;

        let rows = sqlx::query(query).bind(deployment_id).fetch_all(&self.pool).await?;

        let participants = rows
            .iter()
            .map(participant_from_row)
            .collect::<Result<Vec<_>, _>>()?;

        tracing::debug!(
            "Deployment {} has {} eligible participants",
            deployment_id,
            participants.len()
        );

        Ok(participants)
    }
}

#[async_trait]
impl HistorySource for PostgresClient {
    async fn get_history(
        &self,
        deployment_id: &str,
        since: DateTime<Utc>,
    ) -> Result<Vec<HistoryRecord>, StoreError> {
        let query = r#"
            SELECT participants, created_at
            FROM matches
            WHERE deployment_id = $1 AND created_at >= $2
            ORDER BY created_at DESC
        "#;

        let rows = sqlx::query(query)
            .bind(deployment_id)
            .bind(since)
            .fetch_all(&self.pool)
            .await?;

        let records = rows
            .iter()
            .map(|row| {
                Ok(HistoryRecord {
                    participants: row.try_get("participants")?,
                    created_at: row.try_get("created_at")?,
                })
            })
            .collect::<Result<Vec<_>, sqlx::Error>>()?;

        Ok(records)
    }
}

#[async_trait]
impl ConfigSource for PostgresClient {
    async fn get_config(&self, deployment_id: &str) -> Result<Option<DeploymentConfig>, StoreError> {
        let query = r#"
            SELECT deployment_id, schedule, timezone, meeting_size, lookback_days
            FROM deployment_configs
            WHERE deployment_id = $1
        "#;

        let row = sqlx::query(query)
            .bind(deployment_id)
            .fetch_optional(&self.pool)
            .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let meeting_size: i32 = row.try_get("meeting_size")?;
        let lookback_days: Option<i32> = row.try_get("lookback_days")?;

        Ok(Some(DeploymentConfig {
            deployment_id: row.try_get("deployment_id")?,
            schedule: row.try_get("schedule")?,
            timezone: row.try_get("timezone")?,
            meeting_size: u8::try_from(meeting_size).map_err(|_| {
                StoreError::InvalidInput(format!("meeting size {} out of range", meeting_size))
            })?,
            lookback_days: lookback_days.and_then(|v| u32::try_from(v).ok()),
        }))
    }
}

#[async_trait]
impl MatchSink for PostgresClient {
    async fn create(&self, group: MatchGroup) -> Result<PersistedMatch, StoreError> {
        let query = r#"
            INSERT INTO matches (id, deployment_id, participants, scheduled_at, status, created_at, notification_sent)
            VALUES ($1, $2, $3, $4, $5, NOW(), FALSE)
            RETURNING id, deployment_id, participants, scheduled_at, status, created_at, notification_sent
        "#;

        let row = sqlx::query(query)
            .bind(uuid::Uuid::new_v4())
            .bind(&group.deployment_id)
            .bind(&group.participants)
            .bind(group.scheduled_at)
            .bind(MatchStatus::Pending.as_str())
            .fetch_one(&self.pool)
            .await?;

        let stored = match_from_row(&row)?;

        tracing::debug!(
            "Stored match {} with {} participants for deployment {}",
            stored.id,
            stored.participants.len(),
            stored.deployment_id
        );

        Ok(stored)
    }
}
