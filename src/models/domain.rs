use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

/// Meeting preferences used for compatibility scoring
///
/// Collections are treated as sets by the scorer; order and duplicates
/// carry no meaning.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate)]
pub struct Preferences {
    #[serde(default)]
    pub topics: Vec<String>,
    #[serde(default)]
    pub availability: Vec<String>,
    #[serde(rename = "sessionLengthMinutes", default)]
    #[validate(range(min = 15, max = 60))]
    pub session_length_minutes: Option<u16>,
}

/// A person who may be placed into a match group
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct Participant {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(rename = "deploymentId")]
    pub deployment_id: String,
    #[serde(default)]
    #[validate(nested)]
    pub preferences: Preferences,
    #[serde(rename = "isActive", default = "default_true")]
    pub is_active: bool,
    #[serde(rename = "isPaused", default)]
    pub is_paused: bool,
}

impl Participant {
    /// Active and not paused
    pub fn is_eligible(&self) -> bool {
        self.is_active && !self.is_paused
    }
}

fn default_true() -> bool { true }

/// A past match, used only for recency weighting
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryRecord {
    pub participants: Vec<String>,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
}

/// A group produced by a matching run, not yet stored
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchGroup {
    #[serde(rename = "deploymentId")]
    pub deployment_id: String,
    pub participants: Vec<String>,
    #[serde(rename = "scheduledAt")]
    pub scheduled_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchStatus {
    Pending,
    Confirmed,
    Completed,
    Cancelled,
}

impl MatchStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchStatus::Pending => "pending",
            MatchStatus::Confirmed => "confirmed",
            MatchStatus::Completed => "completed",
            MatchStatus::Cancelled => "cancelled",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.to_lowercase().as_str() {
            "pending" => Some(MatchStatus::Pending),
            "confirmed" => Some(MatchStatus::Confirmed),
            "completed" => Some(MatchStatus::Completed),
            "cancelled" => Some(MatchStatus::Cancelled),
            _ => None,
        }
    }
}

/// A match group after the store assigned its identity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistedMatch {
    pub id: String,
    #[serde(rename = "deploymentId")]
    pub deployment_id: String,
    pub participants: Vec<String>,
    #[serde(rename = "scheduledAt")]
    pub scheduled_at: DateTime<Utc>,
    pub status: MatchStatus,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "notificationSent")]
    pub notification_sent: bool,
}

impl From<PersistedMatch> for HistoryRecord {
    fn from(m: PersistedMatch) -> Self {
        HistoryRecord {
            participants: m.participants,
            created_at: m.created_at,
        }
    }
}

/// Per-deployment matching configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct DeploymentConfig {
    #[serde(rename = "deploymentId")]
    #[validate(length(min = 1))]
    pub deployment_id: String,
    #[validate(custom(function = "validate_cron"))]
    pub schedule: String,
    #[serde(default = "default_timezone")]
    #[validate(length(min = 1))]
    pub timezone: String,
    #[serde(rename = "meetingSize", default = "default_meeting_size")]
    #[validate(range(min = 2, max = 10))]
    pub meeting_size: u8,
    #[serde(rename = "lookbackDays", default)]
    #[validate(range(min = 1))]
    pub lookback_days: Option<u32>,
}

impl DeploymentConfig {
    pub fn new(deployment_id: impl Into<String>, meeting_size: u8) -> Self {
        Self {
            deployment_id: deployment_id.into(),
            schedule: "0 9 * * 1".to_string(),
            timezone: default_timezone(),
            meeting_size,
            lookback_days: None,
        }
    }
}

fn default_timezone() -> String { "UTC".to_string() }
fn default_meeting_size() -> u8 { 2 }

/// Five whitespace-separated cron fields; the fields themselves are not parsed
fn validate_cron(schedule: &str) -> Result<(), ValidationError> {
    if schedule.split_whitespace().count() == 5 {
        Ok(())
    } else {
        Err(ValidationError::new("cron_fields"))
    }
}

/// Scoring weights for the compatibility sub-scores
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoringWeights {
    pub interests: f64,
    pub session_length: f64,
    pub availability: f64,
    /// Session-length difference (minutes) at which that sub-score reaches zero
    pub max_session_length_diff: f64,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            interests: 0.4,
            session_length: 0.2,
            availability: 0.4,
            max_session_length_diff: 45.0,
        }
    }
}
