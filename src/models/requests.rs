use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Request to run matching for one deployment
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct RunMatchingRequest {
    #[validate(length(min = 1))]
    #[serde(alias = "deployment_id", rename = "deploymentId")]
    pub deployment_id: String,
    /// Timestamp stamped on every created match; defaults to now
    #[serde(alias = "scheduled_at", rename = "scheduledAt", default)]
    pub scheduled_at: Option<DateTime<Utc>>,
}
