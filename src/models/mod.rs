// Model exports
pub mod domain;
pub mod requests;
pub mod responses;

pub use domain::{
    DeploymentConfig, HistoryRecord, MatchGroup, MatchStatus, Participant, PersistedMatch,
    Preferences, ScoringWeights,
};
pub use requests::RunMatchingRequest;
pub use responses::{ErrorResponse, HealthResponse, RunMatchingResponse};
