//! Coffee Match - recurring group matching for virtual coffee meetings
//!
//! This library provides the matching engine: it groups each deployment's
//! eligible participants into small meeting groups, avoiding recent repeat
//! pairings and favouring overlapping interests and availability.

pub mod bootstrap;
pub mod config;
pub mod core;
pub mod logging;
pub mod models;
pub mod routes;
pub mod services;

// Re-export commonly used types
pub use core::{GroupPartitioner, HistoryGraph, MatchingEngine, MatchingError, PreferenceScorer};
pub use models::{DeploymentConfig, HistoryRecord, MatchGroup, Participant, PersistedMatch, Preferences, ScoringWeights};
