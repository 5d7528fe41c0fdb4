// Core algorithm exports
pub mod history;
pub mod matcher;
pub mod partition;
pub mod scoring;

pub use history::{build_history_graph, recency_weight, HistoryGraph};
pub use matcher::{MatchingEngine, MatchingError, DEFAULT_LOOKBACK_DAYS};
pub use partition::{final_score, GroupPartitioner, DEFAULT_PENALTY_FACTOR, MIN_GROUP_SIZE};
pub use scoring::{calculate_compatibility, CompatibilityScorer, PreferenceScorer, NEUTRAL_SCORE};
