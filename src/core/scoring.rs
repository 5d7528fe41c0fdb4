use std::collections::HashSet;

use crate::models::{Participant, Preferences, ScoringWeights};

/// Score returned when neither participant offers anything comparable
pub const NEUTRAL_SCORE: f64 = 0.5;

/// Pairwise compatibility between two participants
///
/// Implementations must be deterministic, commutative and return a value
/// in `[0, 1]`.
pub trait CompatibilityScorer {
    fn score(&self, a: &Participant, b: &Participant) -> f64;
}

/// Preference-based scorer
///
/// Scoring formula:
/// score = (
///     interest_jaccard * 0.4 +      # shared topics over all topics
///     length_closeness * 0.2 +      # 1 - |len1 - len2| / 45, floored at 0
///     availability_overlap * 0.4    # shared slots over the smaller slot set
/// ) / (sum of the weights that had inputs on both sides)
#[derive(Debug, Clone, Copy)]
pub struct PreferenceScorer {
    weights: ScoringWeights,
}

impl PreferenceScorer {
    pub fn new(weights: ScoringWeights) -> Self {
        Self { weights }
    }

    pub fn with_default_weights() -> Self {
        Self {
            weights: ScoringWeights::default(),
        }
    }

    pub fn weights(&self) -> &ScoringWeights {
        &self.weights
    }
}

impl Default for PreferenceScorer {
    fn default() -> Self {
        Self::with_default_weights()
    }
}

impl CompatibilityScorer for PreferenceScorer {
    fn score(&self, a: &Participant, b: &Participant) -> f64 {
        calculate_compatibility(&a.preferences, &b.preferences, &self.weights)
    }
}

/// Calculate a compatibility score (0-1) between two preference sets
pub fn calculate_compatibility(a: &Preferences, b: &Preferences, weights: &ScoringWeights) -> f64 {
    let mut weighted_score = 0.0;
    let mut total_weight = 0.0;

    if let Some(topic_score) = jaccard(&a.topics, &b.topics) {
        weighted_score += topic_score * weights.interests;
        total_weight += weights.interests;
    }

    if let (Some(len_a), Some(len_b)) = (a.session_length_minutes, b.session_length_minutes) {
        let length_score = session_length_score(len_a, len_b, weights.max_session_length_diff);
        weighted_score += length_score * weights.session_length;
        total_weight += weights.session_length;
    }

    if let Some(avail_score) = overlap_coefficient(&a.availability, &b.availability) {
        weighted_score += avail_score * weights.availability;
        total_weight += weights.availability;
    }

    if total_weight > 0.0 {
        (weighted_score / total_weight).clamp(0.0, 1.0)
    } else {
        NEUTRAL_SCORE
    }
}

/// |A ∩ B| / |A ∪ B|, or `None` when either side is empty
#[inline]
fn jaccard(a: &[String], b: &[String]) -> Option<f64> {
    let set_a: HashSet<&str> = a.iter().map(String::as_str).collect();
    let set_b: HashSet<&str> = b.iter().map(String::as_str).collect();

    if set_a.is_empty() || set_b.is_empty() {
        return None;
    }

    let common = set_a.intersection(&set_b).count() as f64;
    let union = set_a.union(&set_b).count() as f64;

    Some(common / union)
}

/// |A ∩ B| / min(|A|, |B|), or `None` when either side is empty
#[inline]
fn overlap_coefficient(a: &[String], b: &[String]) -> Option<f64> {
    let set_a: HashSet<&str> = a.iter().map(String::as_str).collect();
    let set_b: HashSet<&str> = b.iter().map(String::as_str).collect();

    if set_a.is_empty() || set_b.is_empty() {
        return None;
    }

    let common = set_a.intersection(&set_b).count() as f64;
    let smaller = set_a.len().min(set_b.len()) as f64;

    Some(common / smaller)
}

#[inline]
fn session_length_score(len_a: u16, len_b: u16, max_diff: f64) -> f64 {
    if max_diff <= 0.0 {
        return if len_a == len_b { 1.0 } else { 0.0 };
    }

    let diff = (len_a as f64 - len_b as f64).abs();
    1.0 - (diff / max_diff).min(1.0)
}
