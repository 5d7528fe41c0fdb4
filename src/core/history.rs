use std::collections::{BTreeSet, HashMap};

use chrono::{DateTime, Utc};

use crate::models::HistoryRecord;

const SECONDS_PER_DAY: f64 = 86_400.0;

/// Recency-weighted graph of who was recently matched with whom
///
/// Symmetric by construction: every pair is written in both directions
/// with the same weight.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HistoryGraph {
    edges: HashMap<String, HashMap<String, f64>>,
}

impl HistoryGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Accumulated weight between two participants, 0 if they never met
    pub fn weight(&self, a: &str, b: &str) -> f64 {
        self.edges
            .get(a)
            .and_then(|neighbours| neighbours.get(b))
            .copied()
            .unwrap_or(0.0)
    }

    /// Add `weight` to both directed entries of the pair
    pub fn add_pair(&mut self, a: &str, b: &str, weight: f64) {
        if a == b {
            return;
        }
        *self
            .edges
            .entry(a.to_string())
            .or_default()
            .entry(b.to_string())
            .or_insert(0.0) += weight;
        *self
            .edges
            .entry(b.to_string())
            .or_default()
            .entry(a.to_string())
            .or_insert(0.0) += weight;
    }

    pub fn neighbours(&self, id: &str) -> Option<&HashMap<String, f64>> {
        self.edges.get(id)
    }

    /// Number of participants with at least one edge
    pub fn len(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }
}

/// Recency weight of a record: 1.0 when brand new, 0.0 at the edge of the window
///
/// Age is measured in fractional days so that two records a few hours
/// apart still get distinct weights.
#[inline]
pub fn recency_weight(created_at: DateTime<Utc>, lookback_days: u32, now: DateTime<Utc>) -> f64 {
    if lookback_days == 0 {
        return 0.0;
    }

    let age_days = age_in_days(created_at, now);
    (1.0 - age_days / lookback_days as f64).clamp(0.0, 1.0)
}

#[inline]
fn age_in_days(created_at: DateTime<Utc>, now: DateTime<Utc>) -> f64 {
    (now - created_at).num_seconds() as f64 / SECONDS_PER_DAY
}

/// Build the history graph from past matches inside the lookback window
///
/// Records older than `lookback_days` are ignored. Repeated pairings
/// accumulate without a cap.
pub fn build_history_graph(
    records: &[HistoryRecord],
    lookback_days: u32,
    now: DateTime<Utc>,
) -> HistoryGraph {
    let mut graph = HistoryGraph::new();

    if lookback_days == 0 {
        return graph;
    }

    let mut retained = 0usize;

    for record in records {
        if age_in_days(record.created_at, now) > lookback_days as f64 {
            continue;
        }
        retained += 1;

        let weight = recency_weight(record.created_at, lookback_days, now);

        // Duplicate ids inside one record would otherwise count a pair twice
        let participants: BTreeSet<&str> =
            record.participants.iter().map(String::as_str).collect();
        let participants: Vec<&str> = participants.into_iter().collect();

        for (i, a) in participants.iter().enumerate() {
            for b in &participants[i + 1..] {
                graph.add_pair(a, b, weight);
            }
        }
    }

    tracing::debug!(
        "Built history graph from {} of {} records ({} participants, lookback {} days)",
        retained,
        records.len(),
        graph.len(),
        lookback_days
    );

    graph
}
