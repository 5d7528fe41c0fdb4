use std::collections::HashSet;

use rand::seq::SliceRandom;
use rand::Rng;

use crate::core::history::HistoryGraph;
use crate::core::scoring::CompatibilityScorer;
use crate::models::Participant;

/// How strongly a past pairing discounts compatibility
pub const DEFAULT_PENALTY_FACTOR: f64 = 0.7;

/// Smallest group that can be emitted
pub const MIN_GROUP_SIZE: usize = 2;

/// Compatibility discounted by history
///
/// Not clamped: once accumulated history passes `1 / penalty_factor` the
/// score goes negative, and pairs that met more often keep ranking lower.
#[inline]
pub fn final_score(compatibility: f64, history_weight: f64, penalty_factor: f64) -> f64 {
    compatibility * (1.0 - history_weight * penalty_factor)
}

/// Dense pairwise score table indexed by position in the shuffled pool
struct PairScores {
    n: usize,
    scores: Vec<f64>,
}

impl PairScores {
    fn compute<S>(
        pool: &[&Participant],
        graph: &HistoryGraph,
        scorer: &S,
        penalty_factor: f64,
    ) -> Self
    where
        S: CompatibilityScorer + ?Sized,
    {
        let n = pool.len();
        let mut scores = vec![0.0; n * n];

        for i in 0..n {
            for j in (i + 1)..n {
                let compatibility = scorer.score(pool[i], pool[j]);
                let history_weight = graph.weight(&pool[i].id, &pool[j].id);
                let score = final_score(compatibility, history_weight, penalty_factor);
                scores[i * n + j] = score;
                scores[j * n + i] = score;
            }
        }

        Self { n, scores }
    }

    #[inline]
    fn get(&self, i: usize, j: usize) -> f64 {
        self.scores[i * self.n + j]
    }
}

/// Greedy group builder
///
/// Seeds every group with the best remaining pair, then grows it with the
/// participant whose average score against the current members is highest.
/// Ties go to whichever candidate comes first in the shuffled order.
#[derive(Debug, Clone, Copy)]
pub struct GroupPartitioner {
    penalty_factor: f64,
}

impl GroupPartitioner {
    pub fn new(penalty_factor: f64) -> Self {
        Self { penalty_factor }
    }

    pub fn penalty_factor(&self) -> f64 {
        self.penalty_factor
    }

    /// Partition participants into groups of `group_size`
    ///
    /// # Arguments
    /// * `participants` - Eligible participants; duplicate ids are dropped
    /// * `graph` - Recency-weighted history of past pairings
    /// * `group_size` - Target size of each group (at least 2)
    /// * `scorer` - Compatibility scorer
    /// * `rng` - Source of randomness for the initial shuffle
    ///
    /// # Returns
    /// Groups of participant ids. Empty when there are fewer participants
    /// than `group_size`. Every participant lands in exactly one group.
    pub fn partition<S, R>(
        &self,
        participants: &[Participant],
        graph: &HistoryGraph,
        group_size: usize,
        scorer: &S,
        rng: &mut R,
    ) -> Vec<Vec<String>>
    where
        S: CompatibilityScorer + ?Sized,
        R: Rng + ?Sized,
    {
        if group_size < MIN_GROUP_SIZE {
            tracing::warn!("Refusing to partition with group size {}", group_size);
            return Vec::new();
        }

        let mut seen = HashSet::new();
        let mut pool: Vec<&Participant> = participants
            .iter()
            .filter(|p| seen.insert(p.id.as_str()))
            .collect();

        if pool.len() < group_size {
            return Vec::new();
        }

        pool.shuffle(rng);

        let scores = PairScores::compute(&pool, graph, scorer, self.penalty_factor);
        let mut available = vec![true; pool.len()];
        let mut remaining = pool.len();
        let mut groups: Vec<Vec<usize>> = Vec::new();

        tracing::info!(
            "Creating groups for {} participants with group size {}",
            pool.len(),
            group_size
        );

        while remaining >= MIN_GROUP_SIZE {
            let Some((a, b, seed_score)) = best_pair(&scores, &available) else {
                break;
            };
            available[a] = false;
            available[b] = false;
            remaining -= 2;

            let mut group = vec![a, b];

            while group.len() < group_size {
                let Some((next, avg_score)) = best_addition(&scores, &available, &group) else {
                    break;
                };
                available[next] = false;
                remaining -= 1;
                group.push(next);

                tracing::debug!(
                    "Added {} to group with average score {:.2}",
                    pool[next].id,
                    avg_score
                );
            }

            tracing::debug!(
                "Created group of {} seeded by {} and {} (score {:.2})",
                group.len(),
                pool[a].id,
                pool[b].id,
                seed_score
            );

            groups.push(group);
        }

        let leftovers: Vec<usize> = (0..pool.len()).filter(|&i| available[i]).collect();
        let groups = attach_leftovers(groups, leftovers);

        groups
            .into_iter()
            .map(|group| group.into_iter().map(|i| pool[i].id.clone()).collect())
            .collect()
    }
}

impl Default for GroupPartitioner {
    fn default() -> Self {
        Self::new(DEFAULT_PENALTY_FACTOR)
    }
}

/// Highest-scoring pair among available participants, first found on ties
fn best_pair(scores: &PairScores, available: &[bool]) -> Option<(usize, usize, f64)> {
    let mut best: Option<(usize, usize, f64)> = None;

    for i in 0..available.len() {
        if !available[i] {
            continue;
        }
        for j in (i + 1)..available.len() {
            if !available[j] {
                continue;
            }
            let score = scores.get(i, j);
            if best.map_or(true, |(_, _, best_score)| score > best_score) {
                best = Some((i, j, score));
            }
        }
    }

    best
}

/// Available participant with the best average score against `group`
fn best_addition(scores: &PairScores, available: &[bool], group: &[usize]) -> Option<(usize, f64)> {
    let mut best: Option<(usize, f64)> = None;

    for candidate in 0..available.len() {
        if !available[candidate] {
            continue;
        }
        let total: f64 = group.iter().map(|&member| scores.get(candidate, member)).sum();
        let avg = total / group.len() as f64;

        if best.map_or(true, |(_, best_avg)| avg > best_avg) {
            best = Some((candidate, avg));
        }
    }

    best
}

/// Place participants the main loop could not group
///
/// Two or more leftovers form one last group. A single leftover joins the
/// smallest emitted group (the first one on ties).
fn attach_leftovers(mut groups: Vec<Vec<usize>>, leftovers: Vec<usize>) -> Vec<Vec<usize>> {
    match leftovers.len() {
        0 => {}
        1 => {
            let smallest = groups
                .iter()
                .enumerate()
                .min_by_key(|(_, group)| group.len())
                .map(|(index, _)| index);

            match smallest {
                Some(index) => {
                    groups[index].extend(leftovers);
                    tracing::info!("Added leftover participant to existing group {}", index);
                }
                None => {
                    tracing::warn!("Leftover participant has no group to join");
                }
            }
        }
        count => {
            tracing::info!("Created leftover group with {} participants", count);
            groups.push(leftovers);
        }
    }

    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::scoring::PreferenceScorer;
    use crate::models::Preferences;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn participant(id: &str, topics: &[&str]) -> Participant {
        Participant {
            id: id.to_string(),
            name: format!("User {}", id),
            email: format!("{}@example.com", id),
            deployment_id: "team-a".to_string(),
            preferences: Preferences {
                topics: topics.iter().map(|s| s.to_string()).collect(),
                ..Default::default()
            },
            is_active: true,
            is_paused: false,
        }
    }

    fn pool(count: usize) -> Vec<Participant> {
        (0..count).map(|i| participant(&format!("u{}", i), &[])).collect()
    }

    fn assert_exact_cover(groups: &[Vec<String>], participants: &[Participant]) {
        let mut seen = HashSet::new();
        for group in groups {
            assert!(group.len() >= MIN_GROUP_SIZE);
            for id in group {
                assert!(seen.insert(id.clone()), "{} appears twice", id);
            }
        }
        assert_eq!(seen.len(), participants.len());
    }

    #[test]
    fn test_final_score_penalty() {
        assert_eq!(final_score(0.8, 0.0, 0.7), 0.8);
        assert!((final_score(1.0, 1.0, 0.7) - 0.3).abs() < 1e-9);
        assert!((final_score(1.0, 3.0, 0.7) + 1.1).abs() < 1e-9);
        assert!(final_score(0.5, 3.0, 0.7) < final_score(0.5, 2.0, 0.7));
    }

    #[test]
    fn test_pairs_cover_everyone() {
        let participants = pool(4);
        let mut rng = StdRng::seed_from_u64(7);
        let groups = GroupPartitioner::default().partition(
            &participants,
            &HistoryGraph::new(),
            2,
            &PreferenceScorer::default(),
            &mut rng,
        );

        assert_eq!(groups.len(), 2);
        assert!(groups.iter().all(|g| g.len() == 2));
        assert_exact_cover(&groups, &participants);
    }

    #[test]
    fn test_triples_cover_everyone() {
        let participants = pool(6);
        let mut rng = StdRng::seed_from_u64(11);
        let groups = GroupPartitioner::default().partition(
            &participants,
            &HistoryGraph::new(),
            3,
            &PreferenceScorer::default(),
            &mut rng,
        );

        assert_eq!(groups.len(), 2);
        assert!(groups.iter().all(|g| g.len() == 3));
        assert_exact_cover(&groups, &participants);
    }

    #[test]
    fn test_single_leftover_joins_smallest_group() {
        let participants = pool(5);
        let mut rng = StdRng::seed_from_u64(3);
        let groups = GroupPartitioner::default().partition(
            &participants,
            &HistoryGraph::new(),
            2,
            &PreferenceScorer::default(),
            &mut rng,
        );

        let mut sizes: Vec<usize> = groups.iter().map(Vec::len).collect();
        sizes.sort();
        assert_eq!(sizes, vec![2, 3]);
        assert_exact_cover(&groups, &participants);
    }

    #[test]
    fn test_remainder_pair_forms_own_group() {
        let participants = pool(8);
        let mut rng = StdRng::seed_from_u64(5);
        let groups = GroupPartitioner::default().partition(
            &participants,
            &HistoryGraph::new(),
            3,
            &PreferenceScorer::default(),
            &mut rng,
        );

        let mut sizes: Vec<usize> = groups.iter().map(Vec::len).collect();
        sizes.sort();
        assert_eq!(sizes, vec![2, 3, 3]);
        assert_exact_cover(&groups, &participants);
    }

    #[test]
    fn test_insufficient_pool_returns_empty() {
        let participants = pool(2);
        let mut rng = StdRng::seed_from_u64(1);
        let groups = GroupPartitioner::default().partition(
            &participants,
            &HistoryGraph::new(),
            3,
            &PreferenceScorer::default(),
            &mut rng,
        );
        assert!(groups.is_empty());
    }

    #[test]
    fn test_invalid_group_size_returns_empty() {
        let participants = pool(4);
        let mut rng = StdRng::seed_from_u64(1);
        let groups = GroupPartitioner::default().partition(
            &participants,
            &HistoryGraph::new(),
            1,
            &PreferenceScorer::default(),
            &mut rng,
        );
        assert!(groups.is_empty());
    }

    #[test]
    fn test_duplicate_ids_are_grouped_once() {
        let mut participants = pool(4);
        participants.push(participant("u0", &[]));
        let mut rng = StdRng::seed_from_u64(9);
        let groups = GroupPartitioner::default().partition(
            &participants,
            &HistoryGraph::new(),
            2,
            &PreferenceScorer::default(),
            &mut rng,
        );

        assert_exact_cover(&groups, &participants[..4]);
    }

    #[test]
    fn test_compatible_participants_are_paired() {
        let participants = vec![
            participant("a", &["rust"]),
            participant("b", &["chess"]),
            participant("c", &["rust"]),
            participant("d", &["chess"]),
        ];

        for seed in 0..10 {
            let mut rng = StdRng::seed_from_u64(seed);
            let groups = GroupPartitioner::default().partition(
                &participants,
                &HistoryGraph::new(),
                2,
                &PreferenceScorer::default(),
                &mut rng,
            );

            for group in &groups {
                let mut ids = group.clone();
                ids.sort();
                assert!(ids == ["a", "c"] || ids == ["b", "d"], "unexpected group {:?}", ids);
            }
        }
    }

    #[test]
    fn test_least_repeated_pairs_win_past_penalty_floor() {
        let participants = pool(4);
        let mut graph = HistoryGraph::new();
        graph.add_pair("u0", "u1", 2.0);
        graph.add_pair("u2", "u3", 2.0);
        for (a, b) in [("u0", "u2"), ("u0", "u3"), ("u1", "u2"), ("u1", "u3")] {
            graph.add_pair(a, b, 3.0);
        }

        let partitioner = GroupPartitioner::default();
        let scorer = PreferenceScorer::default();

        for seed in 0..50 {
            let groups = partitioner.partition(
                &participants,
                &graph,
                2,
                &scorer,
                &mut StdRng::seed_from_u64(seed),
            );

            let mut pairs: Vec<Vec<String>> = groups
                .into_iter()
                .map(|mut g| {
                    g.sort();
                    g
                })
                .collect();
            pairs.sort();
            assert_eq!(pairs, vec![vec!["u0", "u1"], vec!["u2", "u3"]], "seed {}", seed);
        }
    }

    #[test]
    fn test_seeded_runs_are_reproducible() {
        let participants = pool(9);
        let partitioner = GroupPartitioner::default();
        let scorer = PreferenceScorer::default();

        let first = partitioner.partition(
            &participants,
            &HistoryGraph::new(),
            3,
            &scorer,
            &mut StdRng::seed_from_u64(42),
        );
        let second = partitioner.partition(
            &participants,
            &HistoryGraph::new(),
            3,
            &scorer,
            &mut StdRng::seed_from_u64(42),
        );

        assert_eq!(first, second);
    }

    #[test]
    fn test_attach_leftovers() {
        let groups = attach_leftovers(vec![vec![0, 1, 2], vec![3, 4]], vec![5]);
        assert_eq!(groups, vec![vec![0, 1, 2], vec![3, 4, 5]]);

        let groups = attach_leftovers(vec![vec![0, 1], vec![2, 3]], vec![4]);
        assert_eq!(groups, vec![vec![0, 1, 4], vec![2, 3]]);

        let groups = attach_leftovers(vec![vec![0, 1]], vec![2, 3]);
        assert_eq!(groups, vec![vec![0, 1], vec![2, 3]]);
    }
}
