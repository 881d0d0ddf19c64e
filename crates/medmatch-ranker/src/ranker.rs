//! Ordering and presentation of scored trials.

use medmatch_common::{MatchFactor, MatchResult, RankedMatch};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankingConfig {
    /// Keep at most this many trials; all of them when unset.
    #[serde(default)]
    pub max_results: Option<usize>,
    /// Factors shown per list on each trial.
    #[serde(default = "default_max_factors")]
    pub max_factors: usize,
}

fn default_max_factors() -> usize {
    5
}

impl Default for RankingConfig {
    fn default() -> Self {
        Self {
            max_results: None,
            max_factors: default_max_factors(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Ranker {
    config: RankingConfig,
}

impl Ranker {
    pub fn new(config: RankingConfig) -> Self {
        Self { config }
    }

    /// Sort by descending score, ties in input order, then cap results and
    /// factor lists. Scores are never altered.
    pub fn rank(&self, mut results: Vec<MatchResult>) -> Vec<RankedMatch> {
        results.sort_by(|a, b| b.score.cmp(&a.score));
        if let Some(max) = self.config.max_results {
            results.truncate(max);
        }

        results
            .into_iter()
            .enumerate()
            .map(|(i, mut result)| {
                let total_match_reasons = result.match_reasons.len();
                let total_limiting_factors = result.limiting_factors.len();
                cap_factors(&mut result.match_reasons, self.config.max_factors);
                cap_factors(&mut result.limiting_factors, self.config.max_factors);
                RankedMatch {
                    rank: i + 1,
                    result,
                    total_match_reasons,
                    total_limiting_factors,
                }
            })
            .collect()
    }
}

/// Keep the `max` heaviest factors; equal weights stay in rule order.
fn cap_factors(factors: &mut Vec<MatchFactor>, max: usize) {
    if factors.len() <= max {
        return;
    }
    factors.sort_by_key(|f| std::cmp::Reverse(f.weight.unsigned_abs()));
    factors.truncate(max);
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn result(trial_id: &str, score: u32) -> MatchResult {
        MatchResult {
            trial_id: trial_id.to_string(),
            score,
            match_reasons: vec![],
            limiting_factors: vec![],
        }
    }

    fn ids(ranked: &[RankedMatch]) -> Vec<&str> {
        ranked.iter().map(|r| r.result.trial_id.as_str()).collect()
    }

    #[test]
    fn test_higher_score_first() {
        let ranked = Ranker::default().rank(vec![result("NCT-B", 40), result("NCT-A", 80)]);
        assert_eq!(ids(&ranked), vec!["NCT-A", "NCT-B"]);
        assert_eq!(ranked[0].rank, 1);
        assert_eq!(ranked[1].rank, 2);
    }

    #[test]
    fn test_ties_keep_catalog_order() {
        let ranked = Ranker::default().rank(vec![
            result("NCT-1", 50),
            result("NCT-2", 70),
            result("NCT-3", 50),
            result("NCT-4", 50),
        ]);
        assert_eq!(ids(&ranked), vec!["NCT-2", "NCT-1", "NCT-3", "NCT-4"]);
    }

    #[test]
    fn test_max_results() {
        let ranker = Ranker::new(RankingConfig {
            max_results: Some(1),
            ..RankingConfig::default()
        });
        let ranked = ranker.rank(vec![result("NCT-1", 10), result("NCT-2", 90)]);
        assert_eq!(ids(&ranked), vec!["NCT-2"]);
    }

    #[test]
    fn test_factor_cap_keeps_heaviest_and_totals() {
        let mut scored = result("NCT-1", 65);
        scored.match_reasons = vec![
            MatchFactor::new("Age", "within range", 5),
            MatchFactor::new("Cancer Type", "site match", 30),
            MatchFactor::new("Gender", "no restriction", 5),
            MatchFactor::new("Stage", "stage match", 25),
        ];
        let ranker = Ranker::new(RankingConfig {
            max_results: None,
            max_factors: 3,
        });
        let ranked = ranker.rank(vec![scored]);

        let kept: Vec<&str> = ranked[0]
            .result
            .match_reasons
            .iter()
            .map(|f| f.factor.as_str())
            .collect();
        assert_eq!(kept, vec!["Cancer Type", "Stage", "Age"]);
        assert_eq!(ranked[0].total_match_reasons, 4);
        assert_eq!(ranked[0].result.score, 65);
    }
}
