//! Narrative-to-ranking runs against the bundled seed catalog.

use medmatch_ner::extract_profile;
use medmatch_ranker::catalog::seed_trials;
use medmatch_ranker::{match_trials, MatchPolicy, Ranker, RankingConfig, RuleKind, Scorer, ScoringConfig};
use medmatch_test_utils::narratives::{ENGLISH_BREAST, ENGLISH_LUNG, UNRELATED};
use medmatch_test_utils::profiles::ProfileBuilder;
use pretty_assertions::assert_eq;

fn score_of(ranked: &[medmatch_common::RankedMatch], trial_id: &str) -> u32 {
    ranked
        .iter()
        .find(|r| r.result.trial_id == trial_id)
        .map(|r| r.result.score)
        .unwrap_or_else(|| panic!("{trial_id} missing from ranking"))
}

#[test]
fn breast_narrative_prefers_adjuvant_hormone_receptor_trial() {
    let profile = extract_profile(ENGLISH_BREAST);
    let ranked = match_trials(&profile, seed_trials(), MatchPolicy::Lenient);

    assert_eq!(ranked.len(), seed_trials().len());
    assert_eq!(ranked[0].result.trial_id, "NCT04001001");
    assert!(ranked[0].result.score >= 80, "score {}", ranked[0].result.score);
    assert!(ranked.iter().all(|r| r.result.score <= 100));
    assert!(ranked.windows(2).all(|w| w[0].result.score >= w[1].result.score));
}

#[test]
fn lung_narrative_prefers_lung_trials() {
    let profile = extract_profile(ENGLISH_LUNG);
    let ranked = match_trials(&profile, seed_trials(), MatchPolicy::Lenient);

    let kras = score_of(&ranked, "NCT04001003");
    let prostate = score_of(&ranked, "NCT04001007");
    assert!(kras > prostate, "{kras} vs {prostate}");
    assert_eq!(prostate, 0);
}

#[test]
fn strict_policy_returns_subset_of_lenient() {
    let profile = extract_profile(ENGLISH_LUNG);
    let lenient = match_trials(&profile, seed_trials(), MatchPolicy::Lenient);
    let strict = match_trials(&profile, seed_trials(), MatchPolicy::Strict);

    assert!(strict.len() < lenient.len());
    assert!(strict.iter().all(|r| r.result.score > 0));
}

#[test]
fn unrelated_narrative_still_ranks_every_trial() {
    let profile = extract_profile(UNRELATED);
    let ranked = match_trials(&profile, seed_trials(), MatchPolicy::Lenient);
    assert_eq!(ranked.len(), seed_trials().len());
    // Only trial-side evidence applies: caveats and enrollment status.
    assert!(ranked.iter().all(|r| r.result.match_reasons.is_empty()));
}

#[test]
fn ranking_is_deterministic() {
    let profile = extract_profile(ENGLISH_BREAST);
    let scorer = Scorer::default();
    let ranker = Ranker::new(RankingConfig {
        max_results: Some(3),
        max_factors: 2,
    });

    let first = ranker.rank(scorer.score_all(&profile, seed_trials(), MatchPolicy::Lenient));
    let second = ranker.rank(scorer.score_all(&profile, seed_trials(), MatchPolicy::Lenient));
    assert_eq!(first, second);
    assert_eq!(first.len(), 3);
    assert!(first.iter().all(|r| r.result.match_reasons.len() <= 2));
    assert!(first[0].total_match_reasons > 2);
}

#[test]
fn prior_targeted_therapy_exclusion_does_not_exclude_mutation_carriers() {
    let profile = ProfileBuilder::new()
        .cancer("Lung Adenocarcinoma")
        .stage("Stage 4")
        .subtype("EGFR exon 19 deletion")
        .age(60)
        .build();
    let trial = seed_trials()
        .iter()
        .find(|t| t.nct_id == "NCT04001005")
        .expect("seed catalog has the EGFR consolidation trial");

    let result = Scorer::default().score(&profile, trial);
    assert!(
        result.limiting_factors.iter().all(|f| f.factor != "Biomarker Exclusion"),
        "{:?}",
        result.limiting_factors
    );

    let without_exclusion = Scorer::new(ScoringConfig {
        disabled_rules: vec![RuleKind::BiomarkerExclusion],
        ..ScoringConfig::default()
    })
    .score(&profile, trial);
    assert_eq!(result.score, without_exclusion.score);
    assert!(result.score >= 75, "score {}", result.score);
}

#[test]
fn italian_exclusion_names_inflammatory_bowel_disease() {
    let profile = ProfileBuilder::new()
        .cancer("Prostate Adenocarcinoma")
        .gender("Male")
        .comorbidities("Inflammatory Bowel Disease")
        .build();
    let trial = seed_trials()
        .iter()
        .find(|t| t.nct_id == "NCT04001007")
        .expect("seed catalog has the prostate radiotherapy trial");

    let result = Scorer::default().score(&profile, trial);
    assert!(
        result
            .limiting_factors
            .iter()
            .any(|f| f.factor == "Comorbidity" && f.weight == -30),
        "{:?}",
        result.limiting_factors
    );
}
