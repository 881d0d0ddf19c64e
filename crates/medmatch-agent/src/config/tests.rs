#[cfg(test)]
mod tests {
    use super::super::*;
    use medmatch_common::Language;
    use medmatch_ranker::{MatchPolicy, RuleKind};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_from(&dir.path().join("medmatch.toml")).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.extraction.context_window, 25);
        assert_eq!(config.ranking.max_factors, 5);
        assert_eq!(config.catalog.freshness_hours, 24);
    }

    #[test]
    fn test_partial_sections_keep_defaults() {
        let config = Config::parse(
            r#"
[extraction]
languages = ["it"]

[scoring]
policy = "strict"
disabled_rules = ["comorbidity"]

[scoring.weights]
stage_match = 30

[ranking]
max_results = 10
"#,
        )
        .unwrap();

        assert_eq!(config.extraction.languages, vec![Language::It]);
        assert_eq!(config.extraction.context_window, 25);
        assert_eq!(config.scoring.policy, MatchPolicy::Strict);
        assert_eq!(config.scoring.disabled_rules, vec![RuleKind::Comorbidity]);
        assert_eq!(config.scoring.weights.stage_match, 30);
        assert_eq!(config.scoring.weights.cancer_type_match, 30);
        assert_eq!(config.ranking.max_results, Some(10));
        assert!(config.catalog.path.is_none());
    }

    #[test]
    fn test_wrong_weight_sign_is_rejected() {
        let err = Config::parse("[scoring.weights]\nage_outside = 10\n").unwrap_err();
        assert!(matches!(err, MedmatchError::Config(_)));
        assert!(err.to_string().contains("age_outside"));
    }

    #[test]
    fn test_malformed_toml_is_an_error() {
        let err = Config::parse("[ranking\nmax_factors = 3").unwrap_err();
        assert!(matches!(err, MedmatchError::Toml(_)));
    }

    #[test]
    fn test_config_file_is_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("medmatch.toml");
        std::fs::write(&path, "[catalog]\npath = \"trials.yaml\"\nfreshness_hours = 6\n").unwrap();
        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.catalog.path.as_deref(), Some(Path::new("trials.yaml")));
        assert_eq!(config.catalog.freshness_hours, 6);
    }
}
