#[cfg(test)]
mod tests {
    use super::super::*;
    use pretty_assertions::assert_eq;
    use secrecy::ExposeSecret;

    #[test]
    fn test_empty_file_gives_defaults() {
        let config = Config::from_toml("").unwrap();
        assert_eq!(config.cases.study_column, "0");
        assert_eq!(config.llm.kind, BackendKind::Gemini);
        assert_eq!(config.llm.model, "gemini-2.0-flash-lite");
        assert_eq!(config.llm.on_failure, FailurePolicy::Skip);
        assert_eq!(config.structuring.split, SplitConfig::default());
        assert_eq!(config.evaluation.field_mapping.len(), 6);
    }

    #[test]
    fn test_default_exclusions_and_merges() {
        let s = StructuringConfig::default();
        assert_eq!(s.excluded_studies().len(), 5);
        assert_eq!(s.merges.len(), 2);
        assert_eq!(s.merges[0].members.len(), 4);
        assert!(s.merges[0].members.contains(&"Tituler, Höftberger - Dalmau, 2014\n\nKruer, 2010".to_string()));
        assert_eq!(
            s.merges[1].members,
            vec!["Prüss-Wandinger, 2010".to_string(), "Prüss-Wandinger, 2010 and Finke, 2012".to_string()]
        );
    }

    #[test]
    fn test_partial_sections_keep_other_defaults() {
        let config = Config::from_toml(
            r#"
            [llm]
            kind = "openai"
            model = "gpt-4o-mini"
            api_key = "sk-test"
            on_failure = "abort"

            [structuring.split]
            seed = 7

            [[evaluation.features]]
            name = "Sex"
            kind = "binary"
            "#,
        )
        .unwrap();
        assert_eq!(config.llm.kind, BackendKind::OpenAi);
        assert_eq!(config.llm.request_delay_secs, 5.0);
        assert_eq!(config.llm.on_failure, FailurePolicy::Abort);
        assert_eq!(config.llm.resolved_api_key().unwrap().expose_secret(), "sk-test");
        assert_eq!(config.structuring.split.seed, 7);
        assert_eq!(config.structuring.split.pilot_single, 5);
        assert_eq!(config.structuring.unreadable_studies, vec!["Raynor -Berkowitz, 2016"]);
        assert_eq!(config.evaluation.features.len(), 1);
    }

    #[test]
    fn test_missing_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load(&dir.path().join("nope.toml")).unwrap();
        assert_eq!(config.paths.files_dir, PathBuf::from("publication_files"));
        assert_eq!(config.matching.review_path_to, "NMDARE SR articles");
    }

    #[test]
    fn test_invalid_backend_kind_is_rejected() {
        assert!(Config::from_toml("[llm]\nkind = \"claude\"\n").is_err());
    }
}
