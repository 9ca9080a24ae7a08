//! Tests for config module

#[cfg(test)]
mod tests {
    use crate::config::*;
    use std::io::Write;

    // ========================================================================
    // Defaults
    // ========================================================================

    #[test]
    fn test_config_default_values() {
        // Arrange & Act
        let config = SqlSearchConfig::default();

        // Assert
        assert_eq!(config.join.multi_search_max_size, 100);
        assert_eq!(config.join.default_table_limit, 200);
        assert_eq!(config.join.max_concurrent_batches, 4);
        assert_eq!(config.transport.url, "http://localhost:9200");
        assert_eq!(config.transport.timeout_ms, 30_000);
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.logging.format, "text");
        assert!(config.validate().is_ok());
    }

    // ========================================================================
    // TOML loading
    // ========================================================================

    #[test]
    fn test_config_from_toml_partial_override() {
        // Arrange
        let toml_str = r#"
[join]
multi_search_max_size = 25

[transport]
url = "https://search.internal:9243"
api_key = "abc"
"#;

        // Act
        let config = SqlSearchConfig::from_toml(toml_str).expect("parse");

        // Assert
        assert_eq!(config.join.multi_search_max_size, 25);
        assert_eq!(config.join.default_table_limit, 200);
        assert_eq!(config.transport.url, "https://search.internal:9243");
        assert_eq!(config.transport.api_key.as_deref(), Some("abc"));
    }

    #[test]
    fn test_config_from_toml_invalid_syntax() {
        let result = SqlSearchConfig::from_toml("[join\nmulti_search_max_size = ");
        assert!(matches!(result, Err(ConfigError::ParseError(_))));
    }

    #[test]
    fn test_config_load_from_file() {
        // Arrange
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        writeln!(file, "[logging]\nlevel = \"debug\"\nformat = \"json\"").expect("write");

        // Act
        let config = SqlSearchConfig::load_from_path(file.path()).expect("load");

        // Assert
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.logging.format, "json");
    }

    #[test]
    fn test_config_load_rejects_out_of_range_value() {
        // Arrange
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        writeln!(file, "[join]\nmax_concurrent_batches = 1000").expect("write");

        // Act
        let result = SqlSearchConfig::load_from_path(file.path());

        // Assert
        assert!(matches!(
            result,
            Err(ConfigError::InvalidValue { ref key, .. }) if key == "join.max_concurrent_batches"
        ));
    }

    #[test]
    fn test_config_load_missing_file_uses_defaults() {
        let config =
            SqlSearchConfig::load_from_path("/definitely/not/here/sqlsearch.toml").expect("load");
        assert_eq!(config.join.multi_search_max_size, 100);
    }

    #[test]
    fn test_config_to_toml_round_trip() {
        let mut config = SqlSearchConfig::default();
        config.join.max_concurrent_batches = 8;

        let text = config.to_toml().expect("serialize");
        let parsed = SqlSearchConfig::from_toml(&text).expect("parse");

        assert_eq!(parsed.join.max_concurrent_batches, 8);
    }

    // ========================================================================
    // Validation
    // ========================================================================

    #[test]
    fn test_validate_rejects_zero_batch_size() {
        let mut config = SqlSearchConfig::default();
        config.join.multi_search_max_size = 0;

        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("join.multi_search_max_size"));
    }

    #[test]
    fn test_validate_rejects_concurrency_out_of_range() {
        let mut config = SqlSearchConfig::default();
        config.join.max_concurrent_batches = 0;
        assert!(config.validate().is_err());

        config.join.max_concurrent_batches = 65;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_non_http_url() {
        let mut config = SqlSearchConfig::default();
        config.transport.url = "ftp://cluster".to_string();

        let err = config.validate().unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref key, .. } if key == "transport.url"));
    }

    #[test]
    fn test_validate_rejects_unknown_log_format() {
        let mut config = SqlSearchConfig::default();
        config.logging.format = "xml".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_error_converts_to_crate_error() {
        let err: crate::Error = ConfigError::ParseError("bad".into()).into();
        assert_eq!(err.code(), "SQLS-008");
    }
}
