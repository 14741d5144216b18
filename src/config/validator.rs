use crate::config::{Config, SCHEMA_VERSION};
use crate::error::{ArchiveError, Result, ValidationError};

/// Configuration validator
pub struct ConfigValidator;

impl ConfigValidator {
    /// Validate the configuration
    pub fn validate(config: &Config) -> Result<()> {
        let mut errors = Vec::new();

        // Validate schema version
        Self::validate_schema_version(config, &mut errors);

        // Validate endpoints and paging
        Self::validate_backend(config, &mut errors);

        // Validate session settings
        Self::validate_session(config, &mut errors);

        // Validate justification settings
        Self::validate_justification(config, &mut errors);

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ArchiveError::ConfigValidation { errors })
        }
    }

    fn validate_schema_version(config: &Config, errors: &mut Vec<ValidationError>) {
        let version = &config.meta.schema_version;
        if version != SCHEMA_VERSION {
            errors.push(ValidationError::new(
                "_meta.schema_version",
                format!("Unsupported schema version: {}", version),
            ));
        }
    }

    fn validate_backend(config: &Config, errors: &mut Vec<ValidationError>) {
        let endpoints = [
            ("backend.search_endpoint", &config.backend.search_endpoint),
            ("backend.count_endpoint", &config.backend.count_endpoint),
            ("backend.resources_endpoint", &config.backend.resources_endpoint),
            ("backend.node_endpoint", &config.backend.node_endpoint),
            ("backend.lists_endpoint", &config.backend.lists_endpoint),
        ];

        for (path, endpoint) in endpoints {
            if !Self::is_valid_endpoint(endpoint) {
                errors.push(ValidationError::new(
                    path,
                    format!("Endpoint must be an http(s) URL, got '{}'", endpoint),
                ));
            }
        }

        if config.backend.subject_list_id.trim().is_empty() {
            errors.push(ValidationError::new(
                "backend.subject_list_id",
                "Subject list id cannot be empty",
            ));
        }

        if config.backend.page_size == 0 {
            errors.push(ValidationError::new(
                "backend.page_size",
                "Page size must be greater than 0",
            ));
        }
    }

    fn validate_session(config: &Config, errors: &mut Vec<ValidationError>) {
        if config.session.api_paging == 0 {
            errors.push(ValidationError::new(
                "session.api_paging",
                "Batch size must be greater than 0",
            ));
        }

        if config.session.lock_timeout_ms == 0 {
            errors.push(ValidationError::new(
                "session.lock_timeout_ms",
                "Lock timeout must be greater than 0",
            ));
        }
    }

    fn validate_justification(config: &Config, errors: &mut Vec<ValidationError>) {
        if config
            .justification
            .hard_break_exceptions
            .iter()
            .any(|e| e.is_empty())
        {
            errors.push(ValidationError::new(
                "justification.hard_break_exceptions",
                "Hard break exceptions cannot be empty strings",
            ));
        }
    }

    fn is_valid_endpoint(s: &str) -> bool {
        let s = s.trim();
        let rest = s
            .strip_prefix("https://")
            .or_else(|| s.strip_prefix("http://"));
        matches!(rest, Some(host) if !host.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_config() {
        let config = Config::default();
        assert!(ConfigValidator::validate(&config).is_ok());
    }

    #[test]
    fn test_invalid_endpoint() {
        let mut config = Config::default();
        config.backend.count_endpoint = "ftp://api.example.org/count".to_string();
        assert!(ConfigValidator::validate(&config).is_err());
    }

    #[test]
    fn test_zero_page_size() {
        let mut config = Config::default();
        config.backend.page_size = 0;
        assert!(ConfigValidator::validate(&config).is_err());
    }

    #[test]
    fn test_blank_subject_list() {
        let mut config = Config::default();
        config.backend.subject_list_id = " ".to_string();
        config.backend.node_endpoint = "api.dasch.swiss/v2/node".to_string();

        match ConfigValidator::validate(&config) {
            Err(ArchiveError::ConfigValidation { errors }) => {
                let paths: Vec<&str> = errors.iter().map(|e| e.path.as_str()).collect();
                assert_eq!(paths, vec!["backend.node_endpoint", "backend.subject_list_id"]);
            }
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_collects_all_errors() {
        let mut config = Config::default();
        config.meta.schema_version = "0.1.0".to_string();
        config.session.api_paging = 0;
        config.justification.hard_break_exceptions = vec![String::new()];

        match ConfigValidator::validate(&config) {
            Err(ArchiveError::ConfigValidation { errors }) => {
                let paths: Vec<&str> = errors.iter().map(|e| e.path.as_str()).collect();
                assert_eq!(
                    paths,
                    vec![
                        "_meta.schema_version",
                        "session.api_paging",
                        "justification.hard_break_exceptions"
                    ]
                );
            }
            other => panic!("expected validation error, got {:?}", other),
        }
    }
}
