//! Configuration validation utilities.

use super::error::{ConfigError, ConfigResult};
use super::schema::{AppConfig, LapisConfig, LogOutput, LoggingConfig};

/// Validates the entire configuration.
pub fn validate_config(config: &LapisConfig) -> ConfigResult<()> {
    validate_app_config(&config.app)?;
    validate_logging_config(&config.logging)?;
    Ok(())
}

fn validate_app_config(app: &AppConfig) -> ConfigResult<()> {
    if app.name.trim().is_empty() {
        return Err(ConfigError::missing_field("app.name"));
    }

    let content_type = app.default_content_type.trim();
    if content_type.is_empty() {
        return Err(ConfigError::validation(
            "Default content type must not be empty",
        ));
    }
    if !content_type.contains('/') {
        return Err(ConfigError::validation(format!(
            "Invalid default content type: {content_type}. Expected a media type such as application/json"
        )));
    }

    if app.charset.trim().is_empty() {
        return Err(ConfigError::validation("Charset must not be empty"));
    }

    if app.max_injection_depth == 0 {
        return Err(ConfigError::validation(
            "Max injection depth must be greater than 0",
        ));
    }

    Ok(())
}

fn validate_logging_config(logging: &LoggingConfig) -> ConfigResult<()> {
    if logging.output == LogOutput::File && logging.file_path.is_none() {
        return Err(ConfigError::missing_field("logging.file_path"));
    }

    if logging.max_files == 0 {
        return Err(ConfigError::validation("Max log files must be greater than 0"));
    }

    if logging.filters.keys().any(|module| module.trim().is_empty()) {
        return Err(ConfigError::validation(
            "Log filter module names must not be empty",
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LogLevel;

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate_config(&LapisConfig::default()).is_ok());
    }

    #[test]
    fn test_rejects_bad_app_settings() {
        let mut config = LapisConfig::default();
        config.app.max_injection_depth = 0;
        assert!(matches!(
            validate_config(&config),
            Err(ConfigError::ValidationError { .. })
        ));

        let mut config = LapisConfig::default();
        config.app.default_content_type = "json".into();
        assert!(validate_config(&config).is_err());

        let mut config = LapisConfig::default();
        config.app.name = " ".into();
        assert!(matches!(
            validate_config(&config),
            Err(ConfigError::MissingField { field }) if field == "app.name"
        ));
    }

    #[test]
    fn test_rejects_bad_logging_settings() {
        let mut config = LapisConfig::default();
        config.logging.output = LogOutput::File;
        assert!(matches!(
            validate_config(&config),
            Err(ConfigError::MissingField { field }) if field == "logging.file_path"
        ));

        let mut config = LapisConfig::default();
        config.logging.filters.insert(String::new(), LogLevel::Debug);
        assert!(validate_config(&config).is_err());
    }
}
