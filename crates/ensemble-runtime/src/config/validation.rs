//! Configuration validation utilities.

use super::error::{ConfigError, ConfigResult};
use super::schema::{EnsembleConfig, LogFormat, LogOutput, PluginSettings};
use std::collections::HashSet;

/// Validates the entire configuration.
pub fn validate_config(config: &EnsembleConfig) -> ConfigResult<()> {
    validate_logging(config)?;
    validate_plugins(&config.plugins)?;
    Ok(())
}

/// Validates logging settings.
fn validate_logging(config: &EnsembleConfig) -> ConfigResult<()> {
    if config.logging.format == LogFormat::Json && !cfg!(feature = "json-log") {
        return Err(ConfigError::validation(
            "logging.format = \"json\" requires the 'json-log' feature",
        ));
    }

    if config.logging.output == LogOutput::File && config.logging.file_path.is_none() {
        return Err(ConfigError::validation(
            "logging.output = \"file\" requires logging.file_path",
        ));
    }

    Ok(())
}

/// Validates plugin loading settings.
fn validate_plugins(plugins: &PluginSettings) -> ConfigResult<()> {
    let mut seen = HashSet::new();

    for name in &plugins.disabled {
        if name.trim().is_empty() {
            return Err(ConfigError::validation(
                "plugins.disabled entries must not be blank",
            ));
        }
        if !seen.insert(name) {
            return Err(ConfigError::DuplicateDisabled(name.clone()));
        }
    }

    for name in plugins.config.keys() {
        if name.trim().is_empty() {
            return Err(ConfigError::validation(
                "plugins.config section names must not be blank",
            ));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_config_is_valid() {
        let config = EnsembleConfig::default();
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn file_output_without_path_is_rejected() {
        let mut config = EnsembleConfig::default();
        config.logging.output = LogOutput::File;
        let result = validate_config(&config);
        assert!(matches!(result, Err(ConfigError::ValidationError { .. })));
    }

    #[test]
    fn file_output_with_path_is_accepted() {
        let mut config = EnsembleConfig::default();
        config.logging.output = LogOutput::File;
        config.logging.file_path = Some("logs/ensemble.log".into());
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn duplicate_disabled_entries_are_rejected() {
        let mut config = EnsembleConfig::default();
        config.plugins.disabled = vec!["transcoder".into(), "transcoder".into()];
        let result = validate_config(&config);
        assert!(matches!(result, Err(ConfigError::DuplicateDisabled(name)) if name == "transcoder"));
    }

    #[test]
    fn blank_disabled_entry_is_rejected() {
        let mut config = EnsembleConfig::default();
        config.plugins.disabled = vec!["  ".into()];
        assert!(validate_config(&config).is_err());
    }
}
