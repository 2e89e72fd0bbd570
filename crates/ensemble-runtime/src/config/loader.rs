//! Configuration loader using figment.
//!
//! This module provides a layered configuration loading system:
//!
//! - **Multiple sources**: TOML/YAML files, environment variables,
//!   programmatic defaults
//! - **Layered configuration**: Later sources override earlier ones
//!
//! # Feature Flags
//!
//! - `toml-config`: enables TOML configuration files (`ensemble.toml`,
//!   `config.toml`)
//! - `yaml-config`: enables YAML configuration files (`ensemble.yaml`,
//!   `ensemble.yml`, etc.)
//!
//! Both features can be enabled simultaneously; if so, both file formats
//! are searched and loaded.
//!
//! # Configuration Priority (lowest to highest)
//!
//! 1. Built-in defaults
//! 2. Config file (`ensemble.toml` / `ensemble.yaml`)
//! 3. Environment variables (`ENSEMBLE_*`)
//! 4. Programmatic overrides
//!
//! # Environment Variable Mapping
//!
//! Environment variables are mapped using the `ENSEMBLE_` prefix with `__`
//! as separator:
//!
//! - `ENSEMBLE_LOGGING__LEVEL=debug` → `logging.level = "debug"`
//! - `ENSEMBLE_LOGGING__FORMAT=pretty` → `logging.format = "pretty"`
//!
//! # Example
//!
//! ```rust,ignore
//! use ensemble_runtime::config::{ConfigLoader, EnsembleConfig};
//!
//! // Simple loading from default locations
//! let config = ConfigLoader::new().load()?;
//!
//! // Load from specific file with env overrides
//! let config = ConfigLoader::new()
//!     .file("./config/ensemble.toml")
//!     .with_env()
//!     .load()?;
//! ```

use std::path::{Path, PathBuf};

use figment::Figment;
#[cfg(any(feature = "yaml-config", feature = "toml-config"))]
use figment::providers::Format;
#[cfg(feature = "toml-config")]
use figment::providers::Toml;
#[cfg(feature = "yaml-config")]
use figment::providers::Yaml;
use figment::providers::{Env, Serialized};
#[cfg(any(feature = "yaml-config", feature = "toml-config"))]
use tracing::warn;
use tracing::{debug, info, trace};

use super::error::{ConfigError, ConfigResult};
use super::schema::EnsembleConfig;
use super::validation::validate_config;

/// Configuration loader with figment-based multi-source support.
///
/// # Example
///
/// ```rust,ignore
/// let config = ConfigLoader::new()
///     .file("ensemble.toml")
///     .with_env()
///     .load()?;
/// ```
pub struct ConfigLoader {
    /// Programmatic overrides, merged on top of files and environment.
    overrides: Figment,
    /// Search paths for configuration files.
    search_paths: Vec<PathBuf>,
    /// Whether to load environment variables.
    load_env: bool,
    /// Specific config file to load (overrides search).
    config_file: Option<PathBuf>,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigLoader {
    /// Creates a new configuration loader with defaults.
    pub fn new() -> Self {
        Self {
            overrides: Figment::new(),
            search_paths: Vec::new(),
            load_env: true,
            config_file: None,
        }
    }

    /// Adds a search path for configuration files.
    pub fn search_path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.search_paths.push(path.as_ref().to_path_buf());
        self
    }

    /// Adds current directory to search paths.
    pub fn with_current_dir(self) -> Self {
        if let Ok(cwd) = std::env::current_dir() {
            self.search_path(cwd)
        } else {
            self
        }
    }

    /// Adds user config directory to search paths.
    pub fn with_user_config_dir(self) -> Self {
        if let Some(config_dir) = dirs::config_dir() {
            self.search_path(config_dir.join("ensemble"))
        } else {
            self
        }
    }

    /// Sets a specific configuration file to load.
    pub fn file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config_file = Some(path.as_ref().to_path_buf());
        self
    }

    /// Enables loading environment variables (default: true).
    pub fn with_env(mut self) -> Self {
        self.load_env = true;
        self
    }

    /// Disables loading environment variables.
    pub fn without_env(mut self) -> Self {
        self.load_env = false;
        self
    }

    /// Merges additional configuration programmatically. Overrides win over
    /// files and environment variables.
    ///
    /// # Example
    ///
    /// ```rust,ignore
    /// let mut overrides = EnsembleConfig::default();
    /// overrides.logging.level = LogLevel::Debug;
    /// let config = ConfigLoader::new().merge(overrides).load()?;
    /// ```
    pub fn merge(mut self, config: EnsembleConfig) -> Self {
        self.overrides = self.overrides.merge(Serialized::defaults(config));
        self
    }

    /// Loads, extracts, and validates the configuration.
    pub fn load(self) -> ConfigResult<EnsembleConfig> {
        let figment = self.build_figment()?;

        let config: EnsembleConfig = figment.extract().map_err(|e| {
            ConfigError::ParseError(format!("Failed to extract configuration: {e}"))
        })?;

        validate_config(&config)?;

        debug!(
            logging_level = %config.logging.level,
            disabled = config.plugins.disabled.len(),
            "Configuration loaded successfully"
        );

        Ok(config)
    }

    /// Builds the figment instance with all sources.
    fn build_figment(self) -> ConfigResult<Figment> {
        let Self {
            overrides,
            search_paths,
            load_env,
            config_file,
        } = self;

        // Start with defaults
        let mut figment = Figment::from(Serialized::defaults(EnsembleConfig::default()));

        // Load config files
        if let Some(path) = config_file {
            if path.exists() {
                info!(path = %path.display(), "Loading configuration file");
                figment = Self::merge_config_file(figment, &path)?;
            } else {
                return Err(ConfigError::FileNotFound(path));
            }
        } else {
            figment = Self::search_config_files(figment, &search_paths);
        }

        // Load environment variables
        if load_env {
            trace!("Loading environment variables with ENSEMBLE_ prefix");
            figment = figment.merge(
                Env::prefixed("ENSEMBLE_")
                    .split("__")
                    .map(|key| key.as_str().replace("__", ".").into()),
            );
        }

        // Programmatic overrides win
        Ok(figment.merge(overrides))
    }

    /// Merges a single config file into the figment, dispatching on file
    /// extension. Only extensions enabled via feature flags are accepted.
    fn merge_config_file(figment: Figment, path: &Path) -> ConfigResult<Figment> {
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
        match ext {
            #[cfg(feature = "toml-config")]
            "toml" => Ok(figment.merge(Toml::file(path))),
            #[cfg(feature = "yaml-config")]
            "yaml" | "yml" => Ok(figment.merge(Yaml::file(path))),
            _ => Err(ConfigError::ParseError(format!(
                "Unsupported or disabled configuration file format: .{ext}"
            ))),
        }
    }

    /// Resolves the effective list of search paths: the configured ones, or
    /// the working directory plus the user config directory.
    #[cfg(any(feature = "toml-config", feature = "yaml-config"))]
    fn resolve_search_paths(configured: &[PathBuf]) -> Vec<PathBuf> {
        if configured.is_empty() {
            let mut paths = Vec::new();
            if let Ok(cwd) = std::env::current_dir() {
                paths.push(cwd);
            }
            if let Some(config_dir) = dirs::config_dir() {
                paths.push(config_dir.join("ensemble"));
            }
            paths
        } else {
            configured.to_vec()
        }
    }

    /// Common search logic for a single file format: walks
    /// `search_paths × base_names` and merges the first file found.
    #[cfg(any(feature = "toml-config", feature = "yaml-config"))]
    fn merge_first_found<F>(
        mut figment: Figment,
        search_paths: &[PathBuf],
        base_names: &[&str],
        merge_fn: F,
    ) -> (Figment, bool)
    where
        F: Fn(Figment, &Path) -> Figment,
    {
        for search_path in search_paths {
            for base_name in base_names {
                let path = search_path.join(base_name);
                if path.exists() {
                    info!(path = %path.display(), "Loading configuration file");
                    figment = merge_fn(figment, &path);
                    return (figment, true);
                }
            }
        }
        (figment, false)
    }

    /// Searches for and loads configuration files from search paths.
    ///
    /// Which file formats are attempted is controlled by the `toml-config`
    /// and `yaml-config` feature flags. Each enabled format is searched
    /// independently.
    #[cfg(any(feature = "toml-config", feature = "yaml-config"))]
    fn search_config_files(mut figment: Figment, configured: &[PathBuf]) -> Figment {
        let search_paths = Self::resolve_search_paths(configured);
        let mut found = false;

        #[cfg(feature = "toml-config")]
        {
            let (merged, ok) = Self::merge_first_found(
                figment,
                &search_paths,
                &["ensemble.toml", "config.toml"],
                |fig, path| fig.merge(Toml::file(path)),
            );
            figment = merged;
            found |= ok;
        }

        #[cfg(feature = "yaml-config")]
        {
            let (merged, ok) = Self::merge_first_found(
                figment,
                &search_paths,
                &["ensemble.yaml", "ensemble.yml", "config.yaml", "config.yml"],
                |fig, path| fig.merge(Yaml::file(path)),
            );
            figment = merged;
            found |= ok;
        }

        if !found {
            warn!("No configuration file found, using defaults");
        }
        figment
    }

    #[cfg(not(any(feature = "toml-config", feature = "yaml-config")))]
    fn search_config_files(figment: Figment, _configured: &[PathBuf]) -> Figment {
        trace!("No configuration file format compiled in, skipping file search");
        figment
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::LogLevel;

    #[test]
    fn default_config_loads_without_files() {
        let dir = tempfile::tempdir().unwrap();
        let config = ConfigLoader::new()
            .search_path(dir.path())
            .without_env()
            .load()
            .unwrap();

        assert_eq!(config.logging.level, LogLevel::Info);
        assert!(config.plugins.disabled.is_empty());
    }

    #[test]
    fn missing_explicit_file_is_an_error() {
        let result = ConfigLoader::new()
            .file("/nonexistent/ensemble.toml")
            .without_env()
            .load();
        assert!(matches!(result, Err(ConfigError::FileNotFound(_))));
    }

    #[cfg(feature = "toml-config")]
    #[test]
    fn toml_file_populates_all_sections() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ensemble.toml");
        std::fs::write(
            &path,
            r#"
[logging]
level = "debug"
format = "pretty"

[plugins]
disabled = ["metadata-editor"]

[plugins.config.transcoder]
bitrate = 320
output_dir = "out"
"#,
        )
        .unwrap();

        let config = ConfigLoader::new().file(&path).without_env().load().unwrap();

        assert_eq!(config.logging.level, LogLevel::Debug);
        assert_eq!(config.plugins.disabled, vec!["metadata-editor"]);
        let transcoder = &config.plugins.config["transcoder"];
        assert_eq!(transcoder["bitrate"], 320);
        assert_eq!(transcoder["output_dir"], "out");
    }

    #[cfg(feature = "toml-config")]
    #[test]
    fn search_picks_up_ensemble_toml() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("ensemble.toml"),
            "[logging]\nlevel = \"warn\"\n",
        )
        .unwrap();

        let config = ConfigLoader::new()
            .search_path(dir.path())
            .without_env()
            .load()
            .unwrap();
        assert_eq!(config.logging.level, LogLevel::Warn);
    }

    #[cfg(feature = "toml-config")]
    #[test]
    fn invalid_values_fail_validation_on_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ensemble.toml");
        std::fs::write(&path, "[logging]\noutput = \"file\"\n").unwrap();

        let result = ConfigLoader::new().file(&path).without_env().load();
        assert!(matches!(result, Err(ConfigError::ValidationError { .. })));
    }

    #[test]
    fn unsupported_extension_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ensemble.ini");
        std::fs::write(&path, "level = debug\n").unwrap();

        let result = ConfigLoader::new().file(&path).without_env().load();
        assert!(matches!(result, Err(ConfigError::ParseError(_))));
    }

    #[test]
    fn programmatic_merge_overrides_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let mut overrides = EnsembleConfig::default();
        overrides.logging.level = LogLevel::Trace;

        let config = ConfigLoader::new()
            .search_path(dir.path())
            .merge(overrides)
            .without_env()
            .load()
            .unwrap();
        assert_eq!(config.logging.level, LogLevel::Trace);
    }
}
