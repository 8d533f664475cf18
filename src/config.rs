use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::ai::DEFAULT_CACHE_SLOTS;
use crate::error::ConfigError;

const LOG_LEVELS: [&str; 6] = ["off", "error", "warn", "info", "debug", "trace"];

/// Top-level application configuration, loadable from TOML.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub solver: SolverConfig,
    pub output: OutputConfig,
}

/// Search budgets and tuning for [`Solver`](crate::ai::Solver).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverConfig {
    /// Wall-clock budget per solve in milliseconds. Absent means unlimited.
    pub time_limit_ms: Option<u64>,
    /// Maximum iterative-deepening depth. Absent means unlimited.
    pub depth_limit: Option<usize>,
    pub cache_slots: usize,
    pub use_cache: bool,
    pub prune_losing_moves: bool,
}

impl Default for SolverConfig {
    fn default() -> Self {
        SolverConfig {
            time_limit_ms: None,
            depth_limit: None,
            cache_slots: DEFAULT_CACHE_SLOTS,
            use_cache: true,
            prune_losing_moves: true,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub format: OutputFormat,
    /// Default `env_logger` filter; `RUST_LOG` takes precedence.
    pub log_level: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        OutputConfig {
            format: OutputFormat::Text,
            log_level: "warn".into(),
        }
    }
}

impl AppConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::FileRead {
            path: path.to_path_buf(),
            source: e,
        })?;
        let config: AppConfig = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.solver.cache_slots < 2 {
            return Err(ConfigError::Validation(
                "solver.cache_slots must be >= 2".into(),
            ));
        }
        if self.solver.time_limit_ms == Some(0) {
            return Err(ConfigError::Validation(
                "solver.time_limit_ms must be > 0 when set".into(),
            ));
        }
        let level = self.output.log_level.to_ascii_lowercase();
        if !LOG_LEVELS.contains(&level.as_str()) {
            return Err(ConfigError::Validation(format!(
                "output.log_level must be one of {}, got '{}'",
                LOG_LEVELS.join(", "),
                self.output.log_level
            )));
        }
        Ok(())
    }

    /// Generate a TOML string with all default values (useful for creating
    /// example config files).
    pub fn default_toml() -> String {
        toml::to_string_pretty(&AppConfig::default()).expect("default config serializes")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config_is_valid() {
        let config = AppConfig::default();
        config.validate().expect("default config should be valid");
        assert_eq!(config.solver.cache_slots, 1 << 20);
        assert_eq!(config.output.log_level, "warn");
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let toml_str = r#"
[solver]
depth_limit = 12
"#;
        let config: AppConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.solver.depth_limit, Some(12));
        // Other fields should be defaults
        assert_eq!(config.solver.time_limit_ms, None);
        assert!(config.solver.use_cache);
        assert_eq!(config.output.format, OutputFormat::Text);
    }

    #[test]
    fn test_empty_toml_uses_all_defaults() {
        let config: AppConfig = toml::from_str("").unwrap();
        assert_eq!(config, AppConfig::default());
    }

    #[test]
    fn test_output_format_is_lowercase() {
        let config: AppConfig = toml::from_str("[output]\nformat = \"json\"\n").unwrap();
        assert_eq!(config.output.format, OutputFormat::Json);
        assert!(toml::from_str::<AppConfig>("[output]\nformat = \"xml\"\n").is_err());
    }

    #[test]
    fn test_validation_rejects_tiny_cache() {
        let mut config = AppConfig::default();
        config.solver.cache_slots = 1;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_rejects_zero_time_limit() {
        let mut config = AppConfig::default();
        config.solver.time_limit_ms = Some(0);
        assert!(config.validate().is_err());
        config.solver.time_limit_ms = Some(1);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validation_rejects_unknown_log_level() {
        let mut config = AppConfig::default();
        config.output.log_level = "loud".into();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("loud"));

        config.output.log_level = "DEBUG".into();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_missing_file() {
        let err = AppConfig::load(Path::new("nonexistent_config.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::FileRead { .. }));
        assert!(err.to_string().contains("nonexistent_config.toml"));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test_config.toml");
        let mut f = std::fs::File::create(&path).unwrap();
        writeln!(
            f,
            r#"
[solver]
time_limit_ms = 500
use_cache = false
"#
        )
        .unwrap();

        let config = AppConfig::load(&path).unwrap();
        assert_eq!(config.solver.time_limit_ms, Some(500));
        assert!(!config.solver.use_cache);
        // Others are defaults
        assert_eq!(config.solver.cache_slots, DEFAULT_CACHE_SLOTS);
    }

    #[test]
    fn test_load_rejects_invalid_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "[solver]\ncache_slots = 0\n").unwrap();
        assert!(matches!(
            AppConfig::load(&path),
            Err(ConfigError::Validation(_))
        ));

        std::fs::write(&path, "[solver\n").unwrap();
        assert!(matches!(AppConfig::load(&path), Err(ConfigError::TomlParse(_))));
    }

    #[test]
    fn test_default_toml_roundtrips() {
        let toml_str = AppConfig::default_toml();
        let config: AppConfig = toml::from_str(&toml_str).unwrap();
        config.validate().expect("roundtripped config should be valid");
        assert_eq!(config, AppConfig::default());
    }
}
