use std::fs;
use std::path::{Path, PathBuf};

use seed_core::{ErrorInfo, SeedError};
use seed_exec::ChangePolicy;
use serde::{Deserialize, Serialize};

/// File names tried, in order, when no configuration path is given.
pub const CONFIG_FILE_NAMES: [&str; 4] = [
    "seeder.config.yaml",
    "seeder.config.yml",
    "seeder.config.toml",
    "seeder.config.json",
];

/// Variables consulted for the environment after `SEEDER_ENVIRONMENT`.
pub const ENVIRONMENT_VARIABLES: [&str; 3] = ["ENVIRONMENT", "ENV", "APP_ENV"];

/// Settings of one `seedctl` invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeedConfig {
    /// Environment used when `--env` is not given.
    #[serde(default = "default_environment")]
    pub environment: String,
    /// SQLite database holding tracking rows and the batch counter.
    #[serde(default = "default_tracking_path")]
    pub tracking_path: PathBuf,
    /// SQLite database the SQL seeders write to.
    #[serde(default = "default_data_path")]
    pub data_path: PathBuf,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub dry_run_by_default: bool,
    #[serde(default)]
    pub change_policy: ChangePolicy,
    /// Environments where mutating commands need `--yes`.
    #[serde(default = "default_protected_environments")]
    pub protected_environments: Vec<String>,
    #[serde(default)]
    pub seeders: Vec<SqlSeederConfig>,
}

fn default_environment() -> String {
    "development".to_string()
}

fn default_tracking_path() -> PathBuf {
    PathBuf::from("seeds/tracking.sqlite")
}

fn default_data_path() -> PathBuf {
    PathBuf::from("seeds/data.sqlite")
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_protected_environments() -> Vec<String> {
    vec!["production".to_string()]
}

fn default_priority() -> i32 {
    100
}

fn default_batch_size() -> usize {
    1000
}

impl Default for SeedConfig {
    fn default() -> Self {
        Self {
            environment: default_environment(),
            tracking_path: default_tracking_path(),
            data_path: default_data_path(),
            log_level: default_log_level(),
            dry_run_by_default: false,
            change_policy: ChangePolicy::default(),
            protected_environments: default_protected_environments(),
            seeders: Vec::new(),
        }
    }
}

/// A seeder declared as SQL statements.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SqlSeederConfig {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub environments: Vec<String>,
    #[serde(default)]
    pub dependencies: Vec<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default = "default_priority")]
    pub priority: i32,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default)]
    pub can_rollback: bool,
    /// Statements executed, in order, by a run.
    #[serde(default)]
    pub up: Vec<String>,
    /// Statements executed, in order, by a rollback.
    #[serde(default)]
    pub down: Vec<String>,
}

impl SeedConfig {
    /// Parses a configuration file, choosing the format from its extension.
    pub fn load(path: &Path) -> Result<Self, SeedError> {
        let raw = fs::read_to_string(path).map_err(|err| {
            config_error("config-read", "failed to read configuration file")
                .with_path(path)
                .with_cause(err)
        })?;
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .unwrap_or_default()
            .to_ascii_lowercase();
        let parsed: Result<SeedConfig, String> = match extension.as_str() {
            "yaml" | "yml" => serde_yaml::from_str(&raw).map_err(|err| err.to_string()),
            "toml" => toml::from_str(&raw).map_err(|err| err.to_string()),
            "json" => serde_json::from_str(&raw).map_err(|err| err.to_string()),
            other => {
                return Err(config_error("config-format", "unsupported configuration format")
                    .with_path(path)
                    .with_detail("extension", other)
                    .build());
            }
        };
        let config = parsed.map_err(|message| {
            config_error("config-parse", "failed to parse configuration file")
                .with_path(path)
                .with_detail("cause", message)
                .build()
        })?;
        tracing::info!(path = %path.display(), "loaded configuration");
        Ok(config)
    }

    /// Loads `explicit` or the first known file name found in `dir`, falling back to
    /// defaults.
    pub fn discover(explicit: Option<&Path>, dir: &Path) -> Result<Self, SeedError> {
        if let Some(path) = explicit {
            return Self::load(path);
        }
        for name in CONFIG_FILE_NAMES {
            let candidate = dir.join(name);
            if candidate.is_file() {
                return Self::load(&candidate);
            }
        }
        tracing::debug!(dir = %dir.display(), "no configuration file found, using defaults");
        Ok(Self::default())
    }

    /// Applies `SEEDER_*` overrides, then the generic environment detection chain.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), SeedError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        let environment = non_empty("SEEDER_ENVIRONMENT").or_else(|| {
            ENVIRONMENT_VARIABLES
                .iter()
                .find_map(|key| non_empty(*key))
        });
        if let Some(environment) = environment {
            self.environment = environment;
        }
        if let Some(path) = non_empty("SEEDER_TRACKING_PATH") {
            self.tracking_path = PathBuf::from(path);
        }
        if let Some(path) = non_empty("SEEDER_DATA_PATH") {
            self.data_path = PathBuf::from(path);
        }
        if let Some(level) = non_empty("SEEDER_LOG_LEVEL") {
            self.log_level = level;
        }
        if let Some(list) = non_empty("SEEDER_PROTECTED_ENVIRONMENTS") {
            self.protected_environments = list
                .split(',')
                .map(|name| name.trim().to_lowercase())
                .filter(|name| !name.is_empty())
                .collect();
        }
        if let Some(flag) = non_empty("SEEDER_DRY_RUN") {
            self.dry_run_by_default = parse_flag(&flag).ok_or_else(|| {
                config_error("config-env", "SEEDER_DRY_RUN is not a boolean")
                    .with_detail("value", flag.clone())
                    .build()
            })?;
        }
        self.environment = self.environment.trim().to_lowercase();
        Ok(())
    }

    pub fn is_protected(&self, environment: &str) -> bool {
        self.protected_environments
            .iter()
            .any(|protected| protected.eq_ignore_ascii_case(environment))
    }

    pub fn validate(&self) -> Result<(), SeedError> {
        if self.environment.is_empty() {
            return Err(config_error("config-invalid", "environment must not be empty").build());
        }
        for (index, seeder) in self.seeders.iter().enumerate() {
            if seeder.name.trim().is_empty() {
                return Err(config_error("config-invalid", "seeder name must not be empty")
                    .with_detail("index", index.to_string())
                    .build());
            }
            if seeder.up.is_empty() {
                return Err(config_error("config-invalid", "seeder has no up statements")
                    .with_detail("seeder", seeder.name.clone())
                    .build());
            }
            if seeder.can_rollback && seeder.down.is_empty() {
                return Err(config_error(
                    "config-invalid",
                    "seeder declares can_rollback without down statements",
                )
                .with_detail("seeder", seeder.name.clone())
                .build());
            }
        }
        Ok(())
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

struct ConfigErrorBuilder(ErrorInfo);

fn config_error(code: &str, message: &str) -> ConfigErrorBuilder {
    ConfigErrorBuilder(ErrorInfo::new(code, message))
}

impl ConfigErrorBuilder {
    fn with_path(self, path: &Path) -> Self {
        self.with_detail("path", path.display().to_string())
    }

    fn with_detail(self, key: &str, value: impl Into<String>) -> Self {
        Self(self.0.with_context(key, value))
    }

    fn with_cause(self, err: impl std::fmt::Display) -> SeedError {
        self.with_detail("cause", err.to_string()).build()
    }

    fn build(self) -> SeedError {
        SeedError::Config(self.0)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: BTreeMap<String, String> = pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        move |key: &str| vars.get(key).cloned()
    }

    #[test]
    fn seeder_prefix_wins_over_generic_variables() {
        let mut config = SeedConfig::default();
        config
            .apply_env(lookup(&[("SEEDER_ENVIRONMENT", "Staging"), ("APP_ENV", "production")]))
            .unwrap();
        assert_eq!(config.environment, "staging");
    }

    #[test]
    fn detection_chain_falls_through_empty_values() {
        let mut config = SeedConfig::default();
        config
            .apply_env(lookup(&[("ENVIRONMENT", " "), ("ENV", ""), ("APP_ENV", "TESTING")]))
            .unwrap();
        assert_eq!(config.environment, "testing");
    }

    #[test]
    fn paths_levels_and_dry_run_are_overridable() {
        let mut config = SeedConfig::default();
        config
            .apply_env(lookup(&[
                ("SEEDER_TRACKING_PATH", "/tmp/t.sqlite"),
                ("SEEDER_DATA_PATH", "/tmp/d.sqlite"),
                ("SEEDER_LOG_LEVEL", "debug"),
                ("SEEDER_DRY_RUN", "yes"),
            ]))
            .unwrap();
        assert_eq!(config.tracking_path, PathBuf::from("/tmp/t.sqlite"));
        assert_eq!(config.data_path, PathBuf::from("/tmp/d.sqlite"));
        assert_eq!(config.log_level, "debug");
        assert!(config.dry_run_by_default);
        assert_eq!(config.environment, "development");
    }

    #[test]
    fn production_is_protected_by_default() {
        let mut config = SeedConfig::default();
        assert!(config.is_protected("production"));
        assert!(config.is_protected("PRODUCTION"));
        assert!(!config.is_protected("development"));

        config
            .apply_env(lookup(&[("SEEDER_PROTECTED_ENVIRONMENTS", "Staging, prod,")]))
            .unwrap();
        assert_eq!(config.protected_environments, vec!["staging", "prod"]);
        assert!(!config.is_protected("production"));
    }

    #[test]
    fn malformed_dry_run_flag_is_rejected() {
        let mut config = SeedConfig::default();
        let err = config
            .apply_env(lookup(&[("SEEDER_DRY_RUN", "maybe")]))
            .unwrap_err();
        assert_eq!(err.code(), "config-env");
    }

    #[test]
    fn validation_requires_statements() {
        let mut config = SeedConfig::default();
        config.seeders.push(SqlSeederConfig {
            name: "roles".into(),
            description: String::new(),
            environments: Vec::new(),
            dependencies: Vec::new(),
            tags: Vec::new(),
            priority: 100,
            batch_size: 1000,
            can_rollback: true,
            up: vec!["INSERT INTO roles(name) VALUES ('admin')".into()],
            down: Vec::new(),
        });
        let err = config.validate().unwrap_err();
        assert_eq!(err.code(), "config-invalid");
        assert_eq!(err.info().context_value("seeder"), Some("roles"));

        config.seeders[0].down.push("DELETE FROM roles".into());
        config.validate().unwrap();
        config.seeders[0].up.clear();
        assert!(config.validate().is_err());
    }

    #[test]
    fn yaml_defaults_fill_missing_fields() {
        let config: SeedConfig = serde_yaml::from_str(
            "environment: testing\nchange_policy: rollback-then-rerun\nseeders:\n  - name: roles\n    up: [\"INSERT INTO roles VALUES (1)\"]\n",
        )
        .unwrap();
        assert_eq!(config.environment, "testing");
        assert_eq!(config.change_policy, ChangePolicy::RollbackThenRerun);
        assert_eq!(config.tracking_path, default_tracking_path());
        assert_eq!(config.seeders[0].priority, 100);
        assert_eq!(config.seeders[0].batch_size, 1000);
    }
}
