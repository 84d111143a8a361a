//! Configuration loader using figment.
//!
//! Sources are layered, later ones overriding earlier ones:
//!
//! 1. Built-in defaults
//! 2. Profile-specific config file (`cqbridge.{profile}.toml` / `.yaml`)
//! 3. Main config file (`cqbridge.toml` / `config.toml` / `.yaml`)
//! 4. Environment variables (`CQBRIDGE_*`)
//! 5. Programmatic overrides
//!
//! # Feature Flags
//!
//! - `toml-config` *(default)*: searches `cqbridge.toml` and `config.toml`
//! - `yaml-config`: searches `cqbridge.yaml`, `cqbridge.yml`, `config.yaml`, `config.yml`
//!
//! # Environment Variable Mapping
//!
//! Variables use the `CQBRIDGE_` prefix with `__` as the nesting separator:
//!
//! - `CQBRIDGE_LOGGING__LEVEL=debug` → `logging.level = "debug"`
//! - `CQBRIDGE_DATABASE__ENABLED=false` → `database.enabled = false`
//! - `CQBRIDGE_BOT__HEARTBEAT_INTERVAL=0` → `bot.heartbeat_interval = 0`
//!
//! # Example
//!
//! ```rust,ignore
//! use cqbridge_runtime::config::ConfigLoader;
//!
//! let config = ConfigLoader::new()
//!     .file("./cqbridge.toml")
//!     .without_env()
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
use tracing::{debug, info, trace, warn};

use super::error::{ConfigError, ConfigResult};
use super::schema::BridgeConfig;

/// Environment variable prefix.
pub const ENV_PREFIX: &str = "CQBRIDGE_";

/// Environment variable selecting the profile.
pub const PROFILE_ENV: &str = "CQBRIDGE_PROFILE";

/// Configuration profile for environment-specific settings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Profile {
    #[default]
    Development,
    Production,
    Custom(String),
}

impl Profile {
    /// Returns the profile name as a string.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Development => "development",
            Self::Production => "production",
            Self::Custom(name) => name,
        }
    }

    /// Parses a profile name; `prod` and `dev` are accepted as aliases.
    pub fn parse(name: &str) -> Self {
        match name.to_lowercase().as_str() {
            "production" | "prod" => Self::Production,
            "development" | "dev" => Self::Development,
            other => Self::Custom(other.to_string()),
        }
    }

    /// Reads the profile from `CQBRIDGE_PROFILE`, defaulting to development.
    pub fn from_env() -> Self {
        std::env::var(PROFILE_ENV)
            .map(|p| Self::parse(&p))
            .unwrap_or_default()
    }
}

impl std::fmt::Display for Profile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Configuration loader with figment-based multi-source support.
pub struct ConfigLoader {
    figment: Figment,
    profile: Profile,
    search_paths: Vec<PathBuf>,
    load_env: bool,
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
            figment: Figment::new(),
            profile: Profile::from_env(),
            search_paths: Vec::new(),
            load_env: true,
            config_file: None,
        }
    }

    /// Sets the configuration profile.
    pub fn profile(mut self, profile: impl AsRef<str>) -> Self {
        self.profile = Profile::parse(profile.as_ref());
        self
    }

    /// Adds a search path for configuration files.
    pub fn search_path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.search_paths.push(path.as_ref().to_path_buf());
        self
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

    /// Merges additional configuration programmatically.
    pub fn merge(mut self, config: BridgeConfig) -> Self {
        self.figment = self.figment.merge(Serialized::defaults(config));
        self
    }

    /// Loads and returns the configuration.
    pub fn load(self) -> ConfigResult<BridgeConfig> {
        let profile = self.profile.clone();
        let figment = self.build_figment()?;

        let config: BridgeConfig = figment.extract().map_err(|e| {
            ConfigError::ParseError(format!("Failed to extract configuration: {e}"))
        })?;

        debug!(
            profile = %profile,
            logging_level = %config.logging.level,
            database = config.database.enabled,
            "Configuration loaded successfully"
        );

        Ok(config)
    }

    fn build_figment(mut self) -> ConfigResult<Figment> {
        let mut figment = Figment::from(Serialized::defaults(BridgeConfig::default()));

        let user_figment = std::mem::take(&mut self.figment);
        figment = figment.merge(user_figment);

        if let Some(path) = self.config_file.as_deref() {
            if !path.exists() {
                return Err(ConfigError::FileNotFound(path.to_path_buf()));
            }
            info!(path = %path.display(), "Loading configuration file");
            figment = Self::merge_config_file(figment, path)?;
        } else {
            figment = self.load_config_files(figment);
        }

        if self.load_env {
            trace!("Loading environment variables with {ENV_PREFIX} prefix");
            figment = figment.merge(
                Env::prefixed(ENV_PREFIX)
                    .ignore(&["PROFILE"])
                    .split("__"),
            );
        }

        Ok(figment)
    }

    /// Merges a single config file, dispatching on its extension.
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

    fn resolve_search_paths(&self) -> Vec<PathBuf> {
        if !self.search_paths.is_empty() {
            return self.search_paths.clone();
        }
        std::env::current_dir()
            .ok()
            .into_iter()
            .chain(dirs::config_dir().map(|dir| dir.join("cqbridge")))
            .collect()
    }

    /// Walks every search path for each enabled format. Per format, the
    /// first directory holding a base file wins; a profile-specific file
    /// next to it is merged first so the base file overrides it.
    fn load_config_files(&self, mut figment: Figment) -> Figment {
        let search_paths = self.resolve_search_paths();
        let mut found = false;

        for format in ConfigFormat::ENABLED {
            let hit = search_paths.iter().find_map(|dir| {
                format
                    .base_names
                    .iter()
                    .map(|name| dir.join(name))
                    .find(|path| path.exists())
            });
            let Some(base_path) = hit else {
                continue;
            };

            let profile_path = format.profile_variant(&base_path, self.profile.as_str());
            if profile_path.exists() {
                debug!(path = %profile_path.display(), "Loading profile-specific config");
                figment = (format.merge)(figment, &profile_path);
            }
            info!(path = %base_path.display(), "Loading configuration file");
            figment = (format.merge)(figment, &base_path);
            found = true;
        }

        if !found {
            warn!("No configuration file found, using defaults");
        }
        figment
    }
}

/// A configuration file format enabled by a cargo feature.
struct ConfigFormat {
    base_names: &'static [&'static str],
    merge: fn(Figment, &Path) -> Figment,
}

impl ConfigFormat {
    const ENABLED: &'static [ConfigFormat] = &[
        #[cfg(feature = "toml-config")]
        ConfigFormat {
            base_names: &["cqbridge.toml", "config.toml"],
            merge: |figment, path| figment.merge(Toml::file(path)),
        },
        #[cfg(feature = "yaml-config")]
        ConfigFormat {
            base_names: &["cqbridge.yaml", "cqbridge.yml", "config.yaml", "config.yml"],
            merge: |figment, path| figment.merge(Yaml::file(path)),
        },
    ];

    /// `dir/cqbridge.toml` -> `dir/cqbridge.{profile}.toml`
    fn profile_variant(&self, base_path: &Path, profile: &str) -> PathBuf {
        let stem = base_path.file_stem().and_then(|s| s.to_str()).unwrap_or("");
        let ext = base_path.extension().and_then(|e| e.to_str()).unwrap_or("");
        base_path.with_file_name(format!("{stem}.{profile}.{ext}"))
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::{LogLevel, LogOutput};

    #[test]
    fn test_default_config() {
        let dir = tempfile::tempdir().unwrap();
        let config = ConfigLoader::new()
            .search_path(dir.path())
            .without_env()
            .load()
            .unwrap();

        assert_eq!(config.logging.level.as_str(), "info");
        assert!(config.database.enabled);
    }

    #[test]
    fn test_profile_parse() {
        assert_eq!(Profile::parse("prod"), Profile::Production);
        assert_eq!(Profile::parse("Dev"), Profile::Development);
        assert_eq!(Profile::parse("staging"), Profile::Custom("staging".into()));
    }

    #[test]
    fn test_missing_file() {
        let result = ConfigLoader::new()
            .file("/nonexistent/cqbridge.toml")
            .without_env()
            .load();
        assert!(matches!(result, Err(ConfigError::FileNotFound(_))));
    }

    #[cfg(feature = "toml-config")]
    #[test]
    fn test_load_toml_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cqbridge.toml");
        std::fs::write(
            &path,
            r#"
[logging]
level = "debug"
output = "stderr"

[database]
enabled = false

[bot]
heartbeat_interval = 0
post_format = "array"
"#,
        )
        .unwrap();

        let config = ConfigLoader::new().file(&path).without_env().load().unwrap();
        assert_eq!(config.logging.level, LogLevel::Debug);
        assert_eq!(config.logging.output, LogOutput::Stderr);
        assert!(!config.database.enabled);
        assert_eq!(config.bot.heartbeat_interval, 0);
    }

    #[cfg(feature = "toml-config")]
    #[test]
    fn test_profile_file_is_overridden_by_base() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("cqbridge.production.toml"),
            "[logging]\nlevel = \"warn\"\nthread_ids = true\n",
        )
        .unwrap();
        std::fs::write(
            dir.path().join("cqbridge.toml"),
            "[logging]\nlevel = \"error\"\n",
        )
        .unwrap();

        let config = ConfigLoader::new()
            .profile("production")
            .search_path(dir.path())
            .without_env()
            .load()
            .unwrap();
        assert_eq!(config.logging.level, LogLevel::Error);
        assert!(config.logging.thread_ids);
    }

    #[cfg(feature = "toml-config")]
    #[test]
    fn test_invalid_level_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cqbridge.toml");
        std::fs::write(&path, "[logging]\nlevel = \"verbose\"\n").unwrap();

        let result = ConfigLoader::new().file(&path).without_env().load();
        assert!(matches!(result, Err(ConfigError::ParseError(_))));
    }

    #[test]
    fn test_unsupported_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cqbridge.ini");
        std::fs::write(&path, "level=info").unwrap();

        let result = ConfigLoader::new().file(&path).without_env().load();
        assert!(matches!(result, Err(ConfigError::ParseError(_))));
    }
}
