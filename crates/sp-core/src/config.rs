//! Configuration loading for skillpack.
//!
//! Implements deterministic config resolution order:
//! 1. Explicit CLI flag (`--config`)
//! 2. Environment variable (`SKILLPACK_CONFIG`)
//! 3. XDG default (`~/.config/skillpack/config.toml`), if it exists
//! 4. Built-in defaults

use serde::{Deserialize, Serialize};
use sp_bundle::batch::{BatchOptions, DEFAULT_ARCHIVE_EXTENSION};
use sp_bundle::builder::DEFAULT_COMPRESSION_LEVEL;
use sp_bundle::{BuildOptions, DescriptorRules, PathPolicy, DEFAULT_DESCRIPTOR_NAME};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Environment variable naming an explicit config file.
pub const ENV_CONFIG_PATH: &str = "SKILLPACK_CONFIG";

/// Application name for XDG directories.
const APP_NAME: &str = "skillpack";

/// Standard config file name.
const CONFIG_FILENAME: &str = "config.toml";

/// Errors loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Config file not found: {}", path.display())]
    NotFound { path: PathBuf },

    #[error("I/O error reading {}: {source}", path.display())]
    IoError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid TOML in config file {}: {source}", path.display())]
    ParseError {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Invalid config value: {0}")]
    Invalid(String),
}

/// Where the configuration came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigSource {
    CliFlag,
    EnvVar,
    XdgConfig,
    Default,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigSource::CliFlag => write!(f, "CLI flag"),
            ConfigSource::EnvVar => write!(f, "environment variable"),
            ConfigSource::XdgConfig => write!(f, "XDG config"),
            ConfigSource::Default => write!(f, "builtin default"),
        }
    }
}

/// Packaging configuration (`config.toml`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PackConfig {
    /// Descriptor file name at the bundle root.
    pub descriptor_name: String,
    /// Header keys required on top of `name` and `description`.
    pub extra_required_keys: Vec<String>,
    /// Archive file extension, without the dot.
    pub archive_extension: String,
    /// Deflate level, 0-9.
    pub compression_level: i64,
    /// Default output directory for `pack`.
    pub output_dir: PathBuf,
    /// Default archive path layout for `pack`.
    pub policy: PathPolicy,
}

impl Default for PackConfig {
    fn default() -> Self {
        Self {
            descriptor_name: DEFAULT_DESCRIPTOR_NAME.to_string(),
            extra_required_keys: Vec::new(),
            archive_extension: DEFAULT_ARCHIVE_EXTENSION.to_string(),
            compression_level: DEFAULT_COMPRESSION_LEVEL,
            output_dir: PathBuf::from("packaged-skills"),
            policy: PathPolicy::default(),
        }
    }
}

impl PackConfig {
    /// Parse and validate TOML text.
    pub fn from_toml(text: &str, path: &Path) -> Result<Self, ConfigError> {
        let config: PackConfig = toml::from_str(text).map_err(|source| ConfigError::ParseError {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Semantic checks that serde cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let name = self.descriptor_name.trim();
        if name.is_empty() {
            return Err(ConfigError::Invalid("descriptor_name is empty".to_string()));
        }
        if name.contains('/') || name.contains('\\') || name == "." || name == ".." {
            return Err(ConfigError::Invalid(format!(
                "descriptor_name '{}' must be a plain file name",
                self.descriptor_name
            )));
        }
        if !(0..=9).contains(&self.compression_level) {
            return Err(ConfigError::Invalid(format!(
                "compression_level {} is outside 0-9",
                self.compression_level
            )));
        }
        if self.archive_extension.is_empty() || self.archive_extension.starts_with('.') {
            return Err(ConfigError::Invalid(format!(
                "archive_extension '{}' must be non-empty and have no leading dot",
                self.archive_extension
            )));
        }
        if let Some(key) = self.extra_required_keys.iter().find(|k| k.trim().is_empty()) {
            return Err(ConfigError::Invalid(format!(
                "extra_required_keys contains an empty key '{key}'"
            )));
        }
        Ok(())
    }

    /// Descriptor rules derived from this config.
    pub fn descriptor_rules(&self) -> DescriptorRules {
        self.extra_required_keys.iter().fold(
            DescriptorRules::default().with_file_name(self.descriptor_name.trim()),
            |rules, key| rules.with_required_key(key.trim()),
        )
    }

    /// Batch options, with CLI overrides applied.
    pub fn batch_options(
        &self,
        output_dir: Option<&Path>,
        policy: Option<PathPolicy>,
    ) -> BatchOptions {
        BatchOptions {
            build: BuildOptions::default()
                .with_rules(self.descriptor_rules())
                .with_policy(policy.unwrap_or(self.policy))
                .with_compression_level(self.compression_level),
            output_dir: output_dir
                .map(Path::to_path_buf)
                .unwrap_or_else(|| self.output_dir.clone()),
            archive_extension: self.archive_extension.clone(),
        }
    }
}

/// Resolved configuration with provenance information.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config: PackConfig,
    pub source: ConfigSource,
    pub path: Option<PathBuf>,
}

/// Pick the config file to load; does not touch the filesystem except for the XDG existence check.
pub fn resolve_config_path(
    cli_path: Option<&Path>,
    env_path: Option<PathBuf>,
    xdg_dir: Option<PathBuf>,
) -> (Option<PathBuf>, ConfigSource) {
    if let Some(path) = cli_path {
        return (Some(path.to_path_buf()), ConfigSource::CliFlag);
    }
    if let Some(path) = env_path {
        return (Some(path), ConfigSource::EnvVar);
    }
    if let Some(dir) = xdg_dir {
        let path = dir.join(APP_NAME).join(CONFIG_FILENAME);
        if path.is_file() {
            return (Some(path), ConfigSource::XdgConfig);
        }
    }
    (None, ConfigSource::Default)
}

/// Resolve and load configuration from the real environment.
pub fn load_config(cli_path: Option<&Path>) -> Result<LoadedConfig, ConfigError> {
    let env_path = std::env::var_os(ENV_CONFIG_PATH)
        .filter(|v| !v.is_empty())
        .map(PathBuf::from);
    let (path, source) = resolve_config_path(cli_path, env_path, dirs::config_dir());
    load_from(path, source)
}

/// Load configuration from an already-resolved path.
pub fn load_from(path: Option<PathBuf>, source: ConfigSource) -> Result<LoadedConfig, ConfigError> {
    let Some(path) = path else {
        return Ok(LoadedConfig {
            config: PackConfig::default(),
            source,
            path: None,
        });
    };

    let text = std::fs::read_to_string(&path).map_err(|source| {
        if source.kind() == std::io::ErrorKind::NotFound {
            ConfigError::NotFound { path: path.clone() }
        } else {
            ConfigError::IoError {
                path: path.clone(),
                source,
            }
        }
    })?;
    let config = PackConfig::from_toml(&text, &path)?;

    tracing::debug!(path = %path.display(), %source, "Loaded config");

    Ok(LoadedConfig {
        config,
        source,
        path: Some(path),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_defaults_valid() {
        let config = PackConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.descriptor_name, "SKILL.md");
        assert_eq!(config.policy, PathPolicy::RootRelative);
    }

    #[test]
    fn test_parse_partial_toml() {
        let text = r#"
            policy = "name-prefixed"
            extra_required_keys = ["license"]
        "#;
        let config = PackConfig::from_toml(text, Path::new("config.toml")).unwrap();

        assert_eq!(config.policy, PathPolicy::NamePrefixed);
        assert_eq!(config.compression_level, 6);
        let rules = config.descriptor_rules();
        let keys: Vec<_> = rules.required_keys().collect();
        assert_eq!(keys, vec!["name", "description", "license"]);
    }

    #[test]
    fn test_unknown_key_rejected() {
        let err = PackConfig::from_toml("colour = 'red'", Path::new("c.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::ParseError { .. }));
    }

    #[test]
    fn test_invalid_values_rejected() {
        for text in [
            "compression_level = 12",
            "descriptor_name = 'docs/SKILL.md'",
            "descriptor_name = ''",
            "archive_extension = '.zip'",
            "extra_required_keys = ['']",
        ] {
            let err = PackConfig::from_toml(text, Path::new("c.toml")).unwrap_err();
            assert!(matches!(err, ConfigError::Invalid(_)), "accepted: {text}");
        }
    }

    #[test]
    fn test_batch_options_overrides() {
        let config = PackConfig::default();
        let options = config.batch_options(Some(Path::new("dist")), Some(PathPolicy::NamePrefixed));

        assert_eq!(options.output_dir, PathBuf::from("dist"));
        assert_eq!(options.build.policy, PathPolicy::NamePrefixed);
        assert_eq!(options.archive_extension, "zip");

        let defaults = config.batch_options(None, None);
        assert_eq!(defaults.output_dir, PathBuf::from("packaged-skills"));
        assert_eq!(defaults.build.policy, PathPolicy::RootRelative);
    }

    #[test]
    fn test_resolution_order() {
        let dir = TempDir::new().unwrap();
        let xdg = dir.path().to_path_buf();
        fs::create_dir_all(xdg.join("skillpack")).unwrap();
        fs::write(xdg.join("skillpack/config.toml"), "").unwrap();

        let cli = PathBuf::from("cli.toml");
        let env = PathBuf::from("env.toml");

        let (path, source) = resolve_config_path(Some(&cli), Some(env.clone()), Some(xdg.clone()));
        assert_eq!((path, source), (Some(cli), ConfigSource::CliFlag));

        let (path, source) = resolve_config_path(None, Some(env.clone()), Some(xdg.clone()));
        assert_eq!((path, source), (Some(env), ConfigSource::EnvVar));

        let (path, source) = resolve_config_path(None, None, Some(xdg.clone()));
        assert_eq!(source, ConfigSource::XdgConfig);
        assert_eq!(path, Some(xdg.join("skillpack/config.toml")));

        let (path, source) = resolve_config_path(None, None, Some(dir.path().join("none")));
        assert_eq!((path, source), (None, ConfigSource::Default));
    }

    #[test]
    fn test_load_missing_explicit_file() {
        let err = load_from(Some(PathBuf::from("/nonexistent/skillpack.toml")), ConfigSource::CliFlag)
            .unwrap_err();
        assert!(matches!(err, ConfigError::NotFound { .. }));
    }

    #[test]
    fn test_load_from_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("skillpack.toml");
        fs::write(&path, "output_dir = 'dist'\ncompression_level = 9\n").unwrap();

        let loaded = load_from(Some(path.clone()), ConfigSource::CliFlag).unwrap();
        assert_eq!(loaded.config.output_dir, PathBuf::from("dist"));
        assert_eq!(loaded.config.compression_level, 9);
        assert_eq!(loaded.path, Some(path));
    }
}
