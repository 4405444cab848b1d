#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Configuration management for libstage
//!
//! This crate handles loading and merging configuration from:
//! - Default values (hard-coded)
//! - Configuration file (~/.config/libstage/config.toml)
//! - Environment variables
//! - CLI flags

use libstage_errors::{ConfigError, Error};
use libstage_types::{ColorChoice, OutputFormat};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;

/// Scratch root used when nothing else is configured
pub const DEFAULT_SCRATCH_ROOT: &str = "buck-out/bin";

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub general: GeneralConfig,

    #[serde(default)]
    pub staging: StagingConfig,
}

/// General configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    #[serde(default = "default_output_format")]
    pub default_output: OutputFormat,
    #[serde(default = "default_color_choice")]
    pub color: ColorChoice,
}

/// Staging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StagingConfig {
    /// Root under which per-target scratch directories are allocated
    #[serde(default = "default_scratch_root")]
    pub scratch_root: PathBuf,
    /// Root that project-relative source paths resolve against
    pub project_root: Option<PathBuf>,
    #[serde(default = "default_hash_jobs")]
    pub hash_jobs: usize, // 0 = auto-detect
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            default_output: OutputFormat::Tty,
            color: ColorChoice::Auto,
        }
    }
}

impl Default for StagingConfig {
    fn default() -> Self {
        Self {
            scratch_root: default_scratch_root(),
            project_root: None,
            hash_jobs: 0,
        }
    }
}

// Default value functions for serde
fn default_output_format() -> OutputFormat {
    OutputFormat::Tty
}

fn default_color_choice() -> ColorChoice {
    ColorChoice::Auto
}

fn default_scratch_root() -> PathBuf {
    PathBuf::from(DEFAULT_SCRATCH_ROOT)
}

fn default_hash_jobs() -> usize {
    0 // 0 = auto-detect
}

fn invalid_env(field: &str, value: String) -> Error {
    ConfigError::InvalidValue {
        field: field.to_string(),
        value,
    }
    .into()
}

impl Config {
    /// Get the default config file path
    ///
    /// # Errors
    ///
    /// Returns an error if the system config directory cannot be determined.
    pub fn default_path() -> Result<PathBuf, Error> {
        let config_dir = dirs::config_dir().ok_or_else(|| ConfigError::NotFound {
            path: "config directory".to_string(),
        })?;
        Ok(config_dir.join("libstage").join("config.toml"))
    }

    /// Load configuration from file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or if the file contents
    /// contain invalid TOML syntax that cannot be parsed.
    pub async fn load_from_file(path: &Path) -> Result<Self, Error> {
        let contents = fs::read_to_string(path)
            .await
            .map_err(|_| ConfigError::NotFound {
                path: path.display().to_string(),
            })?;

        Self::from_toml(&contents)
    }

    /// Parse configuration from TOML text
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not valid configuration TOML.
    pub fn from_toml(contents: &str) -> Result<Self, Error> {
        toml::from_str(contents)
            .map_err(|e| ConfigError::ParseError {
                message: e.to_string(),
            })
            .map_err(Into::into)
    }

    /// Load configuration with fallback to defaults
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration file exists but cannot be read
    /// or contains invalid TOML syntax.
    pub async fn load() -> Result<Self, Error> {
        let config_path = Self::default_path()?;

        if fs::try_exists(&config_path).await.unwrap_or(false) {
            tracing::debug!(path = %config_path.display(), "loading configuration");
            Self::load_from_file(&config_path).await
        } else {
            Ok(Self::default())
        }
    }

    /// Load configuration from an optional path or use default
    ///
    /// If path is provided, loads from that file.
    /// If path is None, uses the default loading behavior.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file cannot be read or parsed
    pub async fn load_or_default(path: Option<&Path>) -> Result<Self, Error> {
        match path {
            Some(config_path) => Self::load_from_file(config_path).await,
            None => Self::load().await,
        }
    }

    /// Merge with environment variables
    ///
    /// # Errors
    ///
    /// Returns an error if environment variables contain invalid values
    /// that cannot be parsed into the expected types.
    pub fn merge_env(&mut self) -> Result<(), Error> {
        // LIBSTAGE_COLOR
        if let Ok(color) = std::env::var("LIBSTAGE_COLOR") {
            self.general.color = match color.as_str() {
                "always" => ColorChoice::Always,
                "auto" => ColorChoice::Auto,
                "never" => ColorChoice::Never,
                _ => return Err(invalid_env("LIBSTAGE_COLOR", color)),
            };
        }

        // LIBSTAGE_SCRATCH_ROOT
        if let Ok(root) = std::env::var("LIBSTAGE_SCRATCH_ROOT") {
            if root.is_empty() {
                return Err(invalid_env("LIBSTAGE_SCRATCH_ROOT", root));
            }
            self.staging.scratch_root = PathBuf::from(root);
        }

        // LIBSTAGE_PROJECT_ROOT
        if let Ok(root) = std::env::var("LIBSTAGE_PROJECT_ROOT") {
            if root.is_empty() {
                return Err(invalid_env("LIBSTAGE_PROJECT_ROOT", root));
            }
            self.staging.project_root = Some(PathBuf::from(root));
        }

        // LIBSTAGE_HASH_JOBS
        if let Ok(jobs) = std::env::var("LIBSTAGE_HASH_JOBS") {
            self.staging.hash_jobs = jobs
                .parse()
                .map_err(|_| invalid_env("LIBSTAGE_HASH_JOBS", jobs))?;
        }

        Ok(())
    }

    /// Get the scratch root
    #[must_use]
    pub fn scratch_root(&self) -> &Path {
        &self.staging.scratch_root
    }

    /// Get the project root (defaults to the current directory)
    #[must_use]
    pub fn project_root(&self) -> PathBuf {
        self.staging
            .project_root
            .clone()
            .unwrap_or_else(|| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")))
    }

    /// Effective number of concurrent hash operations
    #[must_use]
    pub fn hash_jobs(&self) -> usize {
        calculate_hash_jobs(self.staging.hash_jobs)
    }
}

/// Calculate hash concurrency based on CPU count
#[must_use]
pub fn calculate_hash_jobs(config_value: usize) -> usize {
    if config_value > 0 {
        config_value // User override
    } else {
        // One job per CPU
        num_cpus::get().max(1)
    }
}
