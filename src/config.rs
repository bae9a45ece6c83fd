use crate::cli::{Cli, OutputFormat, VerbosityLevel};
use crate::job::FileLevelErrorPolicy;
use crate::logging::LogFormat;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

const ENV_PREFIX: &str = "SUBMISSION_VALIDATOR_";

/// Trait for abstracting environment variable access
pub trait EnvProvider {
    fn get(&self, key: &str) -> Option<String>;
}

/// System environment variable provider for production use
pub struct SystemEnvProvider;

impl EnvProvider for SystemEnvProvider {
    fn get(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlParsing(#[from] toml::de::Error),

    #[error("JSON parsing error: {0}")]
    JsonParsing(#[from] serde_json::Error),

    #[error("Configuration validation error: {0}")]
    Validation(String),

    #[error("Environment variable error: {0}")]
    Environment(String),

    #[error("Unsupported configuration file format: {0}")]
    UnsupportedFormat(String),
}

pub type Result<T> = std::result::Result<T, ConfigError>;

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct Config {
    pub scheduler: SchedulerConfig,
    pub notification: NotificationConfig,
    pub output: OutputConfig,
    pub logging: LoggingConfig,
}

/// Scheduler settings, read once when the scheduler is built
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Number of projects validated at the same time
    pub max_concurrent_validations: usize,
    /// Pause between poll iterations in milliseconds
    pub poll_interval_ms: u64,
    /// Pause after a job starts before cancels are accepted, in milliseconds
    pub start_grace_ms: u64,
    /// Running jobs are stopped and resolved to ERROR after this many seconds
    pub job_timeout_secs: Option<u64>,
    /// Retries of a release write that lost an optimistic-lock race
    pub store_retry_attempts: u32,
    /// Stop the loop instead of idling when several releases are open
    pub fail_on_multiple_open_releases: bool,
    pub file_level_error_policy: FileLevelErrorPolicy,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct NotificationConfig {
    pub enabled: bool,
    /// Recipients of support alerts
    pub support_recipients: Vec<String>,
}

/// Output configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct OutputConfig {
    pub format: OutputFormatConfig,
    pub verbose: bool,
    /// Only print the outcome
    pub quiet: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LoggingConfig {
    /// One of error, warn, info, debug, trace
    pub level: String,
    pub format: LogFormat,
    /// Log to this file instead of stderr
    pub file: Option<PathBuf>,
}

/// Output format configuration (serializable version of CLI OutputFormat)
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormatConfig {
    #[default]
    Human,
    Json,
}

impl From<OutputFormat> for OutputFormatConfig {
    fn from(format: OutputFormat) -> Self {
        match format {
            OutputFormat::Human => OutputFormatConfig::Human,
            OutputFormat::Json => OutputFormatConfig::Json,
        }
    }
}

impl From<OutputFormatConfig> for OutputFormat {
    fn from(format: OutputFormatConfig) -> Self {
        match format {
            OutputFormatConfig::Human => OutputFormat::Human,
            OutputFormatConfig::Json => OutputFormat::Json,
        }
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            max_concurrent_validations: 1,
            poll_interval_ms: 1000,
            start_grace_ms: 2000,
            job_timeout_secs: None,
            store_retry_attempts: 3,
            fail_on_multiple_open_releases: true,
            file_level_error_policy: FileLevelErrorPolicy::default(),
        }
    }
}

impl SchedulerConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn start_grace(&self) -> Duration {
        Duration::from_millis(self.start_grace_ms)
    }

    pub fn job_timeout(&self) -> Option<Duration> {
        self.job_timeout_secs.map(Duration::from_secs)
    }
}

impl OutputConfig {
    pub fn verbosity(&self) -> VerbosityLevel {
        if self.quiet {
            VerbosityLevel::Quiet
        } else if self.verbose {
            VerbosityLevel::Verbose
        } else {
            VerbosityLevel::Normal
        }
    }
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            support_recipients: Vec::new(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::default(),
            file: None,
        }
    }
}

/// Configuration manager for loading and merging configurations
pub struct ConfigManager;

impl ConfigManager {
    /// Load configuration with precedence: file -> environment -> CLI
    pub async fn load_config(cli: &Cli) -> Result<Config> {
        let config = match &cli.config {
            Some(config_path) => Self::load_from_file(config_path).await?,
            None => Self::find_config_file().await?.unwrap_or_default(),
        };

        let config = Self::apply_environment_overrides(config)?;
        let config = Self::merge_with_cli(config, cli);
        Self::validate_config(&config)?;

        Ok(config)
    }

    /// Load configuration from a file (TOML or JSON)
    pub async fn load_from_file(path: &Path) -> Result<Config> {
        let content = tokio::fs::read_to_string(path).await?;

        match path.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => Ok(toml::from_str(&content)?),
            Some("json") => Ok(serde_json::from_str(&content)?),
            Some(ext) => Err(ConfigError::UnsupportedFormat(ext.to_string())),
            None => {
                // Try to parse as TOML first, then JSON
                if let Ok(config) = toml::from_str::<Config>(&content) {
                    Ok(config)
                } else {
                    Ok(serde_json::from_str(&content)?)
                }
            }
        }
    }

    /// Find configuration file in standard locations
    pub async fn find_config_file() -> Result<Option<Config>> {
        let config_names = [
            "submission-validator.toml",
            "submission-validator.json",
            ".submission-validator.toml",
            ".submission-validator.json",
        ];

        for name in &config_names {
            let path = PathBuf::from(name);
            if path.exists() {
                return Ok(Some(Self::load_from_file(&path).await?));
            }
        }

        if let Some(config_dir) = dirs::config_dir() {
            let app_config_dir = config_dir.join("submission-validator");
            for name in &config_names {
                let path = app_config_dir.join(name);
                if path.exists() {
                    return Ok(Some(Self::load_from_file(&path).await?));
                }
            }
        }

        Ok(None)
    }

    /// Apply environment variable overrides using the system environment
    pub fn apply_environment_overrides(config: Config) -> Result<Config> {
        Self::apply_environment_overrides_with(&SystemEnvProvider, config)
    }

    /// Apply environment variable overrides with a custom environment provider
    pub fn apply_environment_overrides_with(
        env: &impl EnvProvider,
        mut config: Config,
    ) -> Result<Config> {
        // Scheduler settings
        if let Some(limit) = parse_env(env, "MAX_CONCURRENT_VALIDATIONS")? {
            config.scheduler.max_concurrent_validations = limit;
        }
        if let Some(interval) = parse_env(env, "POLL_INTERVAL_MS")? {
            config.scheduler.poll_interval_ms = interval;
        }
        if let Some(grace) = parse_env(env, "START_GRACE_MS")? {
            config.scheduler.start_grace_ms = grace;
        }
        if let Some(timeout) = parse_env(env, "JOB_TIMEOUT_SECS")? {
            config.scheduler.job_timeout_secs = Some(timeout);
        }
        if let Some(attempts) = parse_env(env, "STORE_RETRY_ATTEMPTS")? {
            config.scheduler.store_retry_attempts = attempts;
        }
        if let Some(fail) = parse_env(env, "FAIL_ON_MULTIPLE_OPEN_RELEASES")? {
            config.scheduler.fail_on_multiple_open_releases = fail;
        }
        if let Some(policy) = env_var(env, "FILE_LEVEL_ERROR_POLICY") {
            config.scheduler.file_level_error_policy = match policy.to_lowercase().as_str() {
                "latest" => FileLevelErrorPolicy::Latest,
                "accumulate" => FileLevelErrorPolicy::Accumulate,
                _ => return Err(invalid_env("FILE_LEVEL_ERROR_POLICY", &policy)),
            };
        }

        // Notification settings
        if let Some(enabled) = parse_env(env, "NOTIFICATIONS_ENABLED")? {
            config.notification.enabled = enabled;
        }
        if let Some(recipients) = env_var(env, "SUPPORT_RECIPIENTS") {
            config.notification.support_recipients = recipients
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
        }

        // Output settings
        if let Some(verbose) = parse_env(env, "VERBOSE")? {
            config.output.verbose = verbose;
        }
        if let Some(quiet) = parse_env(env, "QUIET")? {
            config.output.quiet = quiet;
        }
        if let Some(format) = env_var(env, "FORMAT") {
            config.output.format = match format.to_lowercase().as_str() {
                "human" => OutputFormatConfig::Human,
                "json" => OutputFormatConfig::Json,
                _ => return Err(invalid_env("FORMAT", &format)),
            };
        }

        // Logging settings
        if let Some(level) = env_var(env, "LOG_LEVEL") {
            config.logging.level = level;
        }
        if let Some(format) = env_var(env, "LOG_FORMAT") {
            config.logging.format = match format.to_lowercase().as_str() {
                "pretty" => LogFormat::Pretty,
                "compact" => LogFormat::Compact,
                "json" => LogFormat::Json,
                _ => return Err(invalid_env("LOG_FORMAT", &format)),
            };
        }
        if let Some(file) = env_var(env, "LOG_FILE") {
            config.logging.file = Some(PathBuf::from(file));
        }

        Ok(config)
    }

    /// Merge CLI arguments with configuration (CLI takes precedence)
    pub fn merge_with_cli(mut config: Config, cli: &Cli) -> Config {
        if let Some(format) = cli.output_format {
            config.output.format = format.into();
        }
        if cli.verbose {
            config.output.verbose = true;
            config.output.quiet = false;
        }
        if cli.quiet {
            config.output.quiet = true;
            config.output.verbose = false;
        }
        if let Some(format) = cli.log_format {
            config.logging.format = format;
        }

        config
    }

    /// Validate configuration values
    pub fn validate_config(config: &Config) -> Result<()> {
        let scheduler = &config.scheduler;

        if scheduler.max_concurrent_validations == 0 {
            return Err(ConfigError::Validation(
                "Concurrent validations must be greater than 0".to_string(),
            ));
        }
        if scheduler.max_concurrent_validations > 64 {
            return Err(ConfigError::Validation(
                "Concurrent validations cannot exceed 64".to_string(),
            ));
        }

        if scheduler.poll_interval_ms == 0 {
            return Err(ConfigError::Validation(
                "Poll interval must be greater than 0".to_string(),
            ));
        }

        if scheduler.job_timeout_secs == Some(0) {
            return Err(ConfigError::Validation(
                "Job timeout must be greater than 0 when set".to_string(),
            ));
        }

        if scheduler.store_retry_attempts > 10 {
            return Err(ConfigError::Validation(
                "Store retry attempts cannot exceed 10".to_string(),
            ));
        }

        if config.output.verbose && config.output.quiet {
            return Err(ConfigError::Validation(
                "Cannot enable both verbose and quiet modes".to_string(),
            ));
        }

        if config.logging.level.parse::<tracing::Level>().is_err() {
            return Err(ConfigError::Validation(format!(
                "Invalid log level: {}",
                config.logging.level
            )));
        }

        Ok(())
    }
}

fn env_var(env: &impl EnvProvider, name: &str) -> Option<String> {
    env.get(&format!("{}{}", ENV_PREFIX, name))
}

fn parse_env<T: FromStr>(env: &impl EnvProvider, name: &str) -> Result<Option<T>> {
    match env_var(env, name) {
        Some(value) => value
            .parse()
            .map(Some)
            .map_err(|_| invalid_env(name, &value)),
        None => Ok(None),
    }
}

fn invalid_env(name: &str, value: &str) -> ConfigError {
    ConfigError::Environment(format!("Invalid {}{} value: {}", ENV_PREFIX, name, value))
}
