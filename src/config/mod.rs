pub mod toml_config;

use crate::core::locator::default_fallback_dir;
use crate::domain::model::ExitCodePolicy;
use crate::utils::error::Result;
use crate::utils::validation::{
    validate_distinct_codes, validate_non_empty_string, validate_path, validate_range, Validate,
};
use std::path::PathBuf;
use std::time::Duration;
use toml_config::FileConfig;

#[cfg(feature = "cli")]
use clap::Parser;

pub const APP_NAME: &str = "silent-upgrade";

pub const DEFAULT_TOOL: &str = "winget";
pub const DEFAULT_TIMEOUT_SECS: u64 = 1800;
pub const MIN_TIMEOUT_SECS: u64 = 60;
pub const MAX_TIMEOUT_SECS: u64 = 86400;
pub const DEFAULT_MAX_LOG_MB: u64 = 10;
pub const MIN_LOG_MB: u64 = 1;
pub const MAX_LOG_MB: u64 = 200;

#[cfg(feature = "cli")]
#[derive(Debug, Clone, Default, Parser)]
#[command(name = "silent-upgrade")]
#[command(about = "Unattended upgrade of installed software through the system package manager")]
pub struct CliConfig {
    /// Log file path
    #[arg(long)]
    pub log_path: Option<PathBuf>,

    /// Rotate the log once it reaches this size, in MB (1-200, default 10)
    #[arg(long)]
    pub max_log_size_mb: Option<u64>,

    /// Per-command timeout in seconds (60-86400, default 1800)
    #[arg(long)]
    pub timeout_seconds: Option<u64>,

    /// Include pinned packages in the upgrade
    #[arg(long)]
    pub include_pinned: bool,

    /// Update (and if needed reset) package sources before scanning
    #[arg(long)]
    pub heal_sources: bool,

    /// Optional TOML settings file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Package manager executable name or path
    #[arg(long)]
    pub tool: Option<String>,

    /// Directory searched when the package manager is not on PATH
    #[arg(long)]
    pub tool_dir: Option<PathBuf>,

    /// Single-instance lock file
    #[arg(long)]
    pub lock_path: Option<PathBuf>,

    /// Exit code meaning "no applicable update"
    #[arg(long, allow_negative_numbers = true)]
    pub no_updates_exit_code: Option<i32>,

    /// Exit code meaning "upgrade all finished with failures"
    #[arg(long, allow_negative_numbers = true)]
    pub partial_failure_exit_code: Option<i32>,

    /// Exit code recorded for a command that hit the timeout
    #[arg(long, allow_negative_numbers = true)]
    pub timeout_exit_code: Option<i32>,

    /// Enable verbose console output
    #[arg(short, long)]
    pub verbose: bool,
}

/// Fully resolved run settings: CLI over settings file over defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpgradeSettings {
    pub log_path: PathBuf,
    pub max_log_size_mb: u64,
    pub timeout_seconds: u64,
    pub include_pinned: bool,
    pub heal_sources: bool,
    pub tool: String,
    pub fallback_dir: Option<PathBuf>,
    pub extra_args: Vec<String>,
    pub lock_path: PathBuf,
    pub exit_codes: ExitCodePolicy,
    pub verbose: bool,
}

/// Host-wide directory for the log and the lock file.
pub fn default_data_dir() -> PathBuf {
    if cfg!(windows) {
        if let Some(program_data) = std::env::var_os("ProgramData") {
            return PathBuf::from(program_data).join(APP_NAME);
        }
    }
    std::env::temp_dir().join(APP_NAME)
}

impl Default for UpgradeSettings {
    fn default() -> Self {
        let data_dir = default_data_dir();
        Self {
            log_path: data_dir.join(format!("{}.log", APP_NAME)),
            max_log_size_mb: DEFAULT_MAX_LOG_MB,
            timeout_seconds: DEFAULT_TIMEOUT_SECS,
            include_pinned: false,
            heal_sources: false,
            tool: DEFAULT_TOOL.to_string(),
            fallback_dir: default_fallback_dir(),
            extra_args: Vec::new(),
            lock_path: data_dir.join(format!("{}.lock", APP_NAME)),
            exit_codes: ExitCodePolicy::default(),
            verbose: false,
        }
    }
}

impl UpgradeSettings {
    pub fn from_file_config(file: &FileConfig) -> Self {
        let defaults = Self::default();
        let tool = file.tool();
        let codes = file.exit_codes();
        let logging = file.logging();
        let run = file.run();

        Self {
            log_path: logging.path.unwrap_or(defaults.log_path),
            max_log_size_mb: logging.max_size_mb.unwrap_or(defaults.max_log_size_mb),
            timeout_seconds: run.timeout_seconds.unwrap_or(defaults.timeout_seconds),
            include_pinned: run.include_pinned.unwrap_or(defaults.include_pinned),
            heal_sources: run.heal_sources.unwrap_or(defaults.heal_sources),
            tool: tool.executable.unwrap_or(defaults.tool),
            fallback_dir: tool.fallback_dir.or(defaults.fallback_dir),
            extra_args: tool.extra_args.unwrap_or(defaults.extra_args),
            lock_path: run.lock_path.unwrap_or(defaults.lock_path),
            exit_codes: ExitCodePolicy {
                no_updates: codes.no_updates.unwrap_or(defaults.exit_codes.no_updates),
                partial_failure: codes
                    .partial_failure
                    .unwrap_or(defaults.exit_codes.partial_failure),
                timeout: codes.timeout.unwrap_or(defaults.exit_codes.timeout),
            },
            verbose: defaults.verbose,
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }

    pub fn max_log_bytes(&self) -> u64 {
        self.max_log_size_mb * 1024 * 1024
    }
}

impl Validate for UpgradeSettings {
    fn validate(&self) -> Result<()> {
        validate_path("log_path", &self.log_path)?;
        validate_path("lock_path", &self.lock_path)?;
        if let Some(dir) = &self.fallback_dir {
            validate_path("tool_dir", dir)?;
        }
        validate_non_empty_string("tool", &self.tool)?;
        validate_range("max_log_size_mb", self.max_log_size_mb, MIN_LOG_MB, MAX_LOG_MB)?;
        validate_range(
            "timeout_seconds",
            self.timeout_seconds,
            MIN_TIMEOUT_SECS,
            MAX_TIMEOUT_SECS,
        )?;
        validate_distinct_codes(&[
            ("no_updates_exit_code", self.exit_codes.no_updates),
            ("partial_failure_exit_code", self.exit_codes.partial_failure),
            ("timeout_exit_code", self.exit_codes.timeout),
        ])
    }
}

#[cfg(feature = "cli")]
impl CliConfig {
    /// Loads the settings file, if any, and lays the command line over it.
    pub fn into_settings(self) -> Result<UpgradeSettings> {
        let file = match &self.config {
            Some(path) => FileConfig::from_file(path)?,
            None => FileConfig::default(),
        };
        Ok(self.apply_to(UpgradeSettings::from_file_config(&file)))
    }

    pub fn apply_to(self, base: UpgradeSettings) -> UpgradeSettings {
        UpgradeSettings {
            log_path: self.log_path.unwrap_or(base.log_path),
            max_log_size_mb: self.max_log_size_mb.unwrap_or(base.max_log_size_mb),
            timeout_seconds: self.timeout_seconds.unwrap_or(base.timeout_seconds),
            include_pinned: self.include_pinned || base.include_pinned,
            heal_sources: self.heal_sources || base.heal_sources,
            tool: self.tool.unwrap_or(base.tool),
            fallback_dir: self.tool_dir.or(base.fallback_dir),
            extra_args: base.extra_args,
            lock_path: self.lock_path.unwrap_or(base.lock_path),
            exit_codes: ExitCodePolicy {
                no_updates: self.no_updates_exit_code.unwrap_or(base.exit_codes.no_updates),
                partial_failure: self
                    .partial_failure_exit_code
                    .unwrap_or(base.exit_codes.partial_failure),
                timeout: self.timeout_exit_code.unwrap_or(base.exit_codes.timeout),
            },
            verbose: self.verbose,
        }
    }
}
