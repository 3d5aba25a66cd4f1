use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum UpgradeError {
    #[error("Package manager '{tool}' not found (searched PATH and {searched})")]
    ToolNotFound { tool: String, searched: String },

    #[error("Command '{command}' timed out after {timeout_secs}s")]
    CommandTimeout { command: String, timeout_secs: u64 },

    #[error("Command '{command}' exited with code {code}")]
    NonZeroExit { command: String, code: i32 },

    #[error("Failed to launch '{command}': {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Configuration error in {field}: {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid value '{value}' for {field}: {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Log setup failed for {path}: {message}")]
    LogSetupError { path: PathBuf, message: String },

    #[error("Instance lock error on {path}: {source}")]
    LockError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl UpgradeError {
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            UpgradeError::CommandTimeout { .. } | UpgradeError::NonZeroExit { .. } => {
                ErrorSeverity::Medium
            }
            UpgradeError::ConfigValidationError { .. }
            | UpgradeError::InvalidConfigValueError { .. } => ErrorSeverity::High,
            UpgradeError::ToolNotFound { .. }
            | UpgradeError::Spawn { .. }
            | UpgradeError::IoError(_)
            | UpgradeError::LogSetupError { .. }
            | UpgradeError::LockError { .. } => ErrorSeverity::Critical,
        }
    }

    /// Timeouts and failing exit codes are handled by the retry pass
    /// instead of aborting the run.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            UpgradeError::CommandTimeout { .. } | UpgradeError::NonZeroExit { .. }
        )
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            UpgradeError::ToolNotFound { .. } => {
                "Install the package manager or pass --tool-dir with its install directory"
            }
            UpgradeError::CommandTimeout { .. } => {
                "Raise --timeout-seconds if upgrades legitimately take longer"
            }
            UpgradeError::NonZeroExit { .. } => {
                "Check the log for the package manager's own error output"
            }
            UpgradeError::Spawn { .. } => "Verify the executable is runnable by this account",
            UpgradeError::IoError(_) => "Check file permissions and free disk space",
            UpgradeError::ConfigValidationError { .. }
            | UpgradeError::InvalidConfigValueError { .. } => {
                "Fix the configuration value and run again"
            }
            UpgradeError::LogSetupError { .. } => "Choose a writable --log-path",
            UpgradeError::LockError { .. } => "Choose a writable --lock-path",
        }
    }
}

pub type Result<T> = std::result::Result<T, UpgradeError>;
