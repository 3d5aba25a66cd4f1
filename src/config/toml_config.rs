use crate::utils::error::{Result, UpgradeError};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

static ENV_REFERENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\{([^}]+)\}").expect("env reference pattern is valid"));

/// Optional settings file. Every value can also be given on the command
/// line, which wins.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FileConfig {
    pub tool: Option<ToolSection>,
    pub exit_codes: Option<ExitCodesSection>,
    pub logging: Option<LoggingSection>,
    pub run: Option<RunSection>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ToolSection {
    pub executable: Option<String>,
    pub fallback_dir: Option<PathBuf>,
    pub extra_args: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExitCodesSection {
    pub no_updates: Option<i32>,
    pub partial_failure: Option<i32>,
    pub timeout: Option<i32>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoggingSection {
    pub path: Option<PathBuf>,
    pub max_size_mb: Option<u64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunSection {
    pub timeout_seconds: Option<u64>,
    pub include_pinned: Option<bool>,
    pub heal_sources: Option<bool>,
    pub lock_path: Option<PathBuf>,
}

impl FileConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(UpgradeError::IoError)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content);

        toml::from_str(&processed_content).map_err(|e| UpgradeError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// Replaces `${NAME}` with the environment value; unknown names stay as
    /// written.
    fn substitute_env_vars(content: &str) -> String {
        ENV_REFERENCE
            .replace_all(content, |caps: &regex::Captures| {
                let var_name = &caps[1];
                std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
            })
            .into_owned()
    }

    pub fn tool(&self) -> ToolSection {
        self.tool.clone().unwrap_or_default()
    }

    pub fn exit_codes(&self) -> ExitCodesSection {
        self.exit_codes.clone().unwrap_or_default()
    }

    pub fn logging(&self) -> LoggingSection {
        self.logging.clone().unwrap_or_default()
    }

    pub fn run(&self) -> RunSection {
        self.run.clone().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_parse_full_config() {
        let toml_content = r#"
[tool]
executable = "winget"
fallback_dir = "C:/Users/svc/AppData/Local/Microsoft/WindowsApps"
extra_args = ["--scope", "machine"]

[exit_codes]
no_updates = -1978335189
partial_failure = -1978335188
timeout = -1

[logging]
path = "C:/ProgramData/silent-upgrade/run.log"
max_size_mb = 25

[run]
timeout_seconds = 3600
include_pinned = true
heal_sources = true
"#;

        let config = FileConfig::from_toml_str(toml_content).unwrap();

        assert_eq!(config.tool().executable.as_deref(), Some("winget"));
        assert_eq!(
            config.tool().extra_args,
            Some(vec!["--scope".to_string(), "machine".to_string()])
        );
        assert_eq!(config.exit_codes().partial_failure, Some(-1978335188));
        assert_eq!(config.logging().max_size_mb, Some(25));
        assert_eq!(config.run().timeout_seconds, Some(3600));
        assert_eq!(config.run().include_pinned, Some(true));
        assert_eq!(config.run().lock_path, None);
    }

    #[test]
    fn test_empty_config_is_valid() {
        let config = FileConfig::from_toml_str("").unwrap();
        assert!(config.tool.is_none());
        assert!(config.exit_codes().no_updates.is_none());
    }

    #[test]
    fn test_env_var_substitution() {
        std::env::set_var("SILENT_UPGRADE_TEST_DIR", "/opt/pm/bin");

        let toml_content = r#"
[tool]
fallback_dir = "${SILENT_UPGRADE_TEST_DIR}"
executable = "${SILENT_UPGRADE_TEST_UNSET_VAR}"
"#;

        let config = FileConfig::from_toml_str(toml_content).unwrap();
        assert_eq!(config.tool().fallback_dir, Some(PathBuf::from("/opt/pm/bin")));
        assert_eq!(
            config.tool().executable.as_deref(),
            Some("${SILENT_UPGRADE_TEST_UNSET_VAR}")
        );

        std::env::remove_var("SILENT_UPGRADE_TEST_DIR");
    }

    #[test]
    fn test_invalid_toml_is_config_error() {
        let err = FileConfig::from_toml_str("[run]\ntimeout_seconds = \"soon\"\n").unwrap_err();
        assert!(matches!(err, UpgradeError::ConfigValidationError { .. }));
    }

    #[test]
    fn test_config_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file
            .write_all(b"[logging]\nmax_size_mb = 5\n")
            .unwrap();

        let config = FileConfig::from_file(temp_file.path()).unwrap();
        assert_eq!(config.logging().max_size_mb, Some(5));
    }
}
