use crate::utils::error::{Result, UpgradeError};
use std::path::{Path, PathBuf};

/// Executable found during VERIFY_TOOL_PRESENT. Every later invocation
/// uses this path, the process PATH is never modified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedTool {
    pub path: PathBuf,
    pub via_fallback: bool,
}

pub fn locate_tool(name: &str, fallback_dir: Option<&Path>) -> Result<ResolvedTool> {
    if let Ok(path) = which::which(name) {
        tracing::debug!("Found {} on PATH at {}", name, path.display());
        return Ok(ResolvedTool {
            path,
            via_fallback: false,
        });
    }

    if let Some(dir) = fallback_dir {
        if let Ok(path) = which::which_in(name, Some(dir), dir) {
            tracing::info!("{} not on PATH, using {}", name, path.display());
            return Ok(ResolvedTool {
                path,
                via_fallback: true,
            });
        }
    }

    Err(UpgradeError::ToolNotFound {
        tool: name.to_string(),
        searched: match fallback_dir {
            Some(dir) => dir.display().to_string(),
            None => "no fallback directory".to_string(),
        },
    })
}

/// Per-user install location of the App Installer shim.
pub fn default_fallback_dir() -> Option<PathBuf> {
    if cfg!(windows) {
        std::env::var_os("LOCALAPPDATA")
            .map(|base| PathBuf::from(base).join("Microsoft").join("WindowsApps"))
    } else {
        None
    }
}
