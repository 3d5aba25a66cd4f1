pub mod app;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use crate::config::CliConfig;

pub use crate::app::upgrade::{run_upgrade, RunStatus};
pub use crate::config::UpgradeSettings;
pub use crate::core::{orchestrator::UpgradeOrchestrator, runner::ProcessRunner};
pub use crate::utils::error::{Result, UpgradeError};
