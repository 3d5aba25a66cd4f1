use crate::domain::model::CommandResult;
use crate::utils::error::Result;
use async_trait::async_trait;
use std::path::Path;

/// Launches the external package manager and waits for it.
///
/// Implementations report timeouts through `CommandResult::timed_out`;
/// `Err` is reserved for failures to launch at all.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    async fn run(&self, program: &Path, args: &[String]) -> Result<CommandResult>;
}
