use crate::config::UpgradeSettings;
use crate::core::commands::ToolCommands;
use crate::core::instance::InstanceGuard;
use crate::core::locator::locate_tool;
use crate::core::orchestrator::UpgradeOrchestrator;
use crate::domain::model::{Phase, UpgradeReport};
use crate::domain::ports::CommandRunner;
use crate::utils::error::Result;

#[derive(Debug)]
pub enum RunStatus {
    Completed(UpgradeReport),
    /// Another instance holds the lock; nothing was run.
    AlreadyRunning,
}

/// One full run: tool lookup, then the orchestrated upgrade.
///
/// `instance` is the outcome of [`InstanceGuard::try_acquire`], taken by the
/// caller before anything else (log rotation included) touches shared state.
/// Without it nothing runs. The guard is held until this returns, on every
/// path.
pub async fn run_upgrade<R: CommandRunner>(
    settings: &UpgradeSettings,
    instance: Option<InstanceGuard>,
    runner: R,
) -> Result<RunStatus> {
    let Some(_guard) = instance else {
        tracing::warn!(
            "Another instance is already running (lock {}), exiting",
            settings.lock_path.display()
        );
        return Ok(RunStatus::AlreadyRunning);
    };

    tracing::info!("Phase {}", Phase::Prepare);
    tracing::info!(
        "Starting silent-upgrade (tool: {}, timeout: {}s, include pinned: {})",
        settings.tool,
        settings.timeout_seconds,
        settings.include_pinned
    );
    tracing::debug!("Settings: {:?}", settings);

    tracing::info!("Phase {}", Phase::VerifyToolPresent);
    let tool = locate_tool(&settings.tool, settings.fallback_dir.as_deref())?;

    let commands = ToolCommands::new(settings.include_pinned, settings.extra_args.clone());
    let orchestrator = UpgradeOrchestrator::new(runner, tool, commands, settings.exit_codes)
        .with_source_healing(settings.heal_sources)
        .with_timeout_secs(settings.timeout_seconds);

    let report = orchestrator.run().await?;
    Ok(RunStatus::Completed(report))
}
