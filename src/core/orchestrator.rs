use crate::core::commands::ToolCommands;
use crate::core::locator::ResolvedTool;
use crate::core::parser::parse_pending;
use crate::core::runner::describe_command;
use crate::domain::model::{
    AttemptOutcome, CommandResult, ExitCodePolicy, PackageOutcome, PendingSet, Phase,
    UpgradeReport,
};
use crate::domain::ports::CommandRunner;
use crate::utils::error::Result;

/// Sequences one unattended upgrade run over the package manager:
/// optional source healing, pre-scan, bulk upgrade, a single per-package
/// sweep when the bulk attempt did not fully succeed, and a post-scan.
pub struct UpgradeOrchestrator<R: CommandRunner> {
    runner: R,
    tool: ResolvedTool,
    commands: ToolCommands,
    policy: ExitCodePolicy,
    heal_sources: bool,
    timeout_secs: u64,
}

impl<R: CommandRunner> UpgradeOrchestrator<R> {
    pub fn new(
        runner: R,
        tool: ResolvedTool,
        commands: ToolCommands,
        policy: ExitCodePolicy,
    ) -> Self {
        Self {
            runner,
            tool,
            commands,
            policy,
            heal_sources: false,
            timeout_secs: 0,
        }
    }

    pub fn with_source_healing(mut self, enabled: bool) -> Self {
        self.heal_sources = enabled;
        self
    }

    /// Only used to describe timeouts in the log.
    pub fn with_timeout_secs(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }

    pub async fn run(&self) -> Result<UpgradeReport> {
        // The resolved tool is the proof that VERIFY_TOOL_PRESENT passed.
        let mut phases = vec![Phase::Prepare, Phase::VerifyToolPresent];
        tracing::info!("Using package manager at {}", self.tool.path.display());

        if self.heal_sources {
            enter(&mut phases, Phase::HealSources);
            self.heal_sources().await?;
        }

        enter(&mut phases, Phase::PreScan);
        let pending_before = self.scan("before upgrade").await?;

        enter(&mut phases, Phase::BulkUpgrade);
        let args = self.commands.upgrade_all();
        let result = self.runner.run(&self.tool.path, &args).await?;
        let bulk = self.policy.classify(&result);
        match bulk {
            AttemptOutcome::Succeeded => tracing::info!("Bulk upgrade succeeded"),
            AttemptOutcome::NothingToDo => tracing::info!("Bulk upgrade found nothing to upgrade"),
            _ => self.log_failed_attempt(&args, bulk, &result),
        }

        let mut retried = Vec::new();
        if !bulk.is_success() {
            enter(&mut phases, Phase::PerPackageRetry);
            retried = self.retry_individually().await?;
        }

        enter(&mut phases, Phase::PostScan);
        let pending_after = self.scan("after upgrade").await?;
        if !pending_after.is_empty() {
            tracing::warn!(
                "{} package(s) still pending: {}",
                pending_after.len(),
                pending_after
            );
        }

        enter(&mut phases, Phase::Done);
        Ok(UpgradeReport {
            phases,
            pending_before,
            bulk,
            retried,
            pending_after,
        })
    }

    async fn scan(&self, label: &str) -> Result<PendingSet> {
        let result = self.runner.run(&self.tool.path, &self.commands.list_pending()).await?;
        if result.timed_out {
            tracing::warn!("Listing pending upgrades {} timed out", label);
        }

        let pending = parse_pending(&result.stdout);
        if pending.is_empty() {
            tracing::info!("No pending upgrades {}", label);
        } else {
            tracing::info!(
                "{} pending upgrade(s) {}: {}",
                pending.len(),
                label,
                pending
            );
        }
        Ok(pending)
    }

    async fn retry_individually(&self) -> Result<Vec<PackageOutcome>> {
        let pending = self.scan("for individual retry").await?;
        let mut outcomes = Vec::with_capacity(pending.len());

        // Sequential on purpose: the package manager serialises on its own lock.
        for id in pending.iter() {
            let args = self.commands.upgrade_exact(id);
            let outcome = match self.runner.run(&self.tool.path, &args).await {
                Ok(result) => {
                    let outcome = self.policy.classify(&result);
                    if outcome.is_success() {
                        tracing::info!("Upgrade of {}: {}", id, outcome);
                    } else {
                        self.log_failed_attempt(&args, outcome, &result);
                    }
                    outcome
                }
                Err(e) => {
                    tracing::warn!("Upgrade of {} not attempted: {}", id, e);
                    AttemptOutcome::LaunchFailed
                }
            };
            outcomes.push(PackageOutcome {
                id: id.clone(),
                outcome,
            });
        }

        let failed = outcomes.iter().filter(|o| !o.outcome.is_success()).count();
        tracing::info!(
            "Individual retry finished: {} attempted, {} failed",
            outcomes.len(),
            failed
        );
        Ok(outcomes)
    }

    async fn heal_sources(&self) -> Result<()> {
        let update = self.commands.source_update();
        let result = self.runner.run(&self.tool.path, &update).await?;
        if result.is_success() {
            tracing::info!("Package sources updated");
            return Ok(());
        }
        self.log_failed_attempt(&update, self.policy.classify(&result), &result);

        tracing::warn!("Resetting package sources");
        let reset = self.commands.source_reset();
        let result = self.runner.run(&self.tool.path, &reset).await?;
        if !result.is_success() {
            self.log_failed_attempt(&reset, self.policy.classify(&result), &result);
        }

        let result = self.runner.run(&self.tool.path, &update).await?;
        if result.is_success() {
            tracing::info!("Package sources updated after reset");
        } else {
            self.log_failed_attempt(&update, self.policy.classify(&result), &result);
        }
        Ok(())
    }

    fn log_failed_attempt(&self, args: &[String], outcome: AttemptOutcome, result: &CommandResult) {
        let command = describe_command(&self.tool.path, args);
        match outcome.to_error(&command, self.timeout_secs, &self.policy) {
            Some(err) => tracing::warn!("{} ({})", err, outcome),
            None => tracing::warn!("{} returned {}", command, result.exit_code),
        }
    }
}

fn enter(phases: &mut Vec<Phase>, phase: Phase) {
    tracing::info!("Phase {}", phase);
    phases.push(phase);
}
