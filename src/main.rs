use anyhow::Context;
use clap::Parser;
use silent_upgrade::core::instance::InstanceGuard;
use silent_upgrade::domain::model::Phase;
use silent_upgrade::utils::{logger, rotating_file::RotatingFile, validation::Validate};
use silent_upgrade::{run_upgrade, CliConfig, ProcessRunner, RunStatus, UpgradeSettings};
use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    let config = CliConfig::parse();

    // Nothing can be logged to file until the settings are known.
    let (settings, instance) = match prepare(config) {
        Ok(prepared) => prepared,
        Err(e) => {
            eprintln!("❌ {:#}", e);
            return ExitCode::FAILURE;
        }
    };

    let runner = ProcessRunner::new(settings.timeout(), settings.exit_codes.timeout);

    match run_upgrade(&settings, instance, runner).await {
        Ok(RunStatus::Completed(report)) => {
            tracing::info!("Upgrade run finished: {}", report.summary());
            println!("✅ {}", report.summary());
            ExitCode::SUCCESS
        }
        Ok(RunStatus::AlreadyRunning) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{}: {} (severity: {:?})", Phase::Fatal, e, e.severity());
            tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());
            eprintln!("❌ {}", e);
            ExitCode::FAILURE
        }
    }
}

fn prepare(config: CliConfig) -> anyhow::Result<(UpgradeSettings, Option<InstanceGuard>)> {
    let settings = config
        .into_settings()
        .context("Failed to load configuration")?;
    settings
        .validate()
        .context("Configuration validation failed")?;

    // The lock comes first: a duplicate instance may append its notice to
    // the shared log but must never rotate it.
    let instance = InstanceGuard::try_acquire(&settings.lock_path)
        .context("Failed to check for another running instance")?;
    let log_file = match instance {
        Some(_) => RotatingFile::open(&settings.log_path, settings.max_log_bytes()),
        None => RotatingFile::append_only(&settings.log_path),
    }
    .context("Failed to open log file")?;
    logger::init_upgrade_logger(log_file, settings.verbose)
        .context("Failed to initialise logging")?;

    Ok((settings, instance))
}
