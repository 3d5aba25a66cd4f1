pub mod commands;
pub mod instance;
pub mod locator;
pub mod orchestrator;
pub mod parser;
pub mod runner;

pub use crate::domain::model::{
    AttemptOutcome, CommandResult, ExitCodePolicy, PackageId, PackageOutcome, PendingSet, Phase,
    UpgradeReport,
};
pub use crate::domain::ports::CommandRunner;
pub use crate::utils::error::Result;
