use std::collections::BTreeMap;
use std::fmt;

use crate::utils::error::UpgradeError;

/// Captured outcome of one external-tool invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandResult {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
    pub timed_out: bool,
}

impl CommandResult {
    pub fn is_success(&self) -> bool {
        !self.timed_out && self.exit_code == 0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PackageId(String);

impl PackageId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PackageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for PackageId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Unique package ids, ordered case-insensitively.
///
/// Ids differing only in case collapse to the first spelling seen, since
/// the package manager matches them case-insensitively.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PendingSet {
    ids: Vec<PackageId>,
}

impl PendingSet {
    pub fn from_ids<I, T>(ids: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        let mut unique: BTreeMap<String, PackageId> = BTreeMap::new();
        for id in ids {
            let id: String = id.into();
            unique.entry(id.to_lowercase()).or_insert(PackageId(id));
        }
        Self {
            ids: unique.into_values().collect(),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &PackageId> {
        self.ids.iter()
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        let folded = id.to_lowercase();
        self.ids.iter().any(|p| p.0.to_lowercase() == folded)
    }
}

impl fmt::Display for PendingSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.ids.iter().map(PackageId::as_str).collect();
        f.write_str(&names.join(", "))
    }
}

/// Numeric codes with a tool-defined meaning. They are version-dependent
/// constants of the external package manager, so every one is overridable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitCodePolicy {
    pub no_updates: i32,
    pub partial_failure: i32,
    pub timeout: i32,
}

impl ExitCodePolicy {
    /// 0x8A15002B, "no applicable update found".
    pub const DEFAULT_NO_UPDATES: i32 = -1978335189;
    /// 0x8A15002C, "upgrade all completed with failures".
    pub const DEFAULT_PARTIAL_FAILURE: i32 = -1978335188;
    pub const DEFAULT_TIMEOUT: i32 = -1;

    pub fn classify(&self, result: &CommandResult) -> AttemptOutcome {
        if result.timed_out {
            return AttemptOutcome::TimedOut;
        }
        match result.exit_code {
            0 => AttemptOutcome::Succeeded,
            code if code == self.no_updates => AttemptOutcome::NothingToDo,
            code if code == self.partial_failure => AttemptOutcome::PartialFailure,
            // A runner that reports the timeout sentinel without the flag
            // still counts as a timeout.
            code if code == self.timeout => AttemptOutcome::TimedOut,
            code => AttemptOutcome::Failed(code),
        }
    }
}

impl Default for ExitCodePolicy {
    fn default() -> Self {
        Self {
            no_updates: Self::DEFAULT_NO_UPDATES,
            partial_failure: Self::DEFAULT_PARTIAL_FAILURE,
            timeout: Self::DEFAULT_TIMEOUT,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptOutcome {
    Succeeded,
    NothingToDo,
    PartialFailure,
    TimedOut,
    Failed(i32),
    /// The process could not be started; the launch error is logged where
    /// it happens.
    LaunchFailed,
}

impl AttemptOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, AttemptOutcome::Succeeded | AttemptOutcome::NothingToDo)
    }

    /// The recoverable error this outcome stands for, if any.
    pub fn to_error(
        &self,
        command: &str,
        timeout_secs: u64,
        policy: &ExitCodePolicy,
    ) -> Option<UpgradeError> {
        match *self {
            AttemptOutcome::Succeeded
            | AttemptOutcome::NothingToDo
            | AttemptOutcome::LaunchFailed => None,
            AttemptOutcome::TimedOut => Some(UpgradeError::CommandTimeout {
                command: command.to_string(),
                timeout_secs,
            }),
            AttemptOutcome::PartialFailure => Some(UpgradeError::NonZeroExit {
                command: command.to_string(),
                code: policy.partial_failure,
            }),
            AttemptOutcome::Failed(code) => Some(UpgradeError::NonZeroExit {
                command: command.to_string(),
                code,
            }),
        }
    }
}

impl fmt::Display for AttemptOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttemptOutcome::Succeeded => f.write_str("succeeded"),
            AttemptOutcome::NothingToDo => f.write_str("nothing to do"),
            AttemptOutcome::PartialFailure => f.write_str("partial failure"),
            AttemptOutcome::TimedOut => f.write_str("timed out"),
            AttemptOutcome::Failed(code) => write!(f, "failed with exit code {}", code),
            AttemptOutcome::LaunchFailed => f.write_str("could not be launched"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageOutcome {
    pub id: PackageId,
    pub outcome: AttemptOutcome,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Prepare,
    VerifyToolPresent,
    HealSources,
    PreScan,
    BulkUpgrade,
    PerPackageRetry,
    PostScan,
    Done,
    Fatal,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Prepare => "PREPARE",
            Phase::VerifyToolPresent => "VERIFY_TOOL_PRESENT",
            Phase::HealSources => "HEAL_SOURCES",
            Phase::PreScan => "PRE_SCAN",
            Phase::BulkUpgrade => "BULK_UPGRADE",
            Phase::PerPackageRetry => "PER_PACKAGE_RETRY",
            Phase::PostScan => "POST_SCAN",
            Phase::Done => "DONE",
            Phase::Fatal => "FATAL",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpgradeReport {
    pub phases: Vec<Phase>,
    pub pending_before: PendingSet,
    pub bulk: AttemptOutcome,
    pub retried: Vec<PackageOutcome>,
    pub pending_after: PendingSet,
}

impl UpgradeReport {
    pub fn entered(&self, phase: Phase) -> bool {
        self.phases.contains(&phase)
    }

    pub fn failed_packages(&self) -> Vec<&PackageId> {
        self.retried
            .iter()
            .filter(|p| !p.outcome.is_success())
            .map(|p| &p.id)
            .collect()
    }

    pub fn summary(&self) -> String {
        let retry = if self.entered(Phase::PerPackageRetry) {
            format!(
                ", retried {} ({} failed)",
                self.retried.len(),
                self.failed_packages().len()
            )
        } else {
            String::new()
        };
        format!(
            "pending before: {}, bulk upgrade {}{}, still pending: {}",
            self.pending_before.len(),
            self.bulk,
            retry,
            self.pending_after.len()
        )
    }
}
