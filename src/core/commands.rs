use crate::domain::model::PackageId;

/// Argument lists for every package-manager invocation the run makes.
#[derive(Debug, Clone, Default)]
pub struct ToolCommands {
    pub include_pinned: bool,
    /// Appended to upgrade invocations only.
    pub extra_args: Vec<String>,
}

const NON_INTERACTIVE: &[&str] = &["--accept-source-agreements", "--disable-interactivity"];

const SILENT_UPGRADE: &[&str] = &[
    "--silent",
    "--accept-package-agreements",
    "--accept-source-agreements",
    "--disable-interactivity",
    "--force",
];

impl ToolCommands {
    pub fn new(include_pinned: bool, extra_args: Vec<String>) -> Self {
        Self {
            include_pinned,
            extra_args,
        }
    }

    pub fn list_pending(&self) -> Vec<String> {
        let mut args = to_args(&["upgrade", "--include-unknown"]);
        args.extend(to_args(NON_INTERACTIVE));
        self.push_pinned(&mut args);
        args
    }

    pub fn upgrade_all(&self) -> Vec<String> {
        let mut args = to_args(&["upgrade", "--all", "--include-unknown"]);
        args.extend(to_args(SILENT_UPGRADE));
        self.push_pinned(&mut args);
        args.extend(self.extra_args.iter().cloned());
        args
    }

    pub fn upgrade_exact(&self, id: &PackageId) -> Vec<String> {
        let mut args = to_args(&["upgrade", "--id"]);
        args.push(id.as_str().to_string());
        args.push("--exact".to_string());
        args.extend(to_args(SILENT_UPGRADE));
        self.push_pinned(&mut args);
        args.extend(self.extra_args.iter().cloned());
        args
    }

    pub fn source_update(&self) -> Vec<String> {
        let mut args = to_args(&["source", "update"]);
        args.push("--disable-interactivity".to_string());
        args
    }

    pub fn source_reset(&self) -> Vec<String> {
        let mut args = to_args(&["source", "reset", "--force"]);
        args.push("--disable-interactivity".to_string());
        args
    }

    fn push_pinned(&self, args: &mut Vec<String>) {
        if self.include_pinned {
            args.push("--include-pinned".to_string());
        }
    }
}

fn to_args(parts: &[&str]) -> Vec<String> {
    parts.iter().map(|s| s.to_string()).collect()
}
