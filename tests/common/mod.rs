#![allow(dead_code)]

use async_trait::async_trait;
use silent_upgrade::core::locator::ResolvedTool;
use silent_upgrade::domain::model::{CommandResult, ExitCodePolicy};
use silent_upgrade::domain::ports::CommandRunner;
use silent_upgrade::{Result, UpgradeError};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;

pub const NO_UPDATES: i32 = ExitCodePolicy::DEFAULT_NO_UPDATES;
pub const PARTIAL_FAILURE: i32 = ExitCodePolicy::DEFAULT_PARTIAL_FAILURE;
pub const TIMEOUT: i32 = ExitCodePolicy::DEFAULT_TIMEOUT;

pub fn listing(rows: &[(&str, &str)]) -> String {
    let mut out = String::from(
        "Name                Id                    Version   Available  Source\n\
         ---------------------------------------------------------------------\n",
    );
    for (name, id) in rows {
        out.push_str(&format!("{:<20}{:<22}1.0.0     2.0.0      winget\n", name, id));
    }
    out.push_str(&format!("{} upgrades available.\n", rows.len()));
    out
}

pub fn fake_tool() -> ResolvedTool {
    ResolvedTool {
        path: PathBuf::from("winget"),
        via_fallback: false,
    }
}

/// What the scripted package manager answers for one kind of call.
#[derive(Clone, Copy)]
pub enum Reply {
    Exit(i32),
    Timeout,
    LaunchError,
}

/// In-memory package manager. Listing calls return the scripted listings in
/// order (the last one repeats); upgrade calls answer per the replies.
#[derive(Clone)]
pub struct ScriptedRunner {
    calls: Arc<Mutex<Vec<Vec<String>>>>,
    listings: Arc<Vec<String>>,
    bulk: Reply,
    per_package: Arc<HashMap<String, Reply>>,
    source_update: Arc<Mutex<Vec<Reply>>>,
    source_reset: Reply,
}

impl ScriptedRunner {
    pub fn new(listings: Vec<String>, bulk: Reply) -> Self {
        Self {
            calls: Arc::new(Mutex::new(Vec::new())),
            listings: Arc::new(listings),
            bulk,
            per_package: Arc::new(HashMap::new()),
            source_update: Arc::new(Mutex::new(Vec::new())),
            source_reset: Reply::Exit(0),
        }
    }

    pub fn with_package_reply(mut self, id: &str, reply: Reply) -> Self {
        Arc::make_mut(&mut self.per_package).insert(id.to_string(), reply);
        self
    }

    /// Replies to successive `source update` calls; exit 0 once exhausted.
    pub fn with_source_updates(mut self, replies: Vec<Reply>) -> Self {
        self.source_update = Arc::new(Mutex::new(replies));
        self
    }

    pub async fn calls(&self) -> Vec<Vec<String>> {
        self.calls.lock().await.clone()
    }

    pub async fn exact_upgrades(&self) -> Vec<String> {
        self.calls()
            .await
            .into_iter()
            .filter(|args| args.iter().any(|a| a == "--id"))
            .filter_map(|args| {
                let pos = args.iter().position(|a| a == "--id")?;
                args.get(pos + 1).cloned()
            })
            .collect()
    }

    pub async fn listing_calls(&self) -> usize {
        self.calls()
            .await
            .iter()
            .filter(|args| is_listing(args))
            .count()
    }
}

fn is_listing(args: &[String]) -> bool {
    args.first().map(String::as_str) == Some("upgrade")
        && !args.iter().any(|a| a == "--all" || a == "--id")
}

fn answer(reply: Reply, stdout: String) -> Result<CommandResult> {
    match reply {
        Reply::Exit(code) => Ok(CommandResult {
            exit_code: code,
            stdout,
            stderr: String::new(),
            timed_out: false,
        }),
        Reply::Timeout => Ok(CommandResult {
            exit_code: TIMEOUT,
            stdout,
            stderr: String::new(),
            timed_out: true,
        }),
        Reply::LaunchError => Err(UpgradeError::Spawn {
            command: "winget".to_string(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        }),
    }
}

#[async_trait]
impl CommandRunner for ScriptedRunner {
    async fn run(&self, _program: &Path, args: &[String]) -> Result<CommandResult> {
        let listing_index = {
            let mut calls = self.calls.lock().await;
            let index = calls.iter().filter(|c| is_listing(c)).count();
            calls.push(args.to_vec());
            index
        };

        if is_listing(args) {
            let stdout = self
                .listings
                .get(listing_index)
                .or_else(|| self.listings.last())
                .cloned()
                .unwrap_or_default();
            return answer(Reply::Exit(0), stdout);
        }

        if args.iter().any(|a| a == "--all") {
            return answer(self.bulk, String::new());
        }

        if let Some(pos) = args.iter().position(|a| a == "--id") {
            let id = &args[pos + 1];
            let reply = self.per_package.get(id).copied().unwrap_or(Reply::Exit(0));
            return answer(reply, String::new());
        }

        match args.get(1).map(String::as_str) {
            Some("update") => {
                let mut replies = self.source_update.lock().await;
                let reply = if replies.is_empty() {
                    Reply::Exit(0)
                } else {
                    replies.remove(0)
                };
                answer(reply, String::new())
            }
            Some("reset") => answer(self.source_reset, String::new()),
            _ => answer(Reply::Exit(0), String::new()),
        }
    }
}
