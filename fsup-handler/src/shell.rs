//! Gateway to the privileged updater shell wrapper.
//!
//! The wrapper is the only road to the updater CLI: the handler never
//! touches flash or boot slots itself. Arguments follow a fixed
//! vocabulary and the child's exit code is the sole result channel;
//! stdout is drained fully before the exit code is interpreted.

use async_trait::async_trait;
use fsup_common::Outcome;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use thiserror::Error;
use tracing::{debug, warn};

/// Fixed wrapper options.
pub const UPDATE_TYPE_OPT: &str = "--update-type";
pub const UPDATE_ACTION_OPT: &str = "--update-action";
pub const TARGET_OPTIONS_OPT: &str = "--target-options";
pub const TARGET_DATA_OPT: &str = "--target-data";

/// Target options forwarded verbatim to the updater by the `execute`
/// action.
pub const REBOOT_STATE_QUERY: &str = "--update_reboot_state";
pub const FIRMWARE_VERSION_QUERY: &str = "--firmware_version";
pub const APPLICATION_VERSION_QUERY: &str = "--application_version";
pub const COMMIT_UPDATE_EXEC: &str = "--commit_update";
pub const ROLLBACK_UPDATE_EXEC: &str = "--rollback_update";

/// Target options selecting the slot for a plain install.
pub const TARGET_APP: &str = "app";
pub const TARGET_FW: &str = "fw";

/// Action verbs the wrapper understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShellAction {
    /// Write the payload into the inactive slot.
    Install,
    /// Commit the pending update.
    Apply,
    /// Roll the pending update back.
    Cancel,
    /// Forward a target option verbatim to the updater.
    Execute,
    /// Delegated to the host agent's reboot request.
    Reboot,
}

impl ShellAction {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Install => "install",
            Self::Apply => "apply",
            Self::Cancel => "cancel",
            Self::Execute => "execute",
            Self::Reboot => "reboot",
        }
    }
}

impl std::fmt::Display for ShellAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One wrapper invocation, assembled into the fixed argv ordering:
/// `--update-type <token> --update-action <action>
/// [--target-options <opt>]... [--target-data <path>]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShellInvocation {
    token: String,
    action: ShellAction,
    target_options: Vec<String>,
    target_data: Option<PathBuf>,
}

impl ShellInvocation {
    #[must_use]
    pub fn new(token: impl Into<String>, action: ShellAction) -> Self {
        Self {
            token: token.into(),
            action,
            target_options: Vec::new(),
            target_data: None,
        }
    }

    #[must_use]
    pub fn target_option(mut self, option: impl Into<String>) -> Self {
        self.target_options.push(option.into());
        self
    }

    #[must_use]
    pub fn target_data(mut self, path: impl Into<PathBuf>) -> Self {
        self.target_data = Some(path.into());
        self
    }

    #[must_use]
    pub fn action(&self) -> ShellAction {
        self.action
    }

    /// Builds the wrapper argv.
    #[must_use]
    pub fn to_args(&self) -> Vec<String> {
        let mut args = vec![
            UPDATE_TYPE_OPT.to_string(),
            self.token.clone(),
            UPDATE_ACTION_OPT.to_string(),
            self.action.as_str().to_string(),
        ];
        for option in &self.target_options {
            args.push(TARGET_OPTIONS_OPT.to_string());
            args.push(option.clone());
        }
        if let Some(data) = &self.target_data {
            args.push(TARGET_DATA_OPT.to_string());
            args.push(data.display().to_string());
        }
        args
    }
}

/// Exit status and captured stdout of one wrapper run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShellExit {
    pub code: i32,
    pub stdout: String,
}

/// Errors launching or reaping the wrapper process.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("failed to launch updater shell {path}: {source}")]
    Launch {
        path: String,
        source: std::io::Error,
    },
    #[error("updater shell {path} was terminated by a signal")]
    Interrupted { path: String },
}

/// The seam between the orchestrator and the wrapper binary.
#[async_trait]
pub trait UpdaterGateway: Send + Sync {
    /// Runs one wrapper invocation synchronously, capturing stdout.
    async fn run(&self, invocation: &ShellInvocation) -> Result<ShellExit, GatewayError>;
}

/// The real wrapper binary on the device.
#[derive(Debug, Clone)]
pub struct AduShell {
    path: PathBuf,
}

impl AduShell {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl UpdaterGateway for AduShell {
    async fn run(&self, invocation: &ShellInvocation) -> Result<ShellExit, GatewayError> {
        let args = invocation.to_args();
        debug!(shell = %self.path.display(), ?args, "launching updater shell");

        let output = tokio::process::Command::new(&self.path)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .output()
            .await
            .map_err(|source| GatewayError::Launch {
                path: self.path.display().to_string(),
                source,
            })?;

        let code = output.status.code().ok_or_else(|| GatewayError::Interrupted {
            path: self.path.display().to_string(),
        })?;
        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        debug!(code, "updater shell finished");
        Ok(ShellExit { code, stdout })
    }
}

/// Runs an `execute` version query and extracts the version string.
///
/// The wrapper echoes its whole log; the version value is the first
/// token after the query option, with NUL/CR/LF/TAB and surrounding
/// spaces stripped. A non-zero exit or empty capture yields a
/// `Failure` carrying the child's exit code.
pub async fn query_version(
    gateway: &dyn UpdaterGateway,
    token: &str,
    option: &str,
) -> Result<String, Outcome> {
    let invocation = ShellInvocation::new(token, ShellAction::Execute).target_option(option);
    let exit = match gateway.run(&invocation).await {
        Ok(exit) => exit,
        Err(e) => {
            warn!(error = %e, "version query could not run");
            return Err(Outcome::failure_raw(-1));
        }
    };
    if exit.code != 0 {
        warn!(code = exit.code, option, "version query failed");
        return Err(Outcome::failure_raw(exit.code));
    }
    if exit.stdout.is_empty() {
        warn!(option, "version query produced no output");
        return Err(Outcome::failure_raw(0));
    }
    match extract_value_after(&exit.stdout, option) {
        Some(version) => Ok(version),
        // Without the option tag in the capture there is nothing to
        // anchor on; hand back the cleaned capture so the comparison
        // against the installed criteria still happens.
        None => Ok(strip_control(exit.stdout.trim())),
    }
}

/// Extracts the first token following `option` in `output`.
fn extract_value_after(output: &str, option: &str) -> Option<String> {
    let start = output.find(option)? + option.len();
    let rest = output[start..].trim_start_matches(' ');
    let end = rest.find(' ').unwrap_or(rest.len());
    let value = strip_control(&rest[..end]);
    if value.is_empty() {
        None
    } else {
        Some(value)
    }
}

fn strip_control(value: &str) -> String {
    value
        .chars()
        .filter(|c| !matches!(c, '\0' | '\r' | '\n' | '\t'))
        .collect::<String>()
        .trim_matches(' ')
        .to_string()
}
