//! Host-visible lifecycle outcomes.
//!
//! Every lifecycle operation returns exactly one [`Outcome`]; errors
//! never cross the host-agent boundary as `Err`. The numeric
//! discriminants follow the host's result-code bands and only surface
//! verbatim in the `errorState` stamp.

use crate::errors::ExtendedCode;
use serde::{Deserialize, Serialize};

/// Result codes the host agent recognises.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(i32)]
pub enum ResultCode {
    Failure = 0,
    FailureCancelled = -1,
    DownloadSuccess = 500,
    InstallSuccess = 600,
    InstallRequiredImmediateReboot = 603,
    ApplySuccess = 700,
    ApplyRequiredImmediateReboot = 703,
    CancelSuccess = 800,
    CancelRequiredImmediateReboot = 801,
    IsInstalledInstalled = 900,
    IsInstalledNotInstalled = 901,
    IsInstalledMissingCommit = 902,
    BackupSuccess = 1000,
    RestoreSuccessUnsupported = 1102,
}

impl ResultCode {
    /// Numeric value written into the `errorState` stamp.
    #[must_use]
    pub const fn code(self) -> i32 {
        self as i32
    }

    /// Whether the host treats this code as a failed phase.
    #[must_use]
    pub const fn is_failure(self) -> bool {
        matches!(self, Self::Failure | Self::FailureCancelled)
    }
}

impl std::fmt::Display for ResultCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// The `(result, extended)` pair a lifecycle operation hands back to
/// the host agent.
///
/// `extended` is `0` for plain successes, an [`ExtendedCode`] number
/// for mapped failures, or the raw child exit code where nothing more
/// specific applies (preserved for post-mortems).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Outcome {
    pub result: ResultCode,
    pub extended: i32,
}

impl Outcome {
    /// A success (or other plain) outcome with no extended code.
    #[must_use]
    pub const fn ok(result: ResultCode) -> Self {
        Self {
            result,
            extended: 0,
        }
    }

    /// A failure carrying a catalog code.
    #[must_use]
    pub const fn failure(code: ExtendedCode) -> Self {
        Self {
            result: ResultCode::Failure,
            extended: code.code_number() as i32,
        }
    }

    /// A failure preserving a raw child exit code.
    #[must_use]
    pub const fn failure_raw(exit_code: i32) -> Self {
        Self {
            result: ResultCode::Failure,
            extended: exit_code,
        }
    }

    /// The cancelled-by-host outcome.
    #[must_use]
    pub const fn cancelled() -> Self {
        Self {
            result: ResultCode::FailureCancelled,
            extended: 0,
        }
    }

    /// A non-failure result with an extended code appended (used by
    /// the cancel path that succeeds but records a state anomaly).
    #[must_use]
    pub const fn with_extended(result: ResultCode, code: ExtendedCode) -> Self {
        Self {
            result,
            extended: code.code_number() as i32,
        }
    }

    #[must_use]
    pub const fn is_failure(&self) -> bool {
        self.result.is_failure()
    }
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.result, self.extended)
    }
}
