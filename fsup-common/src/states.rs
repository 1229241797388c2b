//! Typed views of the updater CLI's exit codes.
//!
//! The external updater reports everything through its exit status.
//! The integer values below are the CLI contract; the gateway maps a
//! raw exit code into one of these enums and the state interpreter
//! matches on the typed value. `CommitState` values are deliberately
//! disjoint from `RebootState` values because the apply decision
//! inspects a single exit-code space for both.

use serde::{Deserialize, Serialize};

/// Exit codes of a firmware slot install or rollback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(i32)]
pub enum FirmwareState {
    UpdateSuccessful = 0,
    UpdateInternalError = 1,
    UpdateProgressError = 2,
    BadImageFormat = 3,
    RollbackSuccessful = 4,
    RollbackInternalError = 5,
    RollbackProgressError = 6,
}

/// Exit codes of an application slot install or rollback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(i32)]
pub enum ApplicationState {
    UpdateSuccessful = 0,
    UpdateInternalError = 1,
    UpdateProgressError = 2,
    BadImageFormat = 3,
    RollbackSuccessful = 4,
    RollbackInternalError = 5,
    RollbackProgressError = 6,
}

/// Exit codes of a combined firmware-and-application install.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(i32)]
pub enum CombinedState {
    UpdateSuccessful = 0,
    InternalError = 1,
    ProgressError = 2,
}

/// Exit codes of the `--update_reboot_state` probe: the updater's
/// persistent record of pending commit/reboot/rollback obligations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(i32)]
pub enum RebootState {
    UpdateRebootPending = 0,
    IncompleteFwUpdate = 1,
    IncompleteAppUpdate = 2,
    IncompleteAppFwUpdate = 3,
    NoUpdateRebootPending = 4,
    FailedFwUpdate = 5,
    FailedAppUpdate = 6,
    FwUpdateRebootFailed = 7,
    RollbackFwRebootPending = 8,
    RollbackAppRebootPending = 9,
}

impl RebootState {
    /// Maps a raw child exit code onto a reboot state, if it is one.
    #[must_use]
    pub const fn from_exit_code(code: i32) -> Option<Self> {
        match code {
            0 => Some(Self::UpdateRebootPending),
            1 => Some(Self::IncompleteFwUpdate),
            2 => Some(Self::IncompleteAppUpdate),
            3 => Some(Self::IncompleteAppFwUpdate),
            4 => Some(Self::NoUpdateRebootPending),
            5 => Some(Self::FailedFwUpdate),
            6 => Some(Self::FailedAppUpdate),
            7 => Some(Self::FwUpdateRebootFailed),
            8 => Some(Self::RollbackFwRebootPending),
            9 => Some(Self::RollbackAppRebootPending),
            _ => None,
        }
    }
}

/// Exit codes of `--commit_update`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(i32)]
pub enum CommitState {
    Successful = 0,
    UpdateNotNeeded = 10,
    UpdateSystemError = 11,
    UpdateCommitSuccessful = 12,
}

/// Exit codes of `--rollback_update`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(i32)]
pub enum RollbackState {
    UpdateRollbackSuccessful = 0,
}

macro_rules! exit_code {
    ($($state:ident),+) => {
        $(
            impl $state {
                /// Raw exit-code value of this state.
                #[must_use]
                pub const fn code(self) -> i32 {
                    self as i32
                }
            }

            impl std::fmt::Display for $state {
                fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                    write!(f, "{:?}({})", self, self.code())
                }
            }
        )+
    };
}

exit_code!(
    FirmwareState,
    ApplicationState,
    CombinedState,
    RebootState,
    CommitState,
    RollbackState
);
