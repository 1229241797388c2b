//! Pure decision tables over the updater's reported states.
//!
//! Everything in this module is a function of its arguments: no I/O,
//! no clock, no process state. The orchestrator feeds in raw exit
//! codes and performs whatever waits, reboots or follow-up probes the
//! returned decision prescribes.

use fsup_common::{
    ApplicationState, CombinedState, CommitState, ExtendedCode, FirmwareState, Outcome,
    RebootState, ResultCode, RollbackState, UpdateKind,
};

/// Maps an install exit code to the phase outcome.
///
/// Any of the three per-kind success codes counts as success; every
/// other code fails with an extended code chosen by the update kind
/// alone.
#[must_use]
pub fn install_outcome(kind: UpdateKind, exit_code: i32) -> Outcome {
    if exit_code == FirmwareState::UpdateSuccessful.code()
        || exit_code == ApplicationState::UpdateSuccessful.code()
        || exit_code == CombinedState::UpdateSuccessful.code()
    {
        return Outcome::ok(ResultCode::InstallSuccess);
    }
    if kind.is_firmware_side() {
        Outcome::failure(ExtendedCode::InstallFirmwareUpdate)
    } else if kind.is_application_side() {
        Outcome::failure(ExtendedCode::InstallApplicationUpdate)
    } else {
        Outcome::failure(ExtendedCode::InstallBadFileEntity)
    }
}

/// What the apply phase must do for a reboot-state probe result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyStep {
    /// Wait for the apply sentinel, then request an immediate reboot.
    AwaitReboot,
    /// Wait for the apply sentinel; the controller drives the commit.
    /// The probe outcome is handed back unchanged.
    AwaitCommit,
    /// The update is installed; nothing left to apply.
    Done,
    /// The updater reports no commit is needed.
    NotNeeded,
    /// Unclassifiable state.
    Unknown,
}

#[must_use]
pub fn apply_step(exit_code: i32) -> ApplyStep {
    match RebootState::from_exit_code(exit_code) {
        Some(RebootState::UpdateRebootPending) => ApplyStep::AwaitReboot,
        Some(
            RebootState::IncompleteFwUpdate
            | RebootState::IncompleteAppUpdate
            | RebootState::IncompleteAppFwUpdate,
        ) => ApplyStep::AwaitCommit,
        Some(RebootState::NoUpdateRebootPending) => ApplyStep::Done,
        _ if exit_code == CommitState::UpdateNotNeeded.code() => ApplyStep::NotNeeded,
        _ => ApplyStep::Unknown,
    }
}

/// How the cancel phase enters, based on the reboot-state probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelEntry {
    /// An application update is half-done: roll it back.
    RollbackApplication,
    /// A firmware rollback already rebooted: commit it.
    CommitRollback,
    /// Nothing is pending; there is nothing to cancel.
    NothingToCancel,
    /// The current state does not permit cancelling.
    NotAllowed,
}

#[must_use]
pub fn cancel_entry(exit_code: i32) -> CancelEntry {
    match RebootState::from_exit_code(exit_code) {
        Some(RebootState::IncompleteAppUpdate) => CancelEntry::RollbackApplication,
        Some(RebootState::RollbackFwRebootPending) => CancelEntry::CommitRollback,
        Some(RebootState::NoUpdateRebootPending) => CancelEntry::NothingToCancel,
        _ => CancelEntry::NotAllowed,
    }
}

/// Whether the rollback command's exit code reports success.
#[must_use]
pub fn rollback_accepted(exit_code: i32) -> bool {
    exit_code == RollbackState::UpdateRollbackSuccessful.code()
}

/// What follows a successful rollback, based on a fresh reboot-state
/// probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RollbackStep {
    /// The firmware rollback needs a reboot to complete.
    AwaitReboot,
    /// The rollback is fully processed.
    Complete,
    /// The updater landed in a state rollback cannot leave.
    NotAllowed,
}

#[must_use]
pub fn rollback_step(exit_code: i32) -> RollbackStep {
    match RebootState::from_exit_code(exit_code) {
        Some(RebootState::RollbackFwRebootPending) => RollbackStep::AwaitReboot,
        Some(RebootState::NoUpdateRebootPending) => RollbackStep::Complete,
        _ => RollbackStep::NotAllowed,
    }
}

/// Outcome of committing a rebooted firmware rollback. A commit that
/// does not land in the quiescent state still reports success, with
/// the anomaly appended as the extended code.
#[must_use]
pub fn commit_after_rollback_outcome(exit_code: i32) -> Outcome {
    if exit_code == RebootState::NoUpdateRebootPending.code() {
        Outcome::ok(ResultCode::CancelSuccess)
    } else {
        Outcome::with_extended(
            ResultCode::CancelSuccess,
            ExtendedCode::CancelNotAllowedStateError,
        )
    }
}

/// IsInstalled decision when the reported version equals the
/// installed criteria.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchedVersionStep {
    /// The version is on the device but a commit is still owed.
    MissingCommit,
    /// Fully installed (for common-both, the application side still
    /// gets the same check before the final verdict).
    Installed,
    /// Unclassifiable state.
    Unknown,
}

#[must_use]
pub fn matched_version_step(exit_code: i32) -> MatchedVersionStep {
    match RebootState::from_exit_code(exit_code) {
        Some(
            RebootState::IncompleteAppFwUpdate
            | RebootState::IncompleteAppUpdate
            | RebootState::IncompleteFwUpdate,
        ) => MatchedVersionStep::MissingCommit,
        Some(RebootState::NoUpdateRebootPending) => MatchedVersionStep::Installed,
        _ => MatchedVersionStep::Unknown,
    }
}

/// IsInstalled decision when the reported version differs from the
/// installed criteria.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StaleVersionStep {
    /// A failed application update must be committed away first.
    CommitFailedApplication,
    /// A failed firmware update must be committed away first.
    CommitFailedFirmware,
    /// The update reboot failed; the slot in use counts as installed.
    RebootFailedInstalled,
    /// Plainly not installed.
    NotInstalled,
}

#[must_use]
pub fn stale_version_step(exit_code: i32) -> StaleVersionStep {
    match RebootState::from_exit_code(exit_code) {
        Some(RebootState::FailedAppUpdate) => StaleVersionStep::CommitFailedApplication,
        Some(RebootState::FailedFwUpdate) => StaleVersionStep::CommitFailedFirmware,
        Some(RebootState::FwUpdateRebootFailed) => StaleVersionStep::RebootFailedInstalled,
        _ => StaleVersionStep::NotInstalled,
    }
}

/// Outcome of committing a previously failed update during the
/// IsInstalled check.
#[must_use]
pub fn commit_recovery_outcome(exit_code: i32) -> Outcome {
    if exit_code == CommitState::UpdateCommitSuccessful.code() {
        Outcome::ok(ResultCode::IsInstalledInstalled)
    } else {
        Outcome::failure(ExtendedCode::IsInstalledCommitPreviousFailedUpdate)
    }
}
