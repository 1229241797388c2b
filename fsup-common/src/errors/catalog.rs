//! Extended-code catalog.
//!
//! Each variant maps to a unique code in the FSUP-Exxx format. The
//! numbers are part of the controller contract: they land in the
//! `errorState` stamp and must never be renumbered.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Extended failure codes reported alongside a `Failure` result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[non_exhaustive]
pub enum ExtendedCode {
    // =========================================================================
    // Common (E001-E099)
    // =========================================================================
    /// The `updateType` handler property is absent or empty.
    MissingUpdateTypeProperty,

    // =========================================================================
    // Download (E100-E199)
    // =========================================================================
    /// The update does not carry exactly one payload file.
    DownloadWrongFileCount,
    /// The payload file entity could not be read from the workflow.
    DownloadBadFileEntity,
    /// The `update_version` stamp could not be created.
    DownloadCreateFailedUpdateVersion,
    /// The `update_type` stamp could not be created.
    DownloadCreateFailedUpdateType,
    /// The `update_size` stamp could not be created.
    DownloadCreateFailedUpdateSize,
    /// The `update_location` stamp could not be created.
    DownloadCreateFailedUpdateLocation,
    /// The update-type token carries an unsupported major version.
    DownloadWrongUpdateVersion,
    /// The update-type token could not be parsed.
    DownloadUnknownUpdateVersion,

    // =========================================================================
    // Install (E200-E299)
    // =========================================================================
    /// The workflow's work folder could not be opened.
    InstallCannotOpenWorkFolder,
    /// The payload file entity could not be read from the workflow.
    InstallBadFileEntity,
    /// The updater rejected a firmware-side install.
    InstallFirmwareUpdate,
    /// The updater rejected an application-side install.
    InstallApplicationUpdate,
    /// Committing after a failed install did not succeed.
    InstallCommitUpdate,

    // =========================================================================
    // Apply (E300-E399)
    // =========================================================================
    /// The reboot-state probe reported a state apply cannot handle.
    ApplyUnknownError,
    /// The updater reported a system error while committing.
    ApplyUpdateSystemError,

    // =========================================================================
    // Cancel (E400-E499)
    // =========================================================================
    /// The rollback command did not report rollback success.
    CancelRollbackFirmwareError,
    /// The updater is in a state that does not permit cancelling.
    CancelNotAllowedStateError,

    // =========================================================================
    // IsInstalled (E500-E599)
    // =========================================================================
    /// The reboot-state probe reported an unclassifiable state.
    IsInstalledUnknownState,
    /// Committing a previously failed update did not succeed.
    IsInstalledCommitPreviousFailedUpdate,
}

impl ExtendedCode {
    /// Returns the numeric code (without prefix).
    #[must_use]
    pub const fn code_number(&self) -> u16 {
        match self {
            // Common (001-099)
            Self::MissingUpdateTypeProperty => 1,

            // Download (100-199)
            Self::DownloadWrongFileCount => 100,
            Self::DownloadBadFileEntity => 101,
            Self::DownloadCreateFailedUpdateVersion => 102,
            Self::DownloadCreateFailedUpdateType => 103,
            Self::DownloadCreateFailedUpdateSize => 104,
            Self::DownloadCreateFailedUpdateLocation => 105,
            Self::DownloadWrongUpdateVersion => 106,
            Self::DownloadUnknownUpdateVersion => 107,

            // Install (200-299)
            Self::InstallCannotOpenWorkFolder => 200,
            Self::InstallBadFileEntity => 201,
            Self::InstallFirmwareUpdate => 202,
            Self::InstallApplicationUpdate => 203,
            Self::InstallCommitUpdate => 204,

            // Apply (300-399)
            Self::ApplyUnknownError => 300,
            Self::ApplyUpdateSystemError => 301,

            // Cancel (400-499)
            Self::CancelRollbackFirmwareError => 400,
            Self::CancelNotAllowedStateError => 401,

            // IsInstalled (500-599)
            Self::IsInstalledUnknownState => 500,
            Self::IsInstalledCommitPreviousFailedUpdate => 501,
        }
    }

    /// Returns the formatted code string (e.g. "FSUP-E100").
    #[must_use]
    pub fn code_string(&self) -> String {
        format!("FSUP-E{:03}", self.code_number())
    }

    /// Returns the phase category this code belongs to.
    #[must_use]
    pub const fn category(&self) -> ErrorCategory {
        match self.code_number() {
            1..=99 => ErrorCategory::Common,
            100..=199 => ErrorCategory::Download,
            200..=299 => ErrorCategory::Install,
            300..=399 => ErrorCategory::Apply,
            400..=499 => ErrorCategory::Cancel,
            _ => ErrorCategory::IsInstalled,
        }
    }

    /// Returns the human-readable message.
    #[must_use]
    pub const fn message(&self) -> &'static str {
        match self {
            Self::MissingUpdateTypeProperty => {
                "The updateType handler property is missing or empty"
            }

            Self::DownloadWrongFileCount => "Update does not carry exactly one payload file",
            Self::DownloadBadFileEntity => "Payload file entity could not be read",
            Self::DownloadCreateFailedUpdateVersion => "Could not create the update_version stamp",
            Self::DownloadCreateFailedUpdateType => "Could not create the update_type stamp",
            Self::DownloadCreateFailedUpdateSize => "Could not create the update_size stamp",
            Self::DownloadCreateFailedUpdateLocation => {
                "Could not create the update_location stamp"
            }
            Self::DownloadWrongUpdateVersion => {
                "Update-type token carries an unsupported major version"
            }
            Self::DownloadUnknownUpdateVersion => "Update-type token could not be parsed",

            Self::InstallCannotOpenWorkFolder => "Work folder could not be opened",
            Self::InstallBadFileEntity => "Payload file entity could not be read",
            Self::InstallFirmwareUpdate => "Updater rejected the firmware install",
            Self::InstallApplicationUpdate => "Updater rejected the application install",
            Self::InstallCommitUpdate => "Commit after a failed install did not succeed",

            Self::ApplyUnknownError => "Unknown state while retrieving the update reboot state",
            Self::ApplyUpdateSystemError => "Updater reported a system error during commit",

            Self::CancelRollbackFirmwareError => "Rollback command did not report success",
            Self::CancelNotAllowedStateError => "Current state does not permit cancelling",

            Self::IsInstalledUnknownState => "Unknown state while checking installed versions",
            Self::IsInstalledCommitPreviousFailedUpdate => {
                "Commit of a previously failed update did not succeed"
            }
        }
    }

    /// Returns all catalog codes.
    #[must_use]
    pub const fn all() -> &'static [ExtendedCode] {
        &[
            Self::MissingUpdateTypeProperty,
            Self::DownloadWrongFileCount,
            Self::DownloadBadFileEntity,
            Self::DownloadCreateFailedUpdateVersion,
            Self::DownloadCreateFailedUpdateType,
            Self::DownloadCreateFailedUpdateSize,
            Self::DownloadCreateFailedUpdateLocation,
            Self::DownloadWrongUpdateVersion,
            Self::DownloadUnknownUpdateVersion,
            Self::InstallCannotOpenWorkFolder,
            Self::InstallBadFileEntity,
            Self::InstallFirmwareUpdate,
            Self::InstallApplicationUpdate,
            Self::InstallCommitUpdate,
            Self::ApplyUnknownError,
            Self::ApplyUpdateSystemError,
            Self::CancelRollbackFirmwareError,
            Self::CancelNotAllowedStateError,
            Self::IsInstalledUnknownState,
            Self::IsInstalledCommitPreviousFailedUpdate,
        ]
    }
}

impl fmt::Display for ExtendedCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code_string(), self.message())
    }
}

/// Phase category grouping related extended codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorCategory {
    /// Cross-phase input errors (E001-E099)
    Common,
    /// Download phase errors (E100-E199)
    Download,
    /// Install phase errors (E200-E299)
    Install,
    /// Apply phase errors (E300-E399)
    Apply,
    /// Cancel phase errors (E400-E499)
    Cancel,
    /// IsInstalled phase errors (E500-E599)
    IsInstalled,
}

impl ErrorCategory {
    /// Returns a human-readable name for the category.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Common => "Common",
            Self::Download => "Download",
            Self::Install => "Install",
            Self::Apply => "Apply",
            Self::Cancel => "Cancel",
            Self::IsInstalled => "IsInstalled",
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn code_numbers_are_unique() {
        let mut seen = std::collections::HashSet::new();
        for code in ExtendedCode::all() {
            let num = code.code_number();
            assert!(
                seen.insert(num),
                "Duplicate extended code number: {} for {:?}",
                num,
                code
            );
        }
    }

    #[test]
    fn code_format() {
        assert_eq!(
            ExtendedCode::MissingUpdateTypeProperty.code_string(),
            "FSUP-E001"
        );
        assert_eq!(
            ExtendedCode::DownloadWrongFileCount.code_string(),
            "FSUP-E100"
        );
        assert_eq!(
            ExtendedCode::InstallCannotOpenWorkFolder.code_string(),
            "FSUP-E200"
        );
        assert_eq!(ExtendedCode::ApplyUnknownError.code_string(), "FSUP-E300");
        assert_eq!(
            ExtendedCode::CancelRollbackFirmwareError.code_string(),
            "FSUP-E400"
        );
        assert_eq!(
            ExtendedCode::IsInstalledUnknownState.code_string(),
            "FSUP-E500"
        );
    }

    #[test]
    fn categories_follow_ranges() {
        assert_eq!(
            ExtendedCode::MissingUpdateTypeProperty.category(),
            ErrorCategory::Common
        );
        assert_eq!(
            ExtendedCode::DownloadBadFileEntity.category(),
            ErrorCategory::Download
        );
        assert_eq!(
            ExtendedCode::InstallCommitUpdate.category(),
            ErrorCategory::Install
        );
        assert_eq!(
            ExtendedCode::ApplyUpdateSystemError.category(),
            ErrorCategory::Apply
        );
        assert_eq!(
            ExtendedCode::CancelNotAllowedStateError.category(),
            ErrorCategory::Cancel
        );
        assert_eq!(
            ExtendedCode::IsInstalledCommitPreviousFailedUpdate.category(),
            ErrorCategory::IsInstalled
        );
    }

    #[test]
    fn messages_are_non_empty() {
        for code in ExtendedCode::all() {
            assert!(!code.message().is_empty(), "empty message for {:?}", code);
        }
    }
}
