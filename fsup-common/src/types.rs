//! Common types used across fsup components.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Update-type tokens understood by the privileged shell wrapper.
pub const TOKEN_FUS_UPDATE: &str = "fus/update:1";
pub const TOKEN_FUS_FIRMWARE: &str = "fus/firmware:1";
pub const TOKEN_FUS_APPLICATION: &str = "fus/application:1";

/// Kind of update a deployment targets, as declared by the
/// `updateType` handler property.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum UpdateKind {
    /// Raw single firmware update.
    Firmware,
    /// Raw single application update.
    Application,
    /// Common firmware update.
    CommonFirmware,
    /// Common application update.
    CommonApplication,
    /// Common application and firmware update.
    CommonBoth,
    /// Property value was not recognised.
    Unknown,
}

impl UpdateKind {
    /// Parses the `updateType` handler-property value.
    ///
    /// Unrecognised values map to [`UpdateKind::Unknown`]; the caller
    /// decides whether that is fatal for its phase.
    #[must_use]
    pub fn from_property(value: &str) -> Self {
        match value {
            "firmware" => Self::Firmware,
            "application" => Self::Application,
            "common-firmware" => Self::CommonFirmware,
            "common-application" => Self::CommonApplication,
            "common-both" => Self::CommonBoth,
            _ => Self::Unknown,
        }
    }

    /// Canonical name, as stamped into the work directory for the
    /// out-of-band controller.
    #[must_use]
    pub const fn canonical_name(&self) -> &'static str {
        match self {
            Self::Firmware => "firmware",
            Self::Application => "application",
            Self::CommonFirmware => "common-firmware",
            Self::CommonApplication => "common-application",
            Self::CommonBoth => "common-both",
            Self::Unknown => "unknown",
        }
    }

    /// True for the kinds whose payload ends up in the firmware slot.
    #[must_use]
    pub const fn is_firmware_side(&self) -> bool {
        matches!(self, Self::Firmware | Self::CommonFirmware)
    }

    /// True for the kinds whose payload ends up in the application slot.
    #[must_use]
    pub const fn is_application_side(&self) -> bool {
        matches!(self, Self::Application | Self::CommonApplication)
    }
}

impl std::fmt::Display for UpdateKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.canonical_name())
    }
}

/// Error from parsing an update-type token.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TokenError {
    #[error("update-type token has no ':<major>' suffix: {0:?}")]
    MissingVersion(String),
    #[error("update-type token major version is not numeric: {0:?}")]
    BadVersion(String),
}

/// A parsed `<provider>/<name>:<major>` update-type token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateTypeToken {
    /// Everything before the `:<major>` suffix, e.g. `fus/update`.
    pub name: String,
    /// Handler major version carried by the token.
    pub major: u32,
}

impl UpdateTypeToken {
    /// Parses a raw token string.
    pub fn parse(raw: &str) -> Result<Self, TokenError> {
        let (name, version) = raw
            .rsplit_once(':')
            .ok_or_else(|| TokenError::MissingVersion(raw.to_string()))?;
        let major = version
            .parse::<u32>()
            .map_err(|_| TokenError::BadVersion(raw.to_string()))?;
        Ok(Self {
            name: name.to_string(),
            major,
        })
    }
}

impl std::fmt::Display for UpdateTypeToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.name, self.major)
    }
}

/// A single payload file delivered with an update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileEntity {
    /// Filename the agent downloads the payload under, relative to
    /// the workflow's work folder.
    pub target_filename: String,
}

impl FileEntity {
    pub fn new(target_filename: impl Into<String>) -> Self {
        Self {
            target_filename: target_filename.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn update_kind_from_property_names() {
        assert_eq!(UpdateKind::from_property("firmware"), UpdateKind::Firmware);
        assert_eq!(
            UpdateKind::from_property("application"),
            UpdateKind::Application
        );
        assert_eq!(
            UpdateKind::from_property("common-firmware"),
            UpdateKind::CommonFirmware
        );
        assert_eq!(
            UpdateKind::from_property("common-application"),
            UpdateKind::CommonApplication
        );
        assert_eq!(
            UpdateKind::from_property("common-both"),
            UpdateKind::CommonBoth
        );
        assert_eq!(UpdateKind::from_property("rootfs"), UpdateKind::Unknown);
        assert_eq!(UpdateKind::from_property(""), UpdateKind::Unknown);
    }

    #[test]
    fn update_kind_round_trips_through_canonical_name() {
        for kind in [
            UpdateKind::Firmware,
            UpdateKind::Application,
            UpdateKind::CommonFirmware,
            UpdateKind::CommonApplication,
            UpdateKind::CommonBoth,
        ] {
            assert_eq!(UpdateKind::from_property(kind.canonical_name()), kind);
        }
    }

    #[test]
    fn update_kind_sides() {
        assert!(UpdateKind::Firmware.is_firmware_side());
        assert!(UpdateKind::CommonFirmware.is_firmware_side());
        assert!(!UpdateKind::CommonBoth.is_firmware_side());
        assert!(UpdateKind::Application.is_application_side());
        assert!(UpdateKind::CommonApplication.is_application_side());
        assert!(!UpdateKind::Unknown.is_application_side());
    }

    #[test]
    fn token_parse_valid() {
        let token = UpdateTypeToken::parse("fus/update:1").unwrap();
        assert_eq!(token.name, "fus/update");
        assert_eq!(token.major, 1);
        assert_eq!(token.to_string(), "fus/update:1");
    }

    #[test]
    fn token_parse_rejects_missing_version() {
        assert!(matches!(
            UpdateTypeToken::parse("fus/update"),
            Err(TokenError::MissingVersion(_))
        ));
    }

    #[test]
    fn token_parse_rejects_non_numeric_version() {
        assert!(matches!(
            UpdateTypeToken::parse("fus/update:one"),
            Err(TokenError::BadVersion(_))
        ));
    }

    #[test]
    fn token_parse_keeps_later_majors() {
        let token = UpdateTypeToken::parse("fus/firmware:2").unwrap();
        assert_eq!(token.major, 2);
    }
}
