//! Read-only adapter over the host agent's workflow handle.
//!
//! The handle is borrowed for the duration of one lifecycle call. The
//! handler never mutates it; the only write-side call is
//! [`Workflow::request_immediate_reboot`], issued by the orchestrator
//! when an apply or rollback needs the device to restart now.

use fsup_common::{ExtendedCode, FileEntity, Outcome, UpdateKind};
use std::path::PathBuf;
use tracing::error;

/// Name of the handler property carrying the update kind.
pub const UPDATE_TYPE_PROPERTY: &str = "updateType";

/// Read accessors the host agent provides for one workflow.
///
/// Implementations return owned copies; missing or empty required
/// fields are reported through the helpers below as documented fatal
/// outcomes rather than panics.
pub trait Workflow: Send + Sync {
    /// Opaque workflow identifier, for logging.
    fn id(&self) -> String;
    /// Folder the agent downloads payloads into.
    fn work_folder(&self) -> PathBuf;
    /// Target version this deployment declares.
    fn installed_criteria(&self) -> String;
    /// Raw `<provider>/<name>:<major>` update-type token.
    fn update_type_token(&self) -> String;
    /// A named handler property from the update manifest.
    fn handler_property(&self, name: &str) -> Option<String>;
    /// Number of payload files delivered with the update.
    fn file_count(&self) -> usize;
    /// The payload file at `index`, if present.
    fn file_entity(&self, index: usize) -> Option<FileEntity>;
    /// Declared update size in bytes.
    fn update_size(&self) -> u64;
    /// Asks the host agent to reboot the device immediately after the
    /// current operation returns.
    fn request_immediate_reboot(&self);
}

/// Fetches the update's single payload file.
///
/// Exactly one file entity per update is an input invariant; any
/// other count is fatal with the phase's wrong-count code, and an
/// unreadable entity is fatal with the phase's bad-entity code.
pub fn single_file_entity(
    workflow: &dyn Workflow,
    wrong_count: ExtendedCode,
    bad_entity: ExtendedCode,
) -> Result<FileEntity, Outcome> {
    let count = workflow.file_count();
    if count != 1 {
        error!(workflow = %workflow.id(), count, "expecting exactly one payload file");
        return Err(Outcome::failure(wrong_count));
    }
    match workflow.file_entity(0) {
        Some(entity) => Ok(entity),
        None => Err(Outcome::failure(bad_entity)),
    }
}

/// Reads the required `updateType` handler property and derives the
/// update kind from it. Absence (or an empty value) is fatal.
pub fn required_update_kind(workflow: &dyn Workflow) -> Result<UpdateKind, Outcome> {
    match workflow.handler_property(UPDATE_TYPE_PROPERTY) {
        Some(value) if !value.is_empty() => Ok(UpdateKind::from_property(&value)),
        _ => {
            error!(workflow = %workflow.id(), "updateType handler property is missing");
            Err(Outcome::failure(ExtendedCode::MissingUpdateTypeProperty))
        }
    }
}
