//! Lifecycle orchestrator.
//!
//! One handler instance serves one update at a time; the host
//! dispatches phases serially, so all per-call state lives on the
//! stack. The only instance state besides configuration is the update
//! kind remembered from an IsInstalled verdict, which the following
//! Download stamps into the work directory for the controller.

use crate::cancel::CancelSignal;
use crate::interpret::{
    apply_step, cancel_entry, commit_after_rollback_outcome, commit_recovery_outcome,
    install_outcome, matched_version_step, rollback_accepted, rollback_step, stale_version_step,
    ApplyStep, CancelEntry, MatchedVersionStep, RollbackStep, StaleVersionStep,
};
use crate::rendezvous::{Sentinel, SentinelWait, Stamp, WorkDir};
use crate::shell::{
    query_version, ShellAction, ShellInvocation, UpdaterGateway, APPLICATION_VERSION_QUERY,
    COMMIT_UPDATE_EXEC, FIRMWARE_VERSION_QUERY, REBOOT_STATE_QUERY, TARGET_APP, TARGET_FW,
};
use crate::workflow::{required_update_kind, single_file_entity, Workflow};
use async_trait::async_trait;
use fsup_common::types::TOKEN_FUS_UPDATE;
use fsup_common::{
    CombinedState, ExtendedCode, HandlerConfig, FileEntity, Outcome, ResultCode, UpdateKind,
    UpdateTypeToken,
};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, error, info};

/// The content-download subsystem the host provides.
#[async_trait]
pub trait ContentDownloader: Send + Sync {
    /// Fetches the payload into the work folder and reports the
    /// download outcome.
    async fn download(&self, entity: &FileEntity, work_folder: &Path) -> Outcome;
}

/// Lifecycle operations the host agent drives, in its dispatch order.
///
/// Every operation returns exactly one [`Outcome`]; failures never
/// cross this boundary as panics or `Err`.
#[async_trait]
pub trait StepHandler: Send {
    async fn download(&mut self, workflow: &dyn Workflow, cancel: &CancelSignal) -> Outcome;
    async fn backup(&mut self, workflow: &dyn Workflow, cancel: &CancelSignal) -> Outcome;
    async fn install(&mut self, workflow: &dyn Workflow, cancel: &CancelSignal) -> Outcome;
    async fn apply(&mut self, workflow: &dyn Workflow, cancel: &CancelSignal) -> Outcome;
    async fn cancel(&mut self, workflow: &dyn Workflow, cancel: &CancelSignal) -> Outcome;
    async fn restore(&mut self, workflow: &dyn Workflow, cancel: &CancelSignal) -> Outcome;
    async fn is_installed(&mut self, workflow: &dyn Workflow, cancel: &CancelSignal) -> Outcome;
}

/// Inner phase flows return early with the failing outcome.
type Step<T> = Result<T, Outcome>;

/// The unified step handler for `fus/update:1` deployments.
pub struct UpdateStepHandler {
    work_dir: WorkDir,
    gateway: Arc<dyn UpdaterGateway>,
    downloader: Arc<dyn ContentDownloader>,
    /// Kind recorded by the last IsInstalled verdict; the next
    /// Download stamps it for the controller.
    cached_kind: Option<UpdateKind>,
}

impl UpdateStepHandler {
    #[must_use]
    pub fn new(
        config: &HandlerConfig,
        gateway: Arc<dyn UpdaterGateway>,
        downloader: Arc<dyn ContentDownloader>,
    ) -> Self {
        Self {
            work_dir: WorkDir::new(config),
            gateway,
            downloader,
            cached_kind: None,
        }
    }

    /// Runs a wrapper invocation and reduces it to an exit code; a
    /// wrapper that could not run at all reads as -1, which no
    /// decision table classifies as success.
    async fn run_code(&self, invocation: ShellInvocation) -> i32 {
        match self.gateway.run(&invocation).await {
            Ok(exit) => exit.code,
            Err(e) => {
                error!(error = %e, "updater shell invocation failed");
                -1
            }
        }
    }

    /// Forwards one target option through the `execute` action.
    async fn exec_code(&self, option: &str) -> i32 {
        let invocation =
            ShellInvocation::new(TOKEN_FUS_UPDATE, ShellAction::Execute).target_option(option);
        self.run_code(invocation).await
    }

    async fn reboot_state_code(&self) -> i32 {
        self.exec_code(REBOOT_STATE_QUERY).await
    }

    /// Blocks until the controller arms the phase, or the host
    /// cancels.
    async fn gate(&self, sentinel: Sentinel, cancel: &CancelSignal) -> Step<()> {
        match self.work_dir.wait_sentinel(sentinel, cancel).await {
            SentinelWait::Signalled => Ok(()),
            SentinelWait::Cancelled => Err(Outcome::cancelled()),
        }
    }

    async fn publish(&self, stamp: Stamp, content: &str) -> Step<()> {
        self.work_dir.write_stamp(stamp, content).await.map_err(|e| {
            error!(stamp = stamp.file_name(), error = %e, "could not create stamp");
            Outcome::failure(stamp.create_failed_code())
        })
    }

    async fn download_flow(&mut self, workflow: &dyn Workflow, cancel: &CancelSignal) -> Step<Outcome> {
        let raw_token = workflow.update_type_token();
        let token = UpdateTypeToken::parse(&raw_token).map_err(|e| {
            error!(token = %raw_token, error = %e, "unparsable update-type token");
            Outcome::failure(ExtendedCode::DownloadUnknownUpdateVersion)
        })?;
        if token.major != 1 {
            error!(major = token.major, "unsupported update-type major version");
            return Err(Outcome::failure(ExtendedCode::DownloadWrongUpdateVersion));
        }

        let entity = single_file_entity(
            workflow,
            ExtendedCode::DownloadWrongFileCount,
            ExtendedCode::DownloadBadFileEntity,
        )?;
        let work_folder = workflow.work_folder();
        let artifact = work_folder.join(&entity.target_filename);

        self.work_dir.reset().await;
        self.publish(Stamp::UpdateVersion, &workflow.installed_criteria())
            .await?;
        let kind = self.cached_kind.unwrap_or(UpdateKind::Unknown);
        self.publish(Stamp::UpdateType, kind.canonical_name()).await?;
        self.publish(Stamp::UpdateSize, &workflow.update_size().to_string())
            .await?;

        self.gate(Sentinel::Download, cancel).await?;

        self.publish(Stamp::UpdateLocation, &artifact.display().to_string())
            .await?;

        info!(artifact = %artifact.display(), "starting payload download");
        let outcome = self.downloader.download(&entity, &work_folder).await;
        info!(result = %outcome, "download finished");
        Ok(outcome)
    }

    async fn install_flow(&mut self, workflow: &dyn Workflow, cancel: &CancelSignal) -> Step<Outcome> {
        let kind = required_update_kind(workflow)?;

        let work_folder = workflow.work_folder();
        info!(folder = %work_folder.display(), "installing from work folder");
        if let Err(e) = tokio::fs::read_dir(&work_folder).await {
            error!(folder = %work_folder.display(), error = %e, "cannot open work folder");
            return Err(Outcome::failure(ExtendedCode::InstallCannotOpenWorkFolder));
        }

        let entity = workflow
            .file_entity(0)
            .ok_or_else(|| Outcome::failure(ExtendedCode::InstallBadFileEntity))?;

        self.gate(Sentinel::Install, cancel).await?;

        let artifact = work_folder.join(&entity.target_filename);
        debug!(image = %artifact.display(), %kind, "install update image");
        let mut invocation =
            ShellInvocation::new(TOKEN_FUS_UPDATE, ShellAction::Install).target_data(artifact);
        match kind {
            UpdateKind::Application => invocation = invocation.target_option(TARGET_APP),
            UpdateKind::Firmware => invocation = invocation.target_option(TARGET_FW),
            _ => {}
        }

        let code = self.run_code(invocation).await;
        let outcome = install_outcome(kind, code);
        if outcome.is_failure() {
            error!(code, %kind, "install failed");
        } else {
            debug!("install succeeded");
        }
        Ok(outcome)
    }

    async fn apply_flow(&mut self, workflow: &dyn Workflow, cancel: &CancelSignal) -> Step<Outcome> {
        let code = self.reboot_state_code().await;
        match apply_step(code) {
            ApplyStep::AwaitReboot => {
                debug!("update reboot pending; waiting for apply permission");
                self.gate(Sentinel::Apply, cancel).await?;
                workflow.request_immediate_reboot();
                Ok(Outcome::ok(ResultCode::ApplyRequiredImmediateReboot))
            }
            ApplyStep::AwaitCommit => {
                debug!(code, "incomplete update; controller drives the commit");
                self.gate(Sentinel::Apply, cancel).await?;
                Ok(Outcome::failure_raw(code))
            }
            ApplyStep::Done => {
                debug!("update is installed");
                Ok(Outcome::ok(ResultCode::ApplySuccess))
            }
            ApplyStep::NotNeeded => {
                debug!("apply not needed");
                Ok(Outcome::ok(ResultCode::ApplySuccess))
            }
            ApplyStep::Unknown => {
                error!(code, "unknown state while retrieving update reboot state");
                Ok(Outcome::failure(ExtendedCode::ApplyUnknownError))
            }
        }
    }

    async fn cancel_flow(&mut self, workflow: &dyn Workflow) -> Outcome {
        let code = self.reboot_state_code().await;
        match cancel_entry(code) {
            CancelEntry::RollbackApplication => {
                info!("incomplete application update; proceeding with rollback");
                let rollback_code = self
                    .run_code(ShellInvocation::new(TOKEN_FUS_UPDATE, ShellAction::Cancel))
                    .await;
                if !rollback_accepted(rollback_code) {
                    error!(code = rollback_code, "rollback failed");
                    return Outcome::failure(ExtendedCode::CancelRollbackFirmwareError);
                }
                let followup = self.reboot_state_code().await;
                match rollback_step(followup) {
                    RollbackStep::AwaitReboot => {
                        info!("firmware rollback needs a reboot to complete");
                        workflow.request_immediate_reboot();
                        Outcome::ok(ResultCode::CancelRequiredImmediateReboot)
                    }
                    RollbackStep::Complete => {
                        info!("firmware rollback complete");
                        Outcome::ok(ResultCode::CancelSuccess)
                    }
                    RollbackStep::NotAllowed => {
                        error!(code = followup, "no permitted rollback state");
                        Outcome::failure(ExtendedCode::CancelNotAllowedStateError)
                    }
                }
            }
            CancelEntry::CommitRollback => {
                info!("firmware rollback already rebooted; committing it");
                let commit_code = self.exec_code(COMMIT_UPDATE_EXEC).await;
                commit_after_rollback_outcome(commit_code)
            }
            CancelEntry::NothingToCancel => {
                info!("nothing to cancel; update already installed");
                Outcome::cancelled()
            }
            CancelEntry::NotAllowed => {
                error!(code, "unknown state while retrieving update state");
                Outcome::failure(ExtendedCode::CancelNotAllowedStateError)
            }
        }
    }

    async fn is_installed_flow(&mut self, workflow: &dyn Workflow) -> Step<Outcome> {
        let kind = required_update_kind(workflow)?;
        if kind == UpdateKind::Unknown {
            error!("unrecognised updateType property value");
            return Err(Outcome::failure_raw(CombinedState::InternalError.code()));
        }
        let criteria = workflow.installed_criteria();
        let option = if kind.is_application_side() {
            APPLICATION_VERSION_QUERY
        } else {
            FIRMWARE_VERSION_QUERY
        };

        let version = query_version(self.gateway.as_ref(), TOKEN_FUS_UPDATE, option).await?;
        info!(%kind, %version, %criteria, "comparing installed version");

        if version == criteria {
            let code = self.reboot_state_code().await;
            match matched_version_step(code) {
                MatchedVersionStep::MissingCommit => {
                    info!("version matches but a commit is still owed");
                    return Ok(Outcome::ok(ResultCode::IsInstalledMissingCommit));
                }
                MatchedVersionStep::Installed => {
                    info!(%kind, %criteria, "update already installed");
                    if kind != UpdateKind::CommonBoth {
                        return Ok(Outcome::ok(ResultCode::IsInstalledInstalled));
                    }
                    // Common-both also checks the application side
                    // before the verdict stands.
                }
                MatchedVersionStep::Unknown => {
                    error!(code, "unknown state while checking matching version");
                    return Err(Outcome::failure(ExtendedCode::IsInstalledUnknownState));
                }
            }
        }

        let mut current = version;
        if kind == UpdateKind::CommonBoth {
            let app_version =
                query_version(self.gateway.as_ref(), TOKEN_FUS_UPDATE, APPLICATION_VERSION_QUERY)
                    .await?;
            if app_version == criteria {
                let code = self.reboot_state_code().await;
                return match matched_version_step(code) {
                    MatchedVersionStep::MissingCommit => {
                        info!("application version matches but a commit is still owed");
                        Ok(Outcome::ok(ResultCode::IsInstalledMissingCommit))
                    }
                    MatchedVersionStep::Installed => {
                        info!(%criteria, "application update already installed");
                        Ok(Outcome::ok(ResultCode::IsInstalledInstalled))
                    }
                    MatchedVersionStep::Unknown => {
                        error!(code, "unknown state while checking application version");
                        Err(Outcome::failure(ExtendedCode::IsInstalledUnknownState))
                    }
                };
            }
            current = app_version;
        }

        let code = self.reboot_state_code().await;
        match stale_version_step(code) {
            StaleVersionStep::CommitFailedApplication | StaleVersionStep::CommitFailedFirmware => {
                info!("previous update failed; committing it away");
                let commit_code = self.exec_code(COMMIT_UPDATE_EXEC).await;
                Ok(commit_recovery_outcome(commit_code))
            }
            StaleVersionStep::RebootFailedInstalled => {
                info!("update reboot failed; current slot counts as installed");
                Ok(Outcome::ok(ResultCode::IsInstalledInstalled))
            }
            StaleVersionStep::NotInstalled => {
                info!(%criteria, %current, "installed criteria not satisfied");
                self.cached_kind = Some(kind);
                Ok(Outcome::ok(ResultCode::IsInstalledNotInstalled))
            }
        }
    }
}

#[async_trait]
impl StepHandler for UpdateStepHandler {
    async fn download(&mut self, workflow: &dyn Workflow, cancel: &CancelSignal) -> Outcome {
        let outcome = self
            .download_flow(workflow, cancel)
            .await
            .unwrap_or_else(|o| o);
        if outcome.result == ResultCode::FailureCancelled {
            self.work_dir.write_error_state(&outcome).await;
        }
        outcome
    }

    async fn backup(&mut self, _workflow: &dyn Workflow, _cancel: &CancelSignal) -> Outcome {
        info!("backup is not required for A/B updates (no-op)");
        Outcome::ok(ResultCode::BackupSuccess)
    }

    async fn install(&mut self, workflow: &dyn Workflow, cancel: &CancelSignal) -> Outcome {
        let outcome = self
            .install_flow(workflow, cancel)
            .await
            .unwrap_or_else(|o| o);
        if outcome.result != ResultCode::InstallSuccess {
            // Let the controller re-arm a failed install.
            self.work_dir.remove_sentinel(Sentinel::Install).await;
        }
        self.work_dir.write_error_state(&outcome).await;
        outcome
    }

    async fn apply(&mut self, workflow: &dyn Workflow, cancel: &CancelSignal) -> Outcome {
        let outcome = self.apply_flow(workflow, cancel).await.unwrap_or_else(|o| o);
        if outcome.result == ResultCode::FailureCancelled {
            self.work_dir.write_error_state(&outcome).await;
        }
        outcome
    }

    async fn cancel(&mut self, workflow: &dyn Workflow, _cancel: &CancelSignal) -> Outcome {
        self.cancel_flow(workflow).await
    }

    async fn restore(&mut self, _workflow: &dyn Workflow, _cancel: &CancelSignal) -> Outcome {
        info!("backup & restore are not supported (no-op)");
        Outcome::ok(ResultCode::RestoreSuccessUnsupported)
    }

    async fn is_installed(&mut self, workflow: &dyn Workflow, _cancel: &CancelSignal) -> Outcome {
        self.is_installed_flow(workflow).await.unwrap_or_else(|o| o)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shell::ShellExit;
    use crate::testing::{RecordingDownloader, ScriptedGateway, StaticWorkflow};
    use crate::workflow::UPDATE_TYPE_PROPERTY;
    use fsup_common::{CommitState, RebootState, RollbackState};

    fn exit(code: i32) -> ShellExit {
        ShellExit {
            code,
            stdout: String::new(),
        }
    }

    fn version_exit(option: &str, version: &str) -> ShellExit {
        ShellExit {
            code: 0,
            stdout: format!("adu-shell output {} {} trailing", option, version),
        }
    }

    struct Fixture {
        handler: UpdateStepHandler,
        gateway: Arc<ScriptedGateway>,
        _temp: tempfile::TempDir,
    }

    fn fixture() -> Fixture {
        let temp = tempfile::tempdir().unwrap();
        let config = HandlerConfig {
            work_dir: temp.path().join(".work"),
            poll_interval_ms: 10,
            ..HandlerConfig::default()
        };
        let gateway = Arc::new(ScriptedGateway::new());
        let downloader = Arc::new(RecordingDownloader::succeeding());
        let handler = UpdateStepHandler::new(&config, gateway.clone(), downloader);
        Fixture {
            handler,
            gateway,
            _temp: temp,
        }
    }

    #[tokio::test]
    async fn apply_success_when_nothing_pending() {
        let mut fx = fixture();
        fx.gateway
            .push(exit(RebootState::NoUpdateRebootPending.code()));

        let workflow = StaticWorkflow::new("1.0.0");
        let outcome = fx
            .handler
            .apply(&workflow, &CancelSignal::never())
            .await;
        assert_eq!(outcome, Outcome::ok(ResultCode::ApplySuccess));
    }

    #[tokio::test]
    async fn apply_success_when_commit_not_needed() {
        let mut fx = fixture();
        fx.gateway.push(exit(CommitState::UpdateNotNeeded.code()));

        let workflow = StaticWorkflow::new("1.0.0");
        let outcome = fx
            .handler
            .apply(&workflow, &CancelSignal::never())
            .await;
        assert_eq!(outcome, Outcome::ok(ResultCode::ApplySuccess));
    }

    #[tokio::test]
    async fn apply_unknown_state_fails() {
        let mut fx = fixture();
        fx.gateway.push(exit(RebootState::FailedAppUpdate.code()));

        let workflow = StaticWorkflow::new("1.0.0");
        let outcome = fx
            .handler
            .apply(&workflow, &CancelSignal::never())
            .await;
        assert_eq!(
            outcome,
            Outcome::failure(ExtendedCode::ApplyUnknownError)
        );
    }

    #[tokio::test]
    async fn apply_incomplete_update_waits_and_hands_back_probe_outcome() {
        let mut fx = fixture();
        let code = RebootState::IncompleteFwUpdate.code();
        fx.gateway.push(exit(code));

        // Arm the sentinel up front so the wait returns immediately.
        std::fs::create_dir_all(fx._temp.path().join(".work")).unwrap();
        std::fs::write(fx._temp.path().join(".work/applyUpdate"), "").unwrap();

        let workflow = StaticWorkflow::new("1.0.0");
        let outcome = fx
            .handler
            .apply(&workflow, &CancelSignal::never())
            .await;
        assert_eq!(outcome, Outcome::failure_raw(code));
        assert_eq!(workflow.reboot_requests(), 0);
    }

    #[tokio::test]
    async fn cancel_rolls_back_incomplete_application_update() {
        // S2: rollback succeeds and the follow-up probe demands a
        // firmware reboot.
        let mut fx = fixture();
        fx.gateway.push(exit(RebootState::IncompleteAppUpdate.code()));
        fx.gateway
            .push(exit(RollbackState::UpdateRollbackSuccessful.code()));
        fx.gateway
            .push(exit(RebootState::RollbackFwRebootPending.code()));

        let workflow = StaticWorkflow::new("1.0.0");
        let outcome = fx
            .handler
            .cancel(&workflow, &CancelSignal::never())
            .await;
        assert_eq!(
            outcome,
            Outcome::ok(ResultCode::CancelRequiredImmediateReboot)
        );
        assert_eq!(workflow.reboot_requests(), 1);

        let runs = fx.gateway.invocations();
        assert_eq!(runs.len(), 3);
        assert_eq!(runs[1].action(), ShellAction::Cancel);
    }

    #[tokio::test]
    async fn cancel_completes_without_reboot_when_state_settles() {
        let mut fx = fixture();
        fx.gateway.push(exit(RebootState::IncompleteAppUpdate.code()));
        fx.gateway
            .push(exit(RollbackState::UpdateRollbackSuccessful.code()));
        fx.gateway
            .push(exit(RebootState::NoUpdateRebootPending.code()));

        let workflow = StaticWorkflow::new("1.0.0");
        let outcome = fx
            .handler
            .cancel(&workflow, &CancelSignal::never())
            .await;
        assert_eq!(outcome, Outcome::ok(ResultCode::CancelSuccess));
        assert_eq!(workflow.reboot_requests(), 0);
    }

    #[tokio::test]
    async fn cancel_reports_failed_rollback() {
        let mut fx = fixture();
        fx.gateway.push(exit(RebootState::IncompleteAppUpdate.code()));
        fx.gateway.push(exit(5));

        let workflow = StaticWorkflow::new("1.0.0");
        let outcome = fx
            .handler
            .cancel(&workflow, &CancelSignal::never())
            .await;
        assert_eq!(
            outcome,
            Outcome::failure(ExtendedCode::CancelRollbackFirmwareError)
        );
    }

    #[tokio::test]
    async fn cancel_commits_a_rebooted_rollback() {
        let mut fx = fixture();
        fx.gateway
            .push(exit(RebootState::RollbackFwRebootPending.code()));
        fx.gateway
            .push(exit(RebootState::NoUpdateRebootPending.code()));

        let workflow = StaticWorkflow::new("1.0.0");
        let outcome = fx
            .handler
            .cancel(&workflow, &CancelSignal::never())
            .await;
        assert_eq!(outcome, Outcome::ok(ResultCode::CancelSuccess));
    }

    #[tokio::test]
    async fn cancel_commit_anomaly_still_succeeds_with_code() {
        let mut fx = fixture();
        fx.gateway
            .push(exit(RebootState::RollbackFwRebootPending.code()));
        fx.gateway.push(exit(RebootState::FailedFwUpdate.code()));

        let workflow = StaticWorkflow::new("1.0.0");
        let outcome = fx
            .handler
            .cancel(&workflow, &CancelSignal::never())
            .await;
        assert_eq!(outcome.result, ResultCode::CancelSuccess);
        assert_eq!(
            outcome.extended,
            ExtendedCode::CancelNotAllowedStateError.code_number() as i32
        );
    }

    #[tokio::test]
    async fn cancel_with_nothing_pending_is_failure_cancelled() {
        let mut fx = fixture();
        fx.gateway
            .push(exit(RebootState::NoUpdateRebootPending.code()));

        let workflow = StaticWorkflow::new("1.0.0");
        let outcome = fx
            .handler
            .cancel(&workflow, &CancelSignal::never())
            .await;
        assert_eq!(outcome, Outcome::cancelled());
    }

    #[tokio::test]
    async fn is_installed_matching_version_and_quiescent_state() {
        let mut fx = fixture();
        fx.gateway
            .push(version_exit(FIRMWARE_VERSION_QUERY, "1.2.3"));
        fx.gateway
            .push(exit(RebootState::NoUpdateRebootPending.code()));

        let workflow = StaticWorkflow::new("1.2.3")
            .with_property(UPDATE_TYPE_PROPERTY, "firmware");
        let outcome = fx
            .handler
            .is_installed(&workflow, &CancelSignal::never())
            .await;
        assert_eq!(outcome, Outcome::ok(ResultCode::IsInstalledInstalled));
    }

    #[tokio::test]
    async fn is_installed_matching_version_incomplete_firmware_is_missing_commit() {
        // S3.
        let mut fx = fixture();
        fx.gateway
            .push(version_exit(FIRMWARE_VERSION_QUERY, "1.2.3"));
        fx.gateway.push(exit(RebootState::IncompleteFwUpdate.code()));

        let workflow = StaticWorkflow::new("1.2.3")
            .with_property(UPDATE_TYPE_PROPERTY, "firmware");
        let outcome = fx
            .handler
            .is_installed(&workflow, &CancelSignal::never())
            .await;
        assert_eq!(outcome, Outcome::ok(ResultCode::IsInstalledMissingCommit));
    }

    #[tokio::test]
    async fn is_installed_application_kind_queries_application_version() {
        let mut fx = fixture();
        fx.gateway
            .push(version_exit(APPLICATION_VERSION_QUERY, "2.0.0"));
        fx.gateway
            .push(exit(RebootState::NoUpdateRebootPending.code()));

        let workflow = StaticWorkflow::new("2.0.0")
            .with_property(UPDATE_TYPE_PROPERTY, "application");
        let outcome = fx
            .handler
            .is_installed(&workflow, &CancelSignal::never())
            .await;
        assert_eq!(outcome, Outcome::ok(ResultCode::IsInstalledInstalled));

        let runs = fx.gateway.invocations();
        assert!(runs[0]
            .to_args()
            .contains(&APPLICATION_VERSION_QUERY.to_string()));
    }

    #[tokio::test]
    async fn is_installed_common_both_checks_both_sides() {
        // S5: firmware side matches and is quiescent, application
        // side differs; the stale probe settles on NotInstalled.
        let mut fx = fixture();
        fx.gateway
            .push(version_exit(FIRMWARE_VERSION_QUERY, "1.2.3"));
        fx.gateway
            .push(exit(RebootState::NoUpdateRebootPending.code()));
        fx.gateway
            .push(version_exit(APPLICATION_VERSION_QUERY, "0.9.0"));
        fx.gateway
            .push(exit(RebootState::NoUpdateRebootPending.code()));

        let workflow = StaticWorkflow::new("1.2.3")
            .with_property(UPDATE_TYPE_PROPERTY, "common-both");
        let outcome = fx
            .handler
            .is_installed(&workflow, &CancelSignal::never())
            .await;
        assert_eq!(outcome, Outcome::ok(ResultCode::IsInstalledNotInstalled));
        assert_eq!(fx.gateway.invocations().len(), 4);
    }

    #[tokio::test]
    async fn is_installed_common_both_fully_installed() {
        let mut fx = fixture();
        fx.gateway
            .push(version_exit(FIRMWARE_VERSION_QUERY, "1.2.3"));
        fx.gateway
            .push(exit(RebootState::NoUpdateRebootPending.code()));
        fx.gateway
            .push(version_exit(APPLICATION_VERSION_QUERY, "1.2.3"));
        fx.gateway
            .push(exit(RebootState::NoUpdateRebootPending.code()));

        let workflow = StaticWorkflow::new("1.2.3")
            .with_property(UPDATE_TYPE_PROPERTY, "common-both");
        let outcome = fx
            .handler
            .is_installed(&workflow, &CancelSignal::never())
            .await;
        assert_eq!(outcome, Outcome::ok(ResultCode::IsInstalledInstalled));
    }

    #[tokio::test]
    async fn is_installed_commits_away_a_failed_update() {
        let mut fx = fixture();
        fx.gateway
            .push(version_exit(FIRMWARE_VERSION_QUERY, "0.9.0"));
        fx.gateway.push(exit(RebootState::FailedFwUpdate.code()));
        fx.gateway
            .push(exit(CommitState::UpdateCommitSuccessful.code()));

        let workflow = StaticWorkflow::new("1.2.3")
            .with_property(UPDATE_TYPE_PROPERTY, "firmware");
        let outcome = fx
            .handler
            .is_installed(&workflow, &CancelSignal::never())
            .await;
        assert_eq!(outcome, Outcome::ok(ResultCode::IsInstalledInstalled));

        let runs = fx.gateway.invocations();
        assert!(runs[2].to_args().contains(&COMMIT_UPDATE_EXEC.to_string()));
    }

    #[tokio::test]
    async fn is_installed_failed_commit_recovery_is_reported() {
        let mut fx = fixture();
        fx.gateway
            .push(version_exit(FIRMWARE_VERSION_QUERY, "0.9.0"));
        fx.gateway.push(exit(RebootState::FailedAppUpdate.code()));
        fx.gateway.push(exit(CommitState::UpdateSystemError.code()));

        let workflow = StaticWorkflow::new("1.2.3")
            .with_property(UPDATE_TYPE_PROPERTY, "firmware");
        let outcome = fx
            .handler
            .is_installed(&workflow, &CancelSignal::never())
            .await;
        assert_eq!(
            outcome,
            Outcome::failure(ExtendedCode::IsInstalledCommitPreviousFailedUpdate)
        );
    }

    #[tokio::test]
    async fn is_installed_not_installed_caches_the_kind_for_download() {
        let mut fx = fixture();
        fx.gateway
            .push(version_exit(FIRMWARE_VERSION_QUERY, "0.9.0"));
        fx.gateway
            .push(exit(RebootState::NoUpdateRebootPending.code()));

        let workflow = StaticWorkflow::new("1.2.3")
            .with_property(UPDATE_TYPE_PROPERTY, "common-firmware");
        let outcome = fx
            .handler
            .is_installed(&workflow, &CancelSignal::never())
            .await;
        assert_eq!(outcome, Outcome::ok(ResultCode::IsInstalledNotInstalled));
        assert_eq!(fx.handler.cached_kind, Some(UpdateKind::CommonFirmware));
    }

    #[tokio::test]
    async fn is_installed_unknown_kind_is_an_internal_error() {
        let mut fx = fixture();
        let workflow = StaticWorkflow::new("1.2.3")
            .with_property(UPDATE_TYPE_PROPERTY, "rootfs");
        let outcome = fx
            .handler
            .is_installed(&workflow, &CancelSignal::never())
            .await;
        assert_eq!(
            outcome,
            Outcome::failure_raw(CombinedState::InternalError.code())
        );
        assert!(fx.gateway.invocations().is_empty());
    }

    #[tokio::test]
    async fn is_installed_reboot_failed_counts_as_installed() {
        let mut fx = fixture();
        fx.gateway
            .push(version_exit(FIRMWARE_VERSION_QUERY, "0.9.0"));
        fx.gateway
            .push(exit(RebootState::FwUpdateRebootFailed.code()));

        let workflow = StaticWorkflow::new("1.2.3")
            .with_property(UPDATE_TYPE_PROPERTY, "firmware");
        let outcome = fx
            .handler
            .is_installed(&workflow, &CancelSignal::never())
            .await;
        assert_eq!(outcome, Outcome::ok(ResultCode::IsInstalledInstalled));
    }

    #[tokio::test]
    async fn backup_and_restore_are_no_ops() {
        let mut fx = fixture();
        let workflow = StaticWorkflow::new("1.0.0");
        assert_eq!(
            fx.handler.backup(&workflow, &CancelSignal::never()).await,
            Outcome::ok(ResultCode::BackupSuccess)
        );
        assert_eq!(
            fx.handler.restore(&workflow, &CancelSignal::never()).await,
            Outcome::ok(ResultCode::RestoreSuccessUnsupported)
        );
        assert!(fx.gateway.invocations().is_empty());
    }
}
