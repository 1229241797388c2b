//! Host-agent contract surface.
//!
//! The host loads the handler under the `fus/update:1` name, asks for
//! its contract version and then drives the [`StepHandler`] phases.
//! Import manifests must name `fus/update:1` as the handler, carry an
//! `updateType` handler property (`firmware`, `application`,
//! `common-firmware`, `common-application` or `common-both`) and an
//! `installedCriteria` version string.

use crate::handler::{ContentDownloader, StepHandler, UpdateStepHandler};
use crate::shell::AduShell;
use fsup_common::types::TOKEN_FUS_UPDATE;
use fsup_common::HandlerConfig;
use std::sync::Arc;
use tracing::info;

/// Contract version negotiated with the host agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContractInfo {
    pub major: u32,
    pub minor: u32,
}

/// Returns the v1.0 contract this handler implements.
#[must_use]
pub const fn contract_info() -> ContractInfo {
    ContractInfo { major: 1, minor: 0 }
}

/// Log severity the host hands over at creation time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    const fn filter(self) -> &'static str {
        match self {
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

/// Creates the step handler for `fus/update:1` deployments.
///
/// Logging is initialised once from the host-supplied level (the
/// `RUST_LOG` environment variable wins when set). Configuration is
/// the built-in device defaults with environment overrides applied.
/// The host supplies its content-download subsystem.
#[must_use]
pub fn create_step_handler(
    log_level: LogLevel,
    downloader: Arc<dyn ContentDownloader>,
) -> Box<dyn StepHandler> {
    init_logging(log_level);
    info!(handler = TOKEN_FUS_UPDATE, "instantiating step handler");

    let config = HandlerConfig::from_env();
    let gateway = Arc::new(AduShell::new(config.shell_path.clone()));
    Box::new(UpdateStepHandler::new(&config, gateway, downloader))
}

/// Creates the step handler from an explicit configuration. Used by
/// hosts that manage their own config file.
#[must_use]
pub fn create_step_handler_with_config(
    config: &HandlerConfig,
    downloader: Arc<dyn ContentDownloader>,
) -> Box<dyn StepHandler> {
    let gateway = Arc::new(AduShell::new(config.shell_path.clone()));
    Box::new(UpdateStepHandler::new(config, gateway, downloader))
}

fn init_logging(level: LogLevel) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level.filter()));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}
