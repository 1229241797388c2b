//! Step handler for the fsup A/B firmware-and-application updater.
//!
//! The handler plugs into a host update agent that sequences the
//! lifecycle of one update at a time: Download, Backup, Install,
//! Apply, Cancel, Restore and IsInstalled. It coordinates three
//! independent actors:
//!
//! * the host agent, which owns the workflow handle and the file
//!   transport;
//! * the privileged updater CLI, reached through a setuid shell
//!   wrapper whose exit code is the sole result channel;
//! * an out-of-band controller that gates each transition by creating
//!   sentinel files in a shared work directory and consumes the
//!   version/size/location stamps written there.
//!
//! The crate is structured along those seams: [`workflow`] adapts the
//! host handle, [`rendezvous`] owns the work directory, [`shell`]
//! fronts the wrapper, [`interpret`] holds the pure decision tables
//! and [`handler`] composes them into the lifecycle operations. The
//! host-facing entry points live in [`extension`].

pub mod cancel;
pub mod extension;
pub mod handler;
pub mod interpret;
pub mod rendezvous;
pub mod shell;
pub mod testing;
pub mod workflow;

pub use cancel::{cancel_pair, CancelHandle, CancelSignal};
pub use extension::{contract_info, create_step_handler, ContractInfo, LogLevel};
pub use handler::{ContentDownloader, StepHandler, UpdateStepHandler};
pub use shell::{AduShell, ShellAction, ShellExit, ShellInvocation, UpdaterGateway};
pub use workflow::Workflow;
