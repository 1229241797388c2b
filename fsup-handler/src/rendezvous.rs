//! Work-directory rendezvous with the out-of-band controller.
//!
//! The handler and the controller share one directory with names
//! partitioned by role: the handler writes stamps (small metadata
//! text files), the controller creates sentinels (zero-byte files
//! whose existence permits the next phase). No locking is needed
//! because each name has a single writer.
//!
//! Stamps are written to a temporary file and renamed into place, so
//! a reader never observes a partially written stamp.

use crate::cancel::CancelSignal;
use fsup_common::{ExtendedCode, HandlerConfig, Outcome};
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

/// Metadata stamps the handler publishes for the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stamp {
    /// Target version of the current attempt.
    UpdateVersion,
    /// Canonical update-kind name.
    UpdateType,
    /// Declared payload size, decimal bytes.
    UpdateSize,
    /// Absolute path of the downloaded artifact.
    UpdateLocation,
}

impl Stamp {
    /// File name inside the work directory.
    #[must_use]
    pub const fn file_name(&self) -> &'static str {
        match self {
            Self::UpdateVersion => "update_version",
            Self::UpdateType => "update_type",
            Self::UpdateSize => "update_size",
            Self::UpdateLocation => "update_location",
        }
    }

    /// Extended code reported when this stamp cannot be created.
    #[must_use]
    pub const fn create_failed_code(&self) -> ExtendedCode {
        match self {
            Self::UpdateVersion => ExtendedCode::DownloadCreateFailedUpdateVersion,
            Self::UpdateType => ExtendedCode::DownloadCreateFailedUpdateType,
            Self::UpdateSize => ExtendedCode::DownloadCreateFailedUpdateSize,
            Self::UpdateLocation => ExtendedCode::DownloadCreateFailedUpdateLocation,
        }
    }
}

/// Sentinels the controller creates to permit a phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sentinel {
    Download,
    Install,
    Apply,
}

impl Sentinel {
    /// File name inside the work directory.
    #[must_use]
    pub const fn file_name(&self) -> &'static str {
        match self {
            Self::Download => "downloadUpdate",
            Self::Install => "installUpdate",
            Self::Apply => "applyUpdate",
        }
    }
}

/// Result of a sentinel wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SentinelWait {
    /// The sentinel exists; the phase may proceed.
    Signalled,
    /// The host cancelled the operation before the sentinel appeared.
    Cancelled,
}

/// Name of the post-mortem stamp carrying the last failure pair.
const ERROR_STATE_FILE: &str = "errorState";

/// The sentinel-and-stamp directory shared with the controller.
#[derive(Debug, Clone)]
pub struct WorkDir {
    root: PathBuf,
    dir_mode: u32,
    stamp_mode: u32,
    poll_interval: Duration,
}

impl WorkDir {
    #[must_use]
    pub fn new(config: &HandlerConfig) -> Self {
        Self {
            root: config.work_dir.clone(),
            dir_mode: config.work_dir_mode,
            stamp_mode: config.stamp_mode,
            poll_interval: Duration::from_millis(config.poll_interval_ms),
        }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_of(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }

    /// Recreates the work directory, dropping anything a previous
    /// update cycle left behind.
    ///
    /// Filesystem errors are reported but not fatal: the next stamp
    /// write will surface a directory that could not be recreated.
    pub async fn reset(&self) {
        match tokio::fs::remove_dir_all(&self.root).await {
            Ok(()) => debug!(dir = %self.root.display(), "removed previous work directory"),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => warn!(dir = %self.root.display(), error = %e, "could not remove work directory"),
        }
        if let Err(e) = tokio::fs::create_dir_all(&self.root).await {
            warn!(dir = %self.root.display(), error = %e, "could not create work directory");
            return;
        }
        if let Err(e) = set_mode(&self.root, self.dir_mode).await {
            warn!(dir = %self.root.display(), error = %e, "could not set work directory mode");
        }
    }

    /// Atomically publishes a stamp with the given content.
    ///
    /// The stamp becomes visible to the controller only after it has
    /// been fully written and closed.
    pub async fn write_stamp(&self, stamp: Stamp, content: &str) -> io::Result<()> {
        let path = self.path_of(stamp.file_name());
        self.publish(&path, content).await?;
        debug!(stamp = stamp.file_name(), content, "stamp published");
        Ok(())
    }

    async fn publish(&self, path: &Path, content: &str) -> io::Result<()> {
        let tmp = self.path_of(&format!(
            ".{}.tmp.{}",
            path.file_name().and_then(|n| n.to_str()).unwrap_or("stamp"),
            std::process::id()
        ));
        let mut file = tokio::fs::File::create(&tmp).await?;
        file.write_all(content.as_bytes()).await?;
        file.sync_all().await?;
        drop(file);
        set_mode(&tmp, self.stamp_mode).await?;
        tokio::fs::rename(&tmp, path).await
    }

    /// Waits until the sentinel exists, polling at the configured
    /// interval, or until the host cancels.
    pub async fn wait_sentinel(&self, sentinel: Sentinel, cancel: &CancelSignal) -> SentinelWait {
        let path = self.path_of(sentinel.file_name());
        debug!(sentinel = sentinel.file_name(), "waiting for controller");
        loop {
            if path.exists() {
                return SentinelWait::Signalled;
            }
            tokio::select! {
                _ = cancel.cancelled() => {
                    warn!(sentinel = sentinel.file_name(), "wait cancelled by host");
                    return SentinelWait::Cancelled;
                }
                _ = tokio::time::sleep(self.poll_interval) => {}
            }
        }
    }

    /// Removes a sentinel so the controller can re-arm the phase.
    pub async fn remove_sentinel(&self, sentinel: Sentinel) {
        let path = self.path_of(sentinel.file_name());
        match tokio::fs::remove_file(&path).await {
            Ok(()) => debug!(sentinel = sentinel.file_name(), "sentinel removed"),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => {
                warn!(sentinel = sentinel.file_name(), error = %e, "could not remove sentinel");
            }
        }
    }

    /// Appends the final outcome's code pair to the `errorState`
    /// stamp for controller post-mortems. Best-effort.
    pub async fn write_error_state(&self, outcome: &Outcome) {
        let path = self.path_of(ERROR_STATE_FILE);
        let line = format!("{} {}\n", outcome.result.code(), outcome.extended);
        let result = async {
            let mut file = tokio::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(&path)
                .await?;
            file.write_all(line.as_bytes()).await?;
            file.sync_all().await?;
            drop(file);
            set_mode(&path, self.stamp_mode).await
        }
        .await;
        if let Err(e) = result {
            warn!(error = %e, "could not record error state");
        }
    }
}

#[cfg(unix)]
async fn set_mode(path: &Path, mode: u32) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    tokio::fs::set_permissions(path, std::fs::Permissions::from_mode(mode)).await
}

#[cfg(not(unix))]
async fn set_mode(_path: &Path, _mode: u32) -> io::Result<()> {
    Ok(())
}
