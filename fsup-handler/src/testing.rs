//! In-memory fakes for the handler's collaborator seams.
//!
//! The integration suites script the updater's exit codes, hand the
//! handler a canned workflow and record what it asked the downloader
//! to fetch, all without a real wrapper binary or host agent.

use crate::handler::ContentDownloader;
use crate::shell::{GatewayError, ShellExit, ShellInvocation, UpdaterGateway};
use crate::workflow::Workflow;
use async_trait::async_trait;
use fsup_common::types::TOKEN_FUS_UPDATE;
use fsup_common::{FileEntity, Outcome, ResultCode};
use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// Gateway fake that replays a scripted sequence of exit statuses and
/// records every invocation it receives.
#[derive(Debug, Default)]
pub struct ScriptedGateway {
    script: Mutex<VecDeque<ShellExit>>,
    invocations: Mutex<Vec<ShellInvocation>>,
}

impl ScriptedGateway {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends the next exit status the fake will report.
    pub fn push(&self, exit: ShellExit) {
        self.script.lock().unwrap().push_back(exit);
    }

    /// Everything the handler asked the wrapper to run, in order.
    #[must_use]
    pub fn invocations(&self) -> Vec<ShellInvocation> {
        self.invocations.lock().unwrap().clone()
    }
}

#[async_trait]
impl UpdaterGateway for ScriptedGateway {
    async fn run(&self, invocation: &ShellInvocation) -> Result<ShellExit, GatewayError> {
        self.invocations.lock().unwrap().push(invocation.clone());
        match self.script.lock().unwrap().pop_front() {
            Some(exit) => Ok(exit),
            None => Err(GatewayError::Launch {
                path: "scripted-gateway".to_string(),
                source: std::io::Error::new(
                    std::io::ErrorKind::Other,
                    "gateway script exhausted",
                ),
            }),
        }
    }
}

/// Workflow fake with builder-style setup.
#[derive(Debug)]
pub struct StaticWorkflow {
    id: String,
    work_folder: PathBuf,
    installed_criteria: String,
    token: String,
    properties: HashMap<String, String>,
    files: Vec<FileEntity>,
    update_size: u64,
    reboots: AtomicUsize,
}

impl StaticWorkflow {
    #[must_use]
    pub fn new(installed_criteria: &str) -> Self {
        Self {
            id: "workflow-under-test".to_string(),
            work_folder: std::env::temp_dir(),
            installed_criteria: installed_criteria.to_string(),
            token: TOKEN_FUS_UPDATE.to_string(),
            properties: HashMap::new(),
            files: Vec::new(),
            update_size: 0,
            reboots: AtomicUsize::new(0),
        }
    }

    #[must_use]
    pub fn with_work_folder(mut self, folder: impl Into<PathBuf>) -> Self {
        self.work_folder = folder.into();
        self
    }

    #[must_use]
    pub fn with_token(mut self, token: &str) -> Self {
        self.token = token.to_string();
        self
    }

    #[must_use]
    pub fn with_property(mut self, name: &str, value: &str) -> Self {
        self.properties.insert(name.to_string(), value.to_string());
        self
    }

    #[must_use]
    pub fn with_file(mut self, target_filename: &str) -> Self {
        self.files.push(FileEntity::new(target_filename));
        self
    }

    #[must_use]
    pub fn with_update_size(mut self, size: u64) -> Self {
        self.update_size = size;
        self
    }

    /// Number of immediate-reboot requests the handler issued.
    #[must_use]
    pub fn reboot_requests(&self) -> usize {
        self.reboots.load(Ordering::SeqCst)
    }
}

impl Workflow for StaticWorkflow {
    fn id(&self) -> String {
        self.id.clone()
    }

    fn work_folder(&self) -> PathBuf {
        self.work_folder.clone()
    }

    fn installed_criteria(&self) -> String {
        self.installed_criteria.clone()
    }

    fn update_type_token(&self) -> String {
        self.token.clone()
    }

    fn handler_property(&self, name: &str) -> Option<String> {
        self.properties.get(name).cloned()
    }

    fn file_count(&self) -> usize {
        self.files.len()
    }

    fn file_entity(&self, index: usize) -> Option<FileEntity> {
        self.files.get(index).cloned()
    }

    fn update_size(&self) -> u64 {
        self.update_size
    }

    fn request_immediate_reboot(&self) {
        self.reboots.fetch_add(1, Ordering::SeqCst);
    }
}

/// Downloader fake returning a fixed outcome and recording calls.
#[derive(Debug)]
pub struct RecordingDownloader {
    outcome: Outcome,
    calls: Mutex<Vec<(FileEntity, PathBuf)>>,
}

impl RecordingDownloader {
    /// A downloader that always reports success.
    #[must_use]
    pub fn succeeding() -> Self {
        Self::with_outcome(Outcome::ok(ResultCode::DownloadSuccess))
    }

    #[must_use]
    pub fn with_outcome(outcome: Outcome) -> Self {
        Self {
            outcome,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Every (entity, work folder) pair the handler requested.
    #[must_use]
    pub fn calls(&self) -> Vec<(FileEntity, PathBuf)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ContentDownloader for RecordingDownloader {
    async fn download(&self, entity: &FileEntity, work_folder: &Path) -> Outcome {
        self.calls
            .lock()
            .unwrap()
            .push((entity.clone(), work_folder.to_path_buf()));
        self.outcome
    }
}
