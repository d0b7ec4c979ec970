//! The process manager.

use crate::command::ProcessCommand;
use crate::monitor::{self, Capture};
use crate::{ProcessError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::process::Stdio;
use std::sync::Arc;
use taskmill_core::{Time, UniqueId};
use tokio::sync::{oneshot, watch, Mutex};
use tracing::{info, warn};

/// Whether a process is still running.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ProcessStatus {
    /// Still running
    Running,
    /// Finished; `exit_code` is `None` when killed by a signal
    Exited {
        /// Exit code, if any
        exit_code: Option<i32>,
    },
}

impl ProcessStatus {
    /// Whether the process is still running.
    pub fn is_running(&self) -> bool {
        matches!(self, ProcessStatus::Running)
    }

    /// The exit code, once exited with one.
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            ProcessStatus::Running => None,
            ProcessStatus::Exited { exit_code } => *exit_code,
        }
    }
}

/// A snapshot of a managed process.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessInfo {
    /// Caller-chosen id
    pub id: UniqueId,
    /// Human readable label
    pub label: String,
    /// The command line
    pub command: String,
    /// OS process id, while known
    pub pid: Option<u32>,
    /// When the process was started
    pub started_at: Time,
    /// Current status
    pub status: ProcessStatus,
}

/// Output captured from a process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapturedOutput {
    /// Everything written to stdout, one `\n` per line
    pub stdout: String,
    /// Everything written to stderr, one `\n` per line
    pub stderr: String,
    /// Exit code once the process has exited
    pub exit_code: Option<i32>,
}

struct ManagedProcess {
    info: ProcessInfo,
    capture: Arc<Capture>,
    status: watch::Receiver<ProcessStatus>,
    kill: Option<oneshot::Sender<()>>,
}

impl ManagedProcess {
    fn snapshot(&self) -> ProcessInfo {
        ProcessInfo {
            status: *self.status.borrow(),
            ..self.info.clone()
        }
    }

    fn is_listed(&self) -> bool {
        self.kill.is_some()
    }
}

/// Tracks running processes.
///
/// Killed processes disappear from the listing, but their captured output
/// stays available through [`ProcessManager::lookup_output`]. Dropping the
/// manager kills every process it still tracks.
#[derive(Default)]
pub struct ProcessManager {
    processes: Mutex<HashMap<UniqueId, ManagedProcess>>,
}

impl ProcessManager {
    /// Create an empty manager.
    pub fn new() -> Self {
        Self::default()
    }

    /// Start `command` and track it under `id`.
    pub async fn register_process(
        &self,
        command: &ProcessCommand,
        id: UniqueId,
        label: impl Into<String>,
    ) -> Result<ProcessInfo> {
        let mut processes = self.processes.lock().await;
        if processes.contains_key(&id) {
            return Err(ProcessError::DuplicateId(id));
        }

        let child = command
            .to_tokio()
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        let info = ProcessInfo {
            id: id.clone(),
            label: label.into(),
            command: command.to_string(),
            pid: child.id(),
            started_at: chrono::Utc::now(),
            status: ProcessStatus::Running,
        };
        info!("Started process {} ({}) pid={:?}", info.id, info.command, info.pid);

        let capture = Arc::new(Capture::default());
        let handle = monitor::spawn(id.clone(), child, capture.clone());
        processes.insert(
            id,
            ManagedProcess {
                info: info.clone(),
                capture,
                status: handle.status,
                kill: Some(handle.kill),
            },
        );
        Ok(info)
    }

    /// The process registered under `id`.
    pub async fn find_by_id(&self, id: &UniqueId) -> Result<ProcessInfo> {
        self.processes
            .lock()
            .await
            .get(id)
            .filter(|p| p.is_listed())
            .map(ManagedProcess::snapshot)
            .ok_or_else(|| ProcessError::NotFound(id.to_string()))
    }

    /// The earliest started process carrying `label`.
    pub async fn find_by_label(&self, label: &str) -> Result<ProcessInfo> {
        self.processes
            .lock()
            .await
            .values()
            .filter(|p| p.is_listed() && p.info.label == label)
            .min_by_key(|p| p.info.started_at)
            .map(ManagedProcess::snapshot)
            .ok_or_else(|| ProcessError::NotFound(label.to_string()))
    }

    /// Every tracked process, oldest first.
    pub async fn all_processes(&self) -> Vec<ProcessInfo> {
        let mut all: Vec<ProcessInfo> = self
            .processes
            .lock()
            .await
            .values()
            .filter(|p| p.is_listed())
            .map(ManagedProcess::snapshot)
            .collect();
        all.sort_by_key(|p| p.started_at);
        all
    }

    /// Kill the process and stop tracking it.
    ///
    /// Without `forcibly` this only requests the kill; with it, the call
    /// returns once the process has actually exited.
    pub async fn kill(&self, id: &UniqueId, forcibly: bool) -> Result<()> {
        let status = {
            let mut processes = self.processes.lock().await;
            let process = processes
                .get_mut(id)
                .filter(|p| p.is_listed())
                .ok_or_else(|| ProcessError::NotFound(id.to_string()))?;
            if let Some(kill) = process.kill.take() {
                // the monitor is gone if the process already exited
                let _ = kill.send(());
            }
            process.status.clone()
        };
        info!("Killing process {} (forcibly={})", id, forcibly);

        if forcibly {
            wait_until_exited(status).await;
        }
        Ok(())
    }

    /// Forcibly kill everything. Returns how many processes were killed.
    pub async fn kill_all(&self) -> usize {
        let ids: Vec<UniqueId> = self
            .processes
            .lock()
            .await
            .values()
            .filter(|p| p.is_listed())
            .map(|p| p.info.id.clone())
            .collect();

        let mut killed = 0;
        for id in ids {
            match self.kill(&id, true).await {
                Ok(()) => killed += 1,
                Err(e) => warn!("Could not kill {}: {}", id, e),
            }
        }
        killed
    }

    /// Output captured so far for `id`, including killed processes.
    pub async fn lookup_output(&self, id: &UniqueId) -> Result<CapturedOutput> {
        let (capture, status) = {
            let processes = self.processes.lock().await;
            let process = processes
                .get(id)
                .ok_or_else(|| ProcessError::NotFound(id.to_string()))?;
            let status = *process.status.borrow();
            (process.capture.clone(), status)
        };
        Ok(capture.snapshot(status).await)
    }

    /// Wait until `id` exits and return its exit code.
    pub async fn wait_for_exit(&self, id: &UniqueId) -> Result<Option<i32>> {
        let status = self
            .processes
            .lock()
            .await
            .get(id)
            .map(|p| p.status.clone())
            .ok_or_else(|| ProcessError::NotFound(id.to_string()))?;
        Ok(wait_until_exited(status).await.exit_code())
    }
}

impl std::fmt::Debug for ProcessManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProcessManager").finish_non_exhaustive()
    }
}

async fn wait_until_exited(mut status: watch::Receiver<ProcessStatus>) -> ProcessStatus {
    loop {
        let current = *status.borrow_and_update();
        if !current.is_running() {
            return current;
        }
        if status.changed().await.is_err() {
            // monitor finished; its last value is final
            return *status.borrow();
        }
    }
}
