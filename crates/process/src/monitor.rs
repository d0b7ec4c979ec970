//! Per-process monitor task: drains output and records the exit.

use crate::manager::{CapturedOutput, ProcessStatus};
use std::sync::Arc;
use std::time::Duration;
use taskmill_core::UniqueId;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Child;
use tokio::sync::{oneshot, watch, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// How long output readers may keep going after the process has exited.
/// A grandchild holding the pipe open must not stall the exit status.
pub(crate) const DRAIN_GRACE: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy)]
enum Stream {
    Stdout,
    Stderr,
}

/// Output captured so far.
#[derive(Debug, Default)]
pub(crate) struct Capture {
    stdout: Mutex<String>,
    stderr: Mutex<String>,
}

impl Capture {
    async fn push(&self, stream: Stream, line: &str) {
        let buffer = match stream {
            Stream::Stdout => &self.stdout,
            Stream::Stderr => &self.stderr,
        };
        let mut buffer = buffer.lock().await;
        buffer.push_str(line);
        buffer.push('\n');
    }

    pub(crate) async fn snapshot(&self, status: ProcessStatus) -> CapturedOutput {
        CapturedOutput {
            stdout: self.stdout.lock().await.clone(),
            stderr: self.stderr.lock().await.clone(),
            exit_code: status.exit_code(),
        }
    }
}

/// Handles the manager keeps for a monitored process.
pub(crate) struct MonitorHandle {
    pub(crate) kill: oneshot::Sender<()>,
    pub(crate) status: watch::Receiver<ProcessStatus>,
}

/// Start monitoring `child`.
///
/// Sending on (or dropping) the returned kill sender kills the process.
pub(crate) fn spawn(id: UniqueId, mut child: Child, capture: Arc<Capture>) -> MonitorHandle {
    let (kill_tx, kill_rx) = oneshot::channel::<()>();
    let (status_tx, status_rx) = watch::channel(ProcessStatus::Running);
    let pid = child.id();

    let stdout = child
        .stdout
        .take()
        .map(|out| tokio::spawn(read_lines(out, capture.clone(), Stream::Stdout)));
    let stderr = child
        .stderr
        .take()
        .map(|err| tokio::spawn(read_lines(err, capture, Stream::Stderr)));

    tokio::spawn(async move {
        let exited = tokio::select! {
            status = child.wait() => status,
            _ = kill_rx => {
                debug!("Killing process {}", id);
                if let Some(pid) = pid {
                    kill_group(&id, pid).await;
                }
                if let Err(e) = child.start_kill() {
                    warn!("Failed to kill process {}: {}", id, e);
                }
                child.wait().await
            }
        };

        for reader in [stdout, stderr].into_iter().flatten() {
            drain(reader).await;
        }

        let exit_code = match exited {
            Ok(status) => status.code(),
            Err(e) => {
                warn!("Lost track of process {}: {}", id, e);
                None
            }
        };
        info!("Process {} exited with code {:?}", id, exit_code);
        let _ = status_tx.send(ProcessStatus::Exited { exit_code });
    });

    MonitorHandle {
        kill: kill_tx,
        status: status_rx,
    }
}

/// Kill every process in the group led by `pid`.
#[cfg(unix)]
async fn kill_group(id: &UniqueId, pid: u32) {
    let script = format!("kill -KILL -- -{pid}");
    match tokio::process::Command::new("sh").arg("-c").arg(&script).status().await {
        Ok(status) if status.success() => {}
        Ok(status) => debug!("Process group of {} already gone ({})", id, status),
        Err(e) => warn!("Failed to kill process group of {}: {}", id, e),
    }
}

#[cfg(not(unix))]
async fn kill_group(_id: &UniqueId, _pid: u32) {}

async fn drain(mut reader: JoinHandle<()>) {
    if tokio::time::timeout(DRAIN_GRACE, &mut reader).await.is_err() {
        reader.abort();
    }
}

async fn read_lines<R: AsyncRead + Unpin>(reader: R, capture: Arc<Capture>, stream: Stream) {
    let mut lines = BufReader::new(reader).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => capture.push(stream, &line).await,
            Ok(None) => break,
            Err(e) => {
                warn!("Stopped reading {:?}: {}", stream, e);
                break;
            }
        }
    }
}
