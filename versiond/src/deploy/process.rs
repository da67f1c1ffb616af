//! Child processes as cancellable event streams

use std::path::PathBuf;
use std::process::Stdio;

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use openapi_server::models::CommandRecord;

use crate::utils::command_line;

const READ_CHUNK: usize = 8192;
const EVENT_QUEUE: usize = 256;

/// A program to run and the directory to run it in
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessSpec {
    pub program: String,
    pub args: Vec<String>,
    pub cwd: PathBuf,
}

impl ProcessSpec {
    pub fn new(program: impl Into<String>, args: &[&str], cwd: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: args.iter().map(|a| a.to_string()).collect(),
            cwd: cwd.into(),
        }
    }

    pub fn command_line(&self) -> String {
        command_line(&self.program, &self.args)
    }
}

/// Something that happened to a running process
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessEvent {
    Stdout(String),
    Stderr(String),
    /// Process exited; signals map to -1
    Exited(i32),
    /// Process could not be started
    LaunchFailed(String),
    /// Process was killed through its cancellation token
    Cancelled,
}

impl ProcessEvent {
    pub fn is_final(&self) -> bool {
        matches!(
            self,
            ProcessEvent::Exited(_) | ProcessEvent::LaunchFailed(_) | ProcessEvent::Cancelled
        )
    }
}

/// A spawned process. Output chunks arrive in order, followed by one final event.
pub struct ProcessTask {
    events: mpsc::Receiver<ProcessEvent>,
    cancel: CancellationToken,
}

impl ProcessTask {
    pub fn spawn(spec: ProcessSpec) -> Self {
        let (tx, events) = mpsc::channel(EVENT_QUEUE);
        let cancel = CancellationToken::new();
        tokio::spawn(supervise(spec, tx, cancel.clone()));

        Self { events, cancel }
    }

    /// Next event; `None` after the final event has been taken
    pub async fn next(&mut self) -> Option<ProcessEvent> {
        self.events.recv().await
    }

    /// Kill the process
    pub fn cancel(&self) {
        self.cancel.cancel();
    }
}

async fn supervise(spec: ProcessSpec, tx: mpsc::Sender<ProcessEvent>, cancel: CancellationToken) {
    let mut cmd = Command::new(&spec.program);
    cmd.args(&spec.args)
        .current_dir(&spec.cwd)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    debug!("Spawning `{}` in {}", spec.command_line(), spec.cwd.display());

    let mut child = match cmd.spawn() {
        Ok(child) => child,
        Err(e) => {
            warn!("Failed to start {}: {}", spec.program, e);
            let _ = tx
                .send(ProcessEvent::LaunchFailed(format!(
                    "Failed to start {}: {}",
                    spec.program, e
                )))
                .await;
            return;
        }
    };

    let stdout_task = child
        .stdout
        .take()
        .map(|out| tokio::spawn(forward(out, tx.clone(), ProcessEvent::Stdout)));
    let stderr_task = child
        .stderr
        .take()
        .map(|err| tokio::spawn(forward(err, tx.clone(), ProcessEvent::Stderr)));

    let status = tokio::select! {
        () = cancel.cancelled() => {
            debug!("Cancelling `{}`", spec.command_line());
            child.kill().await.ok();
            None
        }
        status = child.wait() => Some(status),
    };

    // Drain remaining output so it precedes the final event
    for task in [stdout_task, stderr_task].into_iter().flatten() {
        task.await.ok();
    }

    let last = match status {
        None => ProcessEvent::Cancelled,
        Some(Ok(status)) => ProcessEvent::Exited(status.code().unwrap_or(-1)),
        Some(Err(e)) => ProcessEvent::LaunchFailed(format!("Failed to wait for {}: {}", spec.program, e)),
    };
    let _ = tx.send(last).await;
}

async fn forward<R>(mut reader: R, tx: mpsc::Sender<ProcessEvent>, wrap: fn(String) -> ProcessEvent)
where
    R: AsyncRead + Unpin,
{
    let mut buf = vec![0u8; READ_CHUNK];
    let mut decoder = Utf8Decoder::default();
    loop {
        match reader.read(&mut buf).await {
            Ok(0) => break,
            Ok(n) => {
                let chunk = decoder.decode(&buf[..n]);
                if chunk.is_empty() {
                    continue;
                }
                if tx.send(wrap(chunk)).await.is_err() {
                    return;
                }
            }
            Err(e) => {
                debug!("Output stream closed: {}", e);
                break;
            }
        }
    }

    let rest = decoder.finish();
    if !rest.is_empty() {
        let _ = tx.send(wrap(rest)).await;
    }
}

/// Decodes a byte stream read in arbitrary chunks.
///
/// A character split across two reads is held back until its remaining bytes
/// arrive. Invalid sequences become U+FFFD.
#[derive(Debug, Default)]
struct Utf8Decoder {
    pending: Vec<u8>,
}

impl Utf8Decoder {
    fn decode(&mut self, bytes: &[u8]) -> String {
        self.pending.extend_from_slice(bytes);

        let mut out = String::new();
        let mut start = 0;
        loop {
            match std::str::from_utf8(&self.pending[start..]) {
                Ok(valid) => {
                    out.push_str(valid);
                    start = self.pending.len();
                    break;
                }
                Err(e) => {
                    let end = start + e.valid_up_to();
                    out.push_str(&String::from_utf8_lossy(&self.pending[start..end]));
                    match e.error_len() {
                        Some(len) => {
                            out.push(char::REPLACEMENT_CHARACTER);
                            start = end + len;
                        }
                        // Incomplete sequence at the end: wait for more bytes
                        None => {
                            start = end;
                            break;
                        }
                    }
                }
            }
        }

        self.pending.drain(..start);
        out
    }

    fn finish(self) -> String {
        String::from_utf8_lossy(&self.pending).into_owned()
    }
}

/// Run a process to completion without streaming, capturing trimmed output.
///
/// A launch failure is recorded with code -1 and the error in `stderr`.
pub async fn run_command(spec: ProcessSpec) -> CommandRecord {
    let cmd = spec.command_line();
    let mut task = ProcessTask::spawn(spec);

    let mut stdout = String::new();
    let mut stderr = String::new();
    let mut code = -1;

    while let Some(event) = task.next().await {
        match event {
            ProcessEvent::Stdout(chunk) => stdout.push_str(&chunk),
            ProcessEvent::Stderr(chunk) => stderr.push_str(&chunk),
            ProcessEvent::Exited(c) => code = c,
            ProcessEvent::LaunchFailed(msg) => stderr.push_str(&msg),
            ProcessEvent::Cancelled => stderr.push_str("cancelled"),
        }
    }

    CommandRecord {
        cmd,
        code,
        stdout: stdout.trim().to_string(),
        stderr: stderr.trim().to_string(),
    }
}
