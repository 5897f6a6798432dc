//! Execution handles and their streamed logs
//!
//! An [`Execution`] is created as soon as the service accepts a submission.
//! Its output arrives afterwards through the event listener, which is the
//! only writer of the log buffer. Readers either snapshot the logs at any
//! time or first wait for the completion signal with
//! [`Execution::wait_for_completion`].

use crate::client::SandboxClient;
use crate::error::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::{RwLock, watch};
use tokio::task::JoinHandle;
use tracing::debug;

/// Which output stream a log line belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogStream {
    Stdout,
    Stderr,
}

/// Output collected for one execution
///
/// Both sequences are append-only and keep arrival order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ExecutionLogs {
    pub stdout: Vec<String>,
    pub stderr: Vec<String>,
}

impl ExecutionLogs {
    fn push(&mut self, stream: LogStream, line: String) {
        match stream {
            LogStream::Stdout => self.stdout.push(line),
            LogStream::Stderr => self.stderr.push(line),
        }
    }

    /// Stdout chunks concatenated as received
    pub fn stdout_text(&self) -> String {
        self.stdout.concat()
    }

    /// Stderr chunks concatenated as received
    pub fn stderr_text(&self) -> String {
        self.stderr.concat()
    }

    /// True when neither stream produced anything
    pub fn is_empty(&self) -> bool {
        self.stdout.is_empty() && self.stderr.is_empty()
    }
}

/// Lifecycle of the event stream attached to an execution
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutionStatus {
    /// Listener not connected yet
    Pending,
    /// Events are being received
    Streaming,
    /// The stream closed or signalled the end of the execution
    Completed,
    /// The listener could not attach or the stream broke
    Failed(String),
    /// The listener was cancelled before the stream ended
    Cancelled,
}

impl ExecutionStatus {
    /// Whether no further output will arrive
    pub fn is_finished(&self) -> bool {
        matches!(
            self,
            ExecutionStatus::Completed | ExecutionStatus::Failed(_) | ExecutionStatus::Cancelled
        )
    }
}

/// State shared between an [`Execution`] and its listener task
#[derive(Debug)]
pub(crate) struct ExecutionState {
    logs: RwLock<ExecutionLogs>,
    status: watch::Sender<ExecutionStatus>,
}

impl ExecutionState {
    fn new() -> Self {
        let (status, _) = watch::channel(ExecutionStatus::Pending);
        Self {
            logs: RwLock::new(ExecutionLogs::default()),
            status,
        }
    }

    pub(crate) async fn append(&self, stream: LogStream, line: String) {
        self.logs.write().await.push(stream, line);
    }

    /// Move to `next` unless the execution already finished
    pub(crate) fn transition(&self, next: ExecutionStatus) -> bool {
        self.status.send_if_modified(|current| {
            if current.is_finished() || *current == next {
                return false;
            }
            *current = next;
            true
        })
    }

    pub(crate) fn mark_streaming(&self) {
        self.transition(ExecutionStatus::Streaming);
    }

    pub(crate) fn complete(&self) {
        self.transition(ExecutionStatus::Completed);
    }

    pub(crate) fn fail(&self, reason: impl Into<String>) {
        self.transition(ExecutionStatus::Failed(reason.into()));
    }
}

/// Handle to one code submission
///
/// Dropping the handle cancels its listener task.
#[derive(Debug)]
pub struct Execution {
    id: String,
    sandbox_id: String,
    client: SandboxClient,
    created_at: DateTime<Utc>,
    state: Arc<ExecutionState>,
    listener: Mutex<Option<JoinHandle<()>>>,
}

impl Execution {
    pub(crate) fn new(id: String, sandbox_id: String, client: SandboxClient) -> Self {
        Self {
            id,
            sandbox_id,
            client,
            created_at: Utc::now(),
            state: Arc::new(ExecutionState::new()),
            listener: Mutex::new(None),
        }
    }

    /// Remote execution identifier
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Identifier of the sandbox the code ran in
    pub fn sandbox_id(&self) -> &str {
        &self.sandbox_id
    }

    /// When the submission was accepted
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Snapshot of the output received so far
    pub async fn logs(&self) -> ExecutionLogs {
        self.state.logs.read().await.clone()
    }

    /// Current stream status
    pub fn status(&self) -> ExecutionStatus {
        self.state.status.borrow().clone()
    }

    /// Why the listener failed, if it did
    ///
    /// Distinguishes "no output" from "output could not be collected".
    pub fn stream_error(&self) -> Option<String> {
        match &*self.state.status.borrow() {
            ExecutionStatus::Failed(reason) => Some(reason.clone()),
            _ => None,
        }
    }

    /// Wait until the stream finishes, at most `timeout`
    ///
    /// Returns `false` on timeout; the logs then hold whatever arrived.
    pub async fn wait_for_completion(&self, timeout: Duration) -> bool {
        let mut rx = self.state.status.subscribe();
        matches!(
            tokio::time::timeout(timeout, rx.wait_for(ExecutionStatus::is_finished)).await,
            Ok(Ok(_))
        )
    }

    /// Stop listening for output
    pub fn cancel(&self) {
        let handle = self
            .listener
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = handle {
            handle.abort();
            if self.state.transition(ExecutionStatus::Cancelled) {
                debug!(execution_id = %self.id, "Event listener cancelled");
            }
        }
    }

    /// Download a file produced by this execution
    ///
    /// Returns the base64 content exactly as sent by the service.
    pub async fn download_file(&self, path: &str) -> Result<String> {
        self.client
            .download_file(&self.sandbox_id, &self.id, path)
            .await
    }

    pub(crate) fn client(&self) -> &SandboxClient {
        &self.client
    }

    pub(crate) fn state(&self) -> Arc<ExecutionState> {
        Arc::clone(&self.state)
    }

    pub(crate) fn attach_listener(&self, handle: JoinHandle<()>) {
        let previous = self
            .listener
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(handle);
        if let Some(previous) = previous {
            previous.abort();
        }
    }
}

impl Drop for Execution {
    fn drop(&mut self) {
        self.cancel();
    }
}
