//! Tool-facing façade over the sandbox client
//!
//! [`CodeInterpreter`] is what agents talk to. Every public operation returns
//! text: failures are rendered into the result instead of being raised,
//! because the model consuming a tool call only ever sees its output.

use crate::client::SandboxClient;
use crate::config::InterpreterConfig;
use crate::error::{Result, SandboxError};
use crate::execution::{Execution, ExecutionLogs};
use crate::files;
use crate::sandbox::Sandbox;
use crate::tools::{DownloadFileTool, RunPythonCodeTool};
use agent_core::{ArtifactStore, ImageArtifact};
use agent_tools::ToolRegistry;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use tokio::sync::{OnceCell, RwLock};
use tracing::{info, instrument, warn};

/// Returned when code ran but printed nothing
pub const NO_OUTPUT_MESSAGE: &str = "Code executed successfully with no output.";

/// Returned when a download is requested before any code ran
pub const NO_EXECUTION_MESSAGE: &str = "No code has been executed yet";

/// Render execution output as the text handed back to the model
///
/// `STDOUT:` and `STDERR:` sections appear only for non-empty streams and are
/// joined by a newline. With no output at all the fixed no-output message is
/// returned, unless the listener failed, in which case that is reported.
pub fn format_output(logs: &ExecutionLogs, stream_error: Option<&str>) -> String {
    let mut sections = Vec::with_capacity(2);
    if !logs.stdout.is_empty() {
        sections.push(format!("STDOUT:\n{}", logs.stdout_text()));
    }
    if !logs.stderr.is_empty() {
        sections.push(format!("STDERR:\n{}", logs.stderr_text()));
    }

    if !sections.is_empty() {
        return sections.join("\n");
    }
    match stream_error {
        Some(err) => format!("Code submitted but output could not be streamed: {err}"),
        None => NO_OUTPUT_MESSAGE.to_string(),
    }
}

/// Executions remembered for later downloads, oldest first
#[derive(Debug)]
struct ExecutionHistory {
    order: VecDeque<String>,
    by_id: HashMap<String, Arc<Execution>>,
    capacity: usize,
}

impl ExecutionHistory {
    fn new(capacity: usize) -> Self {
        Self {
            order: VecDeque::new(),
            by_id: HashMap::new(),
            capacity,
        }
    }

    // Evicted executions are dropped here, which cancels their listeners
    // once no caller holds them any more.
    fn insert(&mut self, execution: Arc<Execution>) {
        let id = execution.id().to_string();
        if self.by_id.insert(id.clone(), execution).is_some() {
            self.order.retain(|existing| existing != &id);
        }
        self.order.push_back(id);

        while self.order.len() > self.capacity {
            if let Some(oldest) = self.order.pop_front() {
                self.by_id.remove(&oldest);
            }
        }
    }

    fn latest(&self) -> Option<Arc<Execution>> {
        self.order.back().and_then(|id| self.by_id.get(id)).cloned()
    }

    fn get(&self, id: &str) -> Option<Arc<Execution>> {
        self.by_id.get(id).cloned()
    }

    fn ids(&self) -> Vec<String> {
        self.order.iter().cloned().collect()
    }

    fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

/// Runs Python for an agent in one lazily created remote sandbox
///
/// # Example
///
/// ```no_run
/// use agent_interpreter::CodeInterpreter;
///
/// # async fn example() -> agent_interpreter::Result<()> {
/// let interpreter = CodeInterpreter::from_env()?;
///
/// let output = interpreter.run_python_code("print('hi')").await;
/// println!("{output}");
///
/// let saved = interpreter.download_file_from_sandbox("output.png").await;
/// println!("{saved}");
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct CodeInterpreter {
    client: SandboxClient,
    sandbox: OnceCell<Sandbox>,
    history: RwLock<ExecutionHistory>,
    artifacts: ArtifactStore,
}

impl CodeInterpreter {
    /// Create an interpreter; a missing API key fails here
    pub fn new(config: InterpreterConfig) -> Result<Self> {
        Ok(Self::with_client(SandboxClient::new(config)?))
    }

    /// Create an interpreter configured from the environment
    pub fn from_env() -> Result<Self> {
        Self::new(InterpreterConfig::from_env()?)
    }

    /// Create an interpreter around an existing client
    pub fn with_client(client: SandboxClient) -> Self {
        let capacity = client.config().max_history;
        Self {
            client,
            sandbox: OnceCell::new(),
            history: RwLock::new(ExecutionHistory::new(capacity)),
            artifacts: ArtifactStore::new(),
        }
    }

    /// Register image artifacts on `store` instead of a private one
    pub fn with_artifacts(mut self, store: ArtifactStore) -> Self {
        self.artifacts = store;
        self
    }

    /// Artifact store downloaded images are registered on
    pub fn artifacts(&self) -> &ArtifactStore {
        &self.artifacts
    }

    /// Underlying client
    pub fn client(&self) -> &SandboxClient {
        &self.client
    }

    /// Id of the sandbox, once one has been created
    pub fn sandbox_id(&self) -> Option<&str> {
        self.sandbox.get().map(Sandbox::id)
    }

    /// Register `run_python_code` and `download_file_from_sandbox` on `registry`
    pub fn register_tools(self: &Arc<Self>, registry: &ToolRegistry) {
        registry.register(Arc::new(RunPythonCodeTool::new(Arc::clone(self))));
        registry.register(Arc::new(DownloadFileTool::new(Arc::clone(self))));
    }

    /// Run Python code in the sandbox and describe its output
    ///
    /// Never fails: errors come back as `Error executing code: ...`.
    #[instrument(skip_all, fields(code_len = code.len()))]
    pub async fn run_python_code(&self, code: &str) -> String {
        match self.try_run(code).await {
            Ok(output) => output,
            Err(e) => {
                warn!("Code execution failed: {e}");
                format!("Error executing code: {e}")
            }
        }
    }

    /// Download a file from the most recent execution
    ///
    /// Images are also registered as artifacts. Never fails: errors come back
    /// as `Error downloading file: ...`.
    #[instrument(skip(self))]
    pub async fn download_file_from_sandbox(&self, sandbox_path: &str) -> String {
        match self.latest_execution().await {
            Some(execution) => self.download_from(&execution, sandbox_path).await,
            None => NO_EXECUTION_MESSAGE.to_string(),
        }
    }

    /// Download a file from a specific remembered execution
    #[instrument(skip(self))]
    pub async fn download_file_from_execution(
        &self,
        execution_id: &str,
        sandbox_path: &str,
    ) -> String {
        let execution = {
            let history = self.history.read().await;
            if history.is_empty() {
                return NO_EXECUTION_MESSAGE.to_string();
            }
            history.get(execution_id)
        };

        match execution {
            Some(execution) => self.download_from(&execution, sandbox_path).await,
            None => format!(
                "Error downloading file: {}",
                SandboxError::UnknownExecution(execution_id.to_string())
            ),
        }
    }

    /// Most recent execution, if any
    pub async fn latest_execution(&self) -> Option<Arc<Execution>> {
        self.history.read().await.latest()
    }

    /// Remembered execution by id
    pub async fn execution(&self, execution_id: &str) -> Option<Arc<Execution>> {
        self.history.read().await.get(execution_id)
    }

    /// Ids of remembered executions, oldest first
    pub async fn execution_ids(&self) -> Vec<String> {
        self.history.read().await.ids()
    }

    async fn sandbox(&self) -> Result<&Sandbox> {
        self.sandbox
            .get_or_try_init(|| async {
                let sandbox = self.client.create_sandbox().await?;
                tokio::time::sleep(self.client.config().warmup_delay).await;
                Ok::<_, SandboxError>(sandbox)
            })
            .await
    }

    async fn try_run(&self, code: &str) -> Result<String> {
        let sandbox = self.sandbox().await?;
        let execution = Arc::new(sandbox.run_code(code).await?);

        let timeout = self.client.config().output_timeout;
        if !execution.wait_for_completion(timeout).await {
            warn!(
                execution_id = %execution.id(),
                "Execution still running after {timeout:?}; returning partial output"
            );
        }

        self.history.write().await.insert(Arc::clone(&execution));

        let logs = execution.logs().await;
        Ok(format_output(&logs, execution.stream_error().as_deref()))
    }

    async fn download_from(&self, execution: &Execution, sandbox_path: &str) -> String {
        match self.try_download(execution, sandbox_path).await {
            Ok(message) => message,
            Err(e) => {
                warn!("Download failed: {e}");
                format!("Error downloading file: {e}")
            }
        }
    }

    async fn try_download(&self, execution: &Execution, sandbox_path: &str) -> Result<String> {
        let content_base64 = execution.download_file(sandbox_path).await?;
        let content = files::decode_content(&content_base64)?;

        let local = files::local_path(&self.client.config().download_dir, sandbox_path)?;
        tokio::fs::write(&local, &content).await?;
        info!(path = %local.display(), bytes = content.len(), "File downloaded");

        match files::image_mime_type(sandbox_path) {
            Some(mime_type) => {
                let artifact = ImageArtifact::new(
                    ImageArtifact::data_url(mime_type, &content_base64),
                    format!("Downloaded from sandbox: {sandbox_path}"),
                    mime_type,
                );
                let id = self.artifacts.add_image(artifact);
                Ok(format!(
                    "Image downloaded and added as artifact with ID {id}, saved to {}",
                    local.display()
                ))
            }
            None => Ok(format!("File downloaded and saved to {}", local.display())),
        }
    }
}
