//! Sandbox sessions

use crate::client::SandboxClient;
use crate::error::Result;
use crate::execution::Execution;
use crate::listener;
use tracing::{info, warn};

/// One remote execution environment
///
/// Created by [`SandboxClient::create_sandbox`] and reused for every
/// submission. The service owns its expiry; nothing is torn down here.
#[derive(Debug, Clone)]
pub struct Sandbox {
    id: String,
    client: SandboxClient,
}

impl Sandbox {
    pub(crate) fn new(id: String, client: SandboxClient) -> Self {
        Self { id, client }
    }

    /// Remote sandbox identifier
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Client this sandbox was created with
    pub fn client(&self) -> &SandboxClient {
        &self.client
    }

    /// Submit code and start streaming its output
    ///
    /// Returns as soon as the service accepts the code. Output accumulates on
    /// the returned [`Execution`] in the background. If the listener cannot be
    /// started the failure is recorded on the execution and the handle is
    /// still returned.
    pub async fn run_code(&self, code: &str) -> Result<Execution> {
        let execution_id = self.client.submit_code(&self.id, code).await?;
        info!(sandbox_id = %self.id, %execution_id, "Code submitted");

        let execution = Execution::new(execution_id, self.id.clone(), self.client.clone());
        if let Err(e) = listener::spawn(&execution) {
            warn!(execution_id = %execution.id(), "Error setting up event listener: {e}");
            execution.state().fail(e.to_string());
        }

        Ok(execution)
    }
}
