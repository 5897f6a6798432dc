//! HTTP transport for the sandbox service
//!
//! Every call carries the API key header and treats a non-success status as
//! a hard failure. There is no retry at this layer. File contents travel as
//! base64 strings inside JSON bodies.

use crate::config::{API_KEY_HEADER, InterpreterConfig};
use crate::error::{Result, SandboxError};
use crate::sandbox::Sandbox;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use reqwest::header::{ACCEPT, CONTENT_TYPE, HeaderValue};
use reqwest::{Client, Method, RequestBuilder, Response};
use serde_json::{Value, json};
use std::sync::Arc;
use tracing::{debug, info};

/// Client for the remote sandbox service
///
/// Cheap to clone; clones share the connection pool and configuration.
#[derive(Debug, Clone)]
pub struct SandboxClient {
    http: Client,
    config: Arc<InterpreterConfig>,
}

impl SandboxClient {
    /// Create a client from a validated configuration
    pub fn new(config: InterpreterConfig) -> Result<Self> {
        config.validate()?;

        // No overall timeout on the client: the event stream stays open for
        // the whole execution. Request/response calls set their own.
        let http = Client::builder()
            .connect_timeout(config.connect_timeout)
            .build()?;

        Ok(Self {
            http,
            config: Arc::new(config),
        })
    }

    /// Create a client configured from `THIRI_*` environment variables
    pub fn from_env() -> Result<Self> {
        Self::new(InterpreterConfig::from_env()?)
    }

    /// Configuration in use
    pub fn config(&self) -> &InterpreterConfig {
        &self.config
    }

    /// Absolute URL for a service path
    pub fn url_for(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url, path)
    }

    /// Create a new sandbox and wait for it to boot
    pub async fn create_sandbox(&self) -> Result<Sandbox> {
        const CONTEXT: &str = "create sandbox";

        let response = self
            .request(Method::POST, "/vms")
            .header(CONTENT_TYPE, HeaderValue::from_static("application/json"))
            .timeout(self.config.request_timeout)
            .send()
            .await?;
        let body = Self::read_json(response, CONTEXT).await?;
        let id = Self::string_field(&body, CONTEXT, "id")?;

        info!(sandbox_id = %id, "Sandbox created");
        tokio::time::sleep(self.config.boot_delay).await;

        Ok(Sandbox::new(id, self.clone()))
    }

    /// Submit code to a sandbox, returning the execution id
    pub(crate) async fn submit_code(&self, sandbox_id: &str, code: &str) -> Result<String> {
        const CONTEXT: &str = "run code";

        let payload = json!({ "code": STANDARD.encode(code.as_bytes()) });
        let response = self
            .request(Method::POST, &format!("/vms/{sandbox_id}/gateway/execute"))
            .timeout(self.config.request_timeout)
            .json(&payload)
            .send()
            .await?;
        let body = Self::read_json(response, CONTEXT).await?;
        Self::string_field(&body, CONTEXT, "execution_id")
    }

    /// Open the server-sent-events stream for an execution
    pub(crate) async fn open_event_stream(
        &self,
        sandbox_id: &str,
        execution_id: &str,
    ) -> Result<Response> {
        let path = format!("/vms/{sandbox_id}/gateway/executions/{execution_id}/events");
        let response = self
            .request(Method::GET, &path)
            .header(ACCEPT, HeaderValue::from_static("text/event-stream"))
            .send()
            .await?;
        Self::check_status(response, "open event stream")
    }

    /// Fetch a file from an execution as base64
    pub(crate) async fn download_file(
        &self,
        sandbox_id: &str,
        execution_id: &str,
        path: &str,
    ) -> Result<String> {
        const CONTEXT: &str = "download file";

        let url_path =
            format!("/vms/{sandbox_id}/gateway/executions/{execution_id}/download/{path}");
        let response = self
            .request(Method::GET, &url_path)
            .header(CONTENT_TYPE, HeaderValue::from_static("application/json"))
            .timeout(self.config.request_timeout)
            .send()
            .await?;
        let body = Self::read_json(response, CONTEXT).await?;

        body.get("content")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or(SandboxError::MissingField {
                context: CONTEXT,
                field: "content",
            })
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = self.url_for(path);
        debug!(%method, %url, "Sandbox request");
        self.http
            .request(method, url)
            .header(API_KEY_HEADER, &self.config.api_key)
    }

    fn check_status(response: Response, context: &'static str) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            Ok(response)
        } else {
            Err(SandboxError::http(context, status))
        }
    }

    async fn read_json(response: Response, context: &'static str) -> Result<Value> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            debug!(%status, %body, "Sandbox service returned an error");
            return Err(SandboxError::http(context, status));
        }

        let text = response.text().await?;
        Ok(serde_json::from_str(&text)?)
    }

    // Identifiers are opaque; accept numbers as well as strings.
    fn string_field(body: &Value, context: &'static str, field: &'static str) -> Result<String> {
        match body.get(field) {
            Some(Value::String(s)) if !s.is_empty() => Ok(s.clone()),
            Some(Value::Number(n)) => Ok(n.to_string()),
            _ => Err(SandboxError::MissingField { context, field }),
        }
    }
}
