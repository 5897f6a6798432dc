//! Configuration for the remote code interpreter

use crate::error::{Result, SandboxError};
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;
use url::Url;

/// Environment variable holding the API key
pub const API_KEY_ENV: &str = "THIRI_API_KEY";

/// Environment variable overriding the service base URL
pub const BASE_URL_ENV: &str = "THIRI_API_BASE";

/// Environment variable overriding the request timeout (seconds)
pub const REQUEST_TIMEOUT_ENV: &str = "THIRI_REQUEST_TIMEOUT_SECS";

/// Environment variable overriding how long to wait for output (seconds)
pub const OUTPUT_TIMEOUT_ENV: &str = "THIRI_OUTPUT_TIMEOUT_SECS";

/// Environment variable overriding where downloaded files are written
pub const DOWNLOAD_DIR_ENV: &str = "THIRI_DOWNLOAD_DIR";

/// Default service base URL
pub const DEFAULT_BASE_URL: &str = "https://api.thiri.dev/api";

/// Header carrying the API key on every request
pub const API_KEY_HEADER: &str = "X-THIRI-KEY";

/// Configuration for [`SandboxClient`](crate::SandboxClient) and
/// [`CodeInterpreter`](crate::CodeInterpreter)
#[derive(Clone)]
pub struct InterpreterConfig {
    /// API key sent in the `X-THIRI-KEY` header
    pub api_key: String,

    /// Service base URL, without trailing slash
    pub base_url: String,

    /// Timeout for request/response calls (not the event stream)
    pub request_timeout: Duration,

    /// Timeout for establishing connections
    pub connect_timeout: Duration,

    /// Pause after a sandbox is created, while the remote VM boots
    pub boot_delay: Duration,

    /// Extra pause before the first submission to a new sandbox
    pub warmup_delay: Duration,

    /// Pause before the event listener connects to the stream
    pub listener_delay: Duration,

    /// Upper bound on waiting for an execution to finish streaming
    pub output_timeout: Duration,

    /// Directory downloaded files are written to
    pub download_dir: PathBuf,

    /// Number of executions remembered for later downloads
    pub max_history: usize,
}

impl InterpreterConfig {
    /// Create a new configuration builder
    pub fn builder() -> InterpreterConfigBuilder {
        InterpreterConfigBuilder::default()
    }

    /// Load configuration from the process environment
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(agent_utils::env_var)
    }

    /// Load configuration through an environment lookup function
    ///
    /// A missing API key is a fatal configuration error.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut builder = Self::builder();

        if let Some(key) = lookup(API_KEY_ENV) {
            builder = builder.api_key(key);
        }
        if let Some(base) = lookup(BASE_URL_ENV) {
            builder = builder.base_url(base);
        }
        if let Some(secs) =
            agent_utils::parse_env_var::<u64, _>(&lookup, REQUEST_TIMEOUT_ENV).map_err(SandboxError::Config)?
        {
            builder = builder.request_timeout(Duration::from_secs(secs));
        }
        if let Some(secs) =
            agent_utils::parse_env_var::<u64, _>(&lookup, OUTPUT_TIMEOUT_ENV).map_err(SandboxError::Config)?
        {
            builder = builder.output_timeout(Duration::from_secs(secs));
        }
        if let Some(dir) = lookup(DOWNLOAD_DIR_ENV) {
            builder = builder.download_dir(dir);
        }

        builder.build()
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.api_key.trim().is_empty() {
            return Err(SandboxError::Config(format!(
                "{API_KEY_ENV} not set. Please set the {API_KEY_ENV} environment variable."
            )));
        }

        let url = Url::parse(&self.base_url).map_err(|e| {
            SandboxError::Config(format!("Invalid base URL '{}': {e}", self.base_url))
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(SandboxError::Config(format!(
                "Base URL must use http or https, got '{}'",
                url.scheme()
            )));
        }

        if self.max_history == 0 {
            return Err(SandboxError::Config(
                "max_history must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

// Hand-written so the API key never ends up in logs.
impl fmt::Debug for InterpreterConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InterpreterConfig")
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("request_timeout", &self.request_timeout)
            .field("connect_timeout", &self.connect_timeout)
            .field("boot_delay", &self.boot_delay)
            .field("warmup_delay", &self.warmup_delay)
            .field("listener_delay", &self.listener_delay)
            .field("output_timeout", &self.output_timeout)
            .field("download_dir", &self.download_dir)
            .field("max_history", &self.max_history)
            .finish()
    }
}

/// Builder for InterpreterConfig
#[derive(Debug, Default)]
pub struct InterpreterConfigBuilder {
    api_key: Option<String>,
    base_url: Option<String>,
    request_timeout: Option<Duration>,
    connect_timeout: Option<Duration>,
    boot_delay: Option<Duration>,
    warmup_delay: Option<Duration>,
    listener_delay: Option<Duration>,
    output_timeout: Option<Duration>,
    download_dir: Option<PathBuf>,
    max_history: Option<usize>,
}

impl InterpreterConfigBuilder {
    /// Set the API key
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Set the service base URL
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Set the request timeout
    pub fn request_timeout(mut self, duration: Duration) -> Self {
        self.request_timeout = Some(duration);
        self
    }

    /// Set the connect timeout
    pub fn connect_timeout(mut self, duration: Duration) -> Self {
        self.connect_timeout = Some(duration);
        self
    }

    /// Set the pause after sandbox creation
    pub fn boot_delay(mut self, duration: Duration) -> Self {
        self.boot_delay = Some(duration);
        self
    }

    /// Set the pause before the first submission to a new sandbox
    pub fn warmup_delay(mut self, duration: Duration) -> Self {
        self.warmup_delay = Some(duration);
        self
    }

    /// Set the pause before the listener connects
    pub fn listener_delay(mut self, duration: Duration) -> Self {
        self.listener_delay = Some(duration);
        self
    }

    /// Set the maximum wait for execution output
    pub fn output_timeout(mut self, duration: Duration) -> Self {
        self.output_timeout = Some(duration);
        self
    }

    /// Set the directory downloads are written to
    pub fn download_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.download_dir = Some(dir.into());
        self
    }

    /// Set how many executions are remembered
    pub fn max_history(mut self, max: usize) -> Self {
        self.max_history = Some(max);
        self
    }

    /// Zero every pause; used by tests against a local server
    pub fn no_delays(self) -> Self {
        self.boot_delay(Duration::ZERO)
            .warmup_delay(Duration::ZERO)
            .listener_delay(Duration::ZERO)
    }

    /// Build the configuration
    pub fn build(self) -> Result<InterpreterConfig> {
        let config = InterpreterConfig {
            api_key: self.api_key.unwrap_or_default(),
            base_url: self
                .base_url
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
            request_timeout: self.request_timeout.unwrap_or(Duration::from_secs(30)),
            connect_timeout: self.connect_timeout.unwrap_or(Duration::from_secs(10)),
            boot_delay: self.boot_delay.unwrap_or(Duration::from_secs(1)),
            warmup_delay: self.warmup_delay.unwrap_or(Duration::from_secs(5)),
            listener_delay: self.listener_delay.unwrap_or(Duration::from_secs(1)),
            output_timeout: self.output_timeout.unwrap_or(Duration::from_secs(30)),
            download_dir: self.download_dir.unwrap_or_else(|| PathBuf::from(".")),
            max_history: self.max_history.unwrap_or(16),
        };

        config.validate()?;
        Ok(config)
    }
}
