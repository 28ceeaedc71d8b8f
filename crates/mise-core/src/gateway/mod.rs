//! Completion gateway: the boundary around the external text-generation
//! service.
//!
//! A gateway takes a prompt and returns the model's raw text verbatim. It
//! never parses, repairs or retries; callers decide what to do with the
//! payload and with failures.

mod fake;
mod openai;

pub use fake::FakeGateway;
pub use openai::OpenAiGateway;

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

/// Default OpenAI-compatible API root.
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
/// Default model identifier.
pub const DEFAULT_MODEL: &str = "gpt-4";
/// Default bound on a single completion call.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Failures at the completion boundary.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("completion service unreachable: {0}")]
    Unreachable(String),

    #[error("completion service timed out after {}s", .0.as_secs())]
    Timeout(Duration),

    #[error("completion service returned {status}: {message}")]
    BadStatus { status: u16, message: String },

    #[error("completion service returned an unusable response: {0}")]
    InvalidResponse(String),

    #[error("completion provider not configured: {0}")]
    NotConfigured(String),
}

/// A text-completion backend.
#[async_trait]
pub trait CompletionGateway: Send + Sync + fmt::Debug {
    /// Send `prompt` and return the model's text response unchanged.
    async fn generate(&self, prompt: &str) -> Result<String, GatewayError>;

    /// Model identifier sent with each request.
    fn model_name(&self) -> &str;
}

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Which gateway implementation to build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProviderKind {
    #[default]
    OpenAi,
    Fake,
}

impl ProviderKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::OpenAi => "openai",
            Self::Fake => "fake",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderKind {
    type Err = GatewayError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "openai" => Ok(Self::OpenAi),
            "fake" => Ok(Self::Fake),
            other => Err(GatewayError::NotConfigured(format!(
                "unknown provider {other:?} (expected openai or fake)"
            ))),
        }
    }
}

/// Resolved gateway settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayConfig {
    pub provider: ProviderKind,
    pub base_url: String,
    pub model: String,
    pub api_key: Option<String>,
    pub timeout: Duration,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            provider: ProviderKind::default(),
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            api_key: None,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

/// Build the gateway described by `config`.
///
/// The OpenAI provider requires an API key. The fake provider answers with
/// canned sample payloads and needs nothing.
pub fn gateway_from_config(
    config: &GatewayConfig,
) -> Result<Arc<dyn CompletionGateway>, GatewayError> {
    match config.provider {
        ProviderKind::Fake => Ok(Arc::new(FakeGateway::with_sample_responses())),
        ProviderKind::OpenAi => {
            let api_key = config
                .api_key
                .as_deref()
                .filter(|k| !k.trim().is_empty())
                .ok_or_else(|| {
                    GatewayError::NotConfigured("no API key for the openai provider".to_string())
                })?;
            let gateway =
                OpenAiGateway::new(&config.base_url, api_key, &config.model, config.timeout)?;
            Ok(Arc::new(gateway))
        }
    }
}
