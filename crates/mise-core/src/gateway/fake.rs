//! Deterministic in-process gateway for tests and offline runs.

use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;

use super::{CompletionGateway, GatewayError};

/// One-day plan returned by [`FakeGateway::with_sample_responses`].
pub const SAMPLE_MEAL_PLAN: &str = r#"{
  "meals": [
    {
      "day": 1,
      "meal_type": "dinner",
      "recipe": {
        "name": "Vegetable Soup",
        "description": "A simple soup from whatever is in the crisper.",
        "instructions": "Chop the vegetables. Simmer in stock for 25 minutes.",
        "ingredients": [
          {"name": "Carrot", "quantity": 2, "unit": "pieces"},
          {"name": "Onion", "quantity": 1, "unit": "whole"},
          {"name": "Vegetable Stock", "quantity": 1.5, "unit": "l"}
        ]
      }
    }
  ]
}"#;

/// Suggestions returned by [`FakeGateway::with_sample_responses`].
pub const SAMPLE_SUGGESTIONS: &str = r#"[
  {
    "name": "Carrot Salad",
    "description": "Grated carrot with lemon.",
    "instructions": "Grate, dress, serve.",
    "prep_time": 10,
    "cook_time": 0,
    "servings": 2,
    "ingredients": [
      {"name": "Carrot", "quantity": 3, "unit": "pieces"},
      {"name": "Lemon", "quantity": 1, "unit": "whole"}
    ]
  }
]"#;

/// A gateway answering from a table of canned responses.
///
/// The first registered substring contained in the prompt selects the
/// response; otherwise the default response is used. Every prompt is
/// recorded so tests can assert on what was sent.
#[derive(Debug, Default)]
pub struct FakeGateway {
    responses: Vec<(String, String)>,
    default_response: Option<String>,
    delay: Option<Duration>,
    failure: Option<(u16, String)>,
    prompts: Mutex<Vec<String>>,
}

impl FakeGateway {
    /// A gateway with no responses; every call fails until one is added.
    pub fn new() -> Self {
        Self::default()
    }

    /// Answers meal-plan prompts with [`SAMPLE_MEAL_PLAN`] and suggestion or
    /// variation prompts with [`SAMPLE_SUGGESTIONS`].
    pub fn with_sample_responses() -> Self {
        Self::new()
            .with_response("Suggest", SAMPLE_SUGGESTIONS)
            .with_response("variations of this recipe", SAMPLE_SUGGESTIONS)
            .with_default_response(SAMPLE_MEAL_PLAN)
    }

    /// Return `response` for prompts containing `prompt_contains`.
    pub fn with_response(mut self, prompt_contains: &str, response: &str) -> Self {
        self.responses
            .push((prompt_contains.to_string(), response.to_string()));
        self
    }

    /// Response used when no registered substring matches.
    pub fn with_default_response(mut self, response: &str) -> Self {
        self.default_response = Some(response.to_string());
        self
    }

    /// Sleep before answering.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Fail every call with a `BadStatus` error.
    pub fn with_failure(mut self, status: u16, message: &str) -> Self {
        self.failure = Some((status, message.to_string()));
        self
    }

    /// Prompts received so far, oldest first.
    pub fn prompts(&self) -> Vec<String> {
        self.prompts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl CompletionGateway for FakeGateway {
    async fn generate(&self, prompt: &str) -> Result<String, GatewayError> {
        self.prompts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(prompt.to_string());

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        if let Some((status, message)) = &self.failure {
            return Err(GatewayError::BadStatus {
                status: *status,
                message: message.clone(),
            });
        }

        self.responses
            .iter()
            .find(|(needle, _)| prompt.contains(needle.as_str()))
            .map(|(_, response)| response.clone())
            .or_else(|| self.default_response.clone())
            .ok_or_else(|| {
                GatewayError::InvalidResponse("no fake response registered for prompt".to_string())
            })
    }

    fn model_name(&self) -> &str {
        "fake"
    }
}
