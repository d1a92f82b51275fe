//! Anthropic-backed risk advisor
//!
//! Sends the escalation context to the Anthropic Messages API and parses
//! the model's verdict. The first line of the reply must start with
//! OVERRIDE_CONTINUE or CONFIRM_HALT; anything else is unparseable and
//! resolves to a halt upstream.

use super::{AdvisorContext, AdvisorError, AdvisorVerdict, OverrideDecision, RiskAdvisor};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

const OVERRIDE_PROMPT: &str = "You are the risk-control reviewer for an automated trading system.\n\
A configured limit has been breached and trading is about to halt.\n\
Review the state below and decide whether the halt should be overridden.\n\
\n\
Be conservative with loss breaches: only recommend continuing on strong\n\
reversal evidence. Gain breaches may continue on sustained momentum.\n\
\n\
State:\n\
{state}\n\
\n\
Reply with a first line of exactly OVERRIDE_CONTINUE or CONFIRM_HALT,\n\
followed by your reasoning.";

/// Configuration for the Anthropic advisor
#[derive(Debug, Clone, Deserialize)]
pub struct AdvisorConfig {
    /// Messages API endpoint
    #[serde(default = "default_api_url")]
    pub api_url: String,
    /// Model identifier
    #[serde(default = "default_model")]
    pub model: String,
    /// Maximum response tokens
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    /// Sampling temperature
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    /// Request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_api_url() -> String {
    "https://api.anthropic.com/v1/messages".to_string()
}
fn default_model() -> String {
    "claude-3-5-haiku-latest".to_string()
}
fn default_max_tokens() -> u32 {
    1024
}
fn default_temperature() -> f32 {
    0.7
}
fn default_timeout_secs() -> u64 {
    30
}

impl Default for AdvisorConfig {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            model: default_model(),
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Risk advisor backed by the Anthropic Messages API
pub struct AnthropicAdvisor {
    config: AdvisorConfig,
    api_key: String,
    client: Client,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(default)]
    text: String,
}

impl AnthropicAdvisor {
    /// Create a new advisor client
    pub fn new(config: AdvisorConfig, api_key: impl Into<String>) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            config,
            api_key: api_key.into(),
            client,
        }
    }

    fn build_prompt(context: &AdvisorContext) -> String {
        let state = serde_json::to_string_pretty(context)
            .unwrap_or_else(|_| "unserializable context".to_string());
        OVERRIDE_PROMPT.replace("{state}", &state)
    }
}

/// Parse a model reply into a verdict
pub(crate) fn parse_verdict(text: &str) -> Result<AdvisorVerdict, AdvisorError> {
    let mut lines = text.trim().lines();
    let first = lines.next().unwrap_or_default().trim();
    let rationale = lines.collect::<Vec<_>>().join("\n").trim().to_string();

    let decision = if first.starts_with("OVERRIDE_CONTINUE") {
        OverrideDecision::OverrideContinue
    } else if first.starts_with("CONFIRM_HALT") {
        OverrideDecision::ConfirmHalt
    } else {
        return Err(AdvisorError::Unparseable(format!(
            "unexpected first line: {:?}",
            first
        )));
    };

    Ok(AdvisorVerdict {
        decision,
        rationale: if rationale.is_empty() {
            first.to_string()
        } else {
            rationale
        },
    })
}

#[async_trait]
impl RiskAdvisor for AnthropicAdvisor {
    async fn ask(&self, context: &AdvisorContext) -> Result<AdvisorVerdict, AdvisorError> {
        let body = serde_json::json!({
            "model": self.config.model,
            "max_tokens": self.config.max_tokens,
            "temperature": self.config.temperature,
            "messages": [{
                "role": "user",
                "content": Self::build_prompt(context),
            }],
        });

        let response = self
            .client
            .post(&self.config.api_url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", "2023-06-01")
            .json(&body)
            .send()
            .await
            .map_err(|e| AdvisorError::Unreachable(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            return Err(AdvisorError::Unreachable(format!(
                "advisor API status {}",
                status
            )));
        }

        let message: MessagesResponse = response
            .json()
            .await
            .map_err(|e| AdvisorError::Unparseable(e.to_string()))?;

        let text = message
            .content
            .first()
            .map(|block| block.text.as_str())
            .unwrap_or_default();

        parse_verdict(text)
    }
}
