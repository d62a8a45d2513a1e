// src/core/narrative.rs

//! Narrative analysis of a finding list.
//!
//! With a credential configured the findings are sent to an OpenAI-compatible
//! chat-completions endpoint. Without one, or when that call fails for any
//! reason, [`local_analysis`] produces a deterministic narrative instead.

use crate::core::error::SummarizerError;
use crate::core::models::{NarrativeAnalysis, NarrativeSections, Vulnerability};
use crate::core::risk;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{error, info, warn};

pub const DEFAULT_ENDPOINT: &str = "https://api.openai.com/v1/chat/completions";
pub const DEFAULT_MODEL: &str = "gpt-3.5-turbo";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
const MAX_TOKENS: u32 = 1000;

const SECTION_KEYS: [&str; 4] = ["risk_assessment", "priority_recommendations", "executive_summary", "remediation_steps"];

/// An external text generator turning findings into prose.
#[async_trait]
pub trait Summarizer: Send + Sync {
    async fn summarize(&self, target: &str, vulnerabilities: &[Vulnerability]) -> Result<String, SummarizerError>;
}

/// Where and how to reach the chat-completions endpoint.
#[derive(Debug, Clone)]
pub struct SummarizerSettings {
    pub endpoint: String,
    pub model: String,
    pub timeout: Duration,
}

impl Default for SummarizerSettings {
    fn default() -> Self {
        Self { endpoint: DEFAULT_ENDPOINT.to_string(), model: DEFAULT_MODEL.to_string(), timeout: DEFAULT_TIMEOUT }
    }
}

// --- Chat completions wire format ---

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 1],
    max_tokens: u32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Deserialize)]
struct ChatReply {
    content: Option<String>,
}

/// Bearer-authenticated chat-completions client.
pub struct ChatCompletionSummarizer {
    client: reqwest::Client,
    endpoint: String,
    model: String,
    api_key: String,
}

impl ChatCompletionSummarizer {
    pub fn new(settings: &SummarizerSettings, api_key: impl Into<String>) -> Result<Self, SummarizerError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("VanguardRecon/", env!("CARGO_PKG_VERSION")))
            .timeout(settings.timeout)
            .no_proxy()
            .build()?;
        Ok(Self {
            client,
            endpoint: settings.endpoint.clone(),
            model: settings.model.clone(),
            api_key: api_key.into(),
        })
    }
}

#[async_trait]
impl Summarizer for ChatCompletionSummarizer {
    async fn summarize(&self, target: &str, vulnerabilities: &[Vulnerability]) -> Result<String, SummarizerError> {
        let prompt = build_prompt(target, vulnerabilities);
        let request = ChatRequest {
            model: &self.model,
            messages: [ChatMessage { role: "user", content: &prompt }],
            max_tokens: MAX_TOKENS,
        };

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(SummarizerError::Status(response.status()));
        }

        let body: ChatResponse = response.json().await?;
        body.choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or(SummarizerError::EmptyReply)
    }
}

fn build_prompt(target: &str, vulnerabilities: &[Vulnerability]) -> String {
    let findings = serde_json::to_string_pretty(vulnerabilities).unwrap_or_else(|_| "[]".to_string());
    format!(
        "Analyze the following network penetration test results for target {target}:\n\n\
         Vulnerabilities found:\n{findings}\n\n\
         Please provide:\n\
         1. Overall risk assessment\n\
         2. Priority recommendations\n\
         3. Executive summary\n\
         4. Detailed remediation steps\n\n\
         Format the response as JSON with keys: {}",
        SECTION_KEYS.join(", ")
    )
}

/// Interprets summarizer text.
///
/// A JSON object (optionally inside a Markdown code fence) carrying at least one
/// of the four section keys becomes [`NarrativeAnalysis::Sections`]. Anything
/// else is kept verbatim as [`NarrativeAnalysis::Raw`].
pub fn parse_narrative(reply: &str) -> NarrativeAnalysis {
    let body = strip_code_fence(reply);
    if let Ok(Value::Object(map)) = serde_json::from_str::<Value>(body) {
        if SECTION_KEYS.iter().any(|key| map.contains_key(*key)) {
            if let Ok(sections) = serde_json::from_value::<NarrativeSections>(Value::Object(map)) {
                return NarrativeAnalysis::Sections(sections);
            }
        }
    }
    NarrativeAnalysis::Raw { analysis: reply.to_string() }
}

fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(fenced) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop the info string ("json") on the opening line.
    let body = fenced.split_once('\n').map_or("", |(_, body)| body);
    body.trim_end().strip_suffix("```").unwrap_or(body).trim()
}

/// Deterministic narrative computed from the findings alone.
pub fn local_analysis(target: &str, vulnerabilities: &[Vulnerability]) -> NarrativeAnalysis {
    let summary = risk::aggregate(vulnerabilities);
    let counts = summary.severity_summary;
    let risk_level = if summary.mean > 7.0 {
        "High"
    } else if summary.mean > 4.0 {
        "Medium"
    } else {
        "Low"
    };

    NarrativeAnalysis::Sections(NarrativeSections {
        risk_assessment: format!("Overall risk score: {:.1}/10", summary.risk_score),
        priority_recommendations: vec![
            format!("Address {} critical vulnerabilities immediately", counts.critical),
            format!("Address {} high-risk vulnerabilities within 24 hours", counts.high),
            format!("Address {} medium-risk vulnerabilities within 1 week", counts.medium),
        ],
        executive_summary: format!(
            "Scan of {target} revealed {} vulnerabilities. Risk level: {risk_level}",
            vulnerabilities.len()
        ),
        remediation_steps: vulnerabilities
            .iter()
            .filter(|v| !v.remediation.is_empty())
            .map(|v| v.remediation.clone())
            .collect(),
    })
}

/// Holds the optional summarizer and falls back to [`local_analysis`].
pub struct Narrator {
    settings: SummarizerSettings,
    summarizer: RwLock<Option<Arc<dyn Summarizer>>>,
}

impl Narrator {
    pub fn new(settings: SummarizerSettings) -> Self {
        Self { settings, summarizer: RwLock::new(None) }
    }

    /// Configures the chat-completions summarizer. An empty key unconfigures it.
    pub async fn set_credential(&self, api_key: &str) -> Result<(), SummarizerError> {
        let api_key = api_key.trim();
        if api_key.is_empty() {
            *self.summarizer.write().await = None;
            info!("Summarizer credential cleared.");
            return Ok(());
        }
        let summarizer = ChatCompletionSummarizer::new(&self.settings, api_key)?;
        *self.summarizer.write().await = Some(Arc::new(summarizer));
        info!(endpoint = %self.settings.endpoint, model = %self.settings.model, "Summarizer configured.");
        Ok(())
    }

    /// Installs any summarizer implementation.
    pub async fn set_summarizer(&self, summarizer: Arc<dyn Summarizer>) {
        *self.summarizer.write().await = Some(summarizer);
    }

    pub async fn is_configured(&self) -> bool {
        self.summarizer.read().await.is_some()
    }

    /// Narrative for `vulnerabilities`. Never fails: every summarizer error ends
    /// in the local analysis.
    pub async fn analyze(&self, target: &str, vulnerabilities: &[Vulnerability]) -> NarrativeAnalysis {
        match self.summarize(target, vulnerabilities).await {
            Ok(reply) => parse_narrative(&reply),
            Err(SummarizerError::NotConfigured) => {
                warn!("Summarizer credential not set, using local analysis.");
                local_analysis(target, vulnerabilities)
            }
            Err(e) => {
                error!(target = %target, error = %e, "Summarizer failed, using local analysis.");
                local_analysis(target, vulnerabilities)
            }
        }
    }

    async fn summarize(&self, target: &str, vulnerabilities: &[Vulnerability]) -> Result<String, SummarizerError> {
        let summarizer = self.summarizer.read().await.clone().ok_or(SummarizerError::NotConfigured)?;
        tokio::time::timeout(self.settings.timeout, summarizer.summarize(target, vulnerabilities))
            .await
            .map_err(|_| SummarizerError::Timeout(self.settings.timeout))?
    }
}
