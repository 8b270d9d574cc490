//! Best-effort narrative generation at shift close. The generator returns a
//! typed `Result`; the lifecycle substitutes [`FALLBACK_SUMMARY`] on any error
//! instead of letting a generation failure reach the caller.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::model::ShiftMetrics;

/// Stored in place of the AI narrative when generation fails.
pub const FALLBACK_SUMMARY: &str = "AI summary unavailable due to generation error.";

const GEMINI_MODEL: &str = "gemini-2.0-flash";
const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/models";

#[derive(Debug, thiserror::Error)]
pub enum SummaryError {
    #[error("summary request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("summary generator is not configured")]
    NotConfigured,

    #[error("summary response was unusable: {0}")]
    Contract(String),
}

#[async_trait]
pub trait SummaryGenerator: Send + Sync {
    async fn summarize(&self, metrics: &ShiftMetrics) -> Result<String, SummaryError>;
}

/// The prompt is built strictly from the counters; the model is told not to
/// invent or speculate.
pub fn build_prompt(metrics: &ShiftMetrics) -> String {
    format!(
        "You are a hospital operations analyst.\n\n\
         Shift Summary Data:\n\
         Total Tasks: {}\n\
         Completed Tasks: {}\n\
         Blocked Tasks: {}\n\
         Pending Tasks: {}\n\
         Active Alerts: {}\n\
         Final Risk Score: {}/10\n\n\
         Write a concise 3-sentence professional shift performance summary.\n\
         Do not invent data.\n\
         Do not speculate.\n\
         Only describe based on numbers provided.",
        metrics.total_tasks,
        metrics.completed_tasks,
        metrics.blocked_tasks,
        metrics.pending_tasks,
        metrics.alerts_count,
        metrics.final_risk_score
    )
}

#[derive(Serialize)]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    #[serde(rename = "generationConfig")]
    generation_config: GeminiGenerationConfig,
}

#[derive(Serialize)]
struct GeminiContent {
    role: String,
    parts: Vec<GeminiPart>,
}

#[derive(Serialize, Deserialize)]
struct GeminiPart {
    text: String,
}

#[derive(Serialize)]
struct GeminiGenerationConfig {
    temperature: f64,
    #[serde(rename = "topP")]
    top_p: f64,
    #[serde(rename = "topK")]
    top_k: i32,
    #[serde(rename = "maxOutputTokens")]
    max_output_tokens: i32,
    #[serde(rename = "responseMimeType")]
    response_mime_type: String,
}

#[derive(Deserialize)]
struct GeminiResponse {
    candidates: Vec<GeminiCandidate>,
}

#[derive(Deserialize)]
struct GeminiCandidate {
    content: GeminiCandidateContent,
}

#[derive(Deserialize)]
struct GeminiCandidateContent {
    parts: Vec<GeminiPart>,
}

fn first_text(response: GeminiResponse) -> Result<String, SummaryError> {
    response
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content.parts.into_iter().next())
        .map(|p| p.text.trim().to_string())
        .filter(|t| !t.is_empty())
        .ok_or_else(|| SummaryError::Contract("no text candidate in response".to_string()))
}

/// Gemini-backed generator. Low temperature for factual reporting; one
/// bounded request per shift close.
pub struct GeminiSummaryGenerator {
    client: reqwest::Client,
    api_key: String,
}

impl GeminiSummaryGenerator {
    pub fn new(api_key: impl Into<String>, timeout: Duration) -> Result<Self, SummaryError> {
        Ok(Self {
            client: reqwest::Client::builder().timeout(timeout).build()?,
            api_key: api_key.into(),
        })
    }
}

#[async_trait]
impl SummaryGenerator for GeminiSummaryGenerator {
    async fn summarize(&self, metrics: &ShiftMetrics) -> Result<String, SummaryError> {
        let url = format!(
            "{GEMINI_API_BASE}/{GEMINI_MODEL}:generateContent?key={}",
            self.api_key
        );
        let request = GeminiRequest {
            contents: vec![GeminiContent {
                role: "user".to_string(),
                parts: vec![GeminiPart {
                    text: build_prompt(metrics),
                }],
            }],
            generation_config: GeminiGenerationConfig {
                temperature: 0.2,
                top_p: 0.95,
                top_k: 40,
                max_output_tokens: 1024,
                response_mime_type: "text/plain".to_string(),
            },
        };

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await?
            .error_for_status()?
            .json::<GeminiResponse>()
            .await?;

        first_text(response)
    }
}

/// Stand-in used when no API key is configured: every shift close takes the
/// fallback path instead of failing at startup.
pub struct DisabledSummaryGenerator;

#[async_trait]
impl SummaryGenerator for DisabledSummaryGenerator {
    async fn summarize(&self, _metrics: &ShiftMetrics) -> Result<String, SummaryError> {
        Err(SummaryError::NotConfigured)
    }
}
