//! Classification boundary. The intent/priority labels come from an external
//! text-classification service; entity extraction is deterministic and lives
//! here. The classifier is constructed once at startup and injected — no
//! hidden process-wide singleton.

use std::sync::LazyLock;
use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::CoreError;
use crate::model::TaskPriority;

/// Classifier results below this confidence never reach the mutation router.
pub const CONFIDENCE_FLOOR: f64 = 0.60;

/// The classified purpose of an inbound message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Intent {
    CreateTask,
    CompleteTask,
    BlockTask,
    Alert,
}

impl Intent {
    pub fn as_str(&self) -> &'static str {
        match self {
            Intent::CreateTask => "CREATE_TASK",
            Intent::CompleteTask => "COMPLETE_TASK",
            Intent::BlockTask => "BLOCK_TASK",
            Intent::Alert => "ALERT",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "CREATE_TASK" => Some(Intent::CreateTask),
            "COMPLETE_TASK" => Some(Intent::CompleteTask),
            "BLOCK_TASK" => Some(Intent::BlockTask),
            "ALERT" => Some(Intent::Alert),
            _ => None,
        }
    }
}

/// Structured signals pulled out of the message text.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct Entities {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assigned_to: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub task_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub block_reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alert_message: Option<String>,
}

/// Classifier output contract. Tagged the same way the model service reports
/// it: either a too-vague rejection or a scored intent with entities.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum Classification {
    Invalid {
        message: String,
    },
    Success {
        intent: Intent,
        confidence: f64,
        #[serde(skip_serializing_if = "Option::is_none")]
        priority: Option<TaskPriority>,
        entities: Entities,
    },
}

/// A classification that passed the pipeline gate and may drive a mutation.
#[derive(Debug, Clone)]
pub struct AdmittedMessage {
    pub intent: Intent,
    pub confidence: f64,
    pub priority: Option<TaskPriority>,
    pub entities: Entities,
}

/// Gate between classification and mutation: too-vague results and scores
/// below [`CONFIDENCE_FLOOR`] are rejected here, before any store access.
pub fn admit(classification: Classification) -> Result<AdmittedMessage, CoreError> {
    match classification {
        Classification::Invalid { .. } => Err(CoreError::VagueMessage),
        Classification::Success {
            intent,
            confidence,
            priority,
            entities,
        } => {
            if confidence < CONFIDENCE_FLOOR {
                return Err(CoreError::LowConfidence(confidence));
            }
            Ok(AdmittedMessage {
                intent,
                confidence,
                priority,
                entities,
            })
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ClassifierError {
    #[error("classifier request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("classifier returned an unusable result: {0}")]
    Contract(String),
}

#[async_trait]
pub trait Classifier: Send + Sync {
    async fn classify(&self, text: &str) -> Result<Classification, ClassifierError>;
}

static MENTION_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"@\w+").unwrap());
static TASK_CODE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)T-\d+").unwrap());
static BLOCK_SPLIT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)due to|because").unwrap());

/// First `@name` mention, with the `@` stripped.
pub fn extract_mention(text: &str) -> Option<String> {
    MENTION_RE
        .find(text)
        .map(|m| m.as_str().trim_start_matches('@').to_string())
}

/// First `T-<digits>` token, uppercased.
pub fn extract_task_code(text: &str) -> Option<String> {
    TASK_CODE_RE.find(text).map(|m| m.as_str().to_uppercase())
}

/// Text with mentions removed and whitespace trimmed — what the model sees,
/// and what becomes the task title or alert message.
pub fn clean_text(text: &str) -> String {
    MENTION_RE.replace_all(text, "").trim().to_string()
}

/// The part of the message after the first "due to"/"because".
pub fn extract_block_reason(cleaned: &str) -> String {
    let mut parts = BLOCK_SPLIT_RE.splitn(cleaned, 2);
    let _ = parts.next();
    match parts.next() {
        Some(reason) if !reason.trim().is_empty() => reason.trim().to_string(),
        _ => "Unspecified operational blocker".to_string(),
    }
}

/// Build the entity set for an intent from the raw and cleaned text.
pub fn extract_entities(intent: Intent, text: &str, cleaned: &str) -> Entities {
    let mut entities = Entities::default();
    match intent {
        Intent::CreateTask => {
            entities.assigned_to = extract_mention(text);
            entities.title = Some(cleaned.to_string());
        }
        Intent::CompleteTask => {
            entities.task_code = extract_task_code(text);
        }
        Intent::BlockTask => {
            entities.task_code = extract_task_code(text);
            entities.block_reason = Some(extract_block_reason(cleaned));
        }
        Intent::Alert => {
            entities.alert_message = Some(cleaned.to_string());
        }
    }
    entities
}

#[derive(Serialize)]
struct LabelRequest<'a> {
    text: &'a str,
}

#[derive(Deserialize)]
struct LabelResponse {
    label: String,
    score: f64,
}

/// Client for the model-serving sidecar hosting the intent and priority
/// classification heads. Calls are bounded by a hard timeout; a stalled model
/// must not stall the chat pipeline.
pub struct RemoteClassifier {
    client: reqwest::Client,
    base_url: String,
}

impl RemoteClassifier {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, ClassifierError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }

    async fn label(&self, endpoint: &str, text: &str) -> Result<LabelResponse, ClassifierError> {
        let url = format!("{}/{}", self.base_url.trim_end_matches('/'), endpoint);
        let response = self
            .client
            .post(&url)
            .json(&LabelRequest { text })
            .send()
            .await?
            .error_for_status()?;
        Ok(response.json::<LabelResponse>().await?)
    }
}

#[async_trait]
impl Classifier for RemoteClassifier {
    async fn classify(&self, text: &str) -> Result<Classification, ClassifierError> {
        if text.trim().chars().count() < 3 {
            return Ok(Classification::Invalid {
                message: "Text too short".to_string(),
            });
        }

        let cleaned = clean_text(text);

        let intent_res = self.label("intent", &cleaned).await?;
        let intent = Intent::parse(&intent_res.label).ok_or_else(|| {
            ClassifierError::Contract(format!("unknown intent label '{}'", intent_res.label))
        })?;

        // The priority head only runs where the original pipeline ran it.
        let priority = match intent {
            Intent::CreateTask | Intent::Alert => {
                let prio_res = self.label("priority", &cleaned).await?;
                Some(TaskPriority::parse(&prio_res.label).ok_or_else(|| {
                    ClassifierError::Contract(format!(
                        "unknown priority label '{}'",
                        prio_res.label
                    ))
                })?)
            }
            _ => None,
        };

        let entities = extract_entities(intent, text, &cleaned);

        Ok(Classification::Success {
            intent,
            confidence: intent_res.score,
            priority,
            entities,
        })
    }
}
