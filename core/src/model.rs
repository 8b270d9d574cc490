use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// How urgent a task is. Set once at creation (chat-created tasks are always
/// MEDIUM — priority never comes from the classifier) and only changed by
/// explicit overrides.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskPriority {
    Low,
    Medium,
    High,
    Critical,
}

impl TaskPriority {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskPriority::Low => "LOW",
            TaskPriority::Medium => "MEDIUM",
            TaskPriority::High => "HIGH",
            TaskPriority::Critical => "CRITICAL",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "LOW" => Some(TaskPriority::Low),
            "MEDIUM" => Some(TaskPriority::Medium),
            "HIGH" => Some(TaskPriority::High),
            "CRITICAL" => Some(TaskPriority::Critical),
            _ => None,
        }
    }

    /// Display rank for task listings: CRITICAL first, LOW last.
    pub fn display_rank(&self) -> u8 {
        match self {
            TaskPriority::Critical => 0,
            TaskPriority::High => 1,
            TaskPriority::Medium => 2,
            TaskPriority::Low => 3,
        }
    }
}

/// Task lifecycle. DONE is terminal — every status change goes through the
/// transition gate, which rejects any mutation of a completed task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskStatus {
    Todo,
    InProgress,
    Blocked,
    Done,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Todo => "TODO",
            TaskStatus::InProgress => "IN_PROGRESS",
            TaskStatus::Blocked => "BLOCKED",
            TaskStatus::Done => "DONE",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "TODO" => Some(TaskStatus::Todo),
            "IN_PROGRESS" => Some(TaskStatus::InProgress),
            "BLOCKED" => Some(TaskStatus::Blocked),
            "DONE" => Some(TaskStatus::Done),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AlertType {
    Block,
    Emergency,
}

impl AlertType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertType::Block => "BLOCK",
            AlertType::Emergency => "EMERGENCY",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "BLOCK" => Some(AlertType::Block),
            "EMERGENCY" => Some(AlertType::Emergency),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MessageType {
    User,
    System,
}

impl MessageType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageType::User => "USER",
            MessageType::System => "SYSTEM",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "USER" => Some(MessageType::User),
            "SYSTEM" => Some(MessageType::System),
            _ => None,
        }
    }
}

/// A bounded operational period. Exactly one shift is active system-wide;
/// `risk_score` and `is_high_risk` are derived values, overwritten on every
/// risk evaluation and never edited anywhere else.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Shift {
    pub id: Uuid,
    pub name: String,
    pub is_active: bool,
    /// Derived risk score, always in 0..=10.
    pub risk_score: i32,
    pub is_high_risk: bool,
    /// Position in the rotation ring.
    pub sequence_order: i32,
}

/// A unit of operational work belonging to a shift.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Task {
    pub id: Uuid,
    pub shift_id: Uuid,
    /// Store-generated human-facing code, e.g. "T-17".
    pub task_code: String,
    pub title: String,
    pub status: TaskStatus,
    pub priority: TaskPriority,
    pub assigned_to: String,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    /// Set only while the task is DONE, cleared on any other status.
    pub completed_at: Option<DateTime<Utc>>,
}

/// A standing risk signal. Stays active until an external collaborator
/// resolves the underlying blocker; the risk evaluator only reads `is_active`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Alert {
    pub id: Uuid,
    pub shift_id: Uuid,
    pub task_id: Option<Uuid>,
    pub alert_type: AlertType,
    pub weight: i32,
    pub message: String,
    pub is_active: bool,
}

/// One row of the shift chat. SYSTEM-typed rows are the escalation and
/// rotation audit trail: append-only, never mutated.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ChatMessage {
    pub id: Uuid,
    pub shift_id: Uuid,
    /// None for system messages.
    pub sender_id: Option<String>,
    pub message_text: String,
    pub message_type: MessageType,
}

/// Append-only snapshot written once per shift close.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ShiftSummary {
    pub shift_id: Uuid,
    pub total_tasks: i32,
    pub completed_tasks: i32,
    pub blocked_tasks: i32,
    pub pending_tasks: i32,
    pub alerts_count: i32,
    pub final_risk_score: i32,
    pub ai_summary: String,
}

/// Aggregate counters handed to the summary generator at shift close.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ShiftMetrics {
    pub total_tasks: i32,
    pub completed_tasks: i32,
    pub blocked_tasks: i32,
    pub pending_tasks: i32,
    pub alerts_count: i32,
    pub final_risk_score: i32,
}

/// Insert payload for a task. `id`, `task_code` and `created_at` are
/// store-generated.
#[derive(Debug, Clone)]
pub struct NewTask {
    pub shift_id: Uuid,
    pub title: String,
    pub status: TaskStatus,
    pub priority: TaskPriority,
    pub assigned_to: String,
    pub created_by: String,
}

#[derive(Debug, Clone)]
pub struct NewAlert {
    pub shift_id: Uuid,
    pub task_id: Option<Uuid>,
    pub alert_type: AlertType,
    pub weight: i32,
    pub message: String,
    pub is_active: bool,
}

#[derive(Debug, Clone)]
pub struct NewChatMessage {
    pub shift_id: Uuid,
    pub sender_id: Option<String>,
    pub message_text: String,
    pub message_type: MessageType,
}

/// Order tasks for display: priority rank (CRITICAL first), then creation time.
pub fn sort_for_display(tasks: &mut [Task]) {
    tasks.sort_by(|a, b| {
        a.priority
            .display_rank()
            .cmp(&b.priority.display_rank())
            .then(a.created_at.cmp(&b.created_at))
    });
}
