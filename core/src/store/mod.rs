//! Data-access boundary. The core never caches rows across calls — every
//! operation re-reads current state through this trait. No multi-row
//! transaction is assumed; each call commits independently, and both
//! implementations give read-your-writes within a single pipeline execution.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::model::{
    Alert, ChatMessage, NewAlert, NewChatMessage, NewTask, Shift, ShiftSummary, Task, TaskStatus,
};

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("store query failed: {0}")]
    Query(#[from] sqlx::Error),

    /// A row came back with a value the domain cannot represent
    /// (e.g. an unknown status string).
    #[error("malformed row: {0}")]
    Decode(String),
}

#[async_trait]
pub trait Store: Send + Sync {
    /// Connectivity probe for health reporting.
    async fn ping(&self) -> Result<(), StoreError>;

    async fn active_shift(&self) -> Result<Option<Shift>, StoreError>;
    async fn shift_by_id(&self, id: Uuid) -> Result<Option<Shift>, StoreError>;
    /// All shifts ordered by `sequence_order` — the rotation ring.
    async fn shifts_by_sequence(&self) -> Result<Vec<Shift>, StoreError>;
    async fn set_shift_active(&self, id: Uuid, is_active: bool) -> Result<(), StoreError>;
    async fn update_shift_risk(
        &self,
        id: Uuid,
        risk_score: i32,
        is_high_risk: bool,
    ) -> Result<(), StoreError>;

    async fn tasks_for_shift(&self, shift_id: Uuid) -> Result<Vec<Task>, StoreError>;
    async fn task_by_id(&self, id: Uuid) -> Result<Option<Task>, StoreError>;
    async fn task_by_code(&self, task_code: &str) -> Result<Option<Task>, StoreError>;
    async fn insert_task(&self, task: NewTask) -> Result<Task, StoreError>;
    async fn set_task_status(
        &self,
        id: Uuid,
        status: TaskStatus,
        completed_at: Option<DateTime<Utc>>,
    ) -> Result<(), StoreError>;

    async fn alerts_for_shift(&self, shift_id: Uuid) -> Result<Vec<Alert>, StoreError>;
    async fn active_alerts_for_shift(&self, shift_id: Uuid) -> Result<Vec<Alert>, StoreError>;
    async fn insert_alert(&self, alert: NewAlert) -> Result<Alert, StoreError>;

    async fn insert_chat_message(
        &self,
        message: NewChatMessage,
    ) -> Result<ChatMessage, StoreError>;

    async fn insert_shift_summary(&self, summary: ShiftSummary) -> Result<(), StoreError>;
}
