//! In-memory store used by tests and local development. Same observable
//! semantics as the Postgres store, including store-generated task codes.
//! `set_failing(true)` makes every call report the store as unreachable so
//! failure containment can be exercised.

use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::{Store, StoreError};
use crate::model::{
    Alert, ChatMessage, NewAlert, NewChatMessage, NewTask, Shift, ShiftSummary, Task, TaskStatus,
};

#[derive(Default)]
struct Tables {
    shifts: Vec<Shift>,
    tasks: Vec<Task>,
    alerts: Vec<Alert>,
    chat_messages: Vec<ChatMessage>,
    shift_summaries: Vec<ShiftSummary>,
    task_code_seq: u64,
    failing: bool,
}

#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// When set, every store call fails with `StoreError::Unavailable`.
    pub fn set_failing(&self, failing: bool) {
        self.tables.lock().unwrap().failing = failing;
    }

    /// Seed a shift row directly, bypassing the trait surface.
    pub fn seed_shift(&self, shift: Shift) {
        self.tables.lock().unwrap().shifts.push(shift);
    }

    pub fn chat_messages(&self) -> Vec<ChatMessage> {
        self.tables.lock().unwrap().chat_messages.clone()
    }

    pub fn shift_summaries(&self) -> Vec<ShiftSummary> {
        self.tables.lock().unwrap().shift_summaries.clone()
    }

    pub fn alerts(&self) -> Vec<Alert> {
        self.tables.lock().unwrap().alerts.clone()
    }

    pub fn tasks(&self) -> Vec<Task> {
        self.tables.lock().unwrap().tasks.clone()
    }

    fn guard(tables: &Tables) -> Result<(), StoreError> {
        if tables.failing {
            return Err(StoreError::Unavailable("injected failure".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn ping(&self) -> Result<(), StoreError> {
        let tables = self.tables.lock().unwrap();
        Self::guard(&tables)
    }

    async fn active_shift(&self) -> Result<Option<Shift>, StoreError> {
        let tables = self.tables.lock().unwrap();
        Self::guard(&tables)?;
        Ok(tables.shifts.iter().find(|s| s.is_active).cloned())
    }

    async fn shift_by_id(&self, id: Uuid) -> Result<Option<Shift>, StoreError> {
        let tables = self.tables.lock().unwrap();
        Self::guard(&tables)?;
        Ok(tables.shifts.iter().find(|s| s.id == id).cloned())
    }

    async fn shifts_by_sequence(&self) -> Result<Vec<Shift>, StoreError> {
        let tables = self.tables.lock().unwrap();
        Self::guard(&tables)?;
        let mut shifts = tables.shifts.clone();
        shifts.sort_by_key(|s| s.sequence_order);
        Ok(shifts)
    }

    async fn set_shift_active(&self, id: Uuid, is_active: bool) -> Result<(), StoreError> {
        let mut tables = self.tables.lock().unwrap();
        Self::guard(&tables)?;
        if let Some(shift) = tables.shifts.iter_mut().find(|s| s.id == id) {
            shift.is_active = is_active;
        }
        Ok(())
    }

    async fn update_shift_risk(
        &self,
        id: Uuid,
        risk_score: i32,
        is_high_risk: bool,
    ) -> Result<(), StoreError> {
        let mut tables = self.tables.lock().unwrap();
        Self::guard(&tables)?;
        if let Some(shift) = tables.shifts.iter_mut().find(|s| s.id == id) {
            shift.risk_score = risk_score;
            shift.is_high_risk = is_high_risk;
        }
        Ok(())
    }

    async fn tasks_for_shift(&self, shift_id: Uuid) -> Result<Vec<Task>, StoreError> {
        let tables = self.tables.lock().unwrap();
        Self::guard(&tables)?;
        Ok(tables
            .tasks
            .iter()
            .filter(|t| t.shift_id == shift_id)
            .cloned()
            .collect())
    }

    async fn task_by_id(&self, id: Uuid) -> Result<Option<Task>, StoreError> {
        let tables = self.tables.lock().unwrap();
        Self::guard(&tables)?;
        Ok(tables.tasks.iter().find(|t| t.id == id).cloned())
    }

    async fn task_by_code(&self, task_code: &str) -> Result<Option<Task>, StoreError> {
        let tables = self.tables.lock().unwrap();
        Self::guard(&tables)?;
        Ok(tables.tasks.iter().find(|t| t.task_code == task_code).cloned())
    }

    async fn insert_task(&self, task: NewTask) -> Result<Task, StoreError> {
        let mut tables = self.tables.lock().unwrap();
        Self::guard(&tables)?;
        tables.task_code_seq += 1;
        let row = Task {
            id: Uuid::now_v7(),
            shift_id: task.shift_id,
            task_code: format!("T-{}", tables.task_code_seq),
            title: task.title,
            status: task.status,
            priority: task.priority,
            assigned_to: task.assigned_to,
            created_by: task.created_by,
            created_at: Utc::now(),
            completed_at: None,
        };
        tables.tasks.push(row.clone());
        Ok(row)
    }

    async fn set_task_status(
        &self,
        id: Uuid,
        status: TaskStatus,
        completed_at: Option<DateTime<Utc>>,
    ) -> Result<(), StoreError> {
        let mut tables = self.tables.lock().unwrap();
        Self::guard(&tables)?;
        if let Some(task) = tables.tasks.iter_mut().find(|t| t.id == id) {
            task.status = status;
            task.completed_at = completed_at;
        }
        Ok(())
    }

    async fn alerts_for_shift(&self, shift_id: Uuid) -> Result<Vec<Alert>, StoreError> {
        let tables = self.tables.lock().unwrap();
        Self::guard(&tables)?;
        Ok(tables
            .alerts
            .iter()
            .filter(|a| a.shift_id == shift_id)
            .cloned()
            .collect())
    }

    async fn active_alerts_for_shift(&self, shift_id: Uuid) -> Result<Vec<Alert>, StoreError> {
        let tables = self.tables.lock().unwrap();
        Self::guard(&tables)?;
        Ok(tables
            .alerts
            .iter()
            .filter(|a| a.shift_id == shift_id && a.is_active)
            .cloned()
            .collect())
    }

    async fn insert_alert(&self, alert: NewAlert) -> Result<Alert, StoreError> {
        let mut tables = self.tables.lock().unwrap();
        Self::guard(&tables)?;
        let row = Alert {
            id: Uuid::now_v7(),
            shift_id: alert.shift_id,
            task_id: alert.task_id,
            alert_type: alert.alert_type,
            weight: alert.weight,
            message: alert.message,
            is_active: alert.is_active,
        };
        tables.alerts.push(row.clone());
        Ok(row)
    }

    async fn insert_chat_message(
        &self,
        message: NewChatMessage,
    ) -> Result<ChatMessage, StoreError> {
        let mut tables = self.tables.lock().unwrap();
        Self::guard(&tables)?;
        let row = ChatMessage {
            id: Uuid::now_v7(),
            shift_id: message.shift_id,
            sender_id: message.sender_id,
            message_text: message.message_text,
            message_type: message.message_type,
        };
        tables.chat_messages.push(row.clone());
        Ok(row)
    }

    async fn insert_shift_summary(&self, summary: ShiftSummary) -> Result<(), StoreError> {
        let mut tables = self.tables.lock().unwrap();
        Self::guard(&tables)?;
        tables.shift_summaries.push(summary);
        Ok(())
    }
}
