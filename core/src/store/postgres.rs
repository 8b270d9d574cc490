//! Postgres-backed store. Rows are fetched into plain `FromRow` structs and
//! converted into domain types; an unknown status/priority string surfaces as
//! `StoreError::Decode` rather than panicking mid-pipeline.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use super::{Store, StoreError};
use crate::model::{
    Alert, AlertType, ChatMessage, MessageType, NewAlert, NewChatMessage, NewTask, Shift,
    ShiftSummary, Task, TaskPriority, TaskStatus,
};

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct ShiftRow {
    id: Uuid,
    name: String,
    is_active: bool,
    risk_score: i32,
    is_high_risk: bool,
    sequence_order: i32,
}

impl ShiftRow {
    fn into_shift(self) -> Shift {
        Shift {
            id: self.id,
            name: self.name,
            is_active: self.is_active,
            risk_score: self.risk_score,
            is_high_risk: self.is_high_risk,
            sequence_order: self.sequence_order,
        }
    }
}

#[derive(sqlx::FromRow)]
struct TaskRow {
    id: Uuid,
    shift_id: Uuid,
    task_code: String,
    title: String,
    status: String,
    priority: String,
    assigned_to: String,
    created_by: String,
    created_at: DateTime<Utc>,
    completed_at: Option<DateTime<Utc>>,
}

impl TaskRow {
    fn into_task(self) -> Result<Task, StoreError> {
        let status = TaskStatus::parse(&self.status)
            .ok_or_else(|| StoreError::Decode(format!("unknown task status '{}'", self.status)))?;
        let priority = TaskPriority::parse(&self.priority).ok_or_else(|| {
            StoreError::Decode(format!("unknown task priority '{}'", self.priority))
        })?;
        Ok(Task {
            id: self.id,
            shift_id: self.shift_id,
            task_code: self.task_code,
            title: self.title,
            status,
            priority,
            assigned_to: self.assigned_to,
            created_by: self.created_by,
            created_at: self.created_at,
            completed_at: self.completed_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct AlertRow {
    id: Uuid,
    shift_id: Uuid,
    task_id: Option<Uuid>,
    alert_type: String,
    weight: i32,
    message: String,
    is_active: bool,
}

impl AlertRow {
    fn into_alert(self) -> Result<Alert, StoreError> {
        let alert_type = AlertType::parse(&self.alert_type).ok_or_else(|| {
            StoreError::Decode(format!("unknown alert type '{}'", self.alert_type))
        })?;
        Ok(Alert {
            id: self.id,
            shift_id: self.shift_id,
            task_id: self.task_id,
            alert_type,
            weight: self.weight,
            message: self.message,
            is_active: self.is_active,
        })
    }
}

const SHIFT_COLUMNS: &str = "id, name, is_active, risk_score, is_high_risk, sequence_order";
const TASK_COLUMNS: &str =
    "id, shift_id, task_code, title, status, priority, assigned_to, created_by, created_at, completed_at";
const ALERT_COLUMNS: &str = "id, shift_id, task_id, alert_type, weight, message, is_active";

#[async_trait]
impl Store for PgStore {
    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query_scalar::<_, i32>("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;
        Ok(())
    }

    async fn active_shift(&self) -> Result<Option<Shift>, StoreError> {
        let row = sqlx::query_as::<_, ShiftRow>(&format!(
            "SELECT {SHIFT_COLUMNS} FROM shifts WHERE is_active LIMIT 1"
        ))
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(ShiftRow::into_shift))
    }

    async fn shift_by_id(&self, id: Uuid) -> Result<Option<Shift>, StoreError> {
        let row = sqlx::query_as::<_, ShiftRow>(&format!(
            "SELECT {SHIFT_COLUMNS} FROM shifts WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(ShiftRow::into_shift))
    }

    async fn shifts_by_sequence(&self) -> Result<Vec<Shift>, StoreError> {
        let rows = sqlx::query_as::<_, ShiftRow>(&format!(
            "SELECT {SHIFT_COLUMNS} FROM shifts ORDER BY sequence_order"
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(ShiftRow::into_shift).collect())
    }

    async fn set_shift_active(&self, id: Uuid, is_active: bool) -> Result<(), StoreError> {
        sqlx::query("UPDATE shifts SET is_active = $2 WHERE id = $1")
            .bind(id)
            .bind(is_active)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn update_shift_risk(
        &self,
        id: Uuid,
        risk_score: i32,
        is_high_risk: bool,
    ) -> Result<(), StoreError> {
        sqlx::query("UPDATE shifts SET risk_score = $2, is_high_risk = $3 WHERE id = $1")
            .bind(id)
            .bind(risk_score)
            .bind(is_high_risk)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn tasks_for_shift(&self, shift_id: Uuid) -> Result<Vec<Task>, StoreError> {
        let rows = sqlx::query_as::<_, TaskRow>(&format!(
            "SELECT {TASK_COLUMNS} FROM tasks WHERE shift_id = $1"
        ))
        .bind(shift_id)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(TaskRow::into_task).collect()
    }

    async fn task_by_id(&self, id: Uuid) -> Result<Option<Task>, StoreError> {
        let row = sqlx::query_as::<_, TaskRow>(&format!(
            "SELECT {TASK_COLUMNS} FROM tasks WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(TaskRow::into_task).transpose()
    }

    async fn task_by_code(&self, task_code: &str) -> Result<Option<Task>, StoreError> {
        let row = sqlx::query_as::<_, TaskRow>(&format!(
            "SELECT {TASK_COLUMNS} FROM tasks WHERE task_code = $1"
        ))
        .bind(task_code)
        .fetch_optional(&self.pool)
        .await?;
        row.map(TaskRow::into_task).transpose()
    }

    async fn insert_task(&self, task: NewTask) -> Result<Task, StoreError> {
        // task_code comes from the sequence default, created_at from now().
        let row = sqlx::query_as::<_, TaskRow>(&format!(
            "INSERT INTO tasks (id, shift_id, title, status, priority, assigned_to, created_by) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) \
             RETURNING {TASK_COLUMNS}"
        ))
        .bind(Uuid::now_v7())
        .bind(task.shift_id)
        .bind(&task.title)
        .bind(task.status.as_str())
        .bind(task.priority.as_str())
        .bind(&task.assigned_to)
        .bind(&task.created_by)
        .fetch_one(&self.pool)
        .await?;
        row.into_task()
    }

    async fn set_task_status(
        &self,
        id: Uuid,
        status: TaskStatus,
        completed_at: Option<DateTime<Utc>>,
    ) -> Result<(), StoreError> {
        sqlx::query("UPDATE tasks SET status = $2, completed_at = $3 WHERE id = $1")
            .bind(id)
            .bind(status.as_str())
            .bind(completed_at)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn alerts_for_shift(&self, shift_id: Uuid) -> Result<Vec<Alert>, StoreError> {
        let rows = sqlx::query_as::<_, AlertRow>(&format!(
            "SELECT {ALERT_COLUMNS} FROM alerts WHERE shift_id = $1"
        ))
        .bind(shift_id)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(AlertRow::into_alert).collect()
    }

    async fn active_alerts_for_shift(&self, shift_id: Uuid) -> Result<Vec<Alert>, StoreError> {
        let rows = sqlx::query_as::<_, AlertRow>(&format!(
            "SELECT {ALERT_COLUMNS} FROM alerts WHERE shift_id = $1 AND is_active"
        ))
        .bind(shift_id)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(AlertRow::into_alert).collect()
    }

    async fn insert_alert(&self, alert: NewAlert) -> Result<Alert, StoreError> {
        let row = sqlx::query_as::<_, AlertRow>(&format!(
            "INSERT INTO alerts (id, shift_id, task_id, alert_type, weight, message, is_active) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) \
             RETURNING {ALERT_COLUMNS}"
        ))
        .bind(Uuid::now_v7())
        .bind(alert.shift_id)
        .bind(alert.task_id)
        .bind(alert.alert_type.as_str())
        .bind(alert.weight)
        .bind(&alert.message)
        .bind(alert.is_active)
        .fetch_one(&self.pool)
        .await?;
        row.into_alert()
    }

    async fn insert_chat_message(
        &self,
        message: NewChatMessage,
    ) -> Result<ChatMessage, StoreError> {
        let id = Uuid::now_v7();
        sqlx::query(
            "INSERT INTO chat_messages (id, shift_id, sender_id, message_text, message_type) \
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(id)
        .bind(message.shift_id)
        .bind(&message.sender_id)
        .bind(&message.message_text)
        .bind(message.message_type.as_str())
        .execute(&self.pool)
        .await?;
        Ok(ChatMessage {
            id,
            shift_id: message.shift_id,
            sender_id: message.sender_id,
            message_text: message.message_text,
            message_type: message.message_type,
        })
    }

    async fn insert_shift_summary(&self, summary: ShiftSummary) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO shift_summaries \
             (id, shift_id, total_tasks, completed_tasks, blocked_tasks, pending_tasks, \
              alerts_count, final_risk_score, ai_summary) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
        )
        .bind(Uuid::now_v7())
        .bind(summary.shift_id)
        .bind(summary.total_tasks)
        .bind(summary.completed_tasks)
        .bind(summary.blocked_tasks)
        .bind(summary.pending_tasks)
        .bind(summary.alerts_count)
        .bind(summary.final_risk_score)
        .bind(&summary.ai_summary)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
