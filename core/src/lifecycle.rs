//! Shift rotation and finalization. Rotation is a ring over `sequence_order`:
//! there is always a next shift as long as any shift exists. The whole
//! shift-end sequence runs inside one named critical section so concurrent
//! end-shift calls cannot double-rotate.

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::Mutex;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::CoreError;
use crate::model::{MessageType, NewChatMessage, ShiftMetrics, ShiftSummary, TaskStatus};
use crate::store::Store;
use crate::summary::{SummaryGenerator, FALLBACK_SUMMARY};

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct Rotation {
    pub previous_shift: String,
    pub current_shift: String,
}

pub struct ShiftLifecycle {
    store: Arc<dyn Store>,
    summarizer: Arc<dyn SummaryGenerator>,
    // The "shift-rotation" critical section.
    rotation_lock: Mutex<()>,
}

impl ShiftLifecycle {
    pub fn new(store: Arc<dyn Store>, summarizer: Arc<dyn SummaryGenerator>) -> Self {
        Self {
            store,
            summarizer,
            rotation_lock: Mutex::new(()),
        }
    }

    /// Deactivate the current shift and activate its successor in the ring,
    /// recording the hand-over as a system message on the newly active shift.
    pub async fn rotate_active(&self) -> Result<Rotation, CoreError> {
        let _guard = self.rotation_lock.lock().await;
        self.rotate_locked().await
    }

    async fn rotate_locked(&self) -> Result<Rotation, CoreError> {
        let active = self
            .store
            .active_shift()
            .await?
            .ok_or(CoreError::NoActiveShift)?;

        let shifts = self.store.shifts_by_sequence().await?;
        if shifts.is_empty() {
            return Err(CoreError::Consistency(
                "no shifts available in rotation order".to_string(),
            ));
        }

        let current_index = shifts
            .iter()
            .position(|s| s.id == active.id)
            .ok_or_else(|| {
                CoreError::Consistency(format!(
                    "active shift {} missing from rotation order",
                    active.id
                ))
            })?;

        let next = &shifts[(current_index + 1) % shifts.len()];

        self.store.set_shift_active(active.id, false).await?;
        self.store.set_shift_active(next.id, true).await?;

        self.store
            .insert_chat_message(NewChatMessage {
                shift_id: next.id,
                sender_id: None,
                message_text: format!("Shift changed from {} to {}", active.name, next.name),
                message_type: MessageType::System,
            })
            .await?;

        tracing::info!(previous = %active.name, current = %next.name, "shift rotated");

        Ok(Rotation {
            previous_shift: active.name,
            current_shift: next.name.clone(),
        })
    }

    /// Snapshot the shift's aggregate counters and the AI narrative into one
    /// ShiftSummary row. Does not deactivate the shift — that is rotation's
    /// job. Calling this twice for the same shift appends two rows; callers
    /// own that hazard.
    pub async fn finalize(&self, shift_id: Uuid) -> Result<(), CoreError> {
        let shift = self.store.shift_by_id(shift_id).await?.ok_or_else(|| {
            CoreError::Consistency(format!("shift {shift_id} missing during finalize"))
        })?;

        let tasks = self.store.tasks_for_shift(shift_id).await?;
        let total_tasks = tasks.len() as i32;
        let completed_tasks = tasks
            .iter()
            .filter(|t| t.status == TaskStatus::Done)
            .count() as i32;
        let blocked_tasks = tasks
            .iter()
            .filter(|t| t.status == TaskStatus::Blocked)
            .count() as i32;

        // Historical aggregate: resolved alerts count too.
        let alerts_count = self.store.alerts_for_shift(shift_id).await?.len() as i32;

        let metrics = ShiftMetrics {
            total_tasks,
            completed_tasks,
            blocked_tasks,
            pending_tasks: total_tasks - completed_tasks - blocked_tasks,
            alerts_count,
            final_risk_score: shift.risk_score,
        };

        let ai_summary = match self.summarizer.summarize(&metrics).await {
            Ok(text) => text,
            Err(err) => {
                tracing::warn!(%shift_id, error = %err, "summary generation failed, using fallback");
                FALLBACK_SUMMARY.to_string()
            }
        };

        self.store
            .insert_shift_summary(ShiftSummary {
                shift_id,
                total_tasks: metrics.total_tasks,
                completed_tasks: metrics.completed_tasks,
                blocked_tasks: metrics.blocked_tasks,
                pending_tasks: metrics.pending_tasks,
                alerts_count: metrics.alerts_count,
                final_risk_score: metrics.final_risk_score,
                ai_summary,
            })
            .await?;

        Ok(())
    }

    /// The shift-end pipeline: finalize the active shift while it still
    /// carries its last persisted risk score, then rotate. Serialized under
    /// the rotation lock end to end.
    pub async fn end_shift(&self) -> Result<Rotation, CoreError> {
        let _guard = self.rotation_lock.lock().await;

        let active = self
            .store
            .active_shift()
            .await?
            .ok_or(CoreError::NoActiveShift)?;

        self.finalize(active.id).await?;
        self.rotate_locked().await
    }
}
