//! The single gate for task status changes. The mutation router and the
//! direct status endpoint both go through here; nothing else writes
//! `tasks.status` or `tasks.completed_at`.

use chrono::Utc;
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::CoreError;
use crate::model::TaskStatus;
use crate::store::Store;

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct TaskTransition {
    pub task_id: Uuid,
    pub previous_status: TaskStatus,
    pub new_status: TaskStatus,
}

/// Move a task to `new_status`. DONE is terminal: a completed task rejects
/// every further transition, whatever the target, without touching any field.
/// Entering DONE stamps `completed_at`; every other target clears it.
pub async fn transition_status(
    store: &dyn Store,
    task_id: Uuid,
    new_status: TaskStatus,
) -> Result<TaskTransition, CoreError> {
    let task = store
        .task_by_id(task_id)
        .await?
        .ok_or_else(|| CoreError::TaskNotFound(task_id.to_string()))?;

    if task.status == TaskStatus::Done {
        return Err(CoreError::CompletedTask);
    }

    let completed_at = (new_status == TaskStatus::Done).then(Utc::now);
    store.set_task_status(task_id, new_status, completed_at).await?;

    Ok(TaskTransition {
        task_id,
        previous_status: task.status,
        new_status,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{NewTask, Shift, TaskPriority};
    use crate::store::MemoryStore;

    async fn seeded_task(store: &MemoryStore) -> Uuid {
        let shift_id = Uuid::now_v7();
        store.seed_shift(Shift {
            id: shift_id,
            name: "Day".to_string(),
            is_active: true,
            risk_score: 0,
            is_high_risk: false,
            sequence_order: 0,
        });
        store
            .insert_task(NewTask {
                shift_id,
                title: "restock crash cart".to_string(),
                status: TaskStatus::Todo,
                priority: TaskPriority::Medium,
                assigned_to: "maria".to_string(),
                created_by: "system".to_string(),
            })
            .await
            .unwrap()
            .id
    }

    #[tokio::test]
    async fn completing_a_task_stamps_completed_at() {
        let store = MemoryStore::new();
        let task_id = seeded_task(&store).await;

        let transition = transition_status(&store, task_id, TaskStatus::Done)
            .await
            .unwrap();
        assert_eq!(transition.previous_status, TaskStatus::Todo);
        assert_eq!(transition.new_status, TaskStatus::Done);

        let task = store.task_by_id(task_id).await.unwrap().unwrap();
        assert_eq!(task.status, TaskStatus::Done);
        assert!(task.completed_at.is_some());
    }

    #[tokio::test]
    async fn leaving_done_is_impossible_and_touches_nothing() {
        let store = MemoryStore::new();
        let task_id = seeded_task(&store).await;
        transition_status(&store, task_id, TaskStatus::Done)
            .await
            .unwrap();
        let completed_at = store
            .task_by_id(task_id)
            .await
            .unwrap()
            .unwrap()
            .completed_at;

        for target in [TaskStatus::Todo, TaskStatus::InProgress, TaskStatus::Blocked, TaskStatus::Done] {
            let err = transition_status(&store, task_id, target).await.unwrap_err();
            assert!(matches!(err, CoreError::CompletedTask));
        }

        let task = store.task_by_id(task_id).await.unwrap().unwrap();
        assert_eq!(task.status, TaskStatus::Done);
        assert_eq!(task.completed_at, completed_at);
    }

    #[tokio::test]
    async fn non_done_transitions_clear_completed_at() {
        let store = MemoryStore::new();
        let task_id = seeded_task(&store).await;

        let transition = transition_status(&store, task_id, TaskStatus::Blocked)
            .await
            .unwrap();
        assert_eq!(transition.new_status, TaskStatus::Blocked);

        let task = store.task_by_id(task_id).await.unwrap().unwrap();
        assert!(task.completed_at.is_none());
    }

    #[tokio::test]
    async fn unknown_task_is_not_found() {
        let store = MemoryStore::new();
        let err = transition_status(&store, Uuid::now_v7(), TaskStatus::Done)
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::TaskNotFound(_)));
    }
}
