//! Intent-driven mutations. Each admitted message maps to exactly one
//! deterministic store mutation; validation happens before any write, and a
//! store failure aborts the whole call (there is no multi-statement rollback —
//! each insert/update commits on its own).

use std::sync::Arc;

use uuid::Uuid;

use crate::classify::{AdmittedMessage, Intent};
use crate::error::CoreError;
use crate::model::{AlertType, NewAlert, NewTask, Task, TaskPriority, TaskStatus};
use crate::store::Store;
use crate::transition::transition_status;

#[derive(Debug, Clone)]
pub struct MutationOutcome {
    /// Human-facing description of what was recorded.
    pub summary: String,
    pub task: Option<Task>,
}

pub struct MutationRouter {
    store: Arc<dyn Store>,
}

impl MutationRouter {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Apply the mutation for one admitted message. Callers have already
    /// rejected too-vague and low-confidence classifications.
    pub async fn route(
        &self,
        shift_id: Uuid,
        actor: &str,
        message: &AdmittedMessage,
    ) -> Result<MutationOutcome, CoreError> {
        match message.intent {
            Intent::CreateTask => {
                let assignee = message
                    .entities
                    .assigned_to
                    .as_deref()
                    .filter(|a| !a.is_empty())
                    .ok_or_else(|| {
                        CoreError::Validation(
                            "Failed determining assignee from chat.".to_string(),
                        )
                    })?;
                let title = message
                    .entities
                    .title
                    .clone()
                    .unwrap_or_else(|| "Untitled task".to_string());
                let task = self.create_task(&title, assignee, actor).await?;
                Ok(MutationOutcome {
                    summary: format!("Generated Task {} for @{}", task.task_code, assignee),
                    task: Some(task),
                })
            }

            Intent::CompleteTask => {
                let task = self
                    .resolve_task(
                        message.entities.task_code.as_deref(),
                        "No valid task code recognized to complete.",
                    )
                    .await?;
                transition_status(self.store.as_ref(), task.id, TaskStatus::Done).await?;
                Ok(MutationOutcome {
                    summary: format!("Marked {} as DONE.", task.task_code),
                    task: Some(task),
                })
            }

            Intent::BlockTask => {
                let task = self
                    .resolve_task(
                        message.entities.task_code.as_deref(),
                        "No valid task code recognized to block.",
                    )
                    .await?;
                transition_status(self.store.as_ref(), task.id, TaskStatus::Blocked).await?;
                // The standing alert is what the risk evaluator observes.
                self.store
                    .insert_alert(NewAlert {
                        shift_id,
                        task_id: Some(task.id),
                        alert_type: AlertType::Block,
                        weight: 8,
                        message: message
                            .entities
                            .block_reason
                            .clone()
                            .unwrap_or_else(|| "Unspecified block action".to_string()),
                        is_active: true,
                    })
                    .await?;
                Ok(MutationOutcome {
                    summary: format!("Task {} BLOCKED. Alert logged.", task.task_code),
                    task: Some(task),
                })
            }

            Intent::Alert => {
                self.store
                    .insert_alert(NewAlert {
                        shift_id,
                        task_id: None,
                        alert_type: AlertType::Emergency,
                        weight: 10,
                        message: message
                            .entities
                            .alert_message
                            .clone()
                            .unwrap_or_else(|| "Emergency Alert Declared".to_string()),
                        is_active: true,
                    })
                    .await?;
                Ok(MutationOutcome {
                    summary: "Critical Alert broadcast securely.".to_string(),
                    task: None,
                })
            }
        }
    }

    /// Create a task on the currently active shift. Shared by the chat
    /// pipeline and the direct creation endpoint; the active shift is re-read
    /// here rather than trusted from the caller.
    pub async fn create_task(
        &self,
        title: &str,
        assigned_to: &str,
        created_by: &str,
    ) -> Result<Task, CoreError> {
        let shift = self
            .store
            .active_shift()
            .await?
            .ok_or(CoreError::NoActiveShift)?;

        let task = self
            .store
            .insert_task(NewTask {
                shift_id: shift.id,
                title: title.to_string(),
                status: TaskStatus::Todo,
                // Fixed at creation; the classifier's priority head is never
                // trusted for new tasks.
                priority: TaskPriority::Medium,
                assigned_to: assigned_to.to_string(),
                created_by: created_by.to_string(),
            })
            .await?;
        Ok(task)
    }

    async fn resolve_task(
        &self,
        task_code: Option<&str>,
        missing_message: &str,
    ) -> Result<Task, CoreError> {
        let code = task_code
            .filter(|c| !c.is_empty())
            .ok_or_else(|| CoreError::Validation(missing_message.to_string()))?;
        self.store
            .task_by_code(code)
            .await?
            .ok_or_else(|| CoreError::TaskNotFound(code.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::Entities;
    use crate::model::Shift;
    use crate::store::MemoryStore;

    fn seeded() -> (Arc<MemoryStore>, Uuid, MutationRouter) {
        let store = Arc::new(MemoryStore::new());
        let shift_id = Uuid::now_v7();
        store.seed_shift(Shift {
            id: shift_id,
            name: "Night".to_string(),
            is_active: true,
            risk_score: 0,
            is_high_risk: false,
            sequence_order: 0,
        });
        let router = MutationRouter::new(store.clone());
        (store, shift_id, router)
    }

    fn admitted(intent: Intent, entities: Entities) -> AdmittedMessage {
        AdmittedMessage {
            intent,
            confidence: 0.95,
            priority: None,
            entities,
        }
    }

    #[tokio::test]
    async fn create_task_requires_an_assignee_before_any_insert() {
        let (store, shift_id, router) = seeded();
        let message = admitted(
            Intent::CreateTask,
            Entities {
                title: Some("prep OR room 3".to_string()),
                ..Default::default()
            },
        );

        let err = router.route(shift_id, "nurse-1", &message).await.unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));
        assert!(store.tasks().is_empty());
    }

    #[tokio::test]
    async fn create_task_is_medium_todo_regardless_of_classifier_priority() {
        let (store, shift_id, router) = seeded();
        let mut message = admitted(
            Intent::CreateTask,
            Entities {
                assigned_to: Some("maria".to_string()),
                title: Some("prep OR room 3".to_string()),
                ..Default::default()
            },
        );
        message.priority = Some(TaskPriority::Critical);

        let outcome = router.route(shift_id, "nurse-1", &message).await.unwrap();
        let task = outcome.task.unwrap();
        assert_eq!(task.status, TaskStatus::Todo);
        assert_eq!(task.priority, TaskPriority::Medium);
        assert_eq!(task.assigned_to, "maria");
        assert_eq!(task.created_by, "nurse-1");
        assert_eq!(
            outcome.summary,
            format!("Generated Task {} for @maria", task.task_code)
        );
        assert_eq!(store.tasks().len(), 1);
    }

    #[tokio::test]
    async fn create_task_without_active_shift_is_rejected() {
        let store = Arc::new(MemoryStore::new());
        let router = MutationRouter::new(store.clone());
        let err = router
            .create_task("prep OR room 3", "maria", "nurse-1")
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::NoActiveShift));
    }

    #[tokio::test]
    async fn complete_task_resolves_code_and_goes_through_the_gate() {
        let (store, shift_id, router) = seeded();
        let task = router.create_task("prep OR room 3", "maria", "nurse-1").await.unwrap();

        let message = admitted(
            Intent::CompleteTask,
            Entities {
                task_code: Some(task.task_code.clone()),
                ..Default::default()
            },
        );
        let outcome = router.route(shift_id, "nurse-1", &message).await.unwrap();
        assert_eq!(outcome.summary, format!("Marked {} as DONE.", task.task_code));

        let stored = store.task_by_id(task.id).await.unwrap().unwrap();
        assert_eq!(stored.status, TaskStatus::Done);
        assert!(stored.completed_at.is_some());
    }

    #[tokio::test]
    async fn complete_task_propagates_already_done() {
        let (_store, shift_id, router) = seeded();
        let task = router.create_task("prep OR room 3", "maria", "nurse-1").await.unwrap();
        let message = admitted(
            Intent::CompleteTask,
            Entities {
                task_code: Some(task.task_code.clone()),
                ..Default::default()
            },
        );
        router.route(shift_id, "nurse-1", &message).await.unwrap();

        let err = router.route(shift_id, "nurse-1", &message).await.unwrap_err();
        assert!(matches!(err, CoreError::CompletedTask));
    }

    #[tokio::test]
    async fn complete_task_with_unknown_code_is_not_found() {
        let (_store, shift_id, router) = seeded();
        let message = admitted(
            Intent::CompleteTask,
            Entities {
                task_code: Some("T-999".to_string()),
                ..Default::default()
            },
        );
        let err = router.route(shift_id, "nurse-1", &message).await.unwrap_err();
        assert!(matches!(err, CoreError::TaskNotFound(code) if code == "T-999"));
    }

    #[tokio::test]
    async fn block_task_blocks_and_logs_exactly_one_alert() {
        let (store, shift_id, router) = seeded();
        let task = router.create_task("prep OR room 3", "maria", "nurse-1").await.unwrap();

        let message = admitted(
            Intent::BlockTask,
            Entities {
                task_code: Some(task.task_code.clone()),
                block_reason: Some("missing lab results".to_string()),
                ..Default::default()
            },
        );
        let outcome = router.route(shift_id, "nurse-1", &message).await.unwrap();
        assert_eq!(
            outcome.summary,
            format!("Task {} BLOCKED. Alert logged.", task.task_code)
        );

        let stored = store.task_by_id(task.id).await.unwrap().unwrap();
        assert_eq!(stored.status, TaskStatus::Blocked);

        let alerts = store.alerts();
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].alert_type, AlertType::Block);
        assert_eq!(alerts[0].weight, 8);
        assert_eq!(alerts[0].message, "missing lab results");
        assert_eq!(alerts[0].task_id, Some(task.id));
        assert!(alerts[0].is_active);
    }

    #[tokio::test]
    async fn block_task_without_reason_uses_the_fixed_message() {
        let (store, shift_id, router) = seeded();
        let task = router.create_task("prep OR room 3", "maria", "nurse-1").await.unwrap();

        let message = admitted(
            Intent::BlockTask,
            Entities {
                task_code: Some(task.task_code.clone()),
                ..Default::default()
            },
        );
        router.route(shift_id, "nurse-1", &message).await.unwrap();
        assert_eq!(store.alerts()[0].message, "Unspecified block action");
    }

    #[tokio::test]
    async fn missing_task_code_is_rejected_before_any_write() {
        let (store, shift_id, router) = seeded();
        let message = admitted(Intent::BlockTask, Entities::default());
        let err = router.route(shift_id, "nurse-1", &message).await.unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));
        assert!(store.alerts().is_empty());
    }

    #[tokio::test]
    async fn alert_intent_needs_no_task() {
        let (store, shift_id, router) = seeded();
        let message = admitted(
            Intent::Alert,
            Entities {
                alert_message: Some("code blue in ward 2".to_string()),
                ..Default::default()
            },
        );
        let outcome = router.route(shift_id, "nurse-1", &message).await.unwrap();
        assert_eq!(outcome.summary, "Critical Alert broadcast securely.");
        assert!(outcome.task.is_none());

        let alerts = store.alerts();
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].alert_type, AlertType::Emergency);
        assert_eq!(alerts[0].weight, 10);
        assert_eq!(alerts[0].message, "code blue in ward 2");
        assert!(alerts[0].task_id.is_none());
    }

    #[tokio::test]
    async fn alert_intent_without_message_uses_the_fixed_text() {
        let (store, shift_id, router) = seeded();
        let message = admitted(Intent::Alert, Entities::default());
        router.route(shift_id, "nurse-1", &message).await.unwrap();
        assert_eq!(store.alerts()[0].message, "Emergency Alert Declared");
    }
}
