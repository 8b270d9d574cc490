//! Deterministic risk scoring. The score is re-derived from current task and
//! alert state on every call — no cached counter to drift — and persisted on
//! the shift row, which is the only place those derived fields are written.

use std::sync::Arc;

use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::CoreError;
use crate::locks::ShiftLocks;
use crate::model::{MessageType, NewChatMessage, Task, TaskPriority, TaskStatus};
use crate::store::Store;

pub const RISK_THRESHOLD: i32 = 8;

pub fn priority_weight(priority: TaskPriority) -> i32 {
    match priority {
        TaskPriority::Low => 1,
        TaskPriority::Medium => 3,
        TaskPriority::High => 6,
        TaskPriority::Critical => 10,
    }
}

pub fn status_weight(status: TaskStatus) -> i32 {
    match status {
        TaskStatus::Todo => 1,
        TaskStatus::InProgress => 0,
        TaskStatus::Blocked => 15,
        TaskStatus::Done => 0,
    }
}

/// `min(10, (Σ task weights + 10·active_alerts) / 10)` with integer floor
/// division. Alert weight fields are deliberately ignored: every active alert
/// contributes a flat 10.
pub fn compute_risk(tasks: &[Task], active_alert_count: usize) -> i32 {
    let task_risk: i32 = tasks
        .iter()
        .map(|t| priority_weight(t.priority) + status_weight(t.status))
        .sum();
    let alert_risk = 10 * active_alert_count as i32;
    ((task_risk + alert_risk) / 10).min(10)
}

pub fn escalation_message(risk_score: i32) -> String {
    format!("Warning! Operational Risk threshold breached! Score: {risk_score}/10.")
}

/// When the escalation system message is appended.
///
/// `EveryEvaluation` re-fires on every qualifying call, matching the recorded
/// behavior of the scoring agent. `OnTransition` fires only when the shift's
/// persisted `is_high_risk` flips from false to true.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EscalationPolicy {
    EveryEvaluation,
    OnTransition,
}

impl EscalationPolicy {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "always" => Some(EscalationPolicy::EveryEvaluation),
            "transition" => Some(EscalationPolicy::OnTransition),
            _ => None,
        }
    }
}

impl Default for EscalationPolicy {
    fn default() -> Self {
        EscalationPolicy::EveryEvaluation
    }
}

#[derive(Debug, Clone, Copy, Serialize, ToSchema)]
pub struct RiskOutcome {
    /// Risk score in 0..=10.
    pub risk: i32,
    /// Whether an escalation system message was appended by this call.
    pub escalated: bool,
}

impl RiskOutcome {
    fn zero() -> Self {
        RiskOutcome {
            risk: 0,
            escalated: false,
        }
    }
}

pub struct RiskEvaluator {
    store: Arc<dyn Store>,
    policy: EscalationPolicy,
    locks: ShiftLocks,
}

impl RiskEvaluator {
    pub fn new(store: Arc<dyn Store>, policy: EscalationPolicy) -> Self {
        Self {
            store,
            policy,
            locks: ShiftLocks::new(),
        }
    }

    /// Recompute and persist the shift's risk score. Never errors to the
    /// caller: any internal failure is logged and reported as `{0, false}`,
    /// so a successful mutation earlier in the pipeline is still reported.
    pub async fn evaluate(&self, shift_id: Uuid) -> RiskOutcome {
        match self.try_evaluate(shift_id).await {
            Ok(outcome) => outcome,
            Err(err) => {
                tracing::error!(%shift_id, error = %err, "risk evaluation failed");
                RiskOutcome::zero()
            }
        }
    }

    async fn try_evaluate(&self, shift_id: Uuid) -> Result<RiskOutcome, CoreError> {
        // Serialize the read-derive-write sequence per shift; concurrent
        // pipeline executions would otherwise race on the shift row.
        let _guard = self.locks.acquire(shift_id).await;

        let tasks = self.store.tasks_for_shift(shift_id).await?;
        if tasks.is_empty() {
            return Ok(RiskOutcome::zero());
        }

        let active_alerts = self.store.active_alerts_for_shift(shift_id).await?;
        let risk_score = compute_risk(&tasks, active_alerts.len());
        let qualifies = risk_score >= RISK_THRESHOLD;

        let fire = match (qualifies, self.policy) {
            (false, _) => false,
            (true, EscalationPolicy::EveryEvaluation) => true,
            (true, EscalationPolicy::OnTransition) => {
                let already_high = self
                    .store
                    .shift_by_id(shift_id)
                    .await?
                    .map(|s| s.is_high_risk)
                    .unwrap_or(false);
                !already_high
            }
        };

        if fire {
            tracing::warn!(%shift_id, risk_score, "risk threshold breached, logging escalation");
            self.store
                .insert_chat_message(NewChatMessage {
                    shift_id,
                    sender_id: None,
                    message_text: escalation_message(risk_score),
                    message_type: MessageType::System,
                })
                .await?;
        }

        self.store
            .update_shift_risk(shift_id, risk_score, qualifies)
            .await?;

        Ok(RiskOutcome {
            risk: risk_score,
            escalated: fire,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{NewTask, Shift};
    use crate::store::MemoryStore;
    use chrono::Utc;

    fn task(priority: TaskPriority, status: TaskStatus) -> Task {
        Task {
            id: Uuid::now_v7(),
            shift_id: Uuid::now_v7(),
            task_code: "T-1".to_string(),
            title: "t".to_string(),
            status,
            priority,
            assigned_to: "a".to_string(),
            created_by: "b".to_string(),
            created_at: Utc::now(),
            completed_at: None,
        }
    }

    fn shift(id: Uuid, active: bool) -> Shift {
        Shift {
            id,
            name: "Night".to_string(),
            is_active: active,
            risk_score: 0,
            is_high_risk: false,
            sequence_order: 0,
        }
    }

    async fn seed_tasks(store: &MemoryStore, shift_id: Uuid, specs: &[(TaskPriority, TaskStatus)]) {
        for (priority, status) in specs {
            let t = store
                .insert_task(NewTask {
                    shift_id,
                    title: "t".to_string(),
                    status: TaskStatus::Todo,
                    priority: *priority,
                    assigned_to: "a".to_string(),
                    created_by: "b".to_string(),
                })
                .await
                .unwrap();
            store.set_task_status(t.id, *status, None).await.unwrap();
        }
    }

    #[test]
    fn three_critical_todo_tasks_score_three() {
        let tasks = vec![
            task(TaskPriority::Critical, TaskStatus::Todo),
            task(TaskPriority::Critical, TaskStatus::Todo),
            task(TaskPriority::Critical, TaskStatus::Todo),
        ];
        // 3 × (10 + 1) = 33 → 3
        assert_eq!(compute_risk(&tasks, 0), 3);
    }

    #[test]
    fn blocking_one_critical_task_raises_the_score() {
        let tasks = vec![
            task(TaskPriority::Critical, TaskStatus::Blocked),
            task(TaskPriority::Critical, TaskStatus::Todo),
            task(TaskPriority::Critical, TaskStatus::Todo),
        ];
        // 25 + 11 + 11 = 47 → 4
        assert_eq!(compute_risk(&tasks, 0), 4);
    }

    #[test]
    fn score_is_capped_at_ten() {
        let tasks: Vec<_> = (0..20)
            .map(|_| task(TaskPriority::Critical, TaskStatus::Blocked))
            .collect();
        assert_eq!(compute_risk(&tasks, 5), 10);
    }

    #[test]
    fn every_active_alert_adds_a_flat_ten() {
        let tasks = vec![task(TaskPriority::Low, TaskStatus::InProgress)];
        // 1 + 3×10 = 31 → 3
        assert_eq!(compute_risk(&tasks, 3), 3);
    }

    #[tokio::test]
    async fn empty_shift_short_circuits_without_writing() {
        let store = Arc::new(MemoryStore::new());
        let shift_id = Uuid::now_v7();
        store.seed_shift(shift(shift_id, true));

        let evaluator = RiskEvaluator::new(store.clone(), EscalationPolicy::EveryEvaluation);
        let outcome = evaluator.evaluate(shift_id).await;

        assert_eq!(outcome.risk, 0);
        assert!(!outcome.escalated);
        assert!(store.chat_messages().is_empty());
    }

    #[tokio::test]
    async fn escalation_message_has_the_exact_text() {
        let store = Arc::new(MemoryStore::new());
        let shift_id = Uuid::now_v7();
        store.seed_shift(shift(shift_id, true));
        // 5 CRITICAL/BLOCKED tasks: 5 × 25 = 125 → capped at 10.
        seed_tasks(
            &store,
            shift_id,
            &[(TaskPriority::Critical, TaskStatus::Blocked); 5],
        )
        .await;

        let evaluator = RiskEvaluator::new(store.clone(), EscalationPolicy::EveryEvaluation);
        let outcome = evaluator.evaluate(shift_id).await;

        assert_eq!(outcome.risk, 10);
        assert!(outcome.escalated);
        let messages = store.chat_messages();
        assert_eq!(messages.len(), 1);
        assert_eq!(
            messages[0].message_text,
            "Warning! Operational Risk threshold breached! Score: 10/10."
        );
        assert_eq!(messages[0].message_type, MessageType::System);
        assert!(messages[0].sender_id.is_none());

        let shift = store.shift_by_id(shift_id).await.unwrap().unwrap();
        assert_eq!(shift.risk_score, 10);
        assert!(shift.is_high_risk);
    }

    #[tokio::test]
    async fn every_evaluation_policy_refires() {
        let store = Arc::new(MemoryStore::new());
        let shift_id = Uuid::now_v7();
        store.seed_shift(shift(shift_id, true));
        seed_tasks(
            &store,
            shift_id,
            &[(TaskPriority::Critical, TaskStatus::Blocked); 4],
        )
        .await;

        let evaluator = RiskEvaluator::new(store.clone(), EscalationPolicy::EveryEvaluation);
        assert!(evaluator.evaluate(shift_id).await.escalated);
        assert!(evaluator.evaluate(shift_id).await.escalated);
        assert_eq!(store.chat_messages().len(), 2);
    }

    #[tokio::test]
    async fn transition_policy_fires_once() {
        let store = Arc::new(MemoryStore::new());
        let shift_id = Uuid::now_v7();
        store.seed_shift(shift(shift_id, true));
        seed_tasks(
            &store,
            shift_id,
            &[(TaskPriority::Critical, TaskStatus::Blocked); 4],
        )
        .await;

        let evaluator = RiskEvaluator::new(store.clone(), EscalationPolicy::OnTransition);
        let first = evaluator.evaluate(shift_id).await;
        let second = evaluator.evaluate(shift_id).await;

        assert!(first.escalated);
        assert!(!second.escalated);
        // The shift still reads as high risk after the deduplicated call.
        assert!(store.shift_by_id(shift_id).await.unwrap().unwrap().is_high_risk);
        assert_eq!(store.chat_messages().len(), 1);
    }

    #[tokio::test]
    async fn below_threshold_updates_score_without_message() {
        let store = Arc::new(MemoryStore::new());
        let shift_id = Uuid::now_v7();
        store.seed_shift(shift(shift_id, true));
        seed_tasks(&store, shift_id, &[(TaskPriority::Critical, TaskStatus::Todo); 3]).await;

        let evaluator = RiskEvaluator::new(store.clone(), EscalationPolicy::EveryEvaluation);
        let outcome = evaluator.evaluate(shift_id).await;

        assert_eq!(outcome.risk, 3);
        assert!(!outcome.escalated);
        assert!(store.chat_messages().is_empty());
        let shift = store.shift_by_id(shift_id).await.unwrap().unwrap();
        assert_eq!(shift.risk_score, 3);
        assert!(!shift.is_high_risk);
    }

    #[tokio::test]
    async fn store_failure_is_contained() {
        let store = Arc::new(MemoryStore::new());
        let shift_id = Uuid::now_v7();
        store.seed_shift(shift(shift_id, true));
        store.set_failing(true);

        let evaluator = RiskEvaluator::new(store.clone(), EscalationPolicy::EveryEvaluation);
        let outcome = evaluator.evaluate(shift_id).await;

        assert_eq!(outcome.risk, 0);
        assert!(!outcome.escalated);
    }
}
