use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{patch, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use medistream_core::model::{TaskPriority, TaskStatus};
use medistream_core::transition::{transition_status, TaskTransition};

use crate::error::AppError;
use crate::routes::ApiResponse;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/task/{task_id}/status", patch(change_task_status))
        .route("/task/create", post(create_task))
}

#[derive(Deserialize, ToSchema)]
pub struct TaskStatusRequest {
    pub status: TaskStatus,
}

/// Change a task's status through the transition gate
#[utoipa::path(
    patch,
    path = "/task/{task_id}/status",
    request_body = TaskStatusRequest,
    params(("task_id" = Uuid, Path, description = "Task id")),
    responses(
        (status = 200, description = "Task status updated", body = ApiResponse<TaskTransition>),
        (status = 400, description = "Task is already completed", body = crate::error::ErrorResponse),
        (status = 404, description = "Task not found", body = crate::error::ErrorResponse)
    ),
    tag = "task"
)]
pub async fn change_task_status(
    State(state): State<AppState>,
    Path(task_id): Path<Uuid>,
    Json(req): Json<TaskStatusRequest>,
) -> Result<Json<ApiResponse<TaskTransition>>, AppError> {
    let transition = transition_status(state.store.as_ref(), task_id, req.status).await?;
    Ok(ApiResponse::ok("Task status updated successfully", transition))
}

#[derive(Deserialize, ToSchema)]
pub struct TaskCreateRequest {
    pub title: String,
    pub assigned_to: String,
}

#[derive(Serialize, ToSchema)]
pub struct TaskCreateData {
    pub task_id: Uuid,
    pub task_code: String,
    pub title: String,
    pub assigned_to: String,
    pub shift_id: Uuid,
    pub status: TaskStatus,
    pub priority: TaskPriority,
}

/// Create a task on the active shift without going through chat
#[utoipa::path(
    post,
    path = "/task/create",
    request_body = TaskCreateRequest,
    responses(
        (status = 201, description = "Task created", body = ApiResponse<TaskCreateData>),
        (status = 400, description = "No active shift", body = crate::error::ErrorResponse)
    ),
    tag = "task"
)]
pub async fn create_task(
    State(state): State<AppState>,
    Json(req): Json<TaskCreateRequest>,
) -> Result<impl IntoResponse, AppError> {
    let task = state
        .mutations
        .create_task(&req.title, &req.assigned_to, &state.sender_id)
        .await?;

    Ok((
        StatusCode::CREATED,
        ApiResponse::ok(
            "Task created successfully",
            TaskCreateData {
                task_id: task.id,
                task_code: task.task_code,
                title: task.title,
                assigned_to: task.assigned_to,
                shift_id: task.shift_id,
                status: task.status,
                priority: task.priority,
            },
        ),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    use medistream_core::classify::{Classification, Classifier, ClassifierError};
    use medistream_core::model::Shift;
    use medistream_core::risk::EscalationPolicy;
    use medistream_core::store::MemoryStore;
    use medistream_core::summary::DisabledSummaryGenerator;

    struct NeverClassifier;

    #[async_trait]
    impl Classifier for NeverClassifier {
        async fn classify(&self, _text: &str) -> Result<Classification, ClassifierError> {
            Err(ClassifierError::Contract("not under test".to_string()))
        }
    }

    fn state(store: Arc<MemoryStore>) -> AppState {
        AppState::new(
            store,
            Arc::new(NeverClassifier),
            Arc::new(DisabledSummaryGenerator),
            EscalationPolicy::EveryEvaluation,
            "nurse-1".to_string(),
        )
    }

    fn seed_shift(store: &MemoryStore) -> Uuid {
        let id = Uuid::now_v7();
        store.seed_shift(Shift {
            id,
            name: "Night".to_string(),
            is_active: true,
            risk_score: 0,
            is_high_risk: false,
            sequence_order: 0,
        });
        id
    }

    async fn send(
        state: AppState,
        method: &str,
        uri: &str,
        body: serde_json::Value,
    ) -> (StatusCode, serde_json::Value) {
        let app = router().with_state(state);
        let response = app
            .oneshot(
                Request::builder()
                    .method(method)
                    .uri(uri)
                    .header("content-type", "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn create_then_complete_via_the_status_endpoint() {
        let store = Arc::new(MemoryStore::new());
        seed_shift(&store);
        let app_state = state(store.clone());

        let (status, body) = send(
            app_state.clone(),
            "POST",
            "/task/create",
            serde_json::json!({"title": "restock crash cart", "assigned_to": "maria"}),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["data"]["status"], "TODO");
        assert_eq!(body["data"]["priority"], "MEDIUM");
        let task_id = body["data"]["task_id"].as_str().unwrap().to_string();

        let (status, body) = send(
            app_state,
            "PATCH",
            &format!("/task/{task_id}/status"),
            serde_json::json!({"status": "DONE"}),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["previous_status"], "TODO");
        assert_eq!(body["data"]["new_status"], "DONE");
    }

    #[tokio::test]
    async fn completed_tasks_reject_further_changes_with_400() {
        let store = Arc::new(MemoryStore::new());
        seed_shift(&store);
        let app_state = state(store.clone());

        let (_, body) = send(
            app_state.clone(),
            "POST",
            "/task/create",
            serde_json::json!({"title": "t", "assigned_to": "a"}),
        )
        .await;
        let task_id = body["data"]["task_id"].as_str().unwrap().to_string();

        send(
            app_state.clone(),
            "PATCH",
            &format!("/task/{task_id}/status"),
            serde_json::json!({"status": "DONE"}),
        )
        .await;

        let (status, body) = send(
            app_state,
            "PATCH",
            &format!("/task/{task_id}/status"),
            serde_json::json!({"status": "IN_PROGRESS"}),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "task_completed");
    }

    #[tokio::test]
    async fn unknown_task_id_is_a_404() {
        let store = Arc::new(MemoryStore::new());
        seed_shift(&store);

        let (status, body) = send(
            state(store),
            "PATCH",
            &format!("/task/{}/status", Uuid::now_v7()),
            serde_json::json!({"status": "DONE"}),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["code"], "task_not_found");
    }

    #[tokio::test]
    async fn create_without_active_shift_is_a_400() {
        let store = Arc::new(MemoryStore::new());
        let (status, body) = send(
            state(store),
            "POST",
            "/task/create",
            serde_json::json!({"title": "t", "assigned_to": "a"}),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "no_active_shift");
    }
}
