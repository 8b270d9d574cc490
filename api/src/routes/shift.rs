use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use medistream_core::error::{codes, CoreError};
use medistream_core::lifecycle::Rotation;
use medistream_core::model::{self, Task, TaskPriority, TaskStatus};

use crate::error::AppError;
use crate::routes::ApiResponse;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/shift/tasks", get(shift_tasks))
        .route("/shift/status", get(shift_status))
        .route("/shift/end", post(shift_end))
}

#[derive(Serialize, ToSchema)]
pub struct TaskView {
    pub task_id: Uuid,
    pub task_code: String,
    pub title: String,
    pub status: TaskStatus,
    pub priority: TaskPriority,
    pub assigned_to: String,
    pub created_at: DateTime<Utc>,
}

impl From<Task> for TaskView {
    fn from(task: Task) -> Self {
        Self {
            task_id: task.id,
            task_code: task.task_code,
            title: task.title,
            status: task.status,
            priority: task.priority,
            assigned_to: task.assigned_to,
            created_at: task.created_at,
        }
    }
}

/// List the active shift's tasks, most urgent first
#[utoipa::path(
    get,
    path = "/shift/tasks",
    responses(
        (status = 200, description = "Tasks fetched", body = ApiResponse<Vec<TaskView>>),
        (status = 400, description = "No active shift", body = crate::error::ErrorResponse)
    ),
    tag = "shift"
)]
pub async fn shift_tasks(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<TaskView>>>, AppError> {
    let shift = state
        .store
        .active_shift()
        .await?
        .ok_or_else(|| AppError::bad_request(codes::NO_ACTIVE_SHIFT, "No active shift found"))?;

    let mut tasks = state.store.tasks_for_shift(shift.id).await?;
    model::sort_for_display(&mut tasks);

    Ok(ApiResponse::ok(
        "Tasks fetched",
        tasks.into_iter().map(TaskView::from).collect(),
    ))
}

#[derive(Serialize, ToSchema)]
pub struct ShiftStatusData {
    pub shift_id: Uuid,
    pub shift_name: String,
    pub risk_score: i32,
    pub is_high_risk: bool,
}

/// Current shift and its last persisted risk state
#[utoipa::path(
    get,
    path = "/shift/status",
    responses(
        (status = 200, description = "Active shift fetched", body = ApiResponse<ShiftStatusData>),
        (status = 400, description = "No active shift", body = crate::error::ErrorResponse)
    ),
    tag = "shift"
)]
pub async fn shift_status(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<ShiftStatusData>>, AppError> {
    let shift = state
        .store
        .active_shift()
        .await?
        .ok_or_else(|| AppError::bad_request(codes::NO_ACTIVE_SHIFT, "No active shift found"))?;

    Ok(ApiResponse::ok(
        "Active shift fetched",
        ShiftStatusData {
            shift_id: shift.id,
            shift_name: shift.name,
            risk_score: shift.risk_score,
            is_high_risk: shift.is_high_risk,
        },
    ))
}

/// End the active shift: snapshot its summary, then rotate the ring
#[utoipa::path(
    post,
    path = "/shift/end",
    responses(
        (status = 200, description = "Shift ended and rotated", body = ApiResponse<Rotation>),
        (status = 400, description = "No shift to end", body = crate::error::ErrorResponse)
    ),
    tag = "shift"
)]
pub async fn shift_end(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Rotation>>, AppError> {
    let rotation = state.lifecycle.end_shift().await.map_err(|err| match err {
        CoreError::NoActiveShift => {
            AppError::bad_request(codes::NO_ACTIVE_SHIFT, "No shift to end.")
        }
        other => AppError::from(other),
    })?;

    Ok(ApiResponse::ok(
        "Shift ended safely. Summary generated.",
        rotation,
    ))
}
