use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use medistream_core::classify::{self, Intent};
use medistream_core::error::codes;
use medistream_core::risk::RiskOutcome;

use crate::error::AppError;
use crate::routes::ApiResponse;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/chat", post(chat))
}

#[derive(Deserialize, ToSchema)]
pub struct ChatRequest {
    pub message: String,
}

#[derive(Serialize, ToSchema)]
pub struct ChatData {
    pub intent: Intent,
    pub confidence: f64,
    pub recorded_action: String,
    pub system_risk_update: RiskOutcome,
}

/// The single chat execution pipeline
///
/// Classifies the message, applies exactly one store mutation for the intent,
/// then re-evaluates the shift risk. A failed risk evaluation degrades to a
/// zero result — it never masks a mutation that already succeeded.
#[utoipa::path(
    post,
    path = "/chat",
    request_body = ChatRequest,
    responses(
        (status = 200, description = "Message recorded", body = ApiResponse<ChatData>),
        (status = 400, description = "No active shift, too-vague message, low confidence, or business-rule rejection", body = crate::error::ErrorResponse),
        (status = 404, description = "Referenced task not found", body = crate::error::ErrorResponse)
    ),
    tag = "chat"
)]
pub async fn chat(
    State(state): State<AppState>,
    Json(req): Json<ChatRequest>,
) -> Result<Json<ApiResponse<ChatData>>, AppError> {
    let shift = state.store.active_shift().await?.ok_or_else(|| {
        AppError::bad_request(codes::NO_ACTIVE_SHIFT, "Cannot log. System has no active shift.")
    })?;

    let classification = state.classifier.classify(&req.message).await?;
    let admitted = classify::admit(classification)?;

    let outcome = state
        .mutations
        .route(shift.id, &state.sender_id, &admitted)
        .await?;

    let risk_update = state.risk.evaluate(shift.id).await;

    let summary = outcome.summary;
    Ok(ApiResponse::ok(
        summary.clone(),
        ChatData {
            intent: admitted.intent,
            confidence: admitted.confidence,
            recorded_action: summary,
            system_risk_update: risk_update,
        },
    ))
}
