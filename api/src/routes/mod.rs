use axum::Json;
use serde::Serialize;
use utoipa::ToSchema;

pub mod chat;
pub mod health;
pub mod shift;
pub mod task;

/// Success envelope shared by every endpoint.
#[derive(Serialize, ToSchema)]
pub struct ApiResponse<T: Serialize> {
    /// Always "success".
    pub status: String,
    pub message: String,
    pub data: T,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(message: impl Into<String>, data: T) -> Json<Self> {
        Json(Self {
            status: "success".to_string(),
            message: message.into(),
            data,
        })
    }
}
