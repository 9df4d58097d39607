// src/handlers/health.rs

use axum::Json;

use crate::models::message::MessageResponse;

// GET /api/ping
#[utoipa::path(
    get,
    path = "/api/ping",
    tag = "Test",
    responses(
        (status = 200, description = "O serviço está no ar", body = MessageResponse)
    )
)]
pub async fn ping() -> Json<MessageResponse> {
    Json(MessageResponse::new("pong"))
}
