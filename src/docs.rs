// src/docs.rs

use axum::Json;
use utoipa::OpenApi;

use crate::{handlers, models};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "porcool-bridge-expense-api",
        description = "HTTP Service created to make possible the creation of expenses in Porcool by other applications."
    ),
    paths(
        // --- Test ---
        handlers::health::ping,

        // --- Expense ---
        handlers::expense::create_expense,
    ),
    components(
        schemas(
            models::message::MessageResponse,
            models::expense::CreateExpensePayload,
        )
    ),
    tags(
        (name = "Test", description = "Verificação de disponibilidade"),
        (name = "Expense", description = "Criação de despesas no Porcool")
    )
)]
pub struct ApiDoc;

// GET /api-docs/openapi.json
pub async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}
