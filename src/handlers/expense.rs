// src/handlers/expense.rs

use axum::{
    body::Bytes,
    extract::{
        rejection::{BytesRejection, QueryRejection},
        Query, State,
    },
    http::StatusCode,
};

use crate::{
    common::error::AppError,
    config::AppState,
    models::{
        expense::{CreateExpensePayload, CreateExpenseQuery},
        message::MessageResponse,
    },
};

// POST /api/expense
#[utoipa::path(
    post,
    path = "/api/expense",
    tag = "Expense",
    request_body = CreateExpensePayload,
    params(CreateExpenseQuery),
    responses(
        (status = 204, description = "Despesa criada (e saldo atualizado, se pedido)"),
        (status = 400, description = "Corpo inválido, data inválida ou falha na transação", body = MessageResponse),
        (status = 503, description = "Porcool indisponível", body = MessageResponse)
    )
)]
pub async fn create_expense(
    State(app_state): State<AppState>,
    query: Result<Query<CreateExpenseQuery>, QueryRejection>,
    body: Result<Bytes, BytesRejection>,
) -> Result<StatusCode, AppError> {
    // O corpo é lido como JSON qualquer que seja o Content-Type
    let body = body.map_err(|rejection| {
        tracing::debug!("Corpo da requisição ilegível: {}", rejection);
        AppError::InvalidRequestBody
    })?;
    let payload: CreateExpensePayload = serde_json::from_slice(&body).map_err(|e| {
        tracing::debug!("Corpo da requisição rejeitado: {}", e);
        AppError::InvalidRequestBody
    })?;

    // Query string malformada vale o mesmo que ausente
    let options = query
        .map(|Query(query)| query)
        .unwrap_or_default()
        .balance_options();

    app_state
        .expense_service
        .create_expense(payload, options)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}
