use std::time::Duration;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::{db::store::StoreError, models::message::MessageResponse};

/// As três classes de falha que a API expõe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    Unavailable,
    Persistence,
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Invalid request body")]
    InvalidRequestBody,

    #[error("{0}")]
    Validation(String),

    #[error("No Porcool user is registered with the e-mail {0}")]
    UserNotFound(String),

    #[error("Unable to communicate with Porcool")]
    Unavailable(#[source] StoreError),

    // A mensagem vai para o cliente; o `source` só vai para o log.
    #[error("{message}")]
    Persistence {
        message: String,
        #[source]
        source: StoreError,
    },

    #[error("The transaction did not finish within {} ms", .0.as_millis())]
    Timeout(Duration),
}

impl AppError {
    /// Envolve uma falha do store com uma mensagem segura para o cliente.
    /// Falhas de conexão continuam sendo `Unavailable`.
    pub fn persistence(message: impl Into<String>, source: StoreError) -> Self {
        match source {
            StoreError::Unavailable(_) => AppError::Unavailable(source),
            source => AppError::Persistence {
                message: message.into(),
                source,
            },
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            AppError::InvalidRequestBody | AppError::Validation(_) | AppError::UserNotFound(_) => {
                ErrorKind::Validation
            }
            AppError::Unavailable(_) => ErrorKind::Unavailable,
            AppError::Persistence { .. } | AppError::Timeout(_) => ErrorKind::Persistence,
        }
    }

    /// Só conflitos de concorrência justificam repetir a transação.
    pub fn is_retryable(&self) -> bool {
        matches!(self, AppError::Persistence { source, .. } if source.is_conflict())
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        AppError::persistence("Something went wrong while talking to Porcool", err)
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        // Uma mensagem só: a do primeiro campo inválido
        let mut fields: Vec<_> = errors.field_errors().into_iter().collect();
        fields.sort_by(|a, b| a.0.cmp(&b.0));

        let message = fields
            .iter()
            .flat_map(|(_, errs)| errs.iter())
            .find_map(|e| e.message.as_ref().map(|m| m.to_string()))
            .unwrap_or_else(|| "The request body is invalid".to_string());

        AppError::Validation(message)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match self.kind() {
            ErrorKind::Validation => StatusCode::BAD_REQUEST,
            ErrorKind::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
            // Falhas de transação também respondem 400
            ErrorKind::Persistence => StatusCode::BAD_REQUEST,
        };

        match &self {
            AppError::Unavailable(source) => {
                tracing::error!("🔥 Porcool indisponível: {}", source);
            }
            AppError::Persistence { message, source } => {
                tracing::error!("Falha na transação ({}): {}", message, source);
            }
            e => tracing::info!("Requisição rejeitada: {}", e),
        }

        let body = Json(MessageResponse::new(self.to_string()));
        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::store::DocumentRef;

    #[test]
    fn validation_errors_map_to_400() {
        let res = AppError::Validation("bad date".to_string()).into_response();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);

        let res = AppError::UserNotFound("a@b.com".to_string()).into_response();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn unavailable_maps_to_503_with_fixed_message() {
        let err = AppError::Unavailable(StoreError::Unavailable("connection refused".into()));

        assert_eq!(err.to_string(), "Unable to communicate with Porcool");
        assert_eq!(err.into_response().status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn persistence_hides_store_details() {
        let err = AppError::persistence(
            "Something went wrong during the expense creation",
            StoreError::AlreadyExists(DocumentRef::new("expenses", "secret-id")),
        );

        assert_eq!(err.kind(), ErrorKind::Persistence);
        assert_eq!(err.to_string(), "Something went wrong during the expense creation");
        assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn persistence_of_connection_failure_stays_unavailable() {
        let err = AppError::persistence("whatever", StoreError::Unavailable("down".into()));
        assert_eq!(err.kind(), ErrorKind::Unavailable);
    }

    #[test]
    fn only_conflicts_are_retryable() {
        let conflict = AppError::from(StoreError::Conflict("busy".into()));
        let backend = AppError::from(StoreError::Backend("nope".into()));

        assert!(conflict.is_retryable());
        assert!(!backend.is_retryable());
        assert!(!AppError::Timeout(Duration::from_secs(1)).is_retryable());
    }
}
