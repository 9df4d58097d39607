// src/services/user_service.rs

use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;

use crate::{common::error::AppError, db::UserRepository};

/// Descobre o id do usuário do Porcool a partir do e-mail.
#[async_trait]
pub trait UserResolver: Send + Sync {
    /// Falha com `AppError::UserNotFound` quando o e-mail não é conhecido.
    async fn resolve(&self, email: &str) -> Result<String, AppError>;
}

/// Procura o e-mail na coleção `users` do próprio store.
#[derive(Clone)]
pub struct StoreUserResolver {
    repo: UserRepository,
}

impl StoreUserResolver {
    pub fn new(repo: UserRepository) -> Self {
        Self { repo }
    }
}

#[async_trait]
impl UserResolver for StoreUserResolver {
    async fn resolve(&self, email: &str) -> Result<String, AppError> {
        self.repo
            .find_id_by_email(email)
            .await
            .map_err(|e| AppError::persistence("Something went wrong while looking up the user", e))?
            .ok_or_else(|| AppError::UserNotFound(email.to_string()))
    }
}

/// E-mails conhecidos de antemão (variável `USERS`). O que não estiver aqui
/// é repassado ao resolver de reserva, se houver.
#[derive(Clone, Default)]
pub struct StaticUserResolver {
    users: HashMap<String, String>,
    fallback: Option<Arc<dyn UserResolver>>,
}

impl StaticUserResolver {
    pub fn new(users: impl IntoIterator<Item = (String, String)>) -> Self {
        Self {
            users: users.into_iter().collect(),
            fallback: None,
        }
    }

    #[cfg(test)]
    pub fn with_user(mut self, email: &str, id: &str) -> Self {
        self.users.insert(email.to_string(), id.to_string());
        self
    }

    pub fn or_else(mut self, fallback: Arc<dyn UserResolver>) -> Self {
        self.fallback = Some(fallback);
        self
    }
}

#[async_trait]
impl UserResolver for StaticUserResolver {
    async fn resolve(&self, email: &str) -> Result<String, AppError> {
        if let Some(id) = self.users.get(email) {
            return Ok(id.clone());
        }
        match &self.fallback {
            Some(fallback) => fallback.resolve(email).await,
            None => Err(AppError::UserNotFound(email.to_string())),
        }
    }
}
