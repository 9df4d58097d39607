// src/db/user_repo.rs

use std::sync::Arc;

use crate::db::store::{DocumentStore, StoreError};

pub const USERS_COLLECTION: &str = "users";

// O repositório de usuários do Porcool (somente leitura)
#[derive(Clone)]
pub struct UserRepository {
    store: Arc<dyn DocumentStore>,
}

impl UserRepository {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    // Busca o id do usuário pelo seu e-mail
    pub async fn find_id_by_email(&self, email: &str) -> Result<Option<String>, StoreError> {
        let found = self
            .store
            .find_by_field(USERS_COLLECTION, "email", email)
            .await?;

        Ok(found.map(|(doc, _)| doc.id))
    }
}
