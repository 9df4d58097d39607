// src/db/store.rs

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;
use tokio::time::{sleep, timeout_at, Instant};
use uuid::Uuid;

use crate::common::error::AppError;

/// Conteúdo de um documento: um objeto JSON com os campos no topo.
pub type Document = Map<String, Value>;

// =============================================================================
//  ENDEREÇAMENTO (coleção / documento)
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DocumentRef {
    pub collection: String,
    pub id: String,
}

impl DocumentRef {
    pub fn new(collection: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
            id: id.into(),
        }
    }
}

impl std::fmt::Display for DocumentRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.collection, self.id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionRef {
    pub name: String,
}

impl CollectionRef {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    pub fn doc(&self, id: impl Into<String>) -> DocumentRef {
        DocumentRef::new(self.name.clone(), id)
    }

    /// Reserva um identificador novo. Nada é gravado até o commit.
    pub fn new_doc(&self) -> DocumentRef {
        self.doc(Uuid::new_v4().simple().to_string())
    }
}

// =============================================================================
//  ERROS DO STORE
// =============================================================================

#[derive(Debug, Error)]
pub enum StoreError {
    /// Não foi possível abrir a conexão com o banco.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// Modificação concorrente detectada. A transação inteira pode ser repetida.
    #[error("transaction conflict: {0}")]
    Conflict(String),

    #[error("document {0} already exists")]
    AlreadyExists(DocumentRef),

    #[error("document {0} not found")]
    NotFound(DocumentRef),

    #[error("invalid document: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("store rejected the operation: {0}")]
    Backend(String),
}

impl StoreError {
    pub fn is_conflict(&self) -> bool {
        matches!(self, StoreError::Conflict(_))
    }
}

pub fn to_document<T: Serialize>(value: &T) -> Result<Document, StoreError> {
    match serde_json::to_value(value)? {
        Value::Object(map) => Ok(map),
        other => Err(StoreError::Backend(format!(
            "documents must be JSON objects, got {other}"
        ))),
    }
}

pub fn from_document<T: DeserializeOwned>(document: Document) -> Result<T, StoreError> {
    Ok(serde_json::from_value(Value::Object(document))?)
}

// =============================================================================
//  CONTRATO DO CLIENTE
// =============================================================================

/// Uma transação aberta. Leituras enxergam as escritas já feitas nela.
/// Se for descartada sem `commit`, nenhum efeito chega ao store.
#[async_trait]
pub trait StoreTransaction: Send {
    async fn get(&mut self, doc: &DocumentRef) -> Result<Option<Document>, StoreError>;

    /// Falha com `AlreadyExists` se o documento já existir.
    async fn create(&mut self, doc: &DocumentRef, data: Document) -> Result<(), StoreError>;

    /// Mescla os campos informados no documento existente.
    async fn update(&mut self, doc: &DocumentRef, fields: Document) -> Result<(), StoreError>;

    async fn commit(self: Box<Self>) -> Result<(), StoreError>;

    async fn rollback(self: Box<Self>) -> Result<(), StoreError>;
}

#[async_trait]
pub trait DocumentStore: Send + Sync {
    fn collection(&self, name: &str) -> CollectionRef {
        CollectionRef::new(name)
    }

    /// Adquire uma conexão e abre uma transação nela.
    async fn begin(&self) -> Result<Box<dyn StoreTransaction>, StoreError>;

    /// Leitura fora de transação: primeiro documento cujo campo `field` é igual a `value`.
    async fn find_by_field(
        &self,
        collection: &str,
        field: &str,
        value: &str,
    ) -> Result<Option<(DocumentRef, Document)>, StoreError>;
}

// =============================================================================
//  UNIDADE DE TRABALHO + RETRY
// =============================================================================

/// O trabalho executado dentro de uma transação. Pode rodar mais de uma vez
/// (uma por tentativa), então não deve ter efeitos fora da transação.
#[async_trait]
pub trait UnitOfWork: Send + Sync {
    type Output: Send;

    async fn run(&self, tx: &mut dyn StoreTransaction) -> Result<Self::Output, AppError>;
}

#[derive(Debug)]
pub enum TransactionOutcome<T> {
    Committed { value: T, attempts: u32 },
    Aborted(AppError),
}

impl<T> TransactionOutcome<T> {
    pub fn into_result(self) -> Result<T, AppError> {
        match self {
            TransactionOutcome::Committed { value, .. } => Ok(value),
            TransactionOutcome::Aborted(err) => Err(err),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransactionPolicy {
    /// Prazo total, somando todas as tentativas.
    pub timeout: Duration,
    pub max_attempts: u32,
    pub retry_backoff: Duration,
}

impl Default for TransactionPolicy {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
            max_attempts: 5,
            retry_backoff: Duration::from_millis(50),
        }
    }
}

#[derive(Clone)]
pub struct TransactionRunner {
    store: Arc<dyn DocumentStore>,
    policy: TransactionPolicy,
}

impl TransactionRunner {
    pub fn new(store: Arc<dyn DocumentStore>, policy: TransactionPolicy) -> Self {
        Self { store, policy }
    }

    /// Executa `work` numa transação e faz commit, repetindo tudo em caso de
    /// conflito. O commit é tudo-ou-nada: em qualquer `Aborted` nada foi gravado.
    ///
    /// O prazo vale para abrir a transação, rodar o trabalho e esperar entre
    /// tentativas. O commit nunca é interrompido: uma vez enviado, o resultado
    /// dele é o resultado da tentativa.
    pub async fn run<W: UnitOfWork>(&self, work: &W) -> TransactionOutcome<W::Output> {
        let deadline = Instant::now() + self.policy.timeout;
        let max_attempts = self.policy.max_attempts.max(1);
        let mut attempt = 1;

        loop {
            let err = match self.attempt(work, deadline).await {
                Ok(value) => {
                    return TransactionOutcome::Committed {
                        value,
                        attempts: attempt,
                    };
                }
                Err(err) => err,
            };

            if !err.is_retryable() {
                return TransactionOutcome::Aborted(err);
            }
            if attempt >= max_attempts {
                tracing::warn!("Transação abortada após {} tentativas: {}", attempt, err);
                return TransactionOutcome::Aborted(AppError::Persistence {
                    message: format!(
                        "The transaction could not be completed after {attempt} attempts"
                    ),
                    source: StoreError::Conflict(err.to_string()),
                });
            }

            tracing::debug!("🔁 Conflito na tentativa {}, repetindo: {}", attempt, err);
            if timeout_at(deadline, sleep(self.policy.retry_backoff * attempt))
                .await
                .is_err()
            {
                return TransactionOutcome::Aborted(self.timed_out());
            }
            attempt += 1;
        }
    }

    fn timed_out(&self) -> AppError {
        tracing::warn!("⏱️ Transação excedeu o prazo de {:?}", self.policy.timeout);
        AppError::Timeout(self.policy.timeout)
    }

    async fn attempt<W: UnitOfWork>(
        &self,
        work: &W,
        deadline: Instant,
    ) -> Result<W::Output, AppError> {
        let mut tx = timeout_at(deadline, self.store.begin())
            .await
            .map_err(|_| self.timed_out())??;

        let result = match timeout_at(deadline, work.run(tx.as_mut())).await {
            Ok(result) => result,
            Err(_) => Err(self.timed_out()),
        };

        match result {
            Ok(value) => {
                tx.commit()
                    .await
                    .map_err(|e| AppError::persistence("The transaction could not be committed", e))?;
                Ok(value)
            }
            Err(err) => {
                if let Err(rollback_err) = tx.rollback().await {
                    tracing::warn!("Falha ao descartar a transação: {}", rollback_err);
                }
                Err(err)
            }
        }
    }
}
