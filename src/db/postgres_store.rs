// src/db/postgres_store.rs

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use sqlx::{
    postgres::{PgConnectOptions, PgPoolOptions},
    PgPool, Postgres, Row, Transaction,
};

use crate::db::store::{Document, DocumentRef, DocumentStore, StoreError, StoreTransaction};

// Códigos SQLSTATE que o Postgres usa para conflitos de concorrência
const SERIALIZATION_FAILURE: &str = "40001";
const DEADLOCK_DETECTED: &str = "40P01";

/// Documentos guardados como JSONB na tabela `documents`, uma linha por
/// (coleção, id). As transações rodam em SERIALIZABLE, então duas transações
/// que mexem no mesmo documento terminam com uma delas recebendo `Conflict`.
#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Monta a pool sem conectar. A conexão é feita na primeira transação,
    /// assim o serviço sobe mesmo com o banco fora do ar.
    pub fn connect_lazy(
        options: PgConnectOptions,
        max_connections: u32,
        acquire_timeout: Duration,
    ) -> Self {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(acquire_timeout)
            .connect_lazy_with(options);

        Self { pool }
    }

    pub async fn migrate(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!().run(&self.pool).await
    }
}

fn map_sqlx_error(err: sqlx::Error) -> StoreError {
    match &err {
        sqlx::Error::PoolTimedOut
        | sqlx::Error::PoolClosed
        | sqlx::Error::Io(_)
        | sqlx::Error::Tls(_) => StoreError::Unavailable(err.to_string()),
        sqlx::Error::Database(db_err) => match db_err.code().as_deref() {
            Some(SERIALIZATION_FAILURE) | Some(DEADLOCK_DETECTED) => {
                StoreError::Conflict(db_err.message().to_string())
            }
            _ => StoreError::Backend(err.to_string()),
        },
        _ => StoreError::Backend(err.to_string()),
    }
}

fn into_document(value: Value) -> Result<Document, StoreError> {
    match value {
        Value::Object(map) => Ok(map),
        other => Err(StoreError::Backend(format!(
            "stored document is not a JSON object: {other}"
        ))),
    }
}

#[async_trait]
impl DocumentStore for PostgresStore {
    async fn begin(&self) -> Result<Box<dyn StoreTransaction>, StoreError> {
        let mut tx = self.pool.begin().await.map_err(map_sqlx_error)?;

        sqlx::query("SET TRANSACTION ISOLATION LEVEL SERIALIZABLE")
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx_error)?;

        Ok(Box::new(PostgresTransaction { tx }))
    }

    async fn find_by_field(
        &self,
        collection: &str,
        field: &str,
        value: &str,
    ) -> Result<Option<(DocumentRef, Document)>, StoreError> {
        let row = sqlx::query(
            "SELECT id, data FROM documents WHERE collection = $1 AND data ->> $2 = $3 LIMIT 1",
        )
        .bind(collection)
        .bind(field)
        .bind(value)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        let Some(row) = row else {
            return Ok(None);
        };

        let id: String = row.try_get("id").map_err(map_sqlx_error)?;
        let data: Value = row.try_get("data").map_err(map_sqlx_error)?;

        Ok(Some((DocumentRef::new(collection, id), into_document(data)?)))
    }
}

struct PostgresTransaction {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl StoreTransaction for PostgresTransaction {
    async fn get(&mut self, doc: &DocumentRef) -> Result<Option<Document>, StoreError> {
        let data: Option<Value> =
            sqlx::query_scalar("SELECT data FROM documents WHERE collection = $1 AND id = $2")
                .bind(&doc.collection)
                .bind(&doc.id)
                .fetch_optional(&mut *self.tx)
                .await
                .map_err(map_sqlx_error)?;

        data.map(into_document).transpose()
    }

    async fn create(&mut self, doc: &DocumentRef, data: Document) -> Result<(), StoreError> {
        sqlx::query("INSERT INTO documents (collection, id, data) VALUES ($1, $2, $3)")
            .bind(&doc.collection)
            .bind(&doc.id)
            .bind(Value::Object(data))
            .execute(&mut *self.tx)
            .await
            .map_err(|e| {
                // Violação de chave única = o documento já existe
                if let Some(db_err) = e.as_database_error() {
                    if db_err.is_unique_violation() {
                        return StoreError::AlreadyExists(doc.clone());
                    }
                }
                map_sqlx_error(e)
            })?;

        Ok(())
    }

    async fn update(&mut self, doc: &DocumentRef, fields: Document) -> Result<(), StoreError> {
        let result = sqlx::query(
            "UPDATE documents SET data = data || $3, updated_at = now() WHERE collection = $1 AND id = $2",
        )
        .bind(&doc.collection)
        .bind(&doc.id)
        .bind(Value::Object(fields))
        .execute(&mut *self.tx)
        .await
        .map_err(map_sqlx_error)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(doc.clone()));
        }
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        self.tx.commit().await.map_err(map_sqlx_error)
    }

    async fn rollback(self: Box<Self>) -> Result<(), StoreError> {
        self.tx.rollback().await.map_err(map_sqlx_error)
    }
}
