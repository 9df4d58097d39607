// src/config.rs

use std::{collections::BTreeMap, env, str::FromStr, sync::Arc, time::Duration};

use anyhow::Context;
use sqlx::postgres::PgConnectOptions;

use crate::{
    db::{
        BalanceRepository, DocumentStore, ExpenseRepository, MemoryStore, PostgresStore,
        TransactionPolicy, TransactionRunner, UserRepository,
    },
    services::{
        balance_service::BalanceService,
        expense_service::ExpenseService,
        user_service::{StaticUserResolver, StoreUserResolver, UserResolver},
    },
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreConfig {
    Memory,
    Postgres {
        url: String,
        max_connections: u32,
        acquire_timeout: Duration,
    },
}

/// Configuração explícita do processo. Nada é lido do ambiente depois daqui.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub bind_address: String,
    pub store: StoreConfig,
    pub transaction: TransactionPolicy,
    /// E-mail -> id do usuário, consultado antes da coleção `users`.
    pub users: BTreeMap<String, String>,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let bind_address = lookup("BIND_ADDRESS").unwrap_or_else(|| "0.0.0.0:8080".to_string());

        let database_url = lookup("DATABASE_URL").filter(|url| !url.is_empty());
        let default_backend = if database_url.is_some() { "postgres" } else { "memory" };
        let backend = lookup("STORE_BACKEND").unwrap_or_else(|| default_backend.to_string());

        let store = match backend.as_str() {
            "memory" => StoreConfig::Memory,
            "postgres" => StoreConfig::Postgres {
                url: database_url.context("DATABASE_URL deve ser definida quando STORE_BACKEND=postgres")?,
                max_connections: parse_or(&lookup, "DATABASE_MAX_CONNECTIONS", 5)?,
                acquire_timeout: Duration::from_secs(parse_or(&lookup, "DATABASE_ACQUIRE_TIMEOUT_SECS", 3)?),
            },
            other => anyhow::bail!("STORE_BACKEND inválido: {other:?} (use memory ou postgres)"),
        };

        let defaults = TransactionPolicy::default();
        let transaction = TransactionPolicy {
            timeout: Duration::from_millis(parse_or(
                &lookup,
                "TRANSACTION_TIMEOUT_MS",
                defaults.timeout.as_millis() as u64,
            )?),
            max_attempts: parse_or(&lookup, "TRANSACTION_MAX_ATTEMPTS", defaults.max_attempts)?,
            retry_backoff: Duration::from_millis(parse_or(
                &lookup,
                "TRANSACTION_RETRY_BACKOFF_MS",
                defaults.retry_backoff.as_millis() as u64,
            )?),
        };

        if transaction.max_attempts == 0 {
            anyhow::bail!("TRANSACTION_MAX_ATTEMPTS deve ser pelo menos 1");
        }

        let users = parse_users(lookup("USERS").as_deref().unwrap_or_default())?;

        Ok(Self {
            bind_address,
            store,
            transaction,
            users,
        })
    }
}

/// `USERS=a@b.com=id1,c@d.com=id2`
fn parse_users(raw: &str) -> anyhow::Result<BTreeMap<String, String>> {
    let mut users = BTreeMap::new();

    for entry in raw.split(',').map(str::trim).filter(|e| !e.is_empty()) {
        let Some((email, id)) = entry.split_once('=') else {
            anyhow::bail!("USERS inválido: {entry:?} (use email=id)");
        };
        let (email, id) = (email.trim(), id.trim());
        if email.is_empty() || id.is_empty() {
            anyhow::bail!("USERS inválido: {entry:?} (use email=id)");
        }
        users.insert(email.to_string(), id.to_string());
    }

    Ok(users)
}

fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{key} inválido: {raw:?}")),
        None => Ok(default),
    }
}

// O estado compartilhado que será acessível em toda a aplicação
#[derive(Clone)]
pub struct AppState {
    pub expense_service: ExpenseService,
}

impl AppState {
    pub async fn new(config: &Config) -> anyhow::Result<Self> {
        let store: Arc<dyn DocumentStore> = match &config.store {
            StoreConfig::Memory => {
                tracing::warn!("⚠️ Usando o store em memória: os dados somem quando o processo termina");
                Arc::new(MemoryStore::new())
            }
            StoreConfig::Postgres {
                url,
                max_connections,
                acquire_timeout,
            } => {
                let options = PgConnectOptions::from_str(url).context("DATABASE_URL inválida")?;
                let store = PostgresStore::connect_lazy(options, *max_connections, *acquire_timeout);

                // Banco fora do ar não impede a subida: as requisições respondem 503
                match store.migrate().await {
                    Ok(()) => tracing::info!("✅ Migrações do banco de dados executadas com sucesso!"),
                    Err(e) => tracing::error!("🔥 Falha ao rodar as migrações do banco de dados: {}", e),
                }

                Arc::new(store)
            }
        };

        if config.users.is_empty() && config.store == StoreConfig::Memory {
            tracing::warn!("⚠️ Nenhum usuário em USERS: toda despesa será recusada pelo store em memória");
        }

        let store_resolver = StoreUserResolver::new(UserRepository::new(store.clone()));
        let resolver = StaticUserResolver::new(config.users.clone()).or_else(Arc::new(store_resolver));

        Ok(Self::from_parts(store, Arc::new(resolver), config.transaction))
    }

    // --- Monta o gráfico de dependências ---
    pub fn from_parts(
        store: Arc<dyn DocumentStore>,
        user_resolver: Arc<dyn UserResolver>,
        policy: TransactionPolicy,
    ) -> Self {
        let expense_repo = ExpenseRepository::new(store.as_ref());
        let balance_service = BalanceService::new(BalanceRepository::new(store.as_ref()));
        let runner = TransactionRunner::new(store, policy);

        Self {
            expense_service: ExpenseService::new(runner, expense_repo, balance_service, user_resolver),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config(vars: &[(&str, &str)]) -> anyhow::Result<Config> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_to_memory_store_without_database_url() {
        let config = config(&[]).unwrap();

        assert_eq!(config.bind_address, "0.0.0.0:8080");
        assert_eq!(config.store, StoreConfig::Memory);
        assert_eq!(config.transaction, TransactionPolicy::default());
        assert!(config.users.is_empty());
    }

    #[test]
    fn users_are_read_as_email_id_pairs() {
        let parsed = config(&[("USERS", " a@b.com=user-1, c@d.com = user-2 ,")]).unwrap();

        assert_eq!(
            parsed.users,
            BTreeMap::from([
                ("a@b.com".to_string(), "user-1".to_string()),
                ("c@d.com".to_string(), "user-2".to_string()),
            ])
        );
        assert!(config(&[("USERS", "a@b.com")]).is_err());
        assert!(config(&[("USERS", "a@b.com=")]).is_err());
    }

    #[test]
    fn database_url_selects_postgres() {
        let config = config(&[
            ("DATABASE_URL", "postgres://porcool@localhost/porcool"),
            ("DATABASE_MAX_CONNECTIONS", "12"),
            ("TRANSACTION_TIMEOUT_MS", "2500"),
        ])
        .unwrap();

        assert_eq!(
            config.store,
            StoreConfig::Postgres {
                url: "postgres://porcool@localhost/porcool".to_string(),
                max_connections: 12,
                acquire_timeout: Duration::from_secs(3),
            }
        );
        assert_eq!(config.transaction.timeout, Duration::from_millis(2500));
    }

    #[test]
    fn postgres_without_url_is_an_error() {
        assert!(config(&[("STORE_BACKEND", "postgres")]).is_err());
    }

    #[test]
    fn invalid_numbers_are_reported() {
        let err = config(&[("TRANSACTION_MAX_ATTEMPTS", "many")]).unwrap_err();
        assert!(err.to_string().contains("TRANSACTION_MAX_ATTEMPTS"));

        assert!(config(&[("TRANSACTION_MAX_ATTEMPTS", "0")]).is_err());
        assert!(config(&[("STORE_BACKEND", "firestore")]).is_err());
    }
}
