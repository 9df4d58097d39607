// src/services/balance_service.rs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use crate::{
    common::error::AppError,
    db::{
        store::{StoreError, StoreTransaction},
        BalanceRepository,
    },
    models::{
        balance::{BalanceDocument, BalanceIncrement, BalanceWrite, BALANCE_TYPE},
        expense::SOURCE,
    },
};

#[derive(Clone)]
pub struct BalanceService {
    repo: BalanceRepository,
}

impl BalanceService {
    pub fn new(repo: BalanceRepository) -> Self {
        Self { repo }
    }

    /// Cria o saldo `name` do usuário com `amount`, ou soma `amount` ao total
    /// existente. Usa a transação recebida e nunca faz commit por conta própria.
    pub async fn create_or_increment(
        &self,
        tx: &mut dyn StoreTransaction,
        name: &str,
        amount: Decimal,
        user_id: &str,
        now: DateTime<Utc>,
    ) -> Result<BalanceWrite, AppError> {
        let failed = |e: StoreError| {
            AppError::persistence(
                format!("Something went wrong while updating the balance \"{name}\""),
                e,
            )
        };

        let doc = self.repo.doc_ref(user_id, name);

        // 1. Lê dentro da transação (entra no controle de concorrência)
        let existing = self.repo.find(tx, &doc).await.map_err(failed)?;

        match existing {
            None => {
                // 2a. Primeiro lançamento: cria o saldo
                let balance = BalanceDocument {
                    name: name.to_string(),
                    amount,
                    user: user_id.to_string(),
                    kind: BALANCE_TYPE.to_string(),
                    created: now,
                    updated: now,
                    source: SOURCE.to_string(),
                };
                self.repo.create(tx, &doc, &balance).await.map_err(failed)?;

                Ok(BalanceWrite::Created { total: amount })
            }
            Some(current) => {
                // 2b. Já existe: soma ao total
                let total = current.amount.checked_add(amount).ok_or_else(|| {
                    AppError::Validation(format!(
                        "The balance \"{name}\" cannot hold the resulting amount"
                    ))
                })?;
                let change = BalanceIncrement {
                    amount: total,
                    updated: now,
                };
                self.repo.increment(tx, &doc, &change).await.map_err(failed)?;

                Ok(BalanceWrite::Incremented {
                    previous: current.amount,
                    total,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{sync::Arc, time::Duration};

    use async_trait::async_trait;

    use super::*;
    use crate::{
        common::error::ErrorKind,
        db::{
            store::{
                from_document, to_document, DocumentStore, TransactionPolicy, TransactionRunner,
                UnitOfWork,
            },
            MemoryStore,
        },
    };

    struct Increment<'a> {
        service: &'a BalanceService,
        amount: Decimal,
    }

    #[async_trait]
    impl<'a> UnitOfWork for Increment<'a> {
        type Output = BalanceWrite;

        async fn run(&self, tx: &mut dyn StoreTransaction) -> Result<BalanceWrite, AppError> {
            self.service
                .create_or_increment(tx, "Main", self.amount, "user-1", Utc::now())
                .await
        }
    }

    fn setup() -> (Arc<MemoryStore>, BalanceService, TransactionRunner) {
        let store = Arc::new(MemoryStore::new());
        let service = BalanceService::new(BalanceRepository::new(store.as_ref()));
        let policy = TransactionPolicy {
            timeout: Duration::from_secs(10),
            max_attempts: 100,
            retry_backoff: Duration::from_millis(1),
        };
        let runner = TransactionRunner::new(store.clone(), policy);
        (store, service, runner)
    }

    async fn stored_total(store: &MemoryStore) -> Decimal {
        let doc = BalanceRepository::new(store).doc_ref("user-1", "Main");
        let data = store.snapshot(&doc).await.expect("balance should exist");
        from_document::<BalanceDocument>(data).unwrap().amount
    }

    #[tokio::test]
    async fn first_write_creates_then_increments() {
        let (store, service, runner) = setup();

        let first = runner
            .run(&Increment { service: &service, amount: Decimal::new(45, 1) })
            .await
            .into_result()
            .unwrap();
        let second = runner
            .run(&Increment { service: &service, amount: Decimal::new(10, 0) })
            .await
            .into_result()
            .unwrap();

        assert_eq!(first, BalanceWrite::Created { total: Decimal::new(45, 1) });
        assert_eq!(
            second,
            BalanceWrite::Incremented {
                previous: Decimal::new(45, 1),
                total: Decimal::new(145, 1),
            }
        );
        assert_eq!(stored_total(&store).await, Decimal::new(145, 1));
        assert_eq!(store.count("balances").await, 1);
    }

    #[tokio::test]
    async fn negative_amounts_decrease_the_total() {
        let (store, service, runner) = setup();

        for amount in [Decimal::new(20, 0), Decimal::new(-5, 0)] {
            runner
                .run(&Increment { service: &service, amount })
                .await
                .into_result()
                .unwrap();
        }

        assert_eq!(stored_total(&store).await, Decimal::new(15, 0));
    }

    #[tokio::test]
    async fn concurrent_increments_are_not_lost() {
        let (store, service, runner) = setup();

        let tasks = (0..10).map(|_| {
            let service = service.clone();
            let runner = runner.clone();
            tokio::spawn(async move {
                runner
                    .run(&Increment { service: &service, amount: Decimal::ONE })
                    .await
                    .into_result()
            })
        });

        for task in tasks.collect::<Vec<_>>() {
            task.await.unwrap().unwrap();
        }

        assert_eq!(stored_total(&store).await, Decimal::new(10, 0));
    }

    #[tokio::test]
    async fn overflowing_total_is_rejected_and_keeps_the_balance() {
        let (store, service, runner) = setup();
        let doc = BalanceRepository::new(store.as_ref()).doc_ref("user-1", "Main");
        let near_max = BalanceDocument {
            name: "Main".to_string(),
            amount: Decimal::MAX - Decimal::ONE,
            user: "user-1".to_string(),
            kind: BALANCE_TYPE.to_string(),
            created: Utc::now(),
            updated: Utc::now(),
            source: SOURCE.to_string(),
        };
        store.seed(doc, to_document(&near_max).unwrap()).await;

        let err = runner
            .run(&Increment { service: &service, amount: Decimal::new(2, 0) })
            .await
            .into_result()
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Validation);
        assert_eq!(err.to_string(), "The balance \"Main\" cannot hold the resulting amount");
        assert_eq!(stored_total(&store).await, Decimal::MAX - Decimal::ONE);
    }

    #[tokio::test]
    async fn rejected_write_is_a_persistence_error() {
        let (store, service, _) = setup();
        store.reject_writes_to("balances");

        let mut tx = store.begin().await.unwrap();
        let err = service
            .create_or_increment(tx.as_mut(), "Main", Decimal::ONE, "user-1", Utc::now())
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Persistence);
        assert_eq!(err.to_string(), "Something went wrong while updating the balance \"Main\"");
    }
}
