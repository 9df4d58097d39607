// src/services/expense_service.rs

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use validator::Validate;

use crate::{
    common::error::AppError,
    db::{
        store::{StoreTransaction, TransactionOutcome, UnitOfWork},
        ExpenseRepository, TransactionRunner,
    },
    models::expense::{BalanceOptions, CreateExpensePayload, ExpenseReceipt},
    services::{
        balance_service::BalanceService, expense_builder::build_expense_document,
        user_service::UserResolver,
    },
};

#[derive(Clone)]
pub struct ExpenseService {
    runner: TransactionRunner,
    expense_repo: ExpenseRepository,
    balance_service: BalanceService,
    user_resolver: Arc<dyn UserResolver>,
}

impl ExpenseService {
    pub fn new(
        runner: TransactionRunner,
        expense_repo: ExpenseRepository,
        balance_service: BalanceService,
        user_resolver: Arc<dyn UserResolver>,
    ) -> Self {
        Self {
            runner,
            expense_repo,
            balance_service,
            user_resolver,
        }
    }

    /// Grava a despesa e, se pedido, o saldo, numa única transação.
    /// Ou as duas escritas chegam ao store, ou nenhuma.
    pub async fn create_expense(
        &self,
        payload: CreateExpensePayload,
        options: BalanceOptions,
    ) -> Result<ExpenseReceipt, AppError> {
        // 1. Validação: nada é aberto no store se a entrada for inválida
        payload.validate()?;

        let user_id = self.user_resolver.resolve(&payload.user_email).await?;

        // 2. Transação
        let work = CreateExpenseWork {
            service: self,
            payload: &payload,
            user_id: &user_id,
            options: &options,
        };

        match self.runner.run(&work).await {
            TransactionOutcome::Committed { value, attempts } => {
                tracing::info!(
                    "✅ Despesa {} criada para o usuário '{}' (tentativas: {}, saldo: {:?})",
                    value.expense_id,
                    user_id,
                    attempts,
                    value.balance
                );
                Ok(value)
            }
            TransactionOutcome::Aborted(err) => {
                tracing::warn!("Transação da despesa abortada: {}", err);
                Err(err)
            }
        }
    }
}

/// O trabalho feito a cada tentativa da transação.
struct CreateExpenseWork<'a> {
    service: &'a ExpenseService,
    payload: &'a CreateExpensePayload,
    user_id: &'a str,
    options: &'a BalanceOptions,
}

#[async_trait]
impl<'a> UnitOfWork for CreateExpenseWork<'a> {
    type Output = ExpenseReceipt;

    async fn run(&self, tx: &mut dyn StoreTransaction) -> Result<ExpenseReceipt, AppError> {
        let now = Utc::now();

        let expense = build_expense_document(self.payload, self.user_id, now)?;
        let doc = self.service.expense_repo.allocate();

        self.service
            .expense_repo
            .create(tx, &doc, &expense)
            .await
            .map_err(|e| AppError::persistence("Something went wrong during the expense creation", e))?;

        let balance = if self.options.increment {
            let write = self
                .service
                .balance_service
                .create_or_increment(tx, &self.options.name, expense.amount, self.user_id, now)
                .await?;
            Some(write)
        } else {
            None
        };

        Ok(ExpenseReceipt {
            expense_id: doc.id,
            balance,
        })
    }
}
