// src/models/balance.rs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

pub const BALANCES_COLLECTION: &str = "balances";
pub const BALANCE_TYPE: &str = "balance";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BalanceDocument {
    pub name: String,
    pub amount: Decimal, // Total acumulado
    pub user: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub created: DateTime<Utc>,
    pub updated: DateTime<Utc>,
    pub source: String,
}

/// Só os campos que mudam num incremento.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BalanceIncrement {
    pub amount: Decimal,
    pub updated: DateTime<Utc>,
}

/// Resultado do writer de saldo: criou o documento ou somou no existente.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BalanceWrite {
    Created { total: Decimal },
    Incremented { previous: Decimal, total: Decimal },
}

/// O saldo é identificado pelo nome dentro do usuário.
pub fn balance_document_id(user_id: &str, name: &str) -> String {
    format!("{user_id}:{name}")
}
