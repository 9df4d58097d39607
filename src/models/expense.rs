// src/models/expense.rs

use chrono::{DateTime, FixedOffset, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use validator::{Validate, ValidationError};

use crate::{
    common::spending_date::{parse_spending_date, SPENDING_DATE_MESSAGE},
    models::balance::BalanceWrite,
};

pub const EXPENSES_COLLECTION: &str = "expenses";
pub const EXPENSE_TYPE: &str = "expense";
/// Identifica este serviço como autor do documento.
pub const SOURCE: &str = "porcool-bridge-expense-api";
pub const DEFAULT_BALANCE_NAME: &str = "AUTOMATIC_CREATION_BY_EXTERNAL_SERVICE";

// --- Entrada (HTTP) ---

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateExpensePayload {
    #[validate(email(message = "The request body value userEmail is not a valid e-mail address"))]
    #[schema(example = "a@b.com")]
    pub user_email: String,

    #[schema(example = "Coffee")]
    pub expense_name: String,

    #[schema(example = "paid")]
    pub expense_status: String,

    #[schema(value_type = f64, example = 4.5)]
    pub expense_amount: Decimal,

    #[validate(custom(function = "validate_spending_date", message = "The request body value expenseSpendingDate is invalid. Expected format: YYYY-MM (example: 2024-12)"))]
    #[schema(example = "2024-12")]
    pub expense_spending_date: String,
}

fn validate_spending_date(value: &str) -> Result<(), ValidationError> {
    parse_spending_date(value)
        .map(|_| ())
        .map_err(|_| ValidationError::new("spending_date_format").with_message(SPENDING_DATE_MESSAGE.into()))
}

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct CreateExpenseQuery {
    /// Também cria ou incrementa o saldo `balanceName`. Valores inválidos contam como `false`.
    #[param(example = "true")]
    pub increment_balance: Option<String>,

    /// Nome do saldo. Padrão: AUTOMATIC_CREATION_BY_EXTERNAL_SERVICE
    #[param(example = "Main")]
    pub balance_name: Option<String>,
}

impl CreateExpenseQuery {
    pub fn balance_options(&self) -> BalanceOptions {
        let increment = self
            .increment_balance
            .as_deref()
            .and_then(parse_flag)
            .unwrap_or(false);

        let name = match self.balance_name.as_deref() {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => DEFAULT_BALANCE_NAME.to_string(),
        };

        BalanceOptions { increment, name }
    }
}

/// Mesmo vocabulário aceito pelo `strconv.ParseBool` do Porcool.
fn parse_flag(value: &str) -> Option<bool> {
    match value {
        "1" | "t" | "T" | "TRUE" | "true" | "True" => Some(true),
        "0" | "f" | "F" | "FALSE" | "false" | "False" => Some(false),
        _ => None,
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BalanceOptions {
    pub increment: bool,
    pub name: String,
}

impl Default for BalanceOptions {
    fn default() -> Self {
        Self {
            increment: false,
            name: DEFAULT_BALANCE_NAME.to_string(),
        }
    }
}

// --- Documento gravado ---

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpenseDocument {
    pub expense_name: String,
    pub amount: Decimal,
    pub status: String,
    pub spending_date: DateTime<FixedOffset>,
    pub user: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub already_paid_amount: Decimal,
    pub validity: Option<DateTime<FixedOffset>>,
    pub indeterminate_validity: bool,
    pub created: DateTime<Utc>,
    pub source: String,
}

/// O que foi gravado por uma requisição aceita.
#[derive(Debug, Clone, PartialEq)]
pub struct ExpenseReceipt {
    pub expense_id: String,
    pub balance: Option<BalanceWrite>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query(increment: Option<&str>, name: Option<&str>) -> CreateExpenseQuery {
        CreateExpenseQuery {
            increment_balance: increment.map(str::to_string),
            balance_name: name.map(str::to_string),
        }
    }

    #[test]
    fn missing_query_means_no_balance_and_default_name() {
        assert_eq!(query(None, None).balance_options(), BalanceOptions::default());
    }

    #[test]
    fn increment_flag_accepts_parse_bool_vocabulary() {
        for value in ["1", "t", "T", "TRUE", "true", "True"] {
            assert!(query(Some(value), None).balance_options().increment, "{value}");
        }
        for value in ["0", "f", "F", "FALSE", "false", "False"] {
            assert!(!query(Some(value), None).balance_options().increment, "{value}");
        }
    }

    #[test]
    fn unparseable_increment_flag_is_false() {
        for value in ["", "yes", "on", "tRuE", "2"] {
            assert!(!query(Some(value), None).balance_options().increment, "{value}");
        }
    }

    #[test]
    fn empty_balance_name_falls_back_to_default() {
        let options = query(Some("true"), Some("")).balance_options();
        assert_eq!(options.name, DEFAULT_BALANCE_NAME);

        let options = query(Some("true"), Some("Main")).balance_options();
        assert_eq!(options.name, "Main");
    }

    fn payload(date: &str, email: &str) -> CreateExpensePayload {
        CreateExpensePayload {
            user_email: email.to_string(),
            expense_name: "Coffee".to_string(),
            expense_status: "paid".to_string(),
            expense_amount: Decimal::new(45, 1),
            expense_spending_date: date.to_string(),
        }
    }

    #[test]
    fn payload_validation_checks_date_and_email() {
        assert!(payload("2024-12", "a@b.com").validate().is_ok());

        let errors = payload("2024-12-01", "a@b.com").validate().unwrap_err();
        assert!(errors.field_errors().contains_key("expense_spending_date"));

        let errors = payload("2024-12", "not-an-email").validate().unwrap_err();
        assert!(errors.field_errors().contains_key("user_email"));
    }
}
