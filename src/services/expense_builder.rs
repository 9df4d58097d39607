// src/services/expense_builder.rs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use crate::{
    common::{
        error::AppError,
        spending_date::{parse_spending_date, SPENDING_DATE_MESSAGE},
    },
    models::expense::{CreateExpensePayload, ExpenseDocument, EXPENSE_TYPE, SOURCE},
};

/// Monta o documento da despesa a partir do payload já validado.
/// Não grava nada: o id e a persistência ficam com a transação.
pub fn build_expense_document(
    input: &CreateExpensePayload,
    user_id: &str,
    created: DateTime<Utc>,
) -> Result<ExpenseDocument, AppError> {
    let spending_date = parse_spending_date(&input.expense_spending_date)
        .map_err(|_| AppError::Validation(SPENDING_DATE_MESSAGE.to_string()))?;

    Ok(ExpenseDocument {
        expense_name: input.expense_name.clone(),
        amount: input.expense_amount,
        status: input.expense_status.clone(),
        spending_date,
        user: user_id.to_string(),
        kind: EXPENSE_TYPE.to_string(),
        already_paid_amount: Decimal::ZERO,
        validity: None,
        indeterminate_validity: false,
        created,
        source: SOURCE.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use chrono::{Local, TimeZone};
    use serde_json::json;

    use super::*;
    use crate::common::error::ErrorKind;

    fn coffee(date: &str) -> CreateExpensePayload {
        CreateExpensePayload {
            user_email: "a@b.com".to_string(),
            expense_name: "Coffee".to_string(),
            expense_status: "paid".to_string(),
            expense_amount: Decimal::new(45, 1),
            expense_spending_date: date.to_string(),
        }
    }

    #[test]
    fn fills_defaults_and_passes_amount_through() {
        let created = Utc::now();
        let doc = build_expense_document(&coffee("2024-12"), "user-1", created).unwrap();

        assert_eq!(doc.expense_name, "Coffee");
        assert_eq!(doc.amount, Decimal::new(45, 1));
        assert_eq!(doc.status, "paid");
        assert_eq!(doc.spending_date, Local.with_ymd_and_hms(2024, 12, 1, 0, 0, 0).unwrap());
        assert_eq!(doc.user, "user-1");
        assert_eq!(doc.kind, "expense");
        assert_eq!(doc.already_paid_amount, Decimal::ZERO);
        assert_eq!(doc.validity, None);
        assert!(!doc.indeterminate_validity);
        assert_eq!(doc.created, created);
        assert_eq!(doc.source, "porcool-bridge-expense-api");
    }

    #[test]
    fn serializes_with_porcool_field_names() {
        let doc = build_expense_document(&coffee("2024-12"), "user-1", Utc::now()).unwrap();
        let value = serde_json::to_value(&doc).unwrap();

        assert_eq!(value["expenseName"], json!("Coffee"));
        assert_eq!(value["amount"].as_f64(), Some(4.5));
        assert_eq!(value["type"], json!("expense"));
        assert_eq!(value["alreadyPaidAmount"].as_f64(), Some(0.0));
        assert_eq!(value["validity"], json!(null));
        assert_eq!(value["indeterminateValidity"], json!(false));
        assert!(value["spendingDate"].is_string());
        assert!(value["created"].is_string());
    }

    #[test]
    fn invalid_date_is_a_validation_error() {
        let err = build_expense_document(&coffee("12-2024"), "user-1", Utc::now()).unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Validation);
        assert_eq!(err.to_string(), SPENDING_DATE_MESSAGE);
    }
}
