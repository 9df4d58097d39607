pub mod balance_service;
pub mod expense_builder;
pub mod expense_service;
pub mod user_service;
