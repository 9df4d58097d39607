pub mod expense;
pub mod health;
