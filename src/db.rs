pub mod store;
pub use store::{DocumentStore, TransactionPolicy, TransactionRunner};
pub mod memory_store;
pub use memory_store::MemoryStore;
pub mod postgres_store;
pub use postgres_store::PostgresStore;

pub mod expense_repo;
pub use expense_repo::ExpenseRepository;
pub mod balance_repo;
pub use balance_repo::BalanceRepository;
pub mod user_repo;
pub use user_repo::UserRepository;
