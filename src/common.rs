pub mod error;
pub mod spending_date;
