pub mod dto;
pub mod handlers;

pub use handlers::{get_transaction, list_transactions};
