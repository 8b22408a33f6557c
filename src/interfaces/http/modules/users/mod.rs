pub mod dto;
pub mod handlers;

pub use handlers::{create_user, list_users};
