pub mod dto;
pub mod handlers;

pub use handlers::{broadcast_command, send_command};
