pub mod dto;
pub mod handlers;

pub use handlers::{block_station, get_station, list_stations, register_station, unblock_station};
