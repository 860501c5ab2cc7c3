pub mod anki;
pub mod config;
pub mod creator;
pub mod database;
pub mod error;
pub mod lookup;
pub mod mapper;
pub mod models;
pub mod server;

pub use config::Config;
pub use creator::AnkiCreator;
pub use database::DatabaseManager;
pub use models::*;
pub use server::{AppState, build_router};
