pub mod app;
pub mod auth;
pub mod config;
pub mod errors;
pub mod extract;
pub mod handlers;
pub mod models;
pub mod period;
pub mod state;
pub mod stats;
pub mod storage;
pub mod store;

pub use app::router;
pub use config::Config;
pub use state::AppState;
pub use stats::{aggregate, aggregate_at};
pub use storage::load_data;
pub use store::{JsonStore, MoodHistoryStore};
