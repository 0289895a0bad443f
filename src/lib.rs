pub mod app;
pub mod clear;
pub mod config;
pub mod daily;
pub mod dates;
pub mod day_view;
pub mod errors;
pub mod handlers;
pub mod migration;
pub mod models;
pub mod nutrition;
pub mod profile;
pub mod state;
pub mod storage;
pub mod targets;
pub mod trends;

pub use app::router;
pub use config::Config;
pub use daily::{DailyRecords, Subscription};
pub use state::AppState;
pub use storage::{DocumentStore, load_data};
