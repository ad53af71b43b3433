pub mod config;
pub mod database;
pub mod error;
pub mod export;
pub mod models;

pub use config::{LapsePolicy, SchedulerConfig};
pub use database::{CardRepository, InMemoryCardRepository, SqliteCardRepository};
pub use error::{Error, Result};
pub use models::{Card, DailyStats, ItemId, Quality, ReviewSession};
