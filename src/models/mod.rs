pub mod card;
pub mod day;
pub mod due;
pub mod quality;
pub mod review_session;
pub mod sm2;
pub mod stats;

pub use card::{Card, ItemId, MAX_EASE_FACTOR, MIN_EASE_FACTOR};
pub use due::{DayForecast, forecast, select_due, select_upcoming};
pub use quality::{QUALITY_THRESHOLD, Quality};
pub use review_session::ReviewSession;
pub use sm2::{compute_next_review, preview_intervals};
pub use stats::{DailyStats, compute_daily_stats, compute_retention_rate};
