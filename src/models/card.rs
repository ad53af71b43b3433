//! Per-user, per-item scheduling record.
use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identifier of the learnable content. The scheduler only stores the reference.
pub type ItemId = i64;

pub const MIN_EASE_FACTOR: f64 = 1.3;
pub const MAX_EASE_FACTOR: f64 = 2.5;
pub const INITIAL_EASE_FACTOR: f64 = MAX_EASE_FACTOR;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Card {
    pub user_id: String,
    pub item_id: ItemId,
    pub ease_factor: f64,
    pub interval_days: u32,
    /// Consecutive successful reviews.
    #[serde(rename = "repetitions", alias = "review_count")]
    pub repetition_count: u32,
    pub next_review_date: DateTime<Utc>,
    #[serde(default)]
    pub last_reviewed_at: Option<DateTime<Utc>>,
}

impl Card {
    /// A card that has never been reviewed and is due immediately.
    pub fn new(user_id: impl Into<String>, item_id: ItemId, now: DateTime<Utc>) -> Self {
        Self {
            user_id: user_id.into(),
            item_id,
            ease_factor: INITIAL_EASE_FACTOR,
            interval_days: 0,
            repetition_count: 0,
            next_review_date: now,
            last_reviewed_at: None,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if !self.ease_factor.is_finite()
            || !(MIN_EASE_FACTOR..=MAX_EASE_FACTOR).contains(&self.ease_factor)
        {
            return Err(Error::invalid(format!(
                "ease factor of item {} must be within [{}, {}], got {}",
                self.item_id, MIN_EASE_FACTOR, MAX_EASE_FACTOR, self.ease_factor
            )));
        }
        if self.repetition_count > 0 && self.interval_days == 0 {
            return Err(Error::invalid(format!(
                "item {} has {} repetitions but a zero interval",
                self.item_id, self.repetition_count
            )));
        }
        if self.repetition_count > 0 && self.last_reviewed_at.is_none() {
            return Err(Error::invalid(format!(
                "item {} has {} repetitions but no last review time",
                self.item_id, self.repetition_count
            )));
        }
        Ok(())
    }

    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.next_review_date <= now
    }

    pub fn is_new(&self) -> bool {
        self.repetition_count == 0
    }
}
