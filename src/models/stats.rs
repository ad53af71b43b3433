//! Aggregate statistics derived from a card collection.
use super::card::{Card, MAX_EASE_FACTOR};
use super::day::same_day;
use chrono::{DateTime, FixedOffset, Utc};
use serde::Serialize;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct DailyStats {
    pub due_today: usize,
    pub reviewed_today: usize,
    pub new_cards: usize,
    pub total_cards: usize,
}

/// Counts for the local day containing `now`.
pub fn compute_daily_stats(cards: &[Card], now: DateTime<Utc>, offset: FixedOffset) -> DailyStats {
    cards.iter().fold(
        DailyStats {
            total_cards: cards.len(),
            ..DailyStats::default()
        },
        |mut stats, card| {
            if card.is_due(now) {
                stats.due_today += 1;
            }
            if card
                .last_reviewed_at
                .is_some_and(|reviewed| same_day(reviewed, now, offset))
            {
                stats.reviewed_today += 1;
            }
            if card.is_new() {
                stats.new_cards += 1;
            }
            stats
        },
    )
}

/// Percentage (0-100) of reviewed cards whose ease factor sits at the ceiling.
///
/// This is a proxy for retention, not a historical success ratio: a card that
/// recovered from a lapse counts the same as one that never lapsed. Returns 0
/// when no card has been reviewed yet.
pub fn compute_retention_rate(cards: &[Card]) -> f64 {
    let (reviewed, retained) = cards
        .iter()
        .filter(|card| !card.is_new())
        .fold((0usize, 0usize), |(reviewed, retained), card| {
            let at_ceiling = card.ease_factor >= MAX_EASE_FACTOR;
            (reviewed + 1, retained + usize::from(at_ceiling))
        });

    if reviewed == 0 {
        return 0.0;
    }
    retained as f64 / reviewed as f64 * 100.0
}
