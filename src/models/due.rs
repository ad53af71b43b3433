//! Review queue selection and near-term forecasting over a card collection.
//!
//! All functions are linear scans over caller-supplied cards and keep input order.

use super::card::Card;
use super::day::local_date;
use chrono::{DateTime, Duration, FixedOffset, NaiveDate, Utc};
use serde::Serialize;
use std::collections::BTreeMap;

/// Number of upcoming reviews falling on one local calendar day.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct DayForecast {
    pub date: NaiveDate,
    pub due: usize,
}

/// Cards whose review date has arrived: `next_review_date <= now`.
pub fn select_due(cards: &[Card], now: DateTime<Utc>) -> Vec<Card> {
    cards.iter().filter(|card| card.is_due(now)).cloned().collect()
}

/// Cards coming due within the horizon: `now < next_review_date <= now + horizon_days`.
pub fn select_upcoming(cards: &[Card], now: DateTime<Utc>, horizon_days: u32) -> Vec<Card> {
    let horizon_end = horizon_end(now, horizon_days);
    cards
        .iter()
        .filter(|card| card.next_review_date > now && card.next_review_date <= horizon_end)
        .cloned()
        .collect()
}

/// Upcoming reviews grouped by local date, earliest first. Days without reviews are omitted.
pub fn forecast(
    cards: &[Card],
    now: DateTime<Utc>,
    horizon_days: u32,
    offset: FixedOffset,
) -> Vec<DayForecast> {
    let mut per_day: BTreeMap<NaiveDate, usize> = BTreeMap::new();
    for card in select_upcoming(cards, now, horizon_days) {
        *per_day
            .entry(local_date(card.next_review_date, offset))
            .or_default() += 1;
    }

    per_day
        .into_iter()
        .map(|(date, due)| DayForecast { date, due })
        .collect()
}

fn horizon_end(now: DateTime<Utc>, horizon_days: u32) -> DateTime<Utc> {
    // Horizons past the representable range mean "everything later than now".
    Duration::try_days(i64::from(horizon_days))
        .and_then(|span| now.checked_add_signed(span))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}
