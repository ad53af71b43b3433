//! SM-2 (SuperMemo 2) derived review update engine.
//!
//! The engine maps a card, a recall quality and the current instant to the card's
//! next state:
//! - A first-ever review or a lapse (quality 0-2) schedules the card for tomorrow
//!   and leaves the ease factor alone
//! - Successful reviews grow the interval progressively (1 day → 6 days → EF multiplier)
//! - The ease factor (EF) moves with every successful review and stays within [1.3, 2.5]
//! - What a lapse does to the repetition count depends on the [`LapsePolicy`]
//!
//! Dates are day-granular: the next review always lands on a local midnight.

use super::card::{Card, MAX_EASE_FACTOR, MIN_EASE_FACTOR};
use super::day::start_of_day;
use super::quality::Quality;
use crate::config::{LapsePolicy, SchedulerConfig};
use crate::error::{Error, Result};
use chrono::{DateTime, Duration, Utc};

/// Interval assigned after the second successful review.
pub const GRADUATION_INTERVAL_DAYS: u32 = 6;

/// Interval assigned on a first review or a lapse.
pub const RELEARN_INTERVAL_DAYS: u32 = 1;

/// EF' - EF = 0.1 - (5 - q) * (0.08 + (5 - q) * 0.02)
pub fn ease_factor_delta(quality: Quality) -> f64 {
    let miss = f64::from(Quality::MAX - quality.value());
    0.1 - miss * (0.08 + miss * 0.02)
}

/// Computes the card state after a review of the given quality at `now`.
///
/// The input card is validated first; the returned card is a new value and the
/// caller is responsible for persisting it.
pub fn compute_next_review(
    card: &Card,
    quality: Quality,
    now: DateTime<Utc>,
    config: &SchedulerConfig,
) -> Result<Card> {
    card.validate()?;
    config.validate()?;
    let offset = config.day_offset()?;

    let mut next = card.clone();

    if card.repetition_count == 0 || !quality.is_pass() {
        next.interval_days = RELEARN_INTERVAL_DAYS;
        next.repetition_count = if quality.is_pass() {
            1
        } else {
            match config.lapse_policy {
                LapsePolicy::SoftLapseRetain => card.repetition_count,
                LapsePolicy::StrictLapseReset => 0,
            }
        };
    } else {
        let ease_factor =
            (card.ease_factor + ease_factor_delta(quality)).clamp(MIN_EASE_FACTOR, MAX_EASE_FACTOR);

        next.interval_days = if card.repetition_count == 1 {
            GRADUATION_INTERVAL_DAYS
        } else {
            scale_interval(card.interval_days, ease_factor)
        };
        next.ease_factor = ease_factor;
        next.repetition_count = card.repetition_count.saturating_add(1);
    }

    next.interval_days = next.interval_days.min(config.maximum_interval_days);
    next.next_review_date = start_of_day(now, offset)
        .checked_add_signed(Duration::days(i64::from(next.interval_days)))
        .ok_or_else(|| {
            Error::invalid(format!(
                "next review of item {} falls outside the supported date range",
                card.item_id
            ))
        })?;
    next.last_reviewed_at = Some(now);

    log::debug!(
        "item {} reviewed with quality {}: interval {} -> {} days, EF {:.2} -> {:.2}, reps {} -> {}",
        card.item_id,
        quality,
        card.interval_days,
        next.interval_days,
        card.ease_factor,
        next.ease_factor,
        card.repetition_count,
        next.repetition_count
    );

    Ok(next)
}

/// round(interval * EF), half away from zero, never below one day.
fn scale_interval(interval_days: u32, ease_factor: f64) -> u32 {
    // Float to int `as` casts saturate, so huge products land on u32::MAX.
    (f64::from(interval_days) * ease_factor).round().max(1.0) as u32
}

/// Interval each quality 0..=5 would produce, for showing the outcome of every
/// answer before the user picks one.
pub fn preview_intervals(
    card: &Card,
    now: DateTime<Utc>,
    config: &SchedulerConfig,
) -> Result<[u32; 6]> {
    let mut intervals = [0; 6];
    for (slot, quality) in intervals.iter_mut().zip(Quality::all()) {
        *slot = compute_next_review(card, quality, now, config)?.interval_days;
    }
    Ok(intervals)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{FixedOffset, TimeZone};
    use proptest::prelude::*;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 10, 14, 30, 0).unwrap()
    }

    fn midnight_plus(days: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 10, 0, 0, 0).unwrap() + Duration::days(days)
    }

    fn q(value: u8) -> Quality {
        Quality::new(value).unwrap()
    }

    fn soft() -> SchedulerConfig {
        SchedulerConfig::default()
    }

    fn strict() -> SchedulerConfig {
        SchedulerConfig {
            lapse_policy: LapsePolicy::StrictLapseReset,
            ..SchedulerConfig::default()
        }
    }

    fn reviewed_card(ease_factor: f64, interval_days: u32, repetition_count: u32) -> Card {
        Card {
            ease_factor,
            interval_days,
            repetition_count,
            last_reviewed_at: Some(now() - Duration::days(i64::from(interval_days))),
            ..Card::new("alice", 1, now())
        }
    }

    #[test]
    fn test_first_review() {
        let card = Card::new("alice", 1, now());

        let next = compute_next_review(&card, q(4), now(), &soft()).unwrap();
        assert_eq!(next.interval_days, 1);
        assert_eq!(next.repetition_count, 1);
        assert_eq!(next.ease_factor, 2.5);
        assert_eq!(next.next_review_date, midnight_plus(1));
        assert_eq!(next.last_reviewed_at, Some(now()));
    }

    #[test]
    fn test_first_review_failed_stays_new() {
        let card = Card::new("alice", 1, now());

        let next = compute_next_review(&card, q(1), now(), &soft()).unwrap();
        assert_eq!(next.interval_days, 1);
        assert_eq!(next.repetition_count, 0);
        assert_eq!(next.ease_factor, 2.5);
    }

    #[test]
    fn test_second_review_graduates() {
        let card = reviewed_card(2.5, 1, 1);

        let next = compute_next_review(&card, q(4), now(), &soft()).unwrap();
        assert_eq!(next.interval_days, 6);
        assert_eq!(next.repetition_count, 2);
        assert_eq!(next.next_review_date, midnight_plus(6));
    }

    #[test]
    fn test_graduation_ignores_low_ease() {
        let card = reviewed_card(1.3, 1, 1);

        let next = compute_next_review(&card, q(3), now(), &soft()).unwrap();
        assert_eq!(next.interval_days, 6);
        assert_eq!(next.ease_factor, 1.3);
    }

    #[test]
    fn test_subsequent_review_multiplies_by_new_ease() {
        let card = reviewed_card(2.0, 10, 4);

        // quality 3: EF 2.0 - 0.14 = 1.86, 10 * 1.86 = 18.6
        let next = compute_next_review(&card, q(3), now(), &soft()).unwrap();
        assert!((next.ease_factor - 1.86).abs() < 1e-9);
        assert_eq!(next.interval_days, 19);
        assert_eq!(next.repetition_count, 5);
    }

    #[test]
    fn test_interval_rounds_half_away_from_zero() {
        // 1 * 2.5 = 2.5 rounds up to 3
        let card = reviewed_card(2.5, 1, 3);

        let next = compute_next_review(&card, q(5), now(), &soft()).unwrap();
        assert_eq!(next.interval_days, 3);
    }

    #[test]
    fn test_ease_delta_per_quality() {
        assert!((ease_factor_delta(q(5)) - 0.1).abs() < 1e-12);
        assert!(ease_factor_delta(q(4)).abs() < 1e-12);
        assert!((ease_factor_delta(q(3)) + 0.14).abs() < 1e-12);
        assert!((ease_factor_delta(q(0)) + 0.8).abs() < 1e-12);
    }

    #[test]
    fn test_ease_factor_ceiling() {
        let card = reviewed_card(2.5, 6, 2);

        let next = compute_next_review(&card, q(5), now(), &soft()).unwrap();
        assert_eq!(next.ease_factor, 2.5);
    }

    #[test]
    fn test_ease_factor_floor() {
        let card = reviewed_card(1.4, 6, 2);

        let next = compute_next_review(&card, q(3), now(), &soft()).unwrap();
        assert_eq!(next.ease_factor, 1.3);
    }

    #[test]
    fn test_soft_lapse_keeps_repetitions_and_ease() {
        let card = reviewed_card(2.1, 30, 5);

        let next = compute_next_review(&card, q(0), now(), &soft()).unwrap();
        assert_eq!(next.interval_days, 1);
        assert_eq!(next.repetition_count, 5);
        assert_eq!(next.ease_factor, 2.1);
        assert_eq!(next.next_review_date, midnight_plus(1));
    }

    #[test]
    fn test_strict_lapse_resets_repetitions_and_keeps_ease() {
        let card = reviewed_card(2.1, 30, 5);

        let next = compute_next_review(&card, q(2), now(), &strict()).unwrap();
        assert_eq!(next.interval_days, 1);
        assert_eq!(next.repetition_count, 0);
        assert_eq!(next.ease_factor, 2.1);

        // The next pass starts the learning curve over.
        let after = compute_next_review(&next, q(5), now(), &strict()).unwrap();
        assert_eq!(after.interval_days, 1);
        assert_eq!(after.repetition_count, 1);
    }

    #[test]
    fn test_reference_trace() {
        let fresh = Card::new("alice", 1, now());

        let first = compute_next_review(&fresh, q(5), now(), &soft()).unwrap();
        assert_eq!((first.interval_days, first.repetition_count), (1, 1));

        let second = compute_next_review(&first, q(5), now(), &soft()).unwrap();
        assert_eq!((second.interval_days, second.repetition_count), (6, 2));

        let lapse = compute_next_review(&second, q(2), now(), &soft()).unwrap();
        assert_eq!(lapse.interval_days, 1);
        assert_eq!(lapse.ease_factor, second.ease_factor);
    }

    #[test]
    fn test_perfect_streak_intervals() {
        let mut card = Card::new("alice", 1, now());
        let mut intervals = Vec::new();
        let mut ease_after = Vec::new();

        for _ in 0..6 {
            card = compute_next_review(&card, q(5), now(), &soft()).unwrap();
            intervals.push(card.interval_days);
            ease_after.push(card.ease_factor);
        }

        assert_eq!(intervals[0], 1);
        assert_eq!(intervals[1], 6);
        assert_eq!(intervals[2], (6.0 * ease_after[1]).round() as u32);
        assert!(intervals.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn test_lapse_lands_on_next_midnight() {
        let card = reviewed_card(2.5, 40, 6);
        let late = Utc.with_ymd_and_hms(2024, 3, 10, 23, 59, 59).unwrap();

        let next = compute_next_review(&card, q(0), late, &soft()).unwrap();
        assert_eq!(next.interval_days, 1);
        assert_eq!(next.next_review_date, midnight_plus(1));
    }

    #[test]
    fn test_midnight_uses_configured_offset() {
        let config = SchedulerConfig {
            utc_offset_minutes: 120,
            ..SchedulerConfig::default()
        };
        // 23:30 UTC is already the next local day at UTC+2.
        let late = Utc.with_ymd_and_hms(2024, 3, 10, 23, 30, 0).unwrap();
        let card = Card::new("alice", 1, late);

        let next = compute_next_review(&card, q(4), late, &config).unwrap();
        let offset = FixedOffset::east_opt(7200).unwrap();
        let local = next.next_review_date.with_timezone(&offset);
        assert_eq!(local.format("%Y-%m-%d %H:%M").to_string(), "2024-03-12 00:00");
    }

    #[test]
    fn test_interval_capped_by_config() {
        let config = SchedulerConfig {
            maximum_interval_days: 100,
            ..SchedulerConfig::default()
        };
        let card = reviewed_card(2.5, 90, 8);

        let next = compute_next_review(&card, q(5), now(), &config).unwrap();
        assert_eq!(next.interval_days, 100);
        assert_eq!(next.next_review_date, midnight_plus(100));
    }

    #[test]
    fn test_rejects_zero_maximum_interval() {
        let config = SchedulerConfig {
            maximum_interval_days: 0,
            ..SchedulerConfig::default()
        };
        let card = Card::new("alice", 1, now());

        let result = compute_next_review(&card, q(5), now(), &config);
        assert!(matches!(result, Err(Error::InvalidArgument(_))));
    }

    #[test]
    fn test_rejects_out_of_range_offset() {
        let config = SchedulerConfig {
            utc_offset_minutes: i32::MAX,
            ..SchedulerConfig::default()
        };
        let card = Card::new("alice", 1, now());

        let result = compute_next_review(&card, q(5), now(), &config);
        assert!(matches!(result, Err(Error::InvalidArgument(_))));
    }

    #[test]
    fn test_same_inputs_same_output() {
        let card = reviewed_card(2.3, 15, 3);

        let a = compute_next_review(&card, q(4), now(), &soft()).unwrap();
        let b = compute_next_review(&card, q(4), now(), &soft()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_rejects_invalid_card() {
        let card = reviewed_card(3.0, 15, 3);

        let result = compute_next_review(&card, q(4), now(), &soft());
        assert!(matches!(result, Err(Error::InvalidArgument(_))));
    }

    #[test]
    fn test_preview_intervals() {
        let card = reviewed_card(2.5, 10, 3);

        let preview = preview_intervals(&card, now(), &soft()).unwrap();
        // Failures relearn tomorrow; passes scale by the updated EF.
        assert_eq!(preview[..3], [1, 1, 1]);
        assert_eq!(preview[3], 24);
        assert_eq!(preview[4], 25);
        assert_eq!(preview[5], 25);
    }

    proptest! {
        #[test]
        fn prop_ease_and_interval_bounds(
            qualities in proptest::collection::vec(0u8..=5, 1..80),
            strict_policy in any::<bool>(),
        ) {
            let config = if strict_policy { strict() } else { soft() };
            let mut card = Card::new("alice", 1, now());
            let mut at = now();

            for value in qualities {
                card = compute_next_review(&card, q(value), at, &config).unwrap();
                prop_assert!(card.ease_factor >= MIN_EASE_FACTOR);
                prop_assert!(card.ease_factor <= MAX_EASE_FACTOR);
                prop_assert!(card.interval_days >= 1);
                prop_assert!(card.interval_days <= config.maximum_interval_days);
                prop_assert!(card.next_review_date > at);
                at = card.next_review_date;
            }
        }
    }
}
