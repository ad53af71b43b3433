//! Review session over the cards due at a fixed instant.
//! Runs the due queue in rounds and persists every graded card through a repository.

use super::due::select_due;
use super::quality::Quality;
use super::sm2::compute_next_review;
use super::Card;
use crate::config::SchedulerConfig;
use crate::database::CardRepository;
use crate::error::Result;
use chrono::{DateTime, Utc};

struct SessionCard {
    card: Card,
    passed: bool,
}

/// Manages a review session with multiple rounds.
/// Cards graded below the pass threshold are repeated in subsequent rounds.
///
/// Every round grades against the same `now`, and each retry is a separate review
/// event. Under [`LapsePolicy::SoftLapseRetain`] a previously reviewed card that
/// lapses and then passes its retry takes the success path right away: the interval
/// becomes `round(1 * EF)` and the ease factor moves, so the card ends up with two
/// review events at one instant.
///
/// [`LapsePolicy::SoftLapseRetain`]: crate::config::LapsePolicy::SoftLapseRetain
pub struct ReviewSession<R: CardRepository> {
    repository: R,
    config: SchedulerConfig,
    now: DateTime<Utc>,
    cards: Vec<SessionCard>,
    current_round_cards: Vec<usize>,
    current_index: usize,
    round_number: usize,
}

impl<R: CardRepository> ReviewSession<R> {
    /// Loads the user's cards and queues those due at `now`, earliest due first.
    pub fn start(
        repository: R,
        user_id: &str,
        now: DateTime<Utc>,
        config: SchedulerConfig,
    ) -> Result<Self> {
        let due = select_due(&repository.list(user_id)?, now);
        log::info!("Starting review session for '{}' with {} due cards", user_id, due.len());
        Ok(Self::new_from_due_cards(repository, due, now, config))
    }

    pub fn new_from_due_cards(
        repository: R,
        due_cards: Vec<Card>,
        now: DateTime<Utc>,
        config: SchedulerConfig,
    ) -> Self {
        let cards: Vec<_> = due_cards
            .into_iter()
            .map(|card| SessionCard { card, passed: false })
            .collect();
        let indices = (0..cards.len()).collect();

        Self {
            repository,
            config,
            now,
            cards,
            current_round_cards: indices,
            current_index: 0,
            round_number: 1,
        }
    }

    pub fn current_card(&self) -> Option<&Card> {
        self.current_round_cards
            .get(self.current_index)
            .and_then(|&idx| self.cards.get(idx))
            .map(|entry| &entry.card)
    }

    /// Grades the current card, saves its next state and returns it.
    /// Returns `None` when there is no current card.
    pub fn grade_current_card(&mut self, quality: Quality) -> Result<Option<Card>> {
        let Some(&idx) = self.current_round_cards.get(self.current_index) else {
            return Ok(None);
        };
        let Some(entry) = self.cards.get_mut(idx) else {
            return Ok(None);
        };

        let next = compute_next_review(&entry.card, quality, self.now, &self.config)?;
        self.repository.save(&next)?;

        entry.card = next.clone();
        entry.passed = quality.is_pass();
        Ok(Some(next))
    }

    pub fn next_card(&mut self) {
        if self.current_index + 1 < self.current_round_cards.len() {
            self.current_index += 1;
        } else {
            self.start_next_round();
        }
    }

    /// Starts a new round with the cards that failed in this one.
    /// If none failed, the round is left as is and the session is complete.
    fn start_next_round(&mut self) {
        let failed: Vec<usize> = self
            .current_round_cards
            .iter()
            .copied()
            .filter(|&idx| self.cards.get(idx).is_some_and(|entry| !entry.passed))
            .collect();

        if failed.is_empty() {
            return;
        }

        for &idx in &failed {
            if let Some(entry) = self.cards.get_mut(idx) {
                entry.passed = false;
            }
        }
        log::debug!("Round {} complete, {} cards to retry", self.round_number, failed.len());

        self.current_round_cards = failed;
        self.current_index = 0;
        self.round_number += 1;
    }

    pub fn learned_count(&self) -> usize {
        self.current_round_cards
            .iter()
            .filter(|&&idx| self.cards.get(idx).is_some_and(|entry| entry.passed))
            .count()
    }

    pub fn total_count(&self) -> usize {
        self.current_round_cards.len()
    }

    pub fn remaining_count(&self) -> usize {
        self.total_count() - self.learned_count()
    }

    pub fn round_number(&self) -> usize {
        self.round_number
    }

    /// True when the queue was empty or every card in the current round passed.
    pub fn is_completed(&self) -> bool {
        self.learned_count() == self.total_count()
    }

    pub fn phase_message(&self) -> String {
        if self.round_number == 1 {
            format!("Round {}: {} cards", self.round_number, self.total_count())
        } else {
            format!(
                "Round {} (Retry): {} cards to retry",
                self.round_number,
                self.total_count()
            )
        }
    }

    pub fn into_repository(self) -> R {
        self.repository
    }
}
