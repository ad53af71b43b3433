//! Map-backed repository for tests and embedding callers without a database.
use super::CardRepository;
use crate::error::Result;
use crate::models::{Card, ItemId};
use std::collections::HashMap;

#[derive(Default)]
pub struct InMemoryCardRepository {
    cards: HashMap<(String, ItemId), Card>,
}

impl InMemoryCardRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }
}

impl CardRepository for InMemoryCardRepository {
    fn load(&self, user_id: &str, item_id: ItemId) -> Result<Option<Card>> {
        Ok(self.cards.get(&(user_id.to_string(), item_id)).cloned())
    }

    fn save(&mut self, card: &Card) -> Result<()> {
        card.validate()?;
        self.cards
            .insert((card.user_id.clone(), card.item_id), card.clone());
        Ok(())
    }

    fn list(&self, user_id: &str) -> Result<Vec<Card>> {
        let mut cards: Vec<Card> = self
            .cards
            .values()
            .filter(|card| card.user_id == user_id)
            .cloned()
            .collect();
        cards.sort_by_key(|card| (card.next_review_date, card.item_id));
        Ok(cards)
    }
}
