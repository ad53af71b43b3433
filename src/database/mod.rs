//! Persistence collaborators for card state.
//!
//! The scheduler never touches storage directly; callers load cards through a
//! [`CardRepository`], run them through the engine, and save the result.

pub mod db;
pub mod memory;

use crate::error::Result;
use crate::models::{Card, ItemId};

pub use db::SqliteCardRepository;
pub use memory::InMemoryCardRepository;

pub trait CardRepository {
    fn load(&self, user_id: &str, item_id: ItemId) -> Result<Option<Card>>;

    /// Inserts the card or replaces the stored state for its `(user_id, item_id)`.
    fn save(&mut self, card: &Card) -> Result<()>;

    /// All cards of a user, earliest due first.
    fn list(&self, user_id: &str) -> Result<Vec<Card>>;
}
