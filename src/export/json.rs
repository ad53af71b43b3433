//! JSON import/export of card scheduling state.
//! Provides functionality to save and load card snapshots to/from JSON files.

use crate::error::{Error, Result};
use crate::models::Card;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, Write};
use std::path::Path;

#[derive(Debug, Serialize, Deserialize)]
pub struct CardSnapshot {
    pub exported_at: DateTime<Utc>,
    pub cards: Vec<Card>,
}

/// Exports cards to a JSON file at the specified path.
/// Returns an error if file creation or writing fails.
pub fn export_json_to_path(cards: &[Card], exported_at: DateTime<Utc>, path: &Path) -> Result<()> {
    let snapshot = CardSnapshot {
        exported_at,
        cards: cards.to_vec(),
    };
    let json_string = serde_json::to_string_pretty(&snapshot)?;
    let mut file = File::create(path)?;
    file.write_all(json_string.as_bytes())?;

    log::info!("Exported {} cards to '{}'", cards.len(), path.display());
    Ok(())
}

/// Imports cards from a JSON snapshot file.
/// Every card is validated; one bad card fails the whole import.
pub fn import_json(path: &Path) -> Result<Vec<Card>> {
    let file = File::open(path)?;
    let snapshot: CardSnapshot = serde_json::from_reader(BufReader::new(file))?;

    for card in &snapshot.cards {
        card.validate()?;
    }

    log::info!(
        "Imported {} cards from '{}' (exported {})",
        snapshot.cards.len(),
        path.display(),
        snapshot.exported_at.format("%Y-%m-%d")
    );
    Ok(snapshot.cards)
}

/// Imports a snapshot that must belong entirely to `user_id`.
/// A card owned by anyone else fails the import before anything is returned.
pub fn import_json_for_user(path: &Path, user_id: &str) -> Result<Vec<Card>> {
    let cards = import_json(path)?;
    if let Some(foreign) = cards.iter().find(|card| card.user_id != user_id) {
        return Err(Error::invalid(format!(
            "snapshot '{}' holds item {} of user '{}', expected only '{}'",
            path.display(),
            foreign.item_id,
            foreign.user_id,
            user_id
        )));
    }
    Ok(cards)
}
