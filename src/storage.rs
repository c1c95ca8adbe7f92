//! Progress-file load, merge, and save
//!
//! Review progress lives next to each definition file in a plain-text
//! companion: one `"id | timestamp | streak"` record per card. Loading a
//! card set parses the definition file, then folds the progress records
//! back onto the defined cards by id; records whose id is no longer
//! defined become orphaned cards so their history survives a rename or
//! an accidental deletion until the user saves with `clean`.

use std::fs;
use std::path::Path;

use chrono::{DateTime, SecondsFormat, Utc};
use thiserror::Error;

use crate::models::{Card, CardSet};
use crate::parser::{self, ParseError, SIDE_DELIMITER};

/// Timestamp field for a card that has never been reviewed
const NEVER_REVIEWED: &str = "-";

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("definition error: {0}")]
    Parse(#[from] ParseError),

    #[error("invalid progress record on line {line}: {reason}")]
    InvalidRecord { line: usize, reason: String },
}

pub type Result<T> = std::result::Result<T, StorageError>;

/// Load a card set: parse the definition file, then merge review progress.
///
/// A missing definition file is an error; a missing progress file is not —
/// it just means no card has been reviewed yet. Progress records for ids no
/// longer in the definition file come back as orphaned cards appended after
/// the defined ones.
pub fn load_card_set(definition_path: &Path, progress_path: &Path) -> Result<Vec<Card>> {
    let text = fs::read_to_string(definition_path)?;
    let mut cards = parser::parse_definitions(&text)?;

    if progress_path.exists() {
        merge_progress(progress_path, &mut cards)?;
    }

    Ok(cards)
}

/// Fold the records of an existing progress file onto the defined cards
fn merge_progress(progress_path: &Path, cards: &mut Vec<Card>) -> Result<()> {
    let text = fs::read_to_string(progress_path)?;

    for (index, line) in text.lines().enumerate() {
        let line_number = index + 1;
        let fields: Vec<&str> = line.split(SIDE_DELIMITER).collect();
        if fields.len() != 3 {
            return Err(StorageError::InvalidRecord {
                line: line_number,
                reason: format!("expected 3 fields, found {}", fields.len()),
            });
        }

        let id = fields[0];
        let last_reviewed = parse_timestamp(fields[1], line_number)?;
        let correct_streak: u32 =
            fields[2]
                .parse()
                .map_err(|_| StorageError::InvalidRecord {
                    line: line_number,
                    reason: format!("invalid streak \"{}\"", fields[2]),
                })?;

        match cards.iter_mut().find(|card| card.id == id) {
            Some(card) => {
                card.last_reviewed = last_reviewed;
                card.correct_streak = correct_streak;
            }
            None => cards.push(Card::orphan(id.to_string(), last_reviewed, correct_streak)),
        }
    }

    Ok(())
}

fn parse_timestamp(field: &str, line_number: usize) -> Result<Option<DateTime<Utc>>> {
    if field == NEVER_REVIEWED {
        return Ok(None);
    }
    let parsed = DateTime::parse_from_rfc3339(field).map_err(|e| StorageError::InvalidRecord {
        line: line_number,
        reason: format!("invalid timestamp \"{}\": {}", field, e),
    })?;
    Ok(Some(parsed.with_timezone(&Utc)))
}

fn format_timestamp(last_reviewed: Option<DateTime<Utc>>) -> String {
    match last_reviewed {
        Some(time) => time.to_rfc3339_opts(SecondsFormat::AutoSi, true),
        None => NEVER_REVIEWED.to_string(),
    }
}

/// Write one progress record per card.
///
/// With `clean` set, orphaned cards are dropped, pruning progress for ids
/// that no longer exist in the definition file; without it every record is
/// kept in case the id comes back.
pub fn save_progress(progress_path: &Path, cards: &[Card], clean: bool) -> Result<()> {
    if let Some(parent) = progress_path.parent() {
        fs::create_dir_all(parent)?;
    }

    let mut out = String::new();
    let mut written = 0;
    for card in cards {
        if clean && !card.defined_in_file {
            continue;
        }
        out.push_str(&card.id);
        out.push_str(SIDE_DELIMITER);
        out.push_str(&format_timestamp(card.last_reviewed));
        out.push_str(SIDE_DELIMITER);
        out.push_str(&card.correct_streak.to_string());
        out.push('\n');
        written += 1;
    }
    fs::write(progress_path, out)?;

    log::info!(
        "Saved progress for {} cards to {:?}",
        written,
        progress_path
    );
    Ok(())
}

/// Load every card set in place, stopping at the first failure
pub fn load_card_sets(sets: &mut [CardSet]) -> Result<()> {
    for set in sets {
        set.load()?;
    }
    Ok(())
}

impl CardSet {
    /// Rebuild this set's cards from its definition and progress files
    pub fn load(&mut self) -> Result<()> {
        self.cards = load_card_set(&self.definition_path, &self.progress_path)?;
        Ok(())
    }

    /// Persist this set's review progress
    pub fn save_progress(&self, clean: bool) -> Result<()> {
        save_progress(&self.progress_path, &self.cards, clean)
    }
}
