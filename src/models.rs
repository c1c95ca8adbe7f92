//! Data models for cards, card sets, and review statistics

use std::collections::BTreeMap;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Compute the stable fingerprint for a card id.
///
/// The fingerprint is the lowercase hex MD5 digest of the id and serves as
/// an opaque reference token wherever a card must be identified across an
/// interface boundary without round-tripping the raw id.
pub fn fingerprint(id: &str) -> String {
    format!("{:x}", md5::compute(id))
}

/// A single flashcard
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Card {
    /// Fingerprint of the id, stable across reloads
    pub fingerprint: String,
    pub id: String,
    pub front: String,
    pub back: String,
    /// None means the card has never been reviewed
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub last_reviewed: Option<DateTime<Utc>>,
    /// Consecutive correct answers since the last miss
    #[serde(default)]
    pub correct_streak: u32,
    /// False for cards synthesized from leftover progress records
    #[serde(default = "default_defined_in_file")]
    pub defined_in_file: bool,
}

fn default_defined_in_file() -> bool {
    true
}

impl Card {
    pub fn new(id: String, front: String, back: String) -> Self {
        Self {
            fingerprint: fingerprint(&id),
            id,
            front,
            back,
            last_reviewed: None,
            correct_streak: 0,
            defined_in_file: true,
        }
    }

    /// A card known only from a progress record, no longer in any
    /// definition file
    pub fn orphan(id: String, last_reviewed: Option<DateTime<Utc>>, correct_streak: u32) -> Self {
        Self {
            fingerprint: fingerprint(&id),
            id,
            front: String::new(),
            back: String::new(),
            last_reviewed,
            correct_streak,
            defined_in_file: false,
        }
    }

    /// A card with an empty front or back cannot be reviewed
    pub fn is_blank(&self) -> bool {
        self.front.is_empty() || self.back.is_empty()
    }
}

/// A definition file paired with its progress file
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardSet {
    /// Display path, `/`-separated on every platform, definition suffix
    /// stripped
    pub logical_id: String,
    pub definition_path: PathBuf,
    pub progress_path: PathBuf,
    /// Definition order with orphans appended last; empty until loaded
    #[serde(default)]
    pub cards: Vec<Card>,
}

impl CardSet {
    pub fn new(logical_id: String, definition_path: PathBuf, progress_path: PathBuf) -> Self {
        Self {
            logical_id,
            definition_path,
            progress_path,
            cards: Vec::new(),
        }
    }

    /// Look up a card by fingerprint
    pub fn card(&self, fingerprint: &str) -> Option<&Card> {
        self.cards.iter().find(|c| c.fingerprint == fingerprint)
    }

    /// Look up a card by fingerprint for mutation
    pub fn card_mut(&mut self, fingerprint: &str) -> Option<&mut Card> {
        self.cards.iter_mut().find(|c| c.fingerprint == fingerprint)
    }
}

/// One line of a remap-rule file: pulls definition files from outside the
/// discovery root into the logical-id namespace
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemapRule {
    /// External root the rule reads from
    pub root: PathBuf,
    /// File or directory under `root` to walk
    pub sub_path: String,
    /// Replacement for `sub_path` in the logical-id namespace
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub rename: Option<String>,
}

/// Aggregate review counts over one card set
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetStatistics {
    pub total_cards: usize,
    pub blank_cards: usize,
    pub new_cards: usize,
    pub due_cards: usize,
    pub orphaned_cards: usize,
    /// Count of reviewable cards at each interval-day value
    pub interval_counts: BTreeMap<u32, usize>,
}

impl Default for SetStatistics {
    fn default() -> Self {
        Self {
            total_cards: 0,
            blank_cards: 0,
            new_cards: 0,
            due_cards: 0,
            orphaned_cards: 0,
            interval_counts: BTreeMap::new(),
        }
    }
}
