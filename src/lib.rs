//! Plain-text flashcards with spaced repetition
//!
//! This crate provides:
//! - Definition-file parsing (one card per line, multi-line and fenced
//!   sides supported)
//! - Spaced-repetition scheduling over a fixed interval table
//! - Progress-file load/merge/save, reconciled against the definition file
//! - Card-set discovery across a local tree plus remapped external paths
//!
//! All operations are synchronous and file-backed; the embedding
//! application owns sessions, rendering, and concurrency.

pub mod algorithm;
pub mod locator;
pub mod models;
pub mod parser;
pub mod storage;

pub use algorithm::{
    all_cards, apply_review, compute_statistics, draw_card, due_cards, due_or_new_cards,
    interval_cards, interval_days, interval_values, is_due, new_cards, review_batch, DrillSession,
    ReviewOutcome, INTERVALS,
};
pub use locator::{
    discover_card_sets, discover_card_sets_with_rules, load_remap_rules, progress_path_for,
    DiscoveryError,
};
pub use models::*;
pub use parser::{parse_definitions, ParseError};
pub use storage::{load_card_set, load_card_sets, save_progress, StorageError};
