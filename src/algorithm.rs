//! Spaced-repetition scheduling over card state
//!
//! Review intervals follow a fixed table indexed by the card's streak of
//! consecutive correct answers: three answers to leave the learning phase,
//! then Fibonacci growth out to roughly a year. All functions here are pure
//! over the cards and the clock value passed in; persistence lives in
//! [`crate::storage`].

use std::collections::HashSet;

use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::models::{Card, SetStatistics};

/// Review interval in days for each correct-streak value. A streak past the
/// end of the table stays at the last entry.
pub const INTERVALS: [u32; 17] = [
    0, 0, 0, 1, 1, 2, 3, 5, 8, 13, 21, 34, 55, 89, 144, 233, 377,
];

/// Current review interval in days for a card
pub fn interval_days(card: &Card) -> u32 {
    let index = (card.correct_streak as usize).min(INTERVALS.len() - 1);
    INTERVALS[index]
}

/// Whether a card is ready for spaced-repetition review.
///
/// Cards at interval 0 are never due; they are "new" and picked up by
/// [`new_cards`] instead. A card with a positive interval that has never
/// been reviewed is due immediately.
pub fn is_due(card: &Card, now: DateTime<Utc>) -> bool {
    let days = interval_days(card);
    if days == 0 {
        return false;
    }
    match card.last_reviewed {
        Some(last) => now - last >= Duration::days(i64::from(days)),
        None => true,
    }
}

/// The distinct values of the interval table, in ascending order
pub fn interval_values() -> Vec<u32> {
    let mut values = Vec::new();
    for value in INTERVALS {
        if values.last() != Some(&value) {
            values.push(value);
        }
    }
    values
}

/// All reviewable cards. Blank cards, and with them orphans, are excluded
/// here and from every other selection.
pub fn all_cards(cards: &[Card]) -> Vec<&Card> {
    cards.iter().filter(|card| !card.is_blank()).collect()
}

/// Cards whose review interval has elapsed
pub fn due_cards(cards: &[Card], now: DateTime<Utc>) -> Vec<&Card> {
    cards
        .iter()
        .filter(|card| !card.is_blank() && is_due(card, now))
        .collect()
}

/// Due cards plus cards still in the learning phase
pub fn due_or_new_cards(cards: &[Card], now: DateTime<Utc>) -> Vec<&Card> {
    cards
        .iter()
        .filter(|card| !card.is_blank() && (interval_days(card) == 0 || is_due(card, now)))
        .collect()
}

/// Cards at interval 0, regardless of when they were last seen
pub fn new_cards(cards: &[Card]) -> Vec<&Card> {
    interval_cards(cards, 0)
}

/// Cards whose current interval is exactly `days`
pub fn interval_cards(cards: &[Card], days: u32) -> Vec<&Card> {
    cards
        .iter()
        .filter(|card| !card.is_blank() && interval_days(card) == days)
        .collect()
}

/// Outcome of answering a card in spaced-repetition mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ReviewOutcome {
    Correct,
    Incorrect,
}

/// Apply a review outcome: a correct answer extends the streak, an
/// incorrect one resets it, and both stamp the review time. Skipping a
/// card is the absence of a call.
pub fn apply_review(card: &mut Card, outcome: ReviewOutcome, now: DateTime<Utc>) {
    match outcome {
        ReviewOutcome::Correct => card.correct_streak += 1,
        ReviewOutcome::Incorrect => card.correct_streak = 0,
    }
    card.last_reviewed = Some(now);
}

/// Cap a selection for one review round, preferring the highest streaks so
/// nearly-learned cards leave the rotation first
pub fn review_batch(cards: Vec<&Card>, limit: usize) -> Vec<&Card> {
    if cards.len() <= limit {
        return cards;
    }

    let max_streak = cards
        .iter()
        .map(|card| card.correct_streak)
        .max()
        .unwrap_or(0);

    let mut batch = Vec::with_capacity(limit);
    let mut streak = i64::from(max_streak);
    while batch.len() < limit && streak >= 0 {
        for card in &cards {
            if i64::from(card.correct_streak) == streak {
                batch.push(*card);
                if batch.len() >= limit {
                    break;
                }
            }
        }
        streak -= 1;
    }
    batch
}

/// Pick one card from a selection at random
pub fn draw_card<'a>(cards: &[&'a Card]) -> Option<&'a Card> {
    if cards.is_empty() {
        return None;
    }
    let index = rand::thread_rng().gen_range(0..cards.len());
    Some(cards[index])
}

/// Tally review statistics for one card set's cards
pub fn compute_statistics(cards: &[Card], now: DateTime<Utc>) -> SetStatistics {
    let mut stats = SetStatistics::default();
    for card in cards {
        stats.total_cards += 1;
        if !card.defined_in_file {
            stats.orphaned_cards += 1;
            continue;
        }
        if card.is_blank() {
            stats.blank_cards += 1;
            continue;
        }
        let days = interval_days(card);
        *stats.interval_counts.entry(days).or_insert(0) += 1;
        if days == 0 {
            stats.new_cards += 1;
        } else if is_due(card, now) {
            stats.due_cards += 1;
        }
    }
    stats
}

/// Completion state for one run through a card set.
///
/// In drill mode a correct answer marks the card completed here instead of
/// touching its review state; in spaced-repetition mode the caller marks a
/// card once its interval leaves zero so it stops repeating within the
/// session. Either way the state belongs to the session, not the card.
#[derive(Debug, Default)]
pub struct DrillSession {
    completed: HashSet<String>,
}

impl DrillSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark a card completed for the rest of this session
    pub fn mark_completed(&mut self, card: &Card) {
        self.completed.insert(card.fingerprint.clone());
    }

    pub fn is_completed(&self, card: &Card) -> bool {
        self.completed.contains(&card.fingerprint)
    }

    pub fn completed_count(&self) -> usize {
        self.completed.len()
    }

    /// Filter a selection down to the cards not yet completed
    pub fn remaining<'a>(&self, cards: Vec<&'a Card>) -> Vec<&'a Card> {
        cards
            .into_iter()
            .filter(|card| !self.is_completed(card))
            .collect()
    }
}
