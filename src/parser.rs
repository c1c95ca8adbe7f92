//! Parser for plain-text card definition files
//!
//! A definition file is line oriented. Each card starts on a line of its
//! own with front and back separated by `" | "` and an optional `[id]`
//! prefix. Either side can continue over multiple lines between backtick
//! markers; the triple-backtick variant keeps the fence lines as part of
//! the side text so fenced code renders as written.

use std::collections::HashSet;

use regex::Regex;
use thiserror::Error;

use crate::models::Card;

/// Separates the sides of a card line and the fields of a progress record
pub const SIDE_DELIMITER: &str = " | ";

/// Optional id prefix on a card line: group 1 is the id, group 2 the rest
const BRACKET_ID_PATTERN: &str = r"^\s*\[(.+?)\](.*)$";

#[derive(Error, Debug)]
pub enum ParseError {
    #[error("unexpected number of sides on line {line}")]
    UnexpectedSides { line: usize },

    #[error("card id is empty on line {line}")]
    EmptyId { line: usize },

    #[error("duplicate card id \"{id}\" on line {line}")]
    DuplicateId { id: String, line: usize },

    #[error("definition file ends inside a multi-line card on line {line}")]
    UnterminatedCard { line: usize },
}

impl ParseError {
    /// 1-based line number the error was detected on
    pub fn line(&self) -> usize {
        match self {
            ParseError::UnexpectedSides { line }
            | ParseError::EmptyId { line }
            | ParseError::DuplicateId { line, .. }
            | ParseError::UnterminatedCard { line } => *line,
        }
    }
}

type Result<T> = std::result::Result<T, ParseError>;

/// Card under construction while a multi-line side accumulates
struct CardDraft {
    id: String,
    front: String,
    back: String,
}

impl CardDraft {
    fn finish(self) -> Card {
        Card::new(self.id, self.front, self.back)
    }
}

/// Parser state. The multi-line states own the card being built, so a body
/// line can never apply to anything but the card that opened it.
enum ParseState {
    Ready,
    FrontMulti(CardDraft),
    FrontMultiFenced(CardDraft),
    BackMulti(CardDraft),
    BackMultiFenced(CardDraft),
}

enum FrontKind {
    Complete,
    Multi,
    MultiFenced,
}

enum BackKind {
    Complete,
    Multi,
    MultiFenced,
}

/// Parse the contents of a definition file into cards.
///
/// Errors carry the 1-based line number they were detected on. Duplicate
/// and empty ids are reported at the line that introduced the card, even
/// when the card body continues below it.
pub fn parse_definitions(text: &str) -> Result<Vec<Card>> {
    let bracket = Regex::new(BRACKET_ID_PATTERN).unwrap();

    let mut cards: Vec<Card> = Vec::new();
    let mut seen_ids: HashSet<String> = HashSet::new();
    let mut state = ParseState::Ready;
    let mut line_number = 0;

    for line in text.lines() {
        line_number += 1;

        state = match state {
            ParseState::Ready => {
                // Only zero-length lines are blank; a whitespace-only line
                // is a card line with an empty id.
                if line.is_empty() || line.starts_with('#') {
                    ParseState::Ready
                } else {
                    start_card(line, line_number, &bracket, &mut cards, &mut seen_ids)?
                }
            }
            ParseState::FrontMulti(mut draft) => {
                if line == "` | `" {
                    ParseState::BackMulti(draft)
                } else if line == "` | ```" {
                    draft.back = "```".to_string();
                    ParseState::BackMultiFenced(draft)
                } else if let Some(rest) = line.strip_prefix("` | ") {
                    draft.back = rest.to_string();
                    cards.push(draft.finish());
                    ParseState::Ready
                } else {
                    if draft.front.is_empty() {
                        draft.front = line.to_string();
                    } else {
                        draft.front.push('\n');
                        draft.front.push_str(line);
                    }
                    ParseState::FrontMulti(draft)
                }
            }
            ParseState::FrontMultiFenced(mut draft) => {
                if line == "``` | `" {
                    draft.front.push_str("\n```");
                    ParseState::BackMulti(draft)
                } else if line == "``` | ```" {
                    draft.front.push_str("\n```");
                    draft.back = "```".to_string();
                    ParseState::BackMultiFenced(draft)
                } else if let Some(rest) = line.strip_prefix("``` | ") {
                    draft.front.push_str("\n```");
                    draft.back = rest.to_string();
                    cards.push(draft.finish());
                    ParseState::Ready
                } else {
                    draft.front.push('\n');
                    draft.front.push_str(line);
                    ParseState::FrontMultiFenced(draft)
                }
            }
            ParseState::BackMulti(mut draft) => {
                if line == "`" {
                    cards.push(draft.finish());
                    ParseState::Ready
                } else {
                    if draft.back.is_empty() {
                        draft.back = line.to_string();
                    } else {
                        draft.back.push('\n');
                        draft.back.push_str(line);
                    }
                    ParseState::BackMulti(draft)
                }
            }
            ParseState::BackMultiFenced(mut draft) => {
                if line == "```" {
                    draft.back.push_str("\n```");
                    cards.push(draft.finish());
                    ParseState::Ready
                } else {
                    draft.back.push('\n');
                    draft.back.push_str(line);
                    ParseState::BackMultiFenced(draft)
                }
            }
        };
    }

    if !matches!(state, ParseState::Ready) {
        return Err(ParseError::UnterminatedCard { line: line_number });
    }

    Ok(cards)
}

/// Handle a card line seen in the ready state
fn start_card(
    line: &str,
    line_number: usize,
    bracket: &Regex,
    cards: &mut Vec<Card>,
    seen_ids: &mut HashSet<String>,
) -> Result<ParseState> {
    let sides: Vec<&str> = line.split(SIDE_DELIMITER).collect();
    match sides.len() {
        1 => {
            let (id, front, kind) = parse_one_side(sides[0], bracket);
            reserve_id(&id, line_number, seen_ids)?;
            Ok(match kind {
                FrontKind::Complete => {
                    cards.push(Card::new(id, front, String::new()));
                    ParseState::Ready
                }
                FrontKind::Multi => ParseState::FrontMulti(CardDraft {
                    id,
                    front,
                    back: String::new(),
                }),
                FrontKind::MultiFenced => ParseState::FrontMultiFenced(CardDraft {
                    id,
                    front,
                    back: String::new(),
                }),
            })
        }
        2 => {
            let (id, front, back, kind) = parse_two_sides(sides[0], sides[1], bracket);
            reserve_id(&id, line_number, seen_ids)?;
            Ok(match kind {
                BackKind::Complete => {
                    cards.push(Card::new(id, front, back));
                    ParseState::Ready
                }
                BackKind::Multi => ParseState::BackMulti(CardDraft { id, front, back }),
                BackKind::MultiFenced => ParseState::BackMultiFenced(CardDraft { id, front, back }),
            })
        }
        _ => Err(ParseError::UnexpectedSides { line: line_number }),
    }
}

/// A line with no `" | "`: the single field is the front and, without a
/// bracketed id, the id as well. A trailing backtick marker opens a
/// multi-line front instead.
fn parse_one_side(side: &str, bracket: &Regex) -> (String, String, FrontKind) {
    match bracket.captures(side) {
        Some(caps) => {
            let id = trim(&caps[1]).to_string();
            match trim(&caps[2]) {
                "`" => (id, String::new(), FrontKind::Multi),
                "```" => (id, "```".to_string(), FrontKind::MultiFenced),
                rest => (id, rest.to_string(), FrontKind::Complete),
            }
        }
        None => {
            let text = trim(side).to_string();
            (text.clone(), text, FrontKind::Complete)
        }
    }
}

/// A line with one `" | "`: front (with optional bracketed id) and back.
/// A back of `` ` `` or ```` ``` ```` opens a multi-line back.
fn parse_two_sides(
    first: &str,
    second: &str,
    bracket: &Regex,
) -> (String, String, String, BackKind) {
    let (id, front) = match bracket.captures(first) {
        Some(caps) => (trim(&caps[1]).to_string(), trim(&caps[2]).to_string()),
        None => {
            let text = trim(first).to_string();
            (text.clone(), text)
        }
    };

    match trim(second) {
        "`" => (id, front, String::new(), BackKind::Multi),
        "```" => (id, front, "```".to_string(), BackKind::MultiFenced),
        rest => (id, front, rest.to_string(), BackKind::Complete),
    }
}

fn reserve_id(id: &str, line_number: usize, seen_ids: &mut HashSet<String>) -> Result<()> {
    if id.is_empty() {
        return Err(ParseError::EmptyId { line: line_number });
    }
    if !seen_ids.insert(id.to_string()) {
        return Err(ParseError::DuplicateId {
            id: id.to_string(),
            line: line_number,
        });
    }
    Ok(())
}

/// Trimming strips spaces and tabs only; any other whitespace is card text
fn trim(s: &str) -> &str {
    s.trim_matches(|c| c == ' ' || c == '\t')
}
