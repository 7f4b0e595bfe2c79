//! Deck list parsing.
//!
//! Accepts the plain-text lists exported by most deck builders:
//!
//! ```text
//! 4 Lightning Bolt
//! 2x Counterspell (MH2) 267
//! # sideboard
//! Island
//! ```
//!
//! A leading integer (optionally followed by `x`) is the quantity; anything
//! from the first `(` on is a set/collector suffix and is dropped.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;

static RE_QUANTITY: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(\d+)[xX]?\s+(.+)$").unwrap());

/// One line of a deck list: how many copies of which card.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeckEntry {
    pub quantity: u32,
    pub name: String,
}

/// Parse one deck-list line. Blank lines and comments give `None`.
pub fn parse_line(line: &str) -> Option<DeckEntry> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') || line.starts_with("//") {
        return None;
    }

    let (quantity, rest) = match RE_QUANTITY.captures(line) {
        Some(caps) => {
            let qty = caps[1].parse::<u32>().unwrap_or(1);
            (qty, caps.get(2).map_or("", |m| m.as_str()))
        }
        None => (1, line),
    };
    let name = rest.split('(').next().unwrap_or("").trim();
    if name.is_empty() {
        return None;
    }

    Some(DeckEntry {
        quantity,
        name: name.to_string(),
    })
}

/// Parse a whole deck list, merging repeated names (case-insensitive).
///
/// The first spelling of a name and its first position are kept.
pub fn parse_deck(text: &str) -> Vec<DeckEntry> {
    let mut entries: Vec<DeckEntry> = Vec::new();
    for entry in text.lines().filter_map(parse_line) {
        match entries
            .iter_mut()
            .find(|e| e.name.eq_ignore_ascii_case(&entry.name))
        {
            Some(existing) => existing.quantity = existing.quantity.saturating_add(entry.quantity),
            None => entries.push(entry),
        }
    }
    debug!("Parsed {} distinct cards from deck list", entries.len());
    entries
}
