//! Value-to-difficulty classification for archive clues.
//!
//! Board values doubled on 2001-11-26. Clues aired before that date are graded
//! against the original board; everything after uses the doubled board. When the
//! air date is missing or unparseable the clue's (round, value) pair decides: a
//! pair found on the original board is graded on the original scale.
//!
//! Values absent from an era's easy/medium entries are hard. That includes values
//! that only exist on the other era's board (round 1 value 100 aired in 2005 is
//! hard), and every round other than 1 and 2.

use anyhow::{Context, Result};
use chrono::{Datelike, NaiveDate};
use regex::Regex;

use crate::model::Difficulty;

const SCALE_CHANGE: (i32, u32, u32) = (2001, 11, 26);

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ScoringEra {
    Original,
    Doubled,
}

struct ScaleEntry {
    round: i16,
    value: i16,
    difficulty: Difficulty,
}

const fn entry(round: i16, value: i16, difficulty: Difficulty) -> ScaleEntry {
    ScaleEntry {
        round,
        value,
        difficulty,
    }
}

const ORIGINAL_SCALE: &[ScaleEntry] = &[
    entry(1, 100, Difficulty::Easy),
    entry(1, 200, Difficulty::Easy),
    entry(1, 300, Difficulty::Medium),
    entry(1, 400, Difficulty::Medium),
    entry(2, 200, Difficulty::Easy),
    entry(2, 400, Difficulty::Easy),
    entry(2, 600, Difficulty::Medium),
    entry(2, 800, Difficulty::Medium),
];

const DOUBLED_SCALE: &[ScaleEntry] = &[
    entry(1, 200, Difficulty::Easy),
    entry(1, 400, Difficulty::Easy),
    entry(1, 600, Difficulty::Medium),
    entry(1, 800, Difficulty::Medium),
    entry(2, 400, Difficulty::Easy),
    entry(2, 800, Difficulty::Easy),
    entry(2, 1200, Difficulty::Medium),
    entry(2, 1600, Difficulty::Medium),
];

/// Every grid value that appeared on the board before the scale change.
const ORIGINAL_BOARD: &[(i16, i16)] = &[
    (1, 100),
    (1, 200),
    (1, 300),
    (1, 400),
    (1, 500),
    (2, 200),
    (2, 400),
    (2, 600),
    (2, 800),
    (2, 1000),
];

fn scale(era: ScoringEra) -> &'static [ScaleEntry] {
    match era {
        ScoringEra::Original => ORIGINAL_SCALE,
        ScoringEra::Doubled => DOUBLED_SCALE,
    }
}

pub fn scoring_era(round: i16, value: i16, air_date: Option<NaiveDate>) -> ScoringEra {
    let original = match air_date {
        Some(date) => (date.year(), date.month(), date.day()) < SCALE_CHANGE,
        None => ORIGINAL_BOARD.contains(&(round, value)),
    };

    if original {
        ScoringEra::Original
    } else {
        ScoringEra::Doubled
    }
}

pub fn classify(
    round: Option<i16>,
    clue_value: Option<i16>,
    air_date: Option<NaiveDate>,
) -> Difficulty {
    let (Some(round), Some(value)) = (round, clue_value) else {
        return Difficulty::Hard;
    };

    let era = scoring_era(round, value, air_date);
    scale(era)
        .iter()
        .find(|entry| entry.round == round && entry.value == value)
        .map(|entry| entry.difficulty)
        .unwrap_or(Difficulty::Hard)
}

/// Accepts only `YYYY-MM-DD` strings that name a real calendar day.
pub struct AirDateParser {
    pattern: Regex,
}

impl AirDateParser {
    pub fn new() -> Result<Self> {
        let pattern =
            Regex::new(r"^\d{4}-\d{2}-\d{2}$").context("failed to compile air date regex")?;
        Ok(Self { pattern })
    }

    pub fn parse(&self, raw: Option<&str>) -> Option<NaiveDate> {
        let raw = raw?;
        if !self.pattern.is_match(raw) {
            return None;
        }
        NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok()
    }
}
