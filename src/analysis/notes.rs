//! Note matching.
//!
//! A note is shown when its year, platform and month conditions all
//! accept the current context.

use crate::models::{Note, NoteConditions};

/// Whether one condition list accepts a candidate value. Empty lists and
/// lists whose first entry is blank accept everything.
pub fn condition_matches(values: &[String], candidate: &str) -> bool {
    match values.first() {
        None => true,
        Some(first) if first.is_empty() => true,
        Some(_) => values.iter().any(|value| value == candidate),
    }
}

/// Whether a note's conditions accept the context. An absent month
/// always matches.
pub fn conditions_match(
    conditions: &NoteConditions,
    year: &str,
    platform: &str,
    month: Option<&str>,
) -> bool {
    condition_matches(&conditions.years, year)
        && condition_matches(&conditions.platforms, platform)
        && month.map_or(true, |month| condition_matches(&conditions.months, month))
}

/// Notes that match the context, in their original order.
pub fn matching_notes<'a>(
    notes: &'a [Note],
    year: &str,
    platform: &str,
    month: Option<&str>,
) -> Vec<&'a Note> {
    notes
        .iter()
        .filter(|note| conditions_match(&note.conditions, year, platform, month))
        .collect()
}
