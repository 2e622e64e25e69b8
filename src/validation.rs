// src/validation.rs
//! Structural and policy checks for a poll draft before it is persisted.
//!
//! Pure: no storage access, and the clock is passed in by the caller so the
//! duration window is deterministic under test.

use std::collections::HashSet;

use chrono::{DateTime, Duration, Utc};

use crate::error::{Reason, ValidationError};
use crate::models::PollDraft;

pub const TITLE_MIN: usize = 3;
pub const TITLE_MAX: usize = 100;
pub const DESCRIPTION_MAX: usize = 500;
pub const OPTION_TEXT_MAX: usize = 200;
pub const MIN_OPTIONS: usize = 2;
pub const MAX_OPTIONS: usize = 10;

/// Markup-like characters refused in any user-visible text.
const BLOCKED_CHARS: &[char] = &['<', '>', '{', '}', '[', ']'];

pub fn min_duration() -> Duration {
    Duration::hours(1)
}

pub fn max_duration() -> Duration {
    Duration::days(30)
}

pub fn validate_poll(draft: &PollDraft) -> Result<(), ValidationError> {
    validate_poll_at(draft, Utc::now())
}

pub fn validate_poll_at(draft: &PollDraft, now: DateTime<Utc>) -> Result<(), ValidationError> {
    check_text("title", &draft.title, TITLE_MIN, TITLE_MAX)?;
    check_text("description", &draft.description, 1, DESCRIPTION_MAX)?;
    check_end_date(draft.end_date, now)?;

    if draft.options.len() < MIN_OPTIONS {
        return Err(ValidationError::new(
            "options",
            Reason::TooFewOptions { min: MIN_OPTIONS },
        ));
    }
    if draft.options.len() > MAX_OPTIONS {
        return Err(ValidationError::new(
            "options",
            Reason::TooManyOptions { max: MAX_OPTIONS },
        ));
    }

    let mut seen = HashSet::with_capacity(draft.options.len());
    for (index, option) in draft.options.iter().enumerate() {
        let field = format!("options[{index}].text");
        let text = check_text(&field, &option.text, 1, OPTION_TEXT_MAX)?;

        if !seen.insert(text.to_lowercase()) {
            return Err(ValidationError::new(field, Reason::DuplicateOption));
        }

        if option.votes != 0 {
            return Err(ValidationError::new(
                format!("options[{index}].votes"),
                Reason::NonZeroVotes,
            ));
        }
    }

    Ok(())
}

/// Trims `value` and checks emptiness, length (in characters) and the
/// blocklist. Returns the trimmed text.
fn check_text<'a>(
    field: &str,
    value: &'a str,
    min: usize,
    max: usize,
) -> Result<&'a str, ValidationError> {
    let text = value.trim();
    if text.is_empty() {
        return Err(ValidationError::new(field, Reason::Empty));
    }

    let len = text.chars().count();
    if len < min {
        return Err(ValidationError::new(field, Reason::TooShort { min }));
    }
    if len > max {
        return Err(ValidationError::new(field, Reason::TooLong { max }));
    }
    if text.contains(BLOCKED_CHARS) {
        return Err(ValidationError::new(field, Reason::InvalidCharacters));
    }

    Ok(text)
}

fn check_end_date(end_date: DateTime<Utc>, now: DateTime<Utc>) -> Result<(), ValidationError> {
    if end_date <= now {
        return Err(ValidationError::new("end_date", Reason::EndDateInPast));
    }

    let duration = end_date - now;
    if duration < min_duration() {
        return Err(ValidationError::new("end_date", Reason::DurationTooShort));
    }
    if duration > max_duration() {
        return Err(ValidationError::new("end_date", Reason::DurationTooLong));
    }

    Ok(())
}
