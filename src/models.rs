// src/models.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

pub const DEFAULT_LIMIT: i64 = 10;
pub const MAX_LIMIT: i64 = 50;

/// Opaque authenticated principal. Established by whatever sits in front of
/// the core; the core never inspects credentials.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Identity(pub Uuid);

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Poll {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub end_date: DateTime<Utc>,
    pub options: Vec<PollOption>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PollOption {
    pub id: Uuid,
    pub poll_id: Uuid,
    pub text: String,
    pub votes: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vote {
    pub id: Uuid,
    pub poll_id: Uuid,
    pub option_id: Uuid,
    pub voter: Identity,
    pub created_at: DateTime<Utc>,
}

impl From<Uuid> for Identity {
    fn from(id: Uuid) -> Self {
        Identity(id)
    }
}

impl Vote {
    pub fn new(poll_id: Uuid, option_id: Uuid, voter: Identity, created_at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            poll_id,
            option_id,
            voter,
            created_at,
        }
    }
}

/// Client-supplied poll, before validation.
#[derive(Debug, Clone, Deserialize)]
pub struct PollDraft {
    pub title: String,
    pub description: String,
    pub end_date: DateTime<Utc>,
    pub options: Vec<OptionDraft>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OptionDraft {
    pub text: String,
    #[serde(default)]
    pub votes: i32,
}

impl OptionDraft {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            votes: 0,
        }
    }
}

impl Poll {
    /// Builds the entity to persist from an already validated draft. Texts are
    /// stored trimmed and every tally starts at zero whatever the client sent.
    pub fn from_draft(draft: PollDraft, created_at: DateTime<Utc>) -> Self {
        let id = Uuid::new_v4();
        let options = draft
            .options
            .into_iter()
            .map(|option| PollOption {
                id: Uuid::new_v4(),
                poll_id: id,
                text: option.text.trim().to_string(),
                votes: 0,
            })
            .collect();

        Self {
            id,
            title: draft.title.trim().to_string(),
            description: draft.description.trim().to_string(),
            end_date: draft.end_date,
            options,
            created_at,
        }
    }

    pub fn option(&self, option_id: Uuid) -> Option<&PollOption> {
        self.options.iter().find(|option| option.id == option_id)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusFilter {
    #[default]
    All,
    Active,
    Ended,
}

impl StatusFilter {
    pub fn as_str(&self) -> &'static str {
        match self {
            StatusFilter::All => "all",
            StatusFilter::Active => "active",
            StatusFilter::Ended => "ended",
        }
    }

    /// Anything unrecognised falls back to `All`.
    pub fn parse_lenient(value: &str) -> Self {
        value.parse().unwrap_or_default()
    }
}

impl FromStr for StatusFilter {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "all" => Ok(StatusFilter::All),
            "active" => Ok(StatusFilter::Active),
            "ended" => Ok(StatusFilter::Ended),
            _ => Err(()),
        }
    }
}

/// Normalised listing parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListQuery {
    pub offset: i64,
    pub limit: i64,
    pub status: StatusFilter,
}

impl ListQuery {
    pub fn new(offset: i64, limit: Option<i64>, status: StatusFilter) -> Self {
        Self {
            offset: offset.max(0),
            limit: limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT),
            status,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PollPage {
    pub polls: Vec<Poll>,
    pub total: i64,
}

impl PollPage {
    pub fn total_pages(&self, limit: i64) -> i64 {
        if limit <= 0 {
            return 0;
        }
        (self.total + limit - 1) / limit
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn from_draft_trims_and_zeroes_tallies() {
        let now = Utc::now();
        let draft = PollDraft {
            title: "  Lunch spot  ".into(),
            description: " where to eat ".into(),
            end_date: now + Duration::days(2),
            options: vec![
                OptionDraft { text: " Tacos ".into(), votes: 7 },
                OptionDraft::new("Ramen"),
            ],
        };

        let poll = Poll::from_draft(draft, now);

        assert_eq!(poll.title, "Lunch spot");
        assert_eq!(poll.description, "where to eat");
        assert_eq!(poll.options[0].text, "Tacos");
        assert_eq!(poll.options[1].text, "Ramen");
        assert!(poll.options.iter().all(|o| o.votes == 0 && o.poll_id == poll.id));
        assert_ne!(poll.options[0].id, poll.options[1].id);
        assert!(poll.option(poll.options[1].id).is_some());
        assert!(poll.option(Uuid::new_v4()).is_none());
    }

    #[test]
    fn list_query_clamps() {
        let q = ListQuery::new(-5, None, StatusFilter::All);
        assert_eq!((q.offset, q.limit), (0, DEFAULT_LIMIT));

        assert_eq!(ListQuery::new(0, Some(0), StatusFilter::All).limit, 1);
        assert_eq!(ListQuery::new(0, Some(500), StatusFilter::All).limit, MAX_LIMIT);
        assert_eq!(ListQuery::new(20, Some(25), StatusFilter::All).limit, 25);
    }

    #[test]
    fn status_filter_parsing() {
        assert_eq!("active".parse::<StatusFilter>(), Ok(StatusFilter::Active));
        assert_eq!("ENDED".parse::<StatusFilter>(), Ok(StatusFilter::Ended));
        assert_eq!(StatusFilter::parse_lenient("bogus"), StatusFilter::All);
    }

    #[test]
    fn total_pages_rounds_up() {
        let page = PollPage { polls: vec![], total: 21 };
        assert_eq!(page.total_pages(10), 3);
        assert_eq!(page.total_pages(21), 1);
        assert_eq!(PollPage { polls: vec![], total: 0 }.total_pages(10), 0);
    }
}
