// src/poll.rs
//! Open/closed state of a poll, derived from its deadline on every call.
//! No status is ever stored.
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use crate::models::{Poll, StatusFilter};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PollState {
    Open,
    Closed,
}

impl Poll {
    /// Open strictly before `end_date`, closed at or after it.
    pub fn state_at(&self, now: DateTime<Utc>) -> PollState {
        if now < self.end_date {
            PollState::Open
        } else {
            PollState::Closed
        }
    }

    pub fn is_open_at(&self, now: DateTime<Utc>) -> bool {
        self.state_at(now) == PollState::Open
    }

    pub fn is_open(&self) -> bool {
        self.is_open_at(Utc::now())
    }

    /// Negative once the poll has closed.
    pub fn time_remaining_at(&self, now: DateTime<Utc>) -> Duration {
        self.end_date - now
    }

    pub fn total_votes(&self) -> i64 {
        self.options.iter().map(|option| i64::from(option.votes)).sum()
    }
}

impl StatusFilter {
    pub fn matches(&self, poll: &Poll, now: DateTime<Utc>) -> bool {
        match self {
            StatusFilter::All => true,
            StatusFilter::Active => poll.is_open_at(now),
            StatusFilter::Ended => !poll.is_open_at(now),
        }
    }
}

/// Read-side projection with the derived lifecycle fields filled in.
#[derive(Debug, Serialize)]
pub struct PollView {
    #[serde(flatten)]
    pub poll: Poll,
    pub state: PollState,
    pub is_active: bool,
    pub total_votes: i64,
    pub time_remaining_secs: i64,
}

impl PollView {
    pub fn at(poll: Poll, now: DateTime<Utc>) -> Self {
        let state = poll.state_at(now);
        Self {
            state,
            is_active: state == PollState::Open,
            total_votes: poll.total_votes(),
            time_remaining_secs: poll.time_remaining_at(now).num_seconds(),
            poll,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PollOption;
    use uuid::Uuid;

    fn poll_ending(end_date: DateTime<Utc>, tallies: &[i32]) -> Poll {
        let id = Uuid::new_v4();
        Poll {
            id,
            title: "Lifecycle".into(),
            description: "deadline driven".into(),
            end_date,
            options: tallies
                .iter()
                .enumerate()
                .map(|(i, votes)| PollOption {
                    id: Uuid::new_v4(),
                    poll_id: id,
                    text: format!("option {i}"),
                    votes: *votes,
                })
                .collect(),
            created_at: end_date - Duration::days(1),
        }
    }

    #[test]
    fn open_until_deadline_closed_at_and_after() {
        let end = Utc::now();
        let poll = poll_ending(end, &[0, 0]);

        assert_eq!(poll.state_at(end - Duration::seconds(1)), PollState::Open);
        assert_eq!(poll.state_at(end), PollState::Closed);
        assert_eq!(poll.state_at(end + Duration::hours(1)), PollState::Closed);
    }

    #[test]
    fn time_remaining_goes_negative() {
        let end = Utc::now();
        let poll = poll_ending(end, &[0, 0]);

        assert_eq!(poll.time_remaining_at(end - Duration::minutes(5)), Duration::minutes(5));
        assert_eq!(poll.time_remaining_at(end + Duration::minutes(5)), Duration::minutes(-5));
    }

    #[test]
    fn total_votes_sums_tallies() {
        let poll = poll_ending(Utc::now(), &[3, 0, 4]);
        assert_eq!(poll.total_votes(), 7);
    }

    #[test]
    fn status_filter_uses_deadline() {
        let now = Utc::now();
        let open = poll_ending(now + Duration::hours(1), &[0, 0]);
        let ended = poll_ending(now, &[0, 0]);

        assert!(StatusFilter::Active.matches(&open, now));
        assert!(!StatusFilter::Active.matches(&ended, now));
        assert!(StatusFilter::Ended.matches(&ended, now));
        assert!(StatusFilter::All.matches(&ended, now));
    }

    #[test]
    fn view_carries_derived_fields() {
        let now = Utc::now();
        let view = PollView::at(poll_ending(now + Duration::hours(2), &[1, 2]), now);

        assert!(view.is_active);
        assert_eq!(view.total_votes, 3);
        assert_eq!(view.time_remaining_secs, 7200);
    }
}
