// src/ledger.rs
//! The only path through which a vote is accepted and tallied.
//!
//! Checks run cheapest first and fail fast: poll exists, poll is open, option
//! belongs to the poll, voter has not voted. None of these mutate anything.
//! The write itself is a single `record_vote` transaction; the pre-check above
//! only gives an early, well-worded answer. When two requests for the same
//! voter race past it, the store's uniqueness guard rejects the loser and that
//! rejection is reported as [`VoteError::AlreadyVoted`].

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::error::{StoreError, VoteError};
use crate::models::{Identity, Vote};
use crate::store::PollStore;

#[derive(Clone)]
pub struct VoteLedger {
    store: Arc<dyn PollStore>,
}

impl VoteLedger {
    pub fn new(store: Arc<dyn PollStore>) -> Self {
        Self { store }
    }

    pub async fn cast_vote(
        &self,
        poll_id: Uuid,
        option_id: Uuid,
        voter: Identity,
    ) -> Result<Vote, VoteError> {
        self.cast_vote_at(poll_id, option_id, voter, Utc::now()).await
    }

    pub async fn cast_vote_at(
        &self,
        poll_id: Uuid,
        option_id: Uuid,
        voter: Identity,
        now: DateTime<Utc>,
    ) -> Result<Vote, VoteError> {
        let poll = self
            .store
            .fetch_poll(poll_id)
            .await
            .map_err(internal)?
            .ok_or(VoteError::NotFound)?;

        if !poll.is_open_at(now) {
            return Err(VoteError::PollClosed);
        }

        if poll.option(option_id).is_none() {
            return Err(VoteError::InvalidOption);
        }

        if self.store.has_voted(poll_id, voter).await.map_err(internal)? {
            return Err(VoteError::AlreadyVoted);
        }

        let vote = Vote::new(poll_id, option_id, voter, now);
        match self.store.record_vote(&vote).await {
            Ok(()) => {
                info!("Recorded vote {} by {voter} on poll {poll_id}", vote.id);
                Ok(vote)
            }
            Err(StoreError::DuplicateVote) => {
                warn!("Concurrent duplicate vote by {voter} on poll {poll_id} rejected by store");
                Err(VoteError::AlreadyVoted)
            }
            Err(StoreError::UnknownOption) => Err(VoteError::InvalidOption),
            Err(err) => Err(internal(err)),
        }
    }
}

fn internal(err: StoreError) -> VoteError {
    error!("Vote ledger storage failure: {err}");
    VoteError::Internal(err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{OptionDraft, Poll, PollDraft};
    use crate::store::MemoryStore;
    use chrono::Duration;

    async fn setup(end_in: Duration) -> (Arc<MemoryStore>, VoteLedger, Poll) {
        let store = Arc::new(MemoryStore::new());
        let now = Utc::now();
        let poll = Poll::from_draft(
            PollDraft {
                title: "Best editor".into(),
                description: "Settle it".into(),
                end_date: now + end_in,
                options: vec![
                    OptionDraft::new("vim"),
                    OptionDraft::new("emacs"),
                    OptionDraft::new("helix"),
                ],
            },
            now - Duration::hours(1),
        );
        store.insert_poll(&poll).await.unwrap();
        let ledger = VoteLedger::new(store.clone());
        (store, ledger, poll)
    }

    fn voter() -> Identity {
        Identity(Uuid::new_v4())
    }

    /// Reports every voter as new, so the only thing standing between a
    /// duplicate and the tally is `record_vote`.
    struct StalePreCheck(Arc<MemoryStore>);

    #[async_trait::async_trait]
    impl PollStore for StalePreCheck {
        async fn insert_poll(&self, poll: &Poll) -> crate::store::StoreResult<()> {
            self.0.insert_poll(poll).await
        }

        async fn fetch_poll(&self, id: Uuid) -> crate::store::StoreResult<Option<Poll>> {
            self.0.fetch_poll(id).await
        }

        async fn has_voted(&self, _poll_id: Uuid, _voter: Identity) -> crate::store::StoreResult<bool> {
            Ok(false)
        }

        async fn record_vote(&self, vote: &Vote) -> crate::store::StoreResult<()> {
            self.0.record_vote(vote).await
        }

        async fn list_polls(
            &self,
            query: &crate::models::ListQuery,
            now: DateTime<Utc>,
        ) -> crate::store::StoreResult<crate::models::PollPage> {
            self.0.list_polls(query, now).await
        }

        async fn count_votes(&self, option_id: Uuid) -> crate::store::StoreResult<i64> {
            self.0.count_votes(option_id).await
        }
    }

    #[tokio::test]
    async fn duplicate_caught_by_store_is_already_voted() {
        let (store, _, poll) = setup(Duration::days(1)).await;
        let ledger = VoteLedger::new(Arc::new(StalePreCheck(store.clone())));
        let who = voter();

        ledger.cast_vote(poll.id, poll.options[0].id, who).await.unwrap();
        let err = ledger
            .cast_vote(poll.id, poll.options[1].id, who)
            .await
            .unwrap_err();
        assert!(matches!(err, VoteError::AlreadyVoted));

        let stored = store.fetch_poll(poll.id).await.unwrap().unwrap();
        assert_eq!(stored.options[0].votes, 1);
        assert_eq!(stored.options[1].votes, 0);
        assert_eq!(store.count_votes(poll.options[1].id).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn records_vote_and_increments_tally() {
        let (store, ledger, poll) = setup(Duration::days(1)).await;
        let option = poll.options[1].id;
        let who = voter();

        let vote = ledger.cast_vote(poll.id, option, who).await.unwrap();
        assert_eq!(vote.poll_id, poll.id);
        assert_eq!(vote.option_id, option);
        assert_eq!(vote.voter, who);

        let stored = store.fetch_poll(poll.id).await.unwrap().unwrap();
        assert_eq!(stored.options[1].votes, 1);
        assert_eq!(stored.total_votes(), 1);
    }

    #[tokio::test]
    async fn second_vote_by_same_identity_is_rejected() {
        let (store, ledger, poll) = setup(Duration::days(1)).await;
        let who = voter();

        ledger.cast_vote(poll.id, poll.options[0].id, who).await.unwrap();
        let err = ledger.cast_vote(poll.id, poll.options[2].id, who).await.unwrap_err();
        assert!(matches!(err, VoteError::AlreadyVoted));

        let stored = store.fetch_poll(poll.id).await.unwrap().unwrap();
        assert_eq!(stored.total_votes(), 1);
        assert_eq!(stored.options[2].votes, 0);
    }

    #[tokio::test]
    async fn unknown_poll_is_not_found() {
        let (_, ledger, poll) = setup(Duration::days(1)).await;
        let err = ledger
            .cast_vote(Uuid::new_v4(), poll.options[0].id, voter())
            .await
            .unwrap_err();
        assert!(matches!(err, VoteError::NotFound));
    }

    #[tokio::test]
    async fn closed_poll_rejects_without_mutation() {
        let (store, ledger, poll) = setup(Duration::days(1)).await;
        let after_deadline = poll.end_date + Duration::seconds(1);
        let who = voter();

        let err = ledger
            .cast_vote_at(poll.id, poll.options[0].id, who, after_deadline)
            .await
            .unwrap_err();
        assert!(matches!(err, VoteError::PollClosed));

        let err = ledger
            .cast_vote_at(poll.id, poll.options[0].id, who, poll.end_date)
            .await
            .unwrap_err();
        assert!(matches!(err, VoteError::PollClosed));

        assert!(!store.has_voted(poll.id, who).await.unwrap());
        assert_eq!(store.fetch_poll(poll.id).await.unwrap().unwrap().total_votes(), 0);
    }

    #[tokio::test]
    async fn option_from_another_poll_is_invalid() {
        let (store, ledger, poll) = setup(Duration::days(1)).await;
        let (_, _, other) = setup(Duration::days(1)).await;
        let who = voter();

        let err = ledger
            .cast_vote(poll.id, other.options[0].id, who)
            .await
            .unwrap_err();
        assert!(matches!(err, VoteError::InvalidOption));

        assert!(!store.has_voted(poll.id, who).await.unwrap());
        assert_eq!(store.fetch_poll(poll.id).await.unwrap().unwrap().total_votes(), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_duplicates_yield_exactly_one_success() {
        let (store, ledger, poll) = setup(Duration::days(1)).await;
        let who = voter();
        let option = poll.options[0].id;
        let poll_id = poll.id;

        let attempts = 32;
        let handles: Vec<_> = (0..attempts)
            .map(|_| {
                let ledger = ledger.clone();
                tokio::spawn(async move { ledger.cast_vote(poll_id, option, who).await })
            })
            .collect();

        let mut successes = 0;
        let mut already_voted = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => successes += 1,
                Err(VoteError::AlreadyVoted) => already_voted += 1,
                Err(other) => panic!("unexpected error: {other}"),
            }
        }

        assert_eq!(successes, 1);
        assert_eq!(already_voted, attempts - 1);
        assert_eq!(store.count_votes(option).await.unwrap(), 1);
        assert_eq!(store.fetch_poll(poll.id).await.unwrap().unwrap().options[0].votes, 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_distinct_voters_lose_no_increments() {
        let (store, ledger, poll) = setup(Duration::days(1)).await;
        let poll_id = poll.id;

        let handles: Vec<_> = (0..60)
            .map(|i| {
                let ledger = ledger.clone();
                let option = poll.options[i % 3].id;
                tokio::spawn(async move { ledger.cast_vote(poll_id, option, voter()).await })
            })
            .collect();

        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let stored = store.fetch_poll(poll.id).await.unwrap().unwrap();
        for option in &stored.options {
            assert_eq!(option.votes, 20);
            assert_eq!(i64::from(option.votes), store.count_votes(option.id).await.unwrap());
        }
    }
}
