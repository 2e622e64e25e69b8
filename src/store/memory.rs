// src/store/memory.rs
//! In-process backend. Each trait call takes the single lock for its whole
//! duration, which makes every call one serialised transaction; the
//! `voters` set is this backend's uniqueness constraint.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use uuid::Uuid;

use super::{PollStore, StoreResult};
use crate::error::StoreError;
use crate::models::{Identity, ListQuery, Poll, PollPage, Vote};

#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

#[derive(Default)]
struct Inner {
    polls: HashMap<Uuid, Poll>,
    votes: Vec<Vote>,
    voters: HashSet<(Uuid, Identity)>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PollStore for MemoryStore {
    async fn insert_poll(&self, poll: &Poll) -> StoreResult<()> {
        let mut inner = self.inner.lock().await;
        inner.polls.insert(poll.id, poll.clone());
        Ok(())
    }

    async fn fetch_poll(&self, id: Uuid) -> StoreResult<Option<Poll>> {
        let inner = self.inner.lock().await;
        Ok(inner.polls.get(&id).cloned())
    }

    async fn has_voted(&self, poll_id: Uuid, voter: Identity) -> StoreResult<bool> {
        let inner = self.inner.lock().await;
        Ok(inner.voters.contains(&(poll_id, voter)))
    }

    async fn record_vote(&self, vote: &Vote) -> StoreResult<()> {
        let mut inner = self.inner.lock().await;

        if inner.voters.contains(&(vote.poll_id, vote.voter)) {
            return Err(StoreError::DuplicateVote);
        }

        let option = inner
            .polls
            .get_mut(&vote.poll_id)
            .and_then(|poll| poll.options.iter_mut().find(|o| o.id == vote.option_id))
            .ok_or(StoreError::UnknownOption)?;
        option.votes += 1;

        inner.voters.insert((vote.poll_id, vote.voter));
        inner.votes.push(vote.clone());
        Ok(())
    }

    async fn list_polls(&self, query: &ListQuery, now: DateTime<Utc>) -> StoreResult<PollPage> {
        let inner = self.inner.lock().await;

        let mut matching: Vec<&Poll> = inner
            .polls
            .values()
            .filter(|poll| query.status.matches(poll, now))
            .collect();
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));

        let total = matching.len() as i64;
        let polls = matching
            .into_iter()
            .skip(query.offset as usize)
            .take(query.limit as usize)
            .cloned()
            .collect();

        Ok(PollPage { polls, total })
    }

    async fn count_votes(&self, option_id: Uuid) -> StoreResult<i64> {
        let inner = self.inner.lock().await;
        Ok(inner.votes.iter().filter(|v| v.option_id == option_id).count() as i64)
    }
}
