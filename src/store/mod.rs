// src/store/mod.rs
//! Persistence seam for polls and votes.
//!
//! Every backend must hold two guarantees on its own, without help from the
//! callers: `record_vote` is atomic (the vote row and the tally increment land
//! together or not at all), and the `(poll, voter)` pair is unique at the
//! storage level so concurrent callers cannot both succeed.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::StoreError;
use crate::models::{Identity, ListQuery, Poll, PollPage, Vote};

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

pub type StoreResult<T> = Result<T, StoreError>;

#[async_trait]
pub trait PollStore: Send + Sync {
    /// Inserts the poll and all of its options as one unit.
    async fn insert_poll(&self, poll: &Poll) -> StoreResult<()>;

    /// Fetches a poll with its options in creation order.
    async fn fetch_poll(&self, id: Uuid) -> StoreResult<Option<Poll>>;

    /// Fast-path existence check; `record_vote` remains the authority.
    async fn has_voted(&self, poll_id: Uuid, voter: Identity) -> StoreResult<bool>;

    /// Inserts `vote` and adds one to its option's tally in one transaction.
    ///
    /// Fails with [`StoreError::DuplicateVote`] when the voter already has a
    /// vote on the poll and [`StoreError::UnknownOption`] when the option is
    /// not part of the poll. Nothing is written in either case.
    async fn record_vote(&self, vote: &Vote) -> StoreResult<()>;

    /// One page of polls matching `query.status` at `now`, newest first, plus
    /// the size of the whole filtered set.
    async fn list_polls(&self, query: &ListQuery, now: DateTime<Utc>) -> StoreResult<PollPage>;

    /// Number of committed votes referencing `option_id`, counted from the
    /// vote rows rather than the stored tally. Reconciliation: for every
    /// option this must equal `PollOption::votes`.
    async fn count_votes(&self, option_id: Uuid) -> StoreResult<i64>;
}
