// src/store/postgres.rs
use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use tracing::debug;
use uuid::Uuid;

use super::{PollStore, StoreResult};
use crate::error::StoreError;
use crate::models::{Identity, ListQuery, Poll, PollOption, PollPage, Vote};

/// `$1` is the status filter name, `$2` the evaluation instant.
const STATUS_FILTER: &str = "($1::text = 'all' \
     OR ($1::text = 'active' AND end_date > $2) \
     OR ($1::text = 'ended' AND end_date <= $2))";

#[derive(FromRow)]
struct PollRow {
    id: Uuid,
    title: String,
    description: String,
    end_date: DateTime<Utc>,
    created_at: DateTime<Utc>,
}

#[derive(FromRow)]
struct OptionRow {
    id: Uuid,
    poll_id: Uuid,
    text: String,
    votes: i32,
}

impl PollRow {
    fn into_poll(self, options: Vec<PollOption>) -> Poll {
        Poll {
            id: self.id,
            title: self.title,
            description: self.description,
            end_date: self.end_date,
            options,
            created_at: self.created_at,
        }
    }
}

impl From<OptionRow> for PollOption {
    fn from(row: OptionRow) -> Self {
        PollOption {
            id: row.id,
            poll_id: row.poll_id,
            text: row.text,
            votes: row.votes,
        }
    }
}

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Maps constraint violations raised by the votes table onto the vote
/// outcomes they stand for. Anything else stays a database error.
fn classify(err: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db) = &err {
        if db.is_unique_violation() {
            return StoreError::DuplicateVote;
        }
        if db.is_foreign_key_violation() {
            return StoreError::UnknownOption;
        }
    }
    StoreError::Database(err)
}

#[async_trait]
impl PollStore for PgStore {
    async fn insert_poll(&self, poll: &Poll) -> StoreResult<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "INSERT INTO polls (id, title, description, end_date, created_at) \
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(poll.id)
        .bind(&poll.title)
        .bind(&poll.description)
        .bind(poll.end_date)
        .bind(poll.created_at)
        .execute(&mut *tx)
        .await?;

        for (position, option) in poll.options.iter().enumerate() {
            sqlx::query(
                "INSERT INTO options (id, poll_id, position, text, votes) \
                 VALUES ($1, $2, $3, $4, 0)",
            )
            .bind(option.id)
            .bind(poll.id)
            .bind(position as i32)
            .bind(&option.text)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn fetch_poll(&self, id: Uuid) -> StoreResult<Option<Poll>> {
        let row = sqlx::query_as::<_, PollRow>(
            "SELECT id, title, description, end_date, created_at FROM polls WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let options = sqlx::query_as::<_, OptionRow>(
            "SELECT id, poll_id, text, votes FROM options WHERE poll_id = $1 ORDER BY position",
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?;

        Ok(Some(row.into_poll(options.into_iter().map(PollOption::from).collect())))
    }

    async fn has_voted(&self, poll_id: Uuid, voter: Identity) -> StoreResult<bool> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM votes WHERE poll_id = $1 AND user_id = $2)",
        )
        .bind(poll_id)
        .bind(voter.0)
        .fetch_one(&self.pool)
        .await?;

        Ok(exists)
    }

    async fn record_vote(&self, vote: &Vote) -> StoreResult<()> {
        let mut tx = self.pool.begin().await?;

        // A concurrent insert for the same (poll_id, user_id) blocks here until
        // the other transaction finishes, then fails with a unique violation.
        sqlx::query(
            "INSERT INTO votes (id, poll_id, option_id, user_id, created_at) \
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(vote.id)
        .bind(vote.poll_id)
        .bind(vote.option_id)
        .bind(vote.voter.0)
        .bind(vote.created_at)
        .execute(&mut *tx)
        .await
        .map_err(classify)?;

        let updated = sqlx::query("UPDATE options SET votes = votes + 1 WHERE id = $1 AND poll_id = $2")
            .bind(vote.option_id)
            .bind(vote.poll_id)
            .execute(&mut *tx)
            .await?;

        if updated.rows_affected() != 1 {
            tx.rollback().await?;
            return Err(StoreError::UnknownOption);
        }

        tx.commit().await.map_err(classify)?;
        debug!("Committed vote {} on option {}", vote.id, vote.option_id);
        Ok(())
    }

    async fn list_polls(&self, query: &ListQuery, now: DateTime<Utc>) -> StoreResult<PollPage> {
        let status = query.status.as_str();

        let count_sql = format!("SELECT COUNT(*) FROM polls WHERE {STATUS_FILTER}");
        let total = sqlx::query_scalar::<_, i64>(&count_sql)
            .bind(status)
            .bind(now)
            .fetch_one(&self.pool)
            .await?;

        let page_sql = format!(
            "SELECT id, title, description, end_date, created_at FROM polls \
             WHERE {STATUS_FILTER} \
             ORDER BY created_at DESC, id DESC \
             OFFSET $3 LIMIT $4"
        );
        let rows = sqlx::query_as::<_, PollRow>(&page_sql)
            .bind(status)
            .bind(now)
            .bind(query.offset)
            .bind(query.limit)
            .fetch_all(&self.pool)
            .await?;

        let ids: Vec<Uuid> = rows.iter().map(|row| row.id).collect();
        let option_rows = sqlx::query_as::<_, OptionRow>(
            "SELECT id, poll_id, text, votes FROM options \
             WHERE poll_id = ANY($1) ORDER BY poll_id, position",
        )
        .bind(&ids[..])
        .fetch_all(&self.pool)
        .await?;

        let mut options: HashMap<Uuid, Vec<PollOption>> = HashMap::new();
        for row in option_rows {
            options.entry(row.poll_id).or_default().push(row.into());
        }

        let polls = rows
            .into_iter()
            .map(|row| {
                let opts = options.remove(&row.id).unwrap_or_default();
                row.into_poll(opts)
            })
            .collect();

        Ok(PollPage { polls, total })
    }

    async fn count_votes(&self, option_id: Uuid) -> StoreResult<i64> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM votes WHERE option_id = $1")
            .bind(option_id)
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}
