// src/services.rs
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::info;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::{ListQuery, Poll, PollDraft, PollPage};
use crate::store::PollStore;
use crate::validation::validate_poll_at;

/// Poll creation, lookup and listing. Everything here except `create_poll`
/// is read-only.
#[derive(Clone)]
pub struct PollService {
    store: Arc<dyn PollStore>,
}

impl PollService {
    pub fn new(store: Arc<dyn PollStore>) -> Self {
        Self { store }
    }

    pub async fn create_poll(&self, draft: PollDraft) -> Result<Poll, AppError> {
        self.create_poll_at(draft, Utc::now()).await
    }

    pub async fn create_poll_at(&self, draft: PollDraft, now: DateTime<Utc>) -> Result<Poll, AppError> {
        validate_poll_at(&draft, now)?;

        let poll = Poll::from_draft(draft, now);
        self.store.insert_poll(&poll).await?;

        info!("Created poll {} with {} options", poll.id, poll.options.len());
        Ok(poll)
    }

    pub async fn get_poll(&self, id: Uuid) -> Result<Poll, AppError> {
        self.store.fetch_poll(id).await?.ok_or(AppError::NotFound)
    }

    pub async fn list_polls(&self, query: ListQuery) -> Result<PollPage, AppError> {
        self.list_polls_at(query, Utc::now()).await
    }

    pub async fn list_polls_at(&self, query: ListQuery, now: DateTime<Utc>) -> Result<PollPage, AppError> {
        Ok(self.store.list_polls(&query, now).await?)
    }
}
