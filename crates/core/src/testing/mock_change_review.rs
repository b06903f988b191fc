//! Mock change review backend for testing.

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::review::{ChangeRef, ChangeReview, ChangeReviewError, ChangeStatus, NewChange};

/// A recorded change request for test assertions.
#[derive(Debug, Clone)]
pub struct RecordedChange {
    pub owner: String,
    pub repo: String,
    pub change: NewChange,
}

/// Mock implementation of the ChangeReview trait.
///
/// Each change has a queue of statuses. `get` pops the front of the queue
/// and keeps returning the last status once one is left, so a queue of
/// `open, open, merged` resolves on the third poll.
///
/// # Example
///
/// ```rust,ignore
/// let review = MockChangeReview::new();
/// review.push_states(1, &[("open", false), ("closed", true)]).await;
///
/// let status = review.get("GSA", "infra", 1).await?; // open
/// let status = review.get("GSA", "infra", 1).await?; // merged
/// ```
#[derive(Debug)]
pub struct MockChangeReview {
    statuses: Arc<RwLock<HashMap<u64, VecDeque<ChangeStatus>>>>,
    created: Arc<RwLock<Vec<RecordedChange>>>,
    reviewer_requests: Arc<RwLock<Vec<(u64, Vec<String>)>>>,
    /// If set, the next operation will fail with this error.
    next_error: Arc<RwLock<Option<ChangeReviewError>>>,
    get_calls: Arc<RwLock<usize>>,
    next_number: Arc<RwLock<u64>>,
    head_sha: Arc<RwLock<String>>,
    merged_at: Arc<RwLock<DateTime<Utc>>>,
}

impl Default for MockChangeReview {
    fn default() -> Self {
        Self::new()
    }
}

impl MockChangeReview {
    /// Create a new mock. Changes are numbered from 1.
    pub fn new() -> Self {
        Self {
            statuses: Arc::new(RwLock::new(HashMap::new())),
            created: Arc::new(RwLock::new(Vec::new())),
            reviewer_requests: Arc::new(RwLock::new(Vec::new())),
            next_error: Arc::new(RwLock::new(None)),
            get_calls: Arc::new(RwLock::new(0)),
            next_number: Arc::new(RwLock::new(1)),
            head_sha: Arc::new(RwLock::new("abc123".to_string())),
            merged_at: Arc::new(RwLock::new(
                Utc.with_ymd_and_hms(2020, 3, 1, 12, 0, 0).unwrap(),
            )),
        }
    }

    /// Head commit reported for every change.
    pub async fn set_head_sha(&self, sha: &str) {
        *self.head_sha.write().await = sha.to_string();
    }

    /// Merge time reported for merged changes.
    pub async fn set_merged_at(&self, at: DateTime<Utc>) {
        *self.merged_at.write().await = at;
    }

    /// Queue `(state, merged)` observations for a change.
    pub async fn push_states(&self, number: u64, states: &[(&str, bool)]) {
        let head_sha = self.head_sha.read().await.clone();
        let merged_at = *self.merged_at.read().await;
        let mut statuses = self.statuses.write().await;
        let queue = statuses.entry(number).or_default();
        for (state, merged) in states {
            queue.push_back(ChangeStatus {
                number,
                state: state.to_string(),
                merged: *merged,
                head_sha: head_sha.clone(),
                base_ref: "master".to_string(),
                merged_at: merged.then_some(merged_at),
            });
        }
    }

    /// Configure the next operation to fail with the given error.
    pub async fn set_next_error(&self, error: ChangeReviewError) {
        *self.next_error.write().await = Some(error);
    }

    /// Change requests opened so far.
    pub async fn created_changes(&self) -> Vec<RecordedChange> {
        self.created.read().await.clone()
    }

    /// Reviewer requests made so far.
    pub async fn reviewer_requests(&self) -> Vec<(u64, Vec<String>)> {
        self.reviewer_requests.read().await.clone()
    }

    /// Number of `get` calls.
    pub async fn get_calls(&self) -> usize {
        *self.get_calls.read().await
    }

    async fn take_error(&self) -> Result<(), ChangeReviewError> {
        match self.next_error.write().await.take() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl ChangeReview for MockChangeReview {
    fn name(&self) -> &str {
        "mock"
    }

    async fn get(
        &self,
        _owner: &str,
        _repo: &str,
        number: u64,
    ) -> Result<ChangeStatus, ChangeReviewError> {
        *self.get_calls.write().await += 1;
        self.take_error().await?;

        let mut statuses = self.statuses.write().await;
        let queue = statuses
            .get_mut(&number)
            .ok_or_else(|| ChangeReviewError::NotFound(number.to_string()))?;
        let status = if queue.len() > 1 {
            queue.pop_front()
        } else {
            queue.front().cloned()
        };
        status.ok_or_else(|| ChangeReviewError::NotFound(number.to_string()))
    }

    async fn create(
        &self,
        owner: &str,
        repo: &str,
        change: &NewChange,
    ) -> Result<ChangeRef, ChangeReviewError> {
        self.take_error().await?;

        let mut next = self.next_number.write().await;
        let number = *next;
        *next += 1;

        self.created.write().await.push(RecordedChange {
            owner: owner.to_string(),
            repo: repo.to_string(),
            change: change.clone(),
        });
        Ok(ChangeRef {
            owner: owner.to_string(),
            repo: repo.to_string(),
            number,
            html_url: None,
        })
    }

    async fn request_reviewers(
        &self,
        _owner: &str,
        _repo: &str,
        number: u64,
        teams: &[String],
    ) -> Result<(), ChangeReviewError> {
        self.take_error().await?;
        self.reviewer_requests
            .write()
            .await
            .push((number, teams.to_vec()));
        Ok(())
    }
}
