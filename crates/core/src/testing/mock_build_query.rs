//! Mock CI backend for testing.

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::build::{BuildQuery, BuildQueryError, BuildSummary, ProjectRef};

/// Mock implementation of the BuildQuery trait.
///
/// Listings and per-build states are queues that repeat their last entry,
/// so a test describes a timeline of observations and the tracker sees the
/// final one for as long as it keeps polling.
#[derive(Debug)]
pub struct MockBuildQuery {
    listings: Arc<RwLock<VecDeque<Vec<BuildSummary>>>>,
    build_states: Arc<RwLock<HashMap<u64, VecDeque<BuildSummary>>>>,
    /// If set, the next operation will fail with this error.
    next_error: Arc<RwLock<Option<BuildQueryError>>>,
    list_requests: Arc<RwLock<Vec<(ProjectRef, String, u32)>>>,
    get_calls: Arc<RwLock<HashMap<u64, usize>>>,
}

impl Default for MockBuildQuery {
    fn default() -> Self {
        Self::new()
    }
}

impl MockBuildQuery {
    pub fn new() -> Self {
        Self {
            listings: Arc::new(RwLock::new(VecDeque::new())),
            build_states: Arc::new(RwLock::new(HashMap::new())),
            next_error: Arc::new(RwLock::new(None)),
            list_requests: Arc::new(RwLock::new(Vec::new())),
            get_calls: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Queue the result of one `list_recent` call.
    pub async fn push_listing(&self, builds: Vec<BuildSummary>) {
        self.listings.write().await.push_back(builds);
    }

    /// Queue successive `get_build` results for one build.
    pub async fn push_build_states(&self, build_num: u64, states: Vec<BuildSummary>) {
        self.build_states
            .write()
            .await
            .entry(build_num)
            .or_default()
            .extend(states);
    }

    /// Configure the next operation to fail with the given error.
    pub async fn set_next_error(&self, error: BuildQueryError) {
        *self.next_error.write().await = Some(error);
    }

    /// Number of `list_recent` calls.
    pub async fn list_calls(&self) -> usize {
        self.list_requests.read().await.len()
    }

    /// Arguments of every `list_recent` call.
    pub async fn list_requests(&self) -> Vec<(ProjectRef, String, u32)> {
        self.list_requests.read().await.clone()
    }

    /// Number of `get_build` calls for one build.
    pub async fn get_build_calls(&self, build_num: u64) -> usize {
        self.get_calls
            .read()
            .await
            .get(&build_num)
            .copied()
            .unwrap_or(0)
    }

    async fn take_error(&self) -> Result<(), BuildQueryError> {
        match self.next_error.write().await.take() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}

fn next_of<T: Clone>(queue: &mut VecDeque<T>) -> Option<T> {
    if queue.len() > 1 {
        queue.pop_front()
    } else {
        queue.front().cloned()
    }
}

#[async_trait]
impl BuildQuery for MockBuildQuery {
    fn name(&self) -> &str {
        "mock"
    }

    async fn list_recent(
        &self,
        project: &ProjectRef,
        branch: &str,
        limit: u32,
    ) -> Result<Vec<BuildSummary>, BuildQueryError> {
        self.list_requests
            .write()
            .await
            .push((project.clone(), branch.to_string(), limit));
        self.take_error().await?;

        let mut listings = self.listings.write().await;
        let mut builds = next_of(&mut listings).unwrap_or_default();
        builds.truncate(limit as usize);
        Ok(builds)
    }

    async fn get_build(
        &self,
        _project: &ProjectRef,
        build_num: u64,
    ) -> Result<BuildSummary, BuildQueryError> {
        *self.get_calls.write().await.entry(build_num).or_insert(0) += 1;
        self.take_error().await?;

        let mut states = self.build_states.write().await;
        states
            .get_mut(&build_num)
            .and_then(next_of)
            .ok_or_else(|| BuildQueryError::NotFound(build_num.to_string()))
    }
}
