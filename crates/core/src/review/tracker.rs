//! Waits for a change request to be merged or closed.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::metrics;
use crate::shutdown::ShutdownSignal;
use crate::tracking::{pause, TrackerError};

use super::{ChangeRef, ChangeReview, ChangeState, ChangeStatus};

/// Polls a change review backend until a change leaves the open state.
pub struct ChangeReviewTracker {
    review: Arc<dyn ChangeReview>,
    poll_interval: Duration,
}

impl ChangeReviewTracker {
    pub fn new(review: Arc<dyn ChangeReview>, poll_interval: Duration) -> Self {
        Self {
            review,
            poll_interval,
        }
    }

    /// Wait until the change is resolved.
    ///
    /// Returns the merged status (head commit and merge time feed the build
    /// tracker). A change closed without merging is
    /// [`TrackerError::NotMerged`]. There is no deadline; only `shutdown`
    /// ends an open-ended review.
    pub async fn await_resolution(
        &self,
        change: &ChangeRef,
        shutdown: &mut ShutdownSignal,
    ) -> Result<ChangeStatus, TrackerError> {
        info!(change = %change, "Waiting for pull request to be merged");
        let started = Instant::now();
        let mut polls: u64 = 0;

        loop {
            metrics::record_poll("change_review");
            let status = self
                .review
                .get(&change.owner, &change.repo, change.number)
                .await?;
            polls += 1;

            match status.review_state() {
                ChangeState::Open => {
                    if polls % 30 == 1 {
                        debug!(change = %change, polls = polls, "Pull request still open");
                    }
                }
                ChangeState::Merged => {
                    let waited = started.elapsed().as_secs_f64();
                    metrics::record_wait("change_review", "merged", waited);
                    info!(change = %change, head = %status.head_sha, "Pull request merged");
                    return Ok(status);
                }
                ChangeState::ClosedUnmerged(state) => {
                    let waited = started.elapsed().as_secs_f64();
                    metrics::record_wait("change_review", "not_merged", waited);
                    warn!(change = %change, state = %state, "Pull request closed without merge");
                    return Err(TrackerError::NotMerged { state });
                }
            }

            pause(self.poll_interval, shutdown).await?;
        }
    }
}
