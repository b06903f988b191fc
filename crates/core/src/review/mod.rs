//! Change review (pull request) backends and tracker.

mod github;
mod tracker;
mod types;

pub use github::GitHubChangeReview;
pub use tracker::ChangeReviewTracker;
pub use types::{ChangeRef, ChangeReview, ChangeReviewError, ChangeState, ChangeStatus, NewChange};
