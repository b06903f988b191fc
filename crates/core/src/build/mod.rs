//! CI build backends and the deployment tracker.

mod circleci;
mod tracker;
mod types;

pub use circleci::CircleCiClient;
pub use tracker::{BuildTracker, BuildTrackerSettings, DeploymentTarget};
pub use types::{
    is_success_status, BuildQuery, BuildQueryError, BuildSummary, Lifecycle, ProjectRef,
    SUCCESS_STATUSES,
};
