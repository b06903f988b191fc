//! Shared pieces of the polling trackers.

use std::time::Duration;

use thiserror::Error;

use crate::build::BuildQueryError;
use crate::review::ChangeReviewError;
use crate::shutdown::ShutdownSignal;

/// Errors that end a tracker wait.
#[derive(Debug, Error)]
pub enum TrackerError {
    /// The change reached a terminal state without being merged.
    #[error("pull request {state} but not merged")]
    NotMerged { state: String },

    /// An observed CI job finished with a failing outcome.
    #[error("{job} {status} (build {build_num})")]
    JobFailed {
        job: String,
        status: String,
        build_num: u64,
    },

    /// A CI job did not finish within its budget.
    #[error("job timeout exceeded while waiting for build {job} [{build_num}] to finish")]
    JobTimeout { job: String, build_num: u64 },

    /// The target job never showed up in a build listing.
    #[error("no {job} build for the merged commit appeared within {waited_secs}s")]
    DeploymentNotFound { job: String, waited_secs: u64 },

    /// Shutdown was requested while waiting.
    #[error("wait cancelled by shutdown")]
    Cancelled,

    #[error(transparent)]
    Review(#[from] ChangeReviewError),

    #[error(transparent)]
    Build(#[from] BuildQueryError),
}

/// Sleep for `interval` unless shutdown fires first.
pub(crate) async fn pause(
    interval: Duration,
    shutdown: &mut ShutdownSignal,
) -> Result<(), TrackerError> {
    tokio::select! {
        _ = shutdown.recv() => Err(TrackerError::Cancelled),
        _ = tokio::time::sleep(interval) => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_pause_elapses() {
        let mut signal = ShutdownSignal::never();
        let start = tokio::time::Instant::now();
        pause(Duration::from_secs(10), &mut signal).await.unwrap();
        assert!(start.elapsed() >= Duration::from_secs(10));
    }

    #[tokio::test(start_paused = true)]
    async fn test_pause_cancelled() {
        let (tx, mut signal) = ShutdownSignal::channel();
        tx.send(()).unwrap();
        let err = pause(Duration::from_secs(3600), &mut signal)
            .await
            .unwrap_err();
        assert!(matches!(err, TrackerError::Cancelled));
    }

    #[test]
    fn test_messages() {
        let err = TrackerError::NotMerged {
            state: "closed".into(),
        };
        assert_eq!(err.to_string(), "pull request closed but not merged");
        let err = TrackerError::JobTimeout {
            job: "apply_terraform".into(),
            build_num: 42,
        };
        assert!(err.to_string().contains("apply_terraform [42]"));
    }
}
