//! Waits for the CI deployment job of a merged commit.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::metrics;
use crate::shutdown::ShutdownSignal;
use crate::tracking::{pause, TrackerError};

use super::{BuildQuery, BuildSummary, ProjectRef};

/// Poll interval and budgets of the build tracker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildTrackerSettings {
    pub poll_interval: Duration,
    /// Budget for any job other than the target job.
    pub job_timeout: Duration,
    /// Budget for the target job.
    pub deploy_timeout: Duration,
    /// How long the target job may take to appear. `None` waits forever.
    pub search_timeout: Option<Duration>,
    /// Builds fetched per listing.
    pub list_limit: u32,
}

/// What the tracker is looking for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeploymentTarget {
    pub project: ProjectRef,
    pub branch: String,
    pub commit: String,
    /// Builds that started at or before this instant are ignored.
    pub merged_at: DateTime<Utc>,
    pub job_name: String,
}

/// Correlates CI builds to a merged commit and waits for the deploy job.
pub struct BuildTracker {
    builds: Arc<dyn BuildQuery>,
    settings: BuildTrackerSettings,
}

impl BuildTracker {
    pub fn new(builds: Arc<dyn BuildQuery>, settings: BuildTrackerSettings) -> Self {
        Self { builds, settings }
    }

    /// Wait for the target job to finish successfully.
    ///
    /// Every other job of the commit is awaited too, and the first one that
    /// fails aborts tracking before the target job is found.
    pub async fn await_deployment(
        &self,
        target: &DeploymentTarget,
        shutdown: &mut ShutdownSignal,
    ) -> Result<BuildSummary, TrackerError> {
        info!(
            project = %target.project,
            commit = %target.commit,
            job = %target.job_name,
            "Waiting for deployment job to complete"
        );
        let started = Instant::now();
        let mut resolved: HashSet<u64> = HashSet::new();

        loop {
            if let Some(limit) = self.settings.search_timeout {
                if started.elapsed() > limit {
                    metrics::record_wait("build", "not_found", started.elapsed().as_secs_f64());
                    warn!(job = %target.job_name, "Deployment job never appeared");
                    return Err(TrackerError::DeploymentNotFound {
                        job: target.job_name.clone(),
                        waited_secs: limit.as_secs(),
                    });
                }
            }

            metrics::record_poll("build_list");
            let builds = self
                .builds
                .list_recent(&target.project, &target.branch, self.settings.list_limit)
                .await?;

            for build in builds {
                debug!(
                    build = build.build_num,
                    job = %build.job_name,
                    commit = ?build.commit,
                    lifecycle = ?build.lifecycle,
                    status = %build.status,
                    "Observed build"
                );
                if resolved.contains(&build.build_num)
                    || !build.belongs_to(&target.commit, target.merged_at)
                {
                    continue;
                }

                let is_target = build.job_name == target.job_name;
                let budget = if is_target {
                    self.settings.deploy_timeout
                } else {
                    self.settings.job_timeout
                };

                let finished = self
                    .wait_for_build(&target.project, build, budget, shutdown)
                    .await?;
                resolved.insert(finished.build_num);

                if !finished.succeeded() {
                    let result = if is_target { "failed" } else { "early_failure" };
                    metrics::record_wait("build", result, started.elapsed().as_secs_f64());
                    warn!(
                        build = finished.build_num,
                        job = %finished.job_name,
                        status = %finished.status,
                        "Build failed"
                    );
                    return Err(TrackerError::JobFailed {
                        job: finished.job_name,
                        status: finished.status,
                        build_num: finished.build_num,
                    });
                }

                if is_target {
                    metrics::record_wait("build", "succeeded", started.elapsed().as_secs_f64());
                    info!(build = finished.build_num, job = %finished.job_name, "Deployment job succeeded");
                    return Ok(finished);
                }
            }

            pause(self.settings.poll_interval, shutdown).await?;
        }
    }

    /// Poll one build until it is finished or `budget` is spent.
    async fn wait_for_build(
        &self,
        project: &ProjectRef,
        mut build: BuildSummary,
        budget: Duration,
        shutdown: &mut ShutdownSignal,
    ) -> Result<BuildSummary, TrackerError> {
        let deadline = Instant::now() + budget;
        let mut polls: u64 = 0;

        while !build.lifecycle.is_finished() {
            if Instant::now() > deadline {
                return Err(TrackerError::JobTimeout {
                    job: build.job_name,
                    build_num: build.build_num,
                });
            }
            if polls % 10 == 0 {
                info!(job = %build.job_name, build = build.build_num, "Waiting for build to finish");
            }
            pause(self.settings.poll_interval, shutdown).await?;

            metrics::record_poll("build");
            build = self.builds.get_build(project, build.build_num).await?;
            polls += 1;
        }

        info!(
            job = %build.job_name,
            build = build.build_num,
            status = %build.status,
            "Build finished"
        );
        Ok(build)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::build::Lifecycle;
    use crate::testing::fixtures::{build_summary, finished};
    use crate::testing::MockBuildQuery;
    use chrono::TimeZone;

    fn merged_at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2020, 3, 1, 12, 0, 0).unwrap()
    }

    fn after_merge(secs: i64) -> DateTime<Utc> {
        merged_at() + chrono::Duration::seconds(secs)
    }

    fn target() -> DeploymentTarget {
        DeploymentTarget {
            project: ProjectRef::new("GSA", "infra"),
            branch: "master".into(),
            commit: "abc123".into(),
            merged_at: merged_at(),
            job_name: "apply_terraform".into(),
        }
    }

    fn settings() -> BuildTrackerSettings {
        BuildTrackerSettings {
            poll_interval: Duration::from_secs(5),
            job_timeout: Duration::from_secs(300),
            deploy_timeout: Duration::from_secs(1800),
            search_timeout: Some(Duration::from_secs(3600)),
            list_limit: 4,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_target_job_succeeds() {
        let builds = Arc::new(MockBuildQuery::new());
        let running = build_summary(7, "apply_terraform", "abc123", after_merge(10), Lifecycle::Running);
        builds.push_listing(vec![running.clone()]).await;
        builds
            .push_build_states(7, vec![running.clone(), finished(&running, false)])
            .await;

        let tracker = BuildTracker::new(builds.clone(), settings());
        let done = tracker
            .await_deployment(&target(), &mut ShutdownSignal::never())
            .await
            .unwrap();
        assert_eq!(done.build_num, 7);
        assert!(done.lifecycle.is_finished());
        assert_eq!(builds.get_build_calls(7).await, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_target_job_failure() {
        let builds = Arc::new(MockBuildQuery::new());
        let running = build_summary(7, "apply_terraform", "abc123", after_merge(10), Lifecycle::Running);
        builds.push_listing(vec![running.clone()]).await;
        builds.push_build_states(7, vec![finished(&running, true)]).await;

        let tracker = BuildTracker::new(builds, settings());
        let err = tracker
            .await_deployment(&target(), &mut ShutdownSignal::never())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            TrackerError::JobFailed { ref job, build_num: 7, .. } if job == "apply_terraform"
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_canceled_target_job_is_not_success() {
        let builds = Arc::new(MockBuildQuery::new());
        let running = build_summary(7, "apply_terraform", "abc123", after_merge(10), Lifecycle::Running);
        let canceled = BuildSummary {
            lifecycle: Lifecycle::Finished,
            status: "canceled".into(),
            failed: false,
            ..running.clone()
        };
        builds.push_listing(vec![running]).await;
        builds.push_build_states(7, vec![canceled]).await;

        let tracker = BuildTracker::new(builds, settings());
        let err = tracker
            .await_deployment(&target(), &mut ShutdownSignal::never())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            TrackerError::JobFailed { ref status, build_num: 7, .. } if status == "canceled"
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_target_job_times_out() {
        let builds = Arc::new(MockBuildQuery::new());
        let running = build_summary(7, "apply_terraform", "abc123", after_merge(10), Lifecycle::Running);
        builds.push_listing(vec![running.clone()]).await;
        builds.push_build_states(7, vec![running]).await;

        let tracker = BuildTracker::new(builds, settings());
        let started = Instant::now();
        let err = tracker
            .await_deployment(&target(), &mut ShutdownSignal::never())
            .await
            .unwrap_err();
        assert!(matches!(err, TrackerError::JobTimeout { build_num: 7, .. }));
        assert!(started.elapsed() >= Duration::from_secs(1800));
        assert!(started.elapsed() < Duration::from_secs(1900));
    }

    #[tokio::test(start_paused = true)]
    async fn test_other_job_uses_short_budget() {
        let builds = Arc::new(MockBuildQuery::new());
        let plan = build_summary(6, "plan_terraform", "abc123", after_merge(5), Lifecycle::Running);
        builds.push_listing(vec![plan.clone()]).await;
        builds.push_build_states(6, vec![plan]).await;

        let tracker = BuildTracker::new(builds, settings());
        let started = Instant::now();
        let err = tracker
            .await_deployment(&target(), &mut ShutdownSignal::never())
            .await
            .unwrap_err();
        assert!(matches!(err, TrackerError::JobTimeout { ref job, .. } if job == "plan_terraform"));
        assert!(started.elapsed() < Duration::from_secs(400));
    }

    #[tokio::test(start_paused = true)]
    async fn test_early_failure_aborts_before_target() {
        let builds = Arc::new(MockBuildQuery::new());
        let plan = build_summary(6, "plan_terraform", "abc123", after_merge(5), Lifecycle::Running);
        builds.push_listing(vec![plan.clone()]).await;
        builds.push_build_states(6, vec![finished(&plan, true)]).await;

        let tracker = BuildTracker::new(builds.clone(), settings());
        let err = tracker
            .await_deployment(&target(), &mut ShutdownSignal::never())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            TrackerError::JobFailed { ref job, build_num: 6, .. } if job == "plan_terraform"
        ));
        assert_eq!(builds.list_calls().await, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_ignores_stale_and_foreign_builds() {
        let builds = Arc::new(MockBuildQuery::new());
        // Same commit but started before the merge, and a different commit.
        let stale = finished(
            &build_summary(3, "apply_terraform", "abc123", after_merge(-60), Lifecycle::Running),
            true,
        );
        let foreign = finished(
            &build_summary(4, "apply_terraform", "zzz999", after_merge(30), Lifecycle::Running),
            true,
        );
        let plan = build_summary(5, "plan_terraform", "abc123", after_merge(5), Lifecycle::Finished);
        let apply = build_summary(8, "apply_terraform", "abc123", after_merge(90), Lifecycle::Finished);

        builds.push_listing(vec![stale.clone(), foreign.clone()]).await;
        builds
            .push_listing(vec![plan.clone(), stale.clone(), foreign.clone()])
            .await;
        builds.push_listing(vec![apply.clone(), plan, stale, foreign]).await;

        let tracker = BuildTracker::new(builds.clone(), settings());
        let done = tracker
            .await_deployment(&target(), &mut ShutdownSignal::never())
            .await
            .unwrap();
        assert_eq!(done.build_num, 8);
        assert_eq!(builds.list_calls().await, 3);
        // Listed builds that were already finished are not fetched again.
        assert_eq!(builds.get_build_calls(5).await, 0);
        assert_eq!(builds.get_build_calls(3).await, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_target_never_appears() {
        let builds = Arc::new(MockBuildQuery::new());
        builds.push_listing(Vec::new()).await;

        let mut settings = settings();
        settings.search_timeout = Some(Duration::from_secs(60));
        let tracker = BuildTracker::new(builds.clone(), settings);
        let err = tracker
            .await_deployment(&target(), &mut ShutdownSignal::never())
            .await
            .unwrap_err();
        assert!(matches!(err, TrackerError::DeploymentNotFound { waited_secs: 60, .. }));
        assert!(builds.list_calls().await >= 12);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unbounded_search_cancelled_by_shutdown() {
        let builds = Arc::new(MockBuildQuery::new());
        builds.push_listing(Vec::new()).await;

        let mut settings = settings();
        settings.search_timeout = None;
        let tracker = BuildTracker::new(builds, settings);
        let (tx, mut signal) = ShutdownSignal::channel();
        let handle = tokio::spawn(async move {
            tracker.await_deployment(&target(), &mut signal).await
        });
        tokio::time::sleep(Duration::from_secs(10_000)).await;
        tx.send(()).unwrap();

        let err = handle.await.unwrap().unwrap_err();
        assert!(matches!(err, TrackerError::Cancelled));
    }
}
