//! Periodic background jobs.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use opendraft_common::{AppResult, config::SchedulerSettings};
use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval};

use crate::services::{PostService, PublishReport};

/// Scheduler configuration.
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Interval between scheduled-publishing sweeps (default: 1 minute).
    pub publish_interval: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            publish_interval: Duration::from_secs(60),
        }
    }
}

impl From<&SchedulerSettings> for SchedulerConfig {
    fn from(settings: &SchedulerSettings) -> Self {
        Self {
            publish_interval: Duration::from_secs(settings.interval_secs.max(1)),
        }
    }
}

/// Job executor trait for scheduled jobs.
#[async_trait::async_trait]
pub trait JobExecutor: Send + Sync {
    /// Publish drafts whose scheduled date is at or before `now`.
    async fn publish_due_posts(&self, now: DateTime<Utc>) -> AppResult<PublishReport>;
}

#[async_trait::async_trait]
impl JobExecutor for PostService {
    async fn publish_due_posts(&self, now: DateTime<Utc>) -> AppResult<PublishReport> {
        Self::publish_due_posts(self, now).await
    }
}

/// Run one sweep and log its outcome.
pub async fn run_publish_sweep<E: JobExecutor + ?Sized>(executor: &E) {
    match executor.publish_due_posts(Utc::now()).await {
        Ok(report) => {
            if report.published > 0 || report.failed > 0 {
                tracing::info!(
                    published = report.published,
                    skipped = report.skipped,
                    failed = report.failed,
                    "Published scheduled posts"
                );
            }
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to publish scheduled posts");
        }
    }
}

/// Spawn the scheduler loop. Abort the returned handle to stop it.
pub fn run_scheduler<E: JobExecutor + 'static>(config: SchedulerConfig, executor: Arc<E>) -> JoinHandle<()> {
    tracing::info!(interval = ?config.publish_interval, "Starting scheduler");

    tokio::spawn(async move {
        let mut interval = interval(config.publish_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            interval.tick().await;
            run_publish_sweep(executor.as_ref()).await;
        }
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use opendraft_common::AppError;
    use std::sync::atomic::{AtomicU64, Ordering};

    #[derive(Default)]
    struct CountingExecutor {
        calls: AtomicU64,
    }

    #[async_trait::async_trait]
    impl JobExecutor for CountingExecutor {
        async fn publish_due_posts(&self, _now: DateTime<Utc>) -> AppResult<PublishReport> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            if n == 1 {
                return Err(AppError::Database("connection reset".to_string()));
            }
            Ok(PublishReport {
                published: 1,
                ..Default::default()
            })
        }
    }

    #[test]
    fn test_config_from_settings() {
        let settings = SchedulerSettings {
            enabled: true,
            interval_secs: 5,
        };
        let config = SchedulerConfig::from(&settings);
        assert_eq!(config.publish_interval, Duration::from_secs(5));
        assert_eq!(SchedulerConfig::default().publish_interval, Duration::from_secs(60));
    }

    #[tokio::test(start_paused = true)]
    async fn test_scheduler_keeps_running_after_failure() {
        let executor = Arc::new(CountingExecutor::default());
        let handle = run_scheduler(
            SchedulerConfig {
                publish_interval: Duration::from_secs(60),
            },
            Arc::clone(&executor),
        );

        // First tick fires immediately, then one per minute.
        for _ in 0..3 {
            tokio::time::sleep(Duration::from_secs(60)).await;
        }
        handle.abort();

        assert!(executor.calls.load(Ordering::SeqCst) >= 3);
    }
}
