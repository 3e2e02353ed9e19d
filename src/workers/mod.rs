pub mod draw_ingestion;
pub mod draw_settlement;

use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono_tz::Tz;
use tokio::sync::broadcast;
use tokio_cron_scheduler::{Job, JobScheduler};

use crate::config::WorkerConfig;
use crate::source::DrawSource;
use crate::store::Store;

/// Timeout for individual worker invocations (5 minutes).
const WORKER_TIMEOUT: Duration = Duration::from_secs(300);

/// Drain period before scheduler shutdown to let in-flight tasks complete.
#[cfg(test)]
const DRAIN_TIMEOUT: Duration = Duration::from_millis(10);
#[cfg(not(test))]
const DRAIN_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WorkerName {
    /// Weekly fetch of the newly published round.
    DrawIngestion,
    /// Offset re-attempt plus ticket settlement for confirmed rounds.
    DrawSettlement,
}

impl WorkerName {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::DrawIngestion => "draw_ingestion",
            Self::DrawSettlement => "draw_settlement",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobSpec {
    pub name: WorkerName,
    pub cron: String,
    pub enabled: bool,
}

pub struct WorkerManager {
    store: Arc<Store>,
    source: Arc<dyn DrawSource>,
    shutdown_rx: broadcast::Receiver<()>,
    config: WorkerConfig,
}

impl WorkerManager {
    pub fn new(
        store: Arc<Store>,
        source: Arc<dyn DrawSource>,
        shutdown_rx: broadcast::Receiver<()>,
        config: &WorkerConfig,
    ) -> Self {
        Self {
            store,
            source,
            shutdown_rx,
            config: config.clone(),
        }
    }

    /// Single source of truth for all planned jobs and their cron schedules.
    /// Both fire in the publisher's time zone: ingestion shortly after the
    /// weekly cutover, settlement offset later the same evening so that
    /// reconciliation never races an uncommitted round.
    pub fn planned_jobs(&self) -> Vec<JobSpec> {
        if !self.config.is_leader {
            return Vec::new();
        }

        vec![
            JobSpec {
                name: WorkerName::DrawIngestion,
                cron: self.config.ingestion_cron.clone(),
                enabled: true,
            },
            JobSpec {
                name: WorkerName::DrawSettlement,
                cron: self.config.settlement_cron.clone(),
                enabled: true,
            },
        ]
    }

    fn timezone(&self) -> Tz {
        match Tz::from_str(&self.config.timezone) {
            Ok(tz) => tz,
            Err(_) => {
                tracing::warn!(
                    timezone = %self.config.timezone,
                    "Unknown worker timezone, falling back to UTC"
                );
                Tz::UTC
            }
        }
    }

    /// Start the worker scheduler. Returns an error if the scheduler cannot
    /// be created or started.
    pub async fn start(mut self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        if !self.config.is_leader {
            tracing::info!("Worker leader disabled; skipping worker startup");
            return Ok(());
        }

        let mut scheduler = JobScheduler::new().await?;

        self.register_jobs(&scheduler).await;

        scheduler.start().await?;

        tracing::info!("Worker manager started");
        let _ = self.shutdown_rx.recv().await;

        tracing::info!(
            "Worker manager shutting down, draining for {}s",
            DRAIN_TIMEOUT.as_secs()
        );
        tokio::time::sleep(DRAIN_TIMEOUT).await;
        let _ = scheduler.shutdown().await;
        Ok(())
    }

    async fn register_jobs(&self, scheduler: &JobScheduler) {
        let specs = self.planned_jobs();
        let tz = self.timezone();

        for spec in &specs {
            if !spec.enabled {
                tracing::info!(name = spec.name.as_str(), "Skipping disabled worker");
                continue;
            }

            let store = self.store.clone();
            let source = self.source.clone();
            let name_str = spec.name.as_str();

            match spec.name {
                WorkerName::DrawIngestion => {
                    add_job(scheduler, &spec.cron, tz, name_str, move || {
                        let store = store.clone();
                        let source = source.clone();
                        async move {
                            draw_ingestion::run(&store, source).await;
                        }
                    })
                    .await;
                }
                WorkerName::DrawSettlement => {
                    add_job(scheduler, &spec.cron, tz, name_str, move || {
                        let store = store.clone();
                        let source = source.clone();
                        async move {
                            draw_settlement::run(&store, source).await;
                        }
                    })
                    .await;
                }
            }
            tracing::info!(
                name = name_str,
                cron = %spec.cron,
                timezone = %tz,
                "Registered worker"
            );
        }
    }
}

/// Add a job to the scheduler with an overlap guard and timeout wrapper.
async fn add_job<Fut, F>(
    scheduler: &JobScheduler,
    cron: &str,
    tz: Tz,
    name: &'static str,
    mut run: F,
) where
    F: FnMut() -> Fut + Send + Sync + 'static,
    Fut: std::future::Future<Output = ()> + Send + 'static,
{
    let running = Arc::new(AtomicBool::new(false));

    let job = Job::new_async_tz(cron, tz, move |_uuid, _lock| {
        let guard = running.clone();

        if guard
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            tracing::warn!(
                worker = name,
                "Skipping worker invocation: previous run still in progress"
            );
            return Box::pin(async {});
        }

        let fut = run();
        Box::pin(async move {
            match tokio::time::timeout(WORKER_TIMEOUT, fut).await {
                Ok(()) => {}
                Err(_) => {
                    tracing::error!(
                        worker = name,
                        timeout_secs = WORKER_TIMEOUT.as_secs(),
                        "Worker timed out"
                    );
                }
            }
            guard.store(false, Ordering::SeqCst);
        })
    });

    match job {
        Ok(job) => {
            if let Err(err) = scheduler.add(job).await {
                tracing::error!(error=%err, cron, worker = name, "Failed to add worker job");
            }
        }
        Err(err) => tracing::error!(error=%err, cron, worker = name, "Failed to create worker job"),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use tokio::sync::broadcast;

    use crate::source::canned::CannedDrawSource;

    use super::*;

    fn worker_config(is_leader: bool) -> WorkerConfig {
        WorkerConfig {
            is_leader,
            ingestion_cron: "0 50 20 * * Sat".to_string(),
            settlement_cron: "0 10 21 * * Sat".to_string(),
            timezone: "Asia/Seoul".to_string(),
        }
    }

    fn manager(is_leader: bool) -> (WorkerManager, tempfile::TempDir) {
        let tmp = tempfile::tempdir().expect("tempdir");
        let store =
            Arc::new(Store::open(tmp.path().join("worker_test.sled").to_str().unwrap()).unwrap());
        let source = Arc::new(CannedDrawSource::new());
        let (tx, _) = broadcast::channel(2);
        (
            WorkerManager::new(store, source, tx.subscribe(), &worker_config(is_leader)),
            tmp,
        )
    }

    #[tokio::test]
    async fn leader_switch_controls_job_registration() {
        let (m, _tmp) = manager(false);
        assert!(m.planned_jobs().is_empty());
    }

    #[tokio::test]
    async fn leader_plans_both_weekly_jobs() {
        let (m, _tmp) = manager(true);
        let jobs = m.planned_jobs();
        assert_eq!(jobs.len(), 2);
        assert!(jobs.iter().all(|j| j.enabled));
        assert!(jobs.iter().any(|j| j.name == WorkerName::DrawIngestion));
        assert!(jobs.iter().any(|j| j.name == WorkerName::DrawSettlement));
    }

    #[tokio::test]
    async fn non_leader_start_is_non_panicking() {
        let (m, _tmp) = manager(false);
        m.start().await.expect("non-leader start should succeed");
    }

    #[tokio::test]
    async fn unknown_timezone_falls_back_to_utc() {
        let (mut cfgless, _tmp) = manager(true);
        cfgless.config.timezone = "Mars/Olympus".to_string();
        assert_eq!(cfgless.timezone(), Tz::UTC);
    }
}
