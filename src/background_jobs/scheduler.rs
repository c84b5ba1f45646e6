use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use rand::Rng;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::server::metrics;

use super::job::BackgroundJob;

/// Drives registered jobs on their fixed intervals.
///
/// Each job gets its own timer task. An explicit per-job running flag
/// enforces the no-overlap rule: if a tick fires while the previous run
/// has not finished, the tick is skipped and logged, never queued.
/// Shutdown stops the timers and then waits for an in-flight run, which
/// finishes on its own HTTP deadlines.
pub struct JobScheduler {
    jobs: Vec<Arc<dyn BackgroundJob>>,
    shutdown_token: CancellationToken,
    /// Upper bound of the random startup delay applied per job, so a
    /// fleet of restarted instances does not tick in lockstep.
    startup_jitter: Duration,
}

impl JobScheduler {
    pub fn new(shutdown_token: CancellationToken, startup_jitter: Duration) -> Self {
        Self {
            jobs: Vec::new(),
            shutdown_token,
            startup_jitter,
        }
    }

    pub fn register_job(&mut self, job: Arc<dyn BackgroundJob>) {
        info!("Registering job: {} - {}", job.id(), job.description());
        self.jobs.push(job);
    }

    pub fn job_count(&self) -> usize {
        self.jobs.len()
    }

    /// Run all registered jobs until the shutdown token fires.
    pub async fn run(self) {
        info!("Starting job scheduler with {} registered jobs", self.jobs.len());

        let mut handles = Vec::with_capacity(self.jobs.len());
        for job in self.jobs {
            let token = self.shutdown_token.clone();
            let jitter = self.startup_jitter;
            handles.push(tokio::spawn(run_job_loop(job, token, jitter)));
        }

        for handle in handles {
            if let Err(e) = handle.await {
                error!("Job loop task failed: {e}");
            }
        }

        info!("Job scheduler stopped");
    }
}

async fn run_job_loop(job: Arc<dyn BackgroundJob>, token: CancellationToken, jitter: Duration) {
    if !jitter.is_zero() {
        let delay = rand::rng().random_range(Duration::ZERO..=jitter);
        tokio::select! {
            _ = tokio::time::sleep(delay) => {}
            _ = token.cancelled() => return,
        }
    }

    let running = Arc::new(AtomicBool::new(false));
    let mut in_flight: Option<JoinHandle<()>> = None;

    if job.run_at_startup() {
        in_flight = spawn_execution(Arc::clone(&job), Arc::clone(&running));
    }

    let mut ticker = tokio::time::interval(job.interval());
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    // The first tick resolves immediately; consume it so the interval
    // starts counting from now.
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                if running.load(Ordering::SeqCst) {
                    warn!("Job {} still running, skipping this tick", job.id());
                    metrics::record_background_job_skipped(job.id());
                    continue;
                }
                in_flight = spawn_execution(Arc::clone(&job), Arc::clone(&running));
            }
            _ = token.cancelled() => {
                info!("Job loop for {} received shutdown signal", job.id());
                break;
            }
        }
    }

    // Shutdown lands between cycles: a run that already started gets to
    // finish before the loop returns.
    if let Some(handle) = in_flight {
        if let Err(e) = handle.await {
            error!("Job {} execution task failed: {e}", job.id());
        }
    }
}

fn spawn_execution(job: Arc<dyn BackgroundJob>, running: Arc<AtomicBool>) -> Option<JoinHandle<()>> {
    if running.swap(true, Ordering::SeqCst) {
        return None;
    }
    let handle = tokio::spawn(async move {
        metrics::set_background_job_running(job.id(), true);
        let start_time = Instant::now();
        let result = job.execute().await;
        let elapsed = start_time.elapsed();

        let status = match result {
            Ok(()) => {
                info!("Job {} completed successfully in {:?}", job.id(), elapsed);
                "success"
            }
            Err(e) => {
                error!("Job {} failed after {:?}: {}", job.id(), elapsed, e);
                "failed"
            }
        };
        metrics::record_background_job_execution(job.id(), status, elapsed);
        metrics::set_background_job_running(job.id(), false);
        running.store(false, Ordering::SeqCst);
    });
    Some(handle)
}

#[cfg(test)]
mod tests {
    use super::super::job::JobError;
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::AtomicUsize;

    struct TestJob {
        interval: Duration,
        run_time: Duration,
        run_at_startup: bool,
        execution_count: Arc<AtomicUsize>,
        completed_count: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl BackgroundJob for TestJob {
        fn id(&self) -> &'static str {
            "test_job"
        }

        fn name(&self) -> &'static str {
            "Test Job"
        }

        fn description(&self) -> &'static str {
            "A test job for unit tests"
        }

        fn interval(&self) -> Duration {
            self.interval
        }

        fn run_at_startup(&self) -> bool {
            self.run_at_startup
        }

        async fn execute(&self) -> Result<(), JobError> {
            self.execution_count.fetch_add(1, Ordering::SeqCst);
            if !self.run_time.is_zero() {
                tokio::time::sleep(self.run_time).await;
            }
            self.completed_count.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[tokio::test]
    async fn startup_job_runs_before_first_interval() {
        let token = CancellationToken::new();
        let mut scheduler = JobScheduler::new(token.clone(), Duration::ZERO);
        let execution_count = Arc::new(AtomicUsize::new(0));
        scheduler.register_job(Arc::new(TestJob {
            interval: Duration::from_secs(3600),
            run_time: Duration::ZERO,
            run_at_startup: true,
            execution_count: execution_count.clone(),
            completed_count: Arc::new(AtomicUsize::new(0)),
        }));

        let handle = tokio::spawn(scheduler.run());
        tokio::time::sleep(Duration::from_millis(100)).await;

        assert_eq!(execution_count.load(Ordering::SeqCst), 1);

        token.cancel();
        let _ = tokio::time::timeout(Duration::from_secs(2), handle).await;
    }

    #[tokio::test]
    async fn ticks_fire_on_the_interval() {
        let token = CancellationToken::new();
        let mut scheduler = JobScheduler::new(token.clone(), Duration::ZERO);
        let execution_count = Arc::new(AtomicUsize::new(0));
        scheduler.register_job(Arc::new(TestJob {
            interval: Duration::from_millis(50),
            run_time: Duration::ZERO,
            run_at_startup: false,
            execution_count: execution_count.clone(),
            completed_count: Arc::new(AtomicUsize::new(0)),
        }));

        let handle = tokio::spawn(scheduler.run());
        tokio::time::sleep(Duration::from_millis(230)).await;
        token.cancel();
        let _ = tokio::time::timeout(Duration::from_secs(2), handle).await;

        let count = execution_count.load(Ordering::SeqCst);
        assert!((3..=5).contains(&count), "unexpected execution count {count}");
    }

    #[tokio::test]
    async fn overlapping_ticks_are_skipped() {
        let token = CancellationToken::new();
        let mut scheduler = JobScheduler::new(token.clone(), Duration::ZERO);
        let execution_count = Arc::new(AtomicUsize::new(0));
        // A run outlives several ticks; only non-overlapping runs count.
        scheduler.register_job(Arc::new(TestJob {
            interval: Duration::from_millis(30),
            run_time: Duration::from_millis(200),
            run_at_startup: true,
            execution_count: execution_count.clone(),
            completed_count: Arc::new(AtomicUsize::new(0)),
        }));

        let handle = tokio::spawn(scheduler.run());
        tokio::time::sleep(Duration::from_millis(150)).await;
        token.cancel();
        let _ = tokio::time::timeout(Duration::from_secs(2), handle).await;

        assert_eq!(execution_count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn shutdown_waits_for_the_in_flight_run() {
        let token = CancellationToken::new();
        let mut scheduler = JobScheduler::new(token.clone(), Duration::ZERO);
        let execution_count = Arc::new(AtomicUsize::new(0));
        let completed_count = Arc::new(AtomicUsize::new(0));
        scheduler.register_job(Arc::new(TestJob {
            interval: Duration::from_secs(3600),
            run_time: Duration::from_millis(150),
            run_at_startup: true,
            execution_count: execution_count.clone(),
            completed_count: completed_count.clone(),
        }));

        let handle = tokio::spawn(scheduler.run());
        tokio::time::sleep(Duration::from_millis(30)).await;
        // Cancel mid-run; the scheduler must not return until the run
        // has finished on its own.
        token.cancel();
        tokio::time::timeout(Duration::from_secs(2), handle)
            .await
            .unwrap()
            .unwrap();

        assert_eq!(execution_count.load(Ordering::SeqCst), 1);
        assert_eq!(completed_count.load(Ordering::SeqCst), 1);
    }
}
