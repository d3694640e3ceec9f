//! Fixed-interval scheduler
//!
//! Invokes one [`CycleJob::run_cycle`] per interval. The inter-run sleep is
//! the only suspension point that reacts to shutdown, so an interrupt stops
//! the process before a new run or mid-sleep but never mid-write.

use anyhow::Result;
use async_trait::async_trait;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// One pipeline pass, driven by the [`Scheduler`]
#[async_trait]
pub trait CycleJob: Send + Sync {
    /// Name used in log lines
    fn name(&self) -> &'static str;

    /// Run one pass. An `Err` is a top-level fault and stops the scheduler.
    async fn run_cycle(&self) -> Result<()>;
}

/// Sending half of a [`ShutdownSignal`]
#[derive(Debug)]
pub struct ShutdownTrigger {
    tx: watch::Sender<bool>,
}

impl ShutdownTrigger {
    pub fn trigger(&self) {
        // send_replace never fails, even with no receivers left
        self.tx.send_replace(true);
    }
}

/// Cloneable shutdown flag backed by a `watch` channel
#[derive(Debug, Clone)]
pub struct ShutdownSignal {
    rx: watch::Receiver<bool>,
}

impl ShutdownSignal {
    pub fn channel() -> (ShutdownTrigger, ShutdownSignal) {
        let (tx, rx) = watch::channel(false);
        (ShutdownTrigger { tx }, ShutdownSignal { rx })
    }

    /// Signal fired by Ctrl-C, or SIGTERM on unix
    pub fn from_os_signals() -> ShutdownSignal {
        let (trigger, signal) = Self::channel();
        tokio::spawn(async move {
            wait_for_os_signal().await;
            trigger.trigger();
        });
        signal
    }

    pub fn is_triggered(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves once shutdown has been requested
    pub async fn wait(&mut self) {
        while !*self.rx.borrow_and_update() {
            if self.rx.changed().await.is_err() {
                // Trigger dropped without firing: shutdown can never come
                std::future::pending::<()>().await;
            }
        }
    }
}

async fn wait_for_os_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl-C"),
        _ = terminate => info!("Received SIGTERM"),
    }
}

/// Runs a job immediately, then once per interval, until shutdown
#[derive(Debug, Clone)]
pub struct Scheduler {
    interval: Duration,
    countdown_step: Option<Duration>,
}

impl Scheduler {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            countdown_step: None,
        }
    }

    /// Log a "next run in mm:ss" line every `step` while sleeping
    pub fn with_countdown(mut self, step: Duration) -> Self {
        if !step.is_zero() {
            self.countdown_step = Some(step);
        }
        self
    }

    /// Drive `job` until shutdown (Ok) or a top-level fault (Err).
    /// Returns the number of completed runs.
    pub async fn run<J>(&self, job: &J, mut shutdown: ShutdownSignal) -> Result<u64>
    where
        J: CycleJob + ?Sized,
    {
        let mut completed: u64 = 0;

        loop {
            if shutdown.is_triggered() {
                info!(job = job.name(), runs = completed, "Shutdown requested, not starting a new run");
                return Ok(completed);
            }

            let started = Instant::now();
            info!(job = job.name(), run = completed + 1, "Starting run");
            job.run_cycle().await?;
            completed += 1;
            debug!(
                job = job.name(),
                elapsed_ms = started.elapsed().as_millis() as u64,
                "Run finished"
            );

            if self.sleep(&mut shutdown).await {
                info!(job = job.name(), runs = completed, "Shutdown requested during sleep");
                return Ok(completed);
            }
        }
    }

    /// Sleep for one interval. Returns true when interrupted.
    async fn sleep(&self, shutdown: &mut ShutdownSignal) -> bool {
        let deadline = Instant::now() + self.interval;

        loop {
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            let remaining = deadline - now;

            let nap = match self.countdown_step {
                Some(step) => {
                    info!("Next run in {}", format_countdown(remaining));
                    remaining.min(step)
                }
                None => remaining,
            };

            tokio::select! {
                _ = tokio::time::sleep(nap) => {}
                _ = shutdown.wait() => return true,
            }
        }
    }
}

/// mm:ss, rounding partial seconds up
pub fn format_countdown(remaining: Duration) -> String {
    let mut secs = remaining.as_secs();
    if remaining.subsec_nanos() > 0 {
        secs += 1;
    }
    format!("{:02}:{:02}", secs / 60, secs % 60)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::sync::Arc;
    use tokio_test::{assert_pending, assert_ready};

    struct CountingJob {
        runs: AtomicU64,
        fail_on: Option<u64>,
    }

    impl CountingJob {
        fn new(fail_on: Option<u64>) -> Self {
            Self {
                runs: AtomicU64::new(0),
                fail_on,
            }
        }
    }

    #[async_trait]
    impl CycleJob for CountingJob {
        fn name(&self) -> &'static str {
            "counting"
        }

        async fn run_cycle(&self) -> Result<()> {
            let run = self.runs.fetch_add(1, Ordering::SeqCst) + 1;
            if self.fail_on == Some(run) {
                anyhow::bail!("orchestration fault on run {}", run);
            }
            Ok(())
        }
    }

    #[test]
    fn countdown_format() {
        assert_eq!(format_countdown(Duration::from_secs(300)), "05:00");
        assert_eq!(format_countdown(Duration::from_millis(59_001)), "01:00");
        assert_eq!(format_countdown(Duration::from_secs(7)), "00:07");
    }

    #[test]
    fn wait_resolves_after_trigger() {
        let (trigger, mut signal) = ShutdownSignal::channel();
        assert!(!signal.is_triggered());
        {
            let mut wait = tokio_test::task::spawn(signal.wait());
            assert_pending!(wait.poll());
            trigger.trigger();
            assert!(wait.is_woken());
            assert_ready!(wait.poll());
        }
        assert!(signal.is_triggered());
    }

    #[tokio::test]
    async fn triggered_before_start_runs_nothing() {
        let (trigger, signal) = ShutdownSignal::channel();
        trigger.trigger();
        let job = CountingJob::new(None);
        let runs = Scheduler::new(Duration::from_secs(300))
            .run(&job, signal)
            .await
            .unwrap();
        assert_eq!(runs, 0);
        assert_eq!(job.runs.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn runs_once_per_interval_until_shutdown() {
        let (trigger, signal) = ShutdownSignal::channel();
        let job = Arc::new(CountingJob::new(None));
        let scheduler = Scheduler::new(Duration::from_secs(300)).with_countdown(Duration::from_secs(60));

        let handle = {
            let job = job.clone();
            tokio::spawn(async move { scheduler.run(job.as_ref(), signal).await })
        };

        // First run is immediate, the next two follow the interval
        tokio::time::sleep(Duration::from_secs(610)).await;
        assert_eq!(job.runs.load(Ordering::SeqCst), 3);

        trigger.trigger();
        let runs = handle.await.unwrap().unwrap();
        assert_eq!(runs, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn top_level_fault_stops_the_loop() {
        let (_trigger, signal) = ShutdownSignal::channel();
        let job = CountingJob::new(Some(2));
        let err = Scheduler::new(Duration::from_secs(5))
            .run(&job, signal)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("run 2"));
        assert_eq!(job.runs.load(Ordering::SeqCst), 2);
    }
}
