//! Cooperative periodic background task.
//!
//! Both the health monitor and the alert manager run one of these. A task
//! ticks at a fixed interval, runs one cycle per tick and exits when asked
//! to stop. A cycle that is already running is allowed to finish; if it
//! overruns the grace period given to [`PeriodicTask::stop`], both the loop
//! and the running cycle are aborted.

use std::future::Future;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, warn};

/// Shortest interval a periodic task will run at.
pub const MIN_INTERVAL: Duration = Duration::from_secs(1);

/// Handle to a running periodic task.
#[derive(Debug)]
pub struct PeriodicTask {
    name: String,
    shutdown: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

impl PeriodicTask {
    /// Spawns a task that calls `cycle` immediately and then every
    /// `interval` (never more often than [`MIN_INTERVAL`]).
    ///
    /// Each cycle runs on its own task so a panicking cycle is logged and
    /// the loop carries on.
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime.
    pub fn spawn<F, Fut>(name: impl Into<String>, interval: Duration, mut cycle: F) -> Self
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let name = name.into();
        let (shutdown, mut stop_rx) = watch::channel(false);
        let period = interval.max(MIN_INTERVAL);
        let task_name = name.clone();

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = ticker.tick() => {}
                    changed = stop_rx.changed() => {
                        if changed.is_err() || *stop_rx.borrow() {
                            break;
                        }
                        continue;
                    }
                }

                if *stop_rx.borrow() {
                    break;
                }

                let mut running = CycleGuard(tokio::spawn(cycle()));
                if let Err(e) = (&mut running.0).await {
                    error!(task = %task_name, error = %e, "periodic cycle aborted");
                }
            }

            debug!(task = %task_name, "periodic task exited");
        });

        Self {
            name,
            shutdown,
            handle,
        }
    }

    /// Returns true once the loop has exited.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Signals the loop to stop and waits up to `grace` for it to exit.
    pub async fn stop(self, grace: Duration) {
        let Self {
            name,
            shutdown,
            mut handle,
        } = self;

        // The receiver is gone if the loop already exited.
        let _ = shutdown.send(true);

        if tokio::time::timeout(grace, &mut handle).await.is_err() {
            warn!(task = %name, grace_ms = grace.as_millis(), "periodic task did not stop in time, aborting");
            handle.abort();
            // Dropping the loop drops its CycleGuard, which aborts the cycle.
            let _ = handle.await;
        }
    }
}

/// Aborts the spawned cycle when the loop driving it is dropped.
struct CycleGuard(JoinHandle<()>);

impl Drop for CycleGuard {
    fn drop(&mut self) {
        self.0.abort();
    }
}
