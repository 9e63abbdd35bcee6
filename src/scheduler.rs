use std::{
    fmt::Display,
    future::Future,
    time::{Duration, Instant},
};

use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

/// A job repeated at a fixed interval until cancelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Schedule {
    pub name: &'static str,

    pub every: Duration,
}

impl Schedule {
    pub fn new(name: &'static str, every: Duration) -> Self {
        Self { name, every }
    }

    /// Runs `job` immediately, then once per interval.
    ///
    /// Ticks missed while a run is in progress are skipped so runs never
    /// overlap. A failed run is logged and the schedule carries on. Returns
    /// once `cancel` fires; a run in progress is finished first.
    pub async fn run<F, Fut, T, E>(&self, cancel: CancellationToken, mut job: F)
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display,
    {
        let mut interval = tokio::time::interval(self.every);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        info!(schedule = self.name, every = ?self.every, "schedule started");

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = interval.tick() => {}
            }

            let start = Instant::now();

            match job().await {
                Ok(_) => info!(schedule = self.name, elapsed = ?start.elapsed(), "run finished"),
                Err(e) => error!(schedule = self.name, error = %e, "run failed"),
            }
        }

        info!(schedule = self.name, "schedule stopped");
    }
}
