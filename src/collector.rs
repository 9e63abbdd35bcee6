//! Bounded fan-out/fan-in over a list of cities.
//!
//! Every city becomes one job in a queue that is filled once and never
//! refilled. At most `pool_size` workers drain the queue, each running one
//! fetch at a time; successful results are funneled through a channel to a
//! single aggregator task which owns the batch. Failed fetches are logged and
//! dropped, they never fail the run.

use std::{
    collections::VecDeque,
    fmt::Display,
    future::Future,
    sync::{Arc, Mutex},
    time::Instant,
};

use thiserror::Error;
use tokio::{sync::mpsc, task::JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::weather::{City, MonitoringParams};

#[derive(Error, Debug)]
pub enum Error {
    #[error("worker pool size must be at least 1")]
    InvalidPoolSize,

    #[error("result aggregator failed: {0}")]
    Aggregator(#[source] tokio::task::JoinError),
}

/// Jobs are loaded once at construction; `next` hands each one out exactly once.
struct JobQueue(Mutex<VecDeque<City>>);

impl JobQueue {
    fn new(cities: Vec<City>) -> Self {
        Self(Mutex::new(VecDeque::from(cities)))
    }

    fn next(&self) -> Option<City> {
        // A poisoned queue means a worker panicked mid-handout; stop handing out work.
        self.0.lock().ok()?.pop_front()
    }
}

/// Runs `fetch` for every city with at most `pool_size` fetches in flight and
/// returns the results of the successful ones, in completion order.
///
/// Cancelling `cancel` stops workers from starting new fetches. Fetches
/// already running are awaited and their results kept, so a cancelled run
/// still returns `Ok` with a partial batch.
pub async fn collect<F, Fut, T, E>(
    cities: Vec<City>,
    params: Arc<MonitoringParams>,
    pool_size: usize,
    fetch: F,
    cancel: CancellationToken,
) -> Result<Vec<T>, Error>
where
    F: Fn(City, Arc<MonitoringParams>) -> Fut + Clone + Send + 'static,
    Fut: Future<Output = Result<T, E>> + Send + 'static,
    T: Send + 'static,
    E: Display + Send + 'static,
{
    if cities.is_empty() {
        return Ok(Vec::new());
    }

    if pool_size == 0 {
        return Err(Error::InvalidPoolSize);
    }

    let start = Instant::now();
    let total = cities.len();
    let worker_count = pool_size.min(total);
    let jobs = Arc::new(JobQueue::new(cities));
    let (results_tx, mut results_rx) = mpsc::channel::<T>(total);

    let aggregator = tokio::spawn(async move {
        let mut batch = Vec::with_capacity(total);
        while let Some(result) = results_rx.recv().await {
            batch.push(result);
        }
        batch
    });

    let mut workers = JoinSet::new();

    for worker in 0..worker_count {
        let jobs = jobs.clone();
        let results = results_tx.clone();
        let fetch = fetch.clone();
        let params = params.clone();
        let cancel = cancel.clone();

        workers.spawn(async move {
            let mut failed = 0usize;

            loop {
                if cancel.is_cancelled() {
                    debug!(worker, "cancellation observed, worker stopping");
                    break;
                }

                let Some(city) = jobs.next() else {
                    break;
                };
                let name = city.name.clone();

                // Spawned so that a panicking fetch only loses its own city.
                match tokio::spawn(fetch(city, params.clone())).await {
                    Ok(Ok(result)) => {
                        if results.send(result).await.is_err() {
                            break;
                        }
                    }
                    Ok(Err(e)) => {
                        failed += 1;
                        error!(city = %name, error = %e, "unable to get current weather for city");
                    }
                    Err(e) => {
                        failed += 1;
                        error!(city = %name, error = %e, "fetch for city terminated abnormally");
                    }
                }
            }

            failed
        });
    }

    // Workers hold the remaining senders; the channel closes once the last one exits.
    drop(results_tx);

    let mut failed = 0;
    while let Some(joined) = workers.join_next().await {
        match joined {
            Ok(count) => failed += count,
            Err(e) => error!(error = %e, "collection worker terminated abnormally"),
        }
    }

    let batch = aggregator.await.map_err(Error::Aggregator)?;

    info!(
        cities = total,
        workers = worker_count,
        collected = batch.len(),
        failed,
        cancelled = cancel.is_cancelled(),
        elapsed = ?start.elapsed(),
        "collection run finished"
    );

    Ok(batch)
}
