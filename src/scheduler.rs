//! Periodic batch evaluation
//!
//! Every tick runs a full batch of enabled sensors on a blocking thread.
//! Sensor caching times decide which sensors actually execute per tick.

use anyhow::{Context, Result};
use log::{error, info, trace};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{Instant, MissedTickBehavior};
use vigil_core::{BatchResults, RunRequest, SensorRunner};

pub struct Scheduler {
    runner: Arc<SensorRunner>,
    interval: Duration,
}

impl Scheduler {
    pub fn new(runner: Arc<SensorRunner>, interval: Duration) -> Self {
        Self { runner, interval }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Run one batch of all enabled sensors off the async runtime
    pub async fn run_batch(&self, request: RunRequest) -> Result<BatchResults> {
        let runner = Arc::clone(&self.runner);
        let batch = tokio::task::spawn_blocking(move || runner.run_sensors(&[], request))
            .await
            .context("Sensor batch task failed")??;
        Ok(batch)
    }

    /// Start the evaluation loop
    ///
    /// Runs until `shutdown` completes, handing every batch to `on_batch`.
    /// A batch that overruns the interval delays the next tick instead of
    /// queueing extra ones.
    pub async fn run<F>(&self, mut on_batch: F, shutdown: impl Future<Output = ()>)
    where
        F: FnMut(BatchResults),
    {
        let mut interval = tokio::time::interval(self.interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tokio::pin!(shutdown);

        info!("Evaluating sensors every {:?}", self.interval);
        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("Scheduler stopping");
                    break;
                }
                _ = interval.tick() => {
                    let start = Instant::now();
                    match self.run_batch(RunRequest::default()).await {
                        Ok(batch) => on_batch(batch),
                        Err(e) => error!("Error running sensors: {:#}", e),
                    }
                    trace!("Sensor batch took {:?}", start.elapsed());
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use vigil_core::{
        MemoryCacheStore, MemoryHistoryLog, Sensor, SensorCatalog, SensorDefinition, SensorResult,
        SystemClock,
    };

    struct Counting(Arc<AtomicUsize>);

    impl Sensor for Counting {
        fn run_sensor(
            &self,
            _definition: &SensorDefinition,
            result: &mut SensorResult,
        ) -> anyhow::Result<()> {
            let calls = self.0.fetch_add(1, Ordering::SeqCst) + 1;
            result.set_value(calls as i64);
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_cached_sensors_run_once_across_ticks() {
        let fresh = Arc::new(AtomicUsize::new(0));
        let cached = Arc::new(AtomicUsize::new(0));
        let catalog = SensorCatalog::new()
            .with_sensor(SensorDefinition::new("fresh", "counting"), Counting(fresh.clone()))
            .with_sensor(
                SensorDefinition::new("cached", "counting").with_caching_time(3600),
                Counting(cached.clone()),
            );
        let clock = Arc::new(SystemClock);
        let runner = SensorRunner::new(
            Arc::new(catalog),
            Arc::new(MemoryCacheStore::new(clock.clone())),
            Arc::new(MemoryHistoryLog::new()),
            clock,
        );
        let scheduler = Scheduler::new(Arc::new(runner), Duration::from_millis(10));

        let (done_tx, done_rx) = tokio::sync::oneshot::channel::<()>();
        let mut done_tx = Some(done_tx);
        let mut batches = Vec::new();
        scheduler
            .run(
                |batch| {
                    batches.push(batch);
                    if batches.len() == 3 {
                        if let Some(tx) = done_tx.take() {
                            let _ = tx.send(());
                        }
                    }
                },
                async {
                    let _ = done_rx.await;
                },
            )
            .await;

        assert!(batches.len() >= 3);
        assert!(fresh.load(Ordering::SeqCst) >= 3);
        assert_eq!(cached.load(Ordering::SeqCst), 1);
        assert!(batches[1].get("cached").unwrap().is_cached());
    }
}
