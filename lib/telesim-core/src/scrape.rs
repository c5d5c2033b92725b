//! Periodic refresh of instance metrics.

use std::{ops::ControlFlow, time::Duration};

use async_trait::async_trait;
use tracing::{debug, trace};

use crate::instance::Instance;

/// A sleep primitive for the scrape loop.
///
/// Returning `ControlFlow::Break` stops the loop after the current tick.
#[async_trait]
pub trait Sleeper: Send {
    /// Waits for `interval` to elapse.
    async fn sleep(&mut self, interval: Duration) -> ControlFlow<()>;
}

/// Sleeps on the Tokio clock, and never stops the loop.
#[derive(Clone, Copy, Debug, Default)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&mut self, interval: Duration) -> ControlFlow<()> {
        tokio::time::sleep(interval).await;
        ControlFlow::Continue(())
    }
}

/// Periodically refreshes the metrics of an instance.
///
/// Ticks are strictly sequential: the instance is ticked, the loop sleeps for the interval, and then repeats. The first
/// tick happens immediately.
pub struct ScrapeLoop {
    instance: Instance,
    interval: Duration,
}

impl ScrapeLoop {
    /// Creates a new `ScrapeLoop`.
    pub fn new(instance: Instance, interval: Duration) -> Self {
        Self { instance, interval }
    }

    /// Runs the loop on the Tokio clock.
    ///
    /// This never returns.
    pub async fn run(self) {
        self.run_with(TokioSleeper).await;
    }

    /// Runs the loop with the given sleeper, until the sleeper breaks.
    ///
    /// Returns the number of ticks performed.
    pub async fn run_with<S>(mut self, mut sleeper: S) -> u64
    where
        S: Sleeper,
    {
        debug!(
            instance_id = self.instance.identity().id(),
            interval_secs = self.interval.as_secs_f64(),
            "Starting scrape loop."
        );

        let mut ticks = 0;
        loop {
            self.instance.tick();
            ticks += 1;
            trace!(ticks, "Refreshed instance metrics.");

            if sleeper.sleep(self.interval).await.is_break() {
                break;
            }
        }

        debug!(ticks, "Scrape loop stopped.");
        ticks
    }
}
