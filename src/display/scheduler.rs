//! Display refresh scheduling

use crate::config::Config;
use async_trait::async_trait;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::{Interval, MissedTickBehavior};

/// Source of display refresh ticks.
#[async_trait]
pub trait RefreshScheduler: Send + Sync {
    /// Resolve at the next display refresh.
    async fn next_refresh(&self);
}

/// Fixed-rate refresh driven by a tokio interval.
pub struct IntervalScheduler {
    period: Duration,
    // created on first use so construction does not need a runtime
    interval: Mutex<Option<Interval>>,
}

impl IntervalScheduler {
    pub fn new(period: Duration) -> Self {
        Self {
            period,
            interval: Mutex::new(None),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.refresh_period())
    }

    pub fn period(&self) -> Duration {
        self.period
    }
}

#[async_trait]
impl RefreshScheduler for IntervalScheduler {
    async fn next_refresh(&self) {
        let mut interval = self.interval.lock().await;
        let interval = interval.get_or_insert_with(|| {
            let mut interval = tokio::time::interval_at(
                tokio::time::Instant::now() + self.period,
                self.period,
            );
            // a late frame is dropped, never rendered twice in a row
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            interval
        });
        interval.tick().await;
    }
}
