use std::sync::{Mutex, MutexGuard, Weak};
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};
use crate::error::Result;
use crate::market_data::aggregator::MarketDataAggregator;
use crate::utils::task_supervisor::TaskSupervisor;

pub const REFRESH_TASK: &str = "market_data_refresh";

const MIN_PERIOD: Duration = Duration::from_millis(1);

/// Owns the periodic refresh task. The task holds only a weak reference to
/// the aggregator and exits once the aggregator is dropped.
#[derive(Default)]
pub struct RefreshScheduler {
    supervisor: Mutex<TaskSupervisor>,
}

impl RefreshScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    fn supervisor(&self) -> MutexGuard<'_, TaskSupervisor> {
        match self.supervisor.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Starts refreshing every `period`, beginning immediately. Returns false
    /// if the task is already running.
    pub fn start(&self, aggregator: Weak<MarketDataAggregator>, period: Duration) -> bool {
        let mut supervisor = self.supervisor();
        if supervisor.is_running(REFRESH_TASK) {
            return false;
        }
        supervisor.spawn(REFRESH_TASK, run_refresh_loop(aggregator, period));
        info!(period_secs = period.as_secs_f64(), "Market data refresh scheduled");
        true
    }

    /// Replaces a running task with one on the new period. Does nothing when
    /// stopped.
    pub fn restart(&self, aggregator: Weak<MarketDataAggregator>, period: Duration) -> bool {
        let mut supervisor = self.supervisor();
        if !supervisor.is_running(REFRESH_TASK) {
            return false;
        }
        supervisor.spawn(REFRESH_TASK, run_refresh_loop(aggregator, period));
        info!(period_secs = period.as_secs_f64(), "Market data refresh rescheduled");
        true
    }

    pub fn stop(&self) -> bool {
        self.supervisor().stop(REFRESH_TASK)
    }

    pub fn is_running(&self) -> bool {
        self.supervisor().is_running(REFRESH_TASK)
    }

    /// Fails if the refresh task ended without being stopped. The dead task
    /// is deregistered, so a later `start` spawns a new one.
    pub fn check_health(&self) -> Result<()> {
        self.supervisor().check_health()
    }

    pub fn shutdown(&self) {
        self.supervisor().shutdown_all();
    }
}

async fn run_refresh_loop(aggregator: Weak<MarketDataAggregator>, period: Duration) {
    let mut ticker = tokio::time::interval(period.max(MIN_PERIOD));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;
        let Some(aggregator) = aggregator.upgrade() else {
            debug!("Aggregator dropped, ending refresh loop");
            break;
        };
        if let Err(e) = aggregator.force_refresh().await {
            warn!(error = %e, "Scheduled market data refresh failed");
        }
    }
}
