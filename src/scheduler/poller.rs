use std::sync::Arc;
use std::time::Duration;

use prometheus::IntCounter;
use thiserror::Error;
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::probes::Probe;
use crate::utils::log_throttle::LogThrottle;

#[derive(Debug, Error, PartialEq, Eq)]
#[error("poll interval must be greater than zero")]
pub struct ZeroIntervalError;

/// Spawns poll units that drive `update_values` at a fixed cadence.
#[derive(Debug, Clone)]
pub struct PollScheduler {
    interval: Duration,
    error_log_interval: Duration,
}

impl PollScheduler {
    /// Fails for a zero `interval`, which `tokio::time::interval` cannot tick at.
    pub fn new(
        interval: Duration,
        error_log_interval: Duration,
    ) -> Result<Self, ZeroIntervalError> {
        if interval.is_zero() {
            return Err(ZeroIntervalError);
        }
        Ok(PollScheduler {
            interval,
            error_log_interval,
        })
    }

    /// Starts the poll unit for an initialised, registered probe.
    ///
    /// The first update runs immediately, then once per tick for the life of
    /// the runtime. Failures only increment `errors`.
    pub fn spawn(&self, probe: Arc<dyn Probe>, errors: IntCounter) -> JoinHandle<()> {
        let interval = self.interval;
        let mut throttle = LogThrottle::new(self.error_log_interval);

        tokio::spawn(async move {
            info!(
                "Starting poll unit for '{}' every {:?}",
                probe.get_name(),
                interval
            );
            let mut ticker = time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                poll_once(&probe, &errors, &mut throttle).await;
            }
        })
    }
}

/// Runs one update cycle on the blocking pool.
///
/// Returns `false` if the update failed or panicked, in which case `errors`
/// has been incremented and the probe's previous values are left in place.
pub async fn poll_once(
    probe: &Arc<dyn Probe>,
    errors: &IntCounter,
    throttle: &mut LogThrottle,
) -> bool {
    let unit = probe.clone();
    let failure = match tokio::task::spawn_blocking(move || unit.update_values()).await {
        Ok(Ok(())) => {
            debug!("Updated probe '{}'", probe.get_name());
            return true;
        }
        Ok(Err(e)) => e.to_string(),
        Err(e) => format!("update of '{}' panicked: {}", probe.get_name(), e),
    };

    errors.inc();
    if let Some(suppressed) = throttle.should_emit() {
        warn!(
            probe = probe.get_name(),
            errors = errors.get(),
            suppressed,
            "Probe update failed: {}",
            failure
        );
    }
    false
}
