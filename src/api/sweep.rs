//! Periodic removal of expired triplets.

use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio::time::{interval, Duration, MissedTickBehavior};
use tracing::{debug, error, info};

use super::ApiState;

/// Run `clean_expired_tokens` every `every` until the runtime shuts down.
///
/// Failures are logged and retried on the next tick.
pub fn spawn(state: Arc<ApiState>, every: Duration) -> JoinHandle<()> {
    info!("Sweeping expired triplets every {} seconds", every.as_secs());

    tokio::spawn(async move {
        let mut sweep_interval = interval(every);
        sweep_interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            sweep_interval.tick().await;

            match state.authenticator().clean_expired_tokens().await {
                Ok(removed) => debug!("Removed {} expired triplets", removed),
                Err(e) => error!("Error sweeping expired triplets: {:#}", e),
            }
        }
    })
}
