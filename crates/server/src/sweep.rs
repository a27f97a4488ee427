//! The auto-resume sweep: the only scheduled behavior in the system. Each
//! tick resumes a bounded batch of paused conversations whose deadline has
//! elapsed.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::{error, info};

use concierge_core::config::SweepConfig;
use concierge_core::EscalationEngine;

pub fn spawn(escalation: Arc<EscalationEngine>, config: SweepConfig) {
    let interval = Duration::from_secs(config.interval_secs.max(1));
    let batch_size = config.batch_size;

    info!(
        event_name = "system.sweep.start",
        interval_secs = config.interval_secs,
        batch_size,
        "auto-resume sweep scheduled"
    );

    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            ticker.tick().await;
            match escalation.sweep_expired(Utc::now(), batch_size).await {
                Ok(0) => {}
                Ok(resumed) => {
                    info!(event_name = "sweep.tick", resumed, "auto-resumed conversations");
                }
                Err(err) => {
                    // A failed tick is retried on the next interval.
                    error!(event_name = "sweep.tick_failed", error = %err, "sweep tick failed");
                }
            }
        }
    });
}
