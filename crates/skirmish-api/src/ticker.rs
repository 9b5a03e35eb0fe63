//! Background initiative polling.

use std::sync::Arc;
use std::time::Duration;

use skirmish_initiative::TickOutcome;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::state::Engine;

/// Runs one tick under the engine lock and logs each poller's outcome.
pub async fn run_tick(engine: &Mutex<Engine>) -> Vec<(Uuid, TickOutcome)> {
    let outcomes = engine.lock().await.tick();
    for (session_id, outcome) in &outcomes {
        match outcome {
            TickOutcome::Waiting { missing } => {
                debug!(session_id = %session_id, missing = missing.len(), "initiative pending");
            }
            TickOutcome::Settled => info!(session_id = %session_id, "initiative poller settled"),
            TickOutcome::TimedOut { missing } => {
                warn!(session_id = %session_id, missing = missing.len(), "initiative poller timed out");
            }
            TickOutcome::Cancelled => debug!(session_id = %session_id, "initiative poller cancelled"),
        }
    }
    outcomes
}

/// Spawns the polling loop. The period follows the controller's settings
/// and is picked up again after every tick, so edits apply without a
/// restart.
pub fn spawn_ticker(engine: Arc<Mutex<Engine>>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut period = current_period(&engine).await;
        let mut interval = new_interval(period);
        loop {
            interval.tick().await;
            run_tick(&engine).await;

            let next = current_period(&engine).await;
            if next != period {
                info!(period_ms = next.as_millis(), "poll interval changed");
                period = next;
                interval = new_interval(period);
            }
        }
    })
}

async fn current_period(engine: &Mutex<Engine>) -> Duration {
    engine.lock().await.controller.settings().poll_interval()
}

fn new_interval(period: Duration) -> tokio::time::Interval {
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    interval
}
