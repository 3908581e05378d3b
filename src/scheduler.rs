use crate::prelude::*;

use std::time::Duration;

pub struct Scheduler {
    interval: Duration,
}

impl Scheduler {
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }

    /// Polls on every tick until a shutdown signal arrives. A cycle that is
    /// already running is allowed to finish first.
    pub async fn run(
        &self,
        poller: &FleetPoller,
        mut shutdown_rx: broadcast::Receiver<()>,
    ) -> Result<u64> {
        let mut interval = tokio::time::interval(self.interval);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        let mut cycles = 0;

        loop {
            tokio::select! {
                _ = shutdown_rx.recv() => {
                    info!("Scheduler received shutdown signal");
                    break;
                }
                _ = interval.tick() => {
                    poller.poll().await.print_summary();
                    cycles += 1;
                }
            }
        }

        Ok(cycles)
    }
}
