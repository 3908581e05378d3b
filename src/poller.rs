use crate::prelude::*;

use bytes::Bytes;
use std::sync::Arc;

/// Tally of one poll cycle. Returned once every target has settled.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PollSummary {
    pub targets: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub unparsed: usize,
    pub faulted: usize,
    pub published: usize,
    pub publish_errors: usize,
}

impl PollSummary {
    pub fn all_succeeded(&self) -> bool {
        self.succeeded == self.targets
    }

    pub fn print_summary(&self) {
        info!(
            "Poll cycle complete: {}/{} devices read, {} fields published",
            self.succeeded, self.targets, self.published
        );
        if !self.all_succeeded() {
            info!("  Query failures: {}", self.failed);
            info!("  Unparseable responses: {}", self.unparsed);
            info!("  Internal faults: {}", self.faulted);
        }
        if self.publish_errors > 0 {
            info!("  Publish errors: {}", self.publish_errors);
        }
    }
}

pub struct FleetPoller {
    targets: Vec<DeviceTarget>,
    payload: Bytes,
    options: QueryOptions,
    publisher: Arc<dyn Publisher>,
}

impl FleetPoller {
    pub fn new(
        targets: Vec<DeviceTarget>,
        payload: &[u8],
        options: QueryOptions,
        publisher: Arc<dyn Publisher>,
    ) -> Self {
        Self {
            targets,
            payload: Bytes::copy_from_slice(payload),
            options,
            publisher,
        }
    }

    pub fn from_config(config: &Config, publisher: Arc<dyn Publisher>) -> Self {
        Self::new(
            config.targets(),
            config.query.command().as_bytes(),
            config.query.options(),
            publisher,
        )
    }

    pub fn targets(&self) -> &[DeviceTarget] {
        &self.targets
    }

    /// Queries every target at once and publishes what comes back.
    ///
    /// No target can stop the others: failures are logged and counted, and
    /// results are handled in the order targets were configured.
    pub async fn poll(&self) -> PollSummary {
        let handles: Vec<_> = self
            .targets
            .iter()
            .cloned()
            .map(|target| {
                let payload = self.payload.clone();
                let options = self.options.clone();
                tokio::spawn(async move { device::query(&target, &payload, &options).await })
            })
            .collect();

        let results = futures::future::join_all(handles).await;

        let mut summary = PollSummary {
            targets: self.targets.len(),
            ..Default::default()
        };

        for (target, result) in self.targets.iter().zip(results) {
            match result {
                Err(e) => {
                    error!("device {}: poll task failed: {}", target, e);
                    summary.faulted += 1;
                }
                Ok(Err(e)) => {
                    warn!("device {}: {}", target, e);
                    summary.failed += 1;
                }
                Ok(Ok(response)) => match reading::decode(&response) {
                    Err(e) => {
                        warn!("device {}: skipping, {}", target, e);
                        summary.unparsed += 1;
                    }
                    Ok(reading) => {
                        summary.succeeded += 1;
                        self.publish_reading(target, &reading, &mut summary).await;
                    }
                },
            }
        }

        summary
    }

    async fn publish_reading(
        &self,
        target: &DeviceTarget,
        reading: &DeviceReading,
        summary: &mut PollSummary,
    ) {
        let values = fields::extract_all(reading);
        debug!(
            "device {}: {} of {} fields present",
            target,
            values.len(),
            fields::FIELDS.len()
        );

        for (name, value) in values {
            let message = Message::for_field(target, name, value);
            match self.publisher.publish(message).await {
                Ok(()) => summary.published += 1,
                Err(e) => {
                    warn!("device {}: {}", target, e);
                    summary.publish_errors += 1;
                }
            }
        }
    }
}
