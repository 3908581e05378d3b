use crate::prelude::*;

use async_trait::async_trait;
use rumqttc::{AsyncClient, Event, EventLoop, MqttOptions, Outgoing, QoS};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

const RECONNECT_DELAY_SECS: u64 = 5;
const FLUSH_TIMEOUT_SECS: u64 = 5;
pub const REQUEST_QUEUE_SIZE: usize = 100;

// Message {{{
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct Message {
    pub topic: String,
    pub retain: bool,
    pub payload: String,
}

impl Message {
    // eg 192.168.4.1 + BTemp1 => 192-168-4-1/BTemp1
    pub fn for_field(target: &DeviceTarget, field: &str, payload: String) -> Message {
        Message {
            topic: format!("{}/{}", target.topic_prefix(), field),
            retain: false,
            payload,
        }
    }
} // }}}

/// Anything that can take a topic/payload pair and push it onwards.
#[async_trait]
pub trait Publisher: Send + Sync {
    async fn publish(&self, message: Message) -> Result<()>;
}

#[derive(Clone)]
pub struct Mqtt {
    config: config::Mqtt,
    client: AsyncClient,
    messages_sent: Arc<AtomicU64>,
    errors: Arc<AtomicU64>,
}

impl Mqtt {
    /// Creates the client and spawns the task that drives its event loop.
    pub fn new(config: config::Mqtt) -> (Self, tokio::task::JoinHandle<()>) {
        let mut options = MqttOptions::new(config.client_id(), config.host(), config.port());
        options.set_keep_alive(Duration::from_secs(60));
        if let (Some(u), Some(p)) = (config.username(), config.password()) {
            options.set_credentials(u, p);
        }

        info!("initializing mqtt at {}:{}", config.host(), config.port());

        let (client, eventloop) = AsyncClient::new(options, REQUEST_QUEUE_SIZE);
        let handle = tokio::spawn(Self::receiver(eventloop));

        let mqtt = Self {
            config,
            client,
            messages_sent: Arc::new(AtomicU64::new(0)),
            errors: Arc::new(AtomicU64::new(0)),
        };

        (mqtt, handle)
    }

    /// Queues DISCONNECT behind any pending publishes, then waits (bounded)
    /// for the event loop to drain. Never blocks on an unreachable broker.
    pub async fn stop(&self, handle: tokio::task::JoinHandle<()>) -> Result<()> {
        info!("Stopping MQTT client...");

        let abort = handle.abort_handle();
        if let Err(e) = self.client.try_disconnect() {
            warn!("MQTT disconnect could not be queued ({}), abandoning", e);
            abort.abort();
            self.log_totals();
            return Ok(());
        }

        match tokio::time::timeout(Duration::from_secs(FLUSH_TIMEOUT_SECS), handle).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!("MQTT event loop ended abnormally: {}", e),
            Err(_) => {
                warn!(
                    "MQTT event loop did not finish within {}s, abandoning",
                    FLUSH_TIMEOUT_SECS
                );
                abort.abort();
            }
        }

        self.log_totals();
        Ok(())
    }

    fn log_totals(&self) {
        info!(
            "MQTT: {} messages sent, {} errors",
            self.messages_sent(),
            self.errors()
        );
    }

    pub fn messages_sent(&self) -> u64 {
        self.messages_sent.load(Ordering::Relaxed)
    }

    pub fn errors(&self) -> u64 {
        self.errors.load(Ordering::Relaxed)
    }

    async fn receiver(mut eventloop: EventLoop) {
        loop {
            match eventloop.poll().await {
                Ok(Event::Outgoing(Outgoing::Disconnect)) => {
                    debug!("MQTT disconnect sent");
                    break;
                }
                Ok(Event::Incoming(incoming)) => trace!("MQTT RX: {:?}", incoming),
                Ok(_) => {} // outgoing publishes, pings etc
                Err(e) => {
                    error!("{}", e);
                    info!("reconnecting in {}s", RECONNECT_DELAY_SECS);
                    tokio::time::sleep(Duration::from_secs(RECONNECT_DELAY_SECS)).await;
                }
            }
        }

        info!("MQTT receiver loop exiting");
    }

    fn topic(&self, topic: &str) -> String {
        match self.config.namespace() {
            Some(namespace) => format!("{}/{}", namespace, topic),
            None => topic.to_string(),
        }
    }
}

#[async_trait]
impl Publisher for Mqtt {
    async fn publish(&self, message: Message) -> Result<()> {
        let topic = self.topic(&message.topic);
        let retain = message.retain || self.config.retain();
        debug!("publishing: {} = {}", topic, message.payload);

        // never waits: a full request queue (broker down) is an error
        match self
            .client
            .try_publish(&topic, QoS::AtLeastOnce, retain, message.payload.into_bytes())
        {
            Ok(()) => {
                self.messages_sent.fetch_add(1, Ordering::Relaxed);
                Ok(())
            }
            Err(err) => {
                self.errors.fetch_add(1, Ordering::Relaxed);
                Err(anyhow!("MQTT publish to {} failed: {}", topic, err))
            }
        }
    }
}
