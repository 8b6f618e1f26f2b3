use std::time::Duration;

use lgtv_serial::{Controller, Port};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::bus::{Bus, BusEvent};
use crate::topics::{self, Topics, VolumeRequest};
use crate::Error;

pub const RECONNECT_DELAY: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BridgeState {
    Disconnected,
    Connecting,
    Connected,
}

#[derive(Debug, Clone)]
pub struct BridgeConfig {
    pub topics: Topics,
    /// How often power, input and volume are republished.
    pub interval: Duration,
    pub reconnect_delay: Duration,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            topics: Topics::default(),
            interval: Duration::from_secs(15),
            reconnect_delay: RECONNECT_DELAY,
        }
    }
}

/// Mirrors one set onto the bus: status topics are republished
/// periodically and right after every change requested on a `/set` topic.
pub struct Bridge<B, P> {
    bus: B,
    tv: Controller<P>,
    config: BridgeConfig,
    state: BridgeState,
    last_update: Option<Instant>,
}

impl<B: Bus, P: Port> Bridge<B, P> {
    pub fn new(bus: B, tv: Controller<P>, config: BridgeConfig) -> Self {
        Self {
            bus,
            tv,
            config,
            state: BridgeState::Disconnected,
            last_update: None,
        }
    }

    pub fn state(&self) -> BridgeState {
        self.state
    }

    pub fn bus(&self) -> &B {
        &self.bus
    }

    pub fn bus_mut(&mut self) -> &mut B {
        &mut self.bus
    }

    pub fn tv(&self) -> &Controller<P> {
        &self.tv
    }

    pub async fn run(&mut self) {
        loop {
            self.step().await;
        }
    }

    /// One round of the main loop: bus I/O, then the periodic update while
    /// connected or the reconnect delay while not.
    pub async fn step(&mut self) {
        if self.state == BridgeState::Disconnected {
            info!("connecting to broker");
            self.state = BridgeState::Connecting;
        }

        let event = self.bus.poll().await;
        self.handle_event(event).await;

        match self.state {
            BridgeState::Connected => self.update().await,
            BridgeState::Disconnected => tokio::time::sleep(self.config.reconnect_delay).await,
            BridgeState::Connecting => {}
        }
    }

    async fn handle_event(&mut self, event: BusEvent) {
        match event {
            BusEvent::Connected => {
                info!("connected to broker");
                for topic in self.config.topics.inbound() {
                    if let Err(e) = self.bus.subscribe(topic).await {
                        warn!(topic, "can't subscribe: {}", e);
                    }
                }
                self.state = BridgeState::Connected;
                // fresh snapshot after every (re)connect
                self.last_update = None;
            }
            BusEvent::Disconnected(reason) => {
                if self.state != BridgeState::Disconnected {
                    warn!("disconnected from broker: {}", reason);
                }
                self.state = BridgeState::Disconnected;
            }
            BusEvent::Message { topic, payload } => {
                if self.state != BridgeState::Connected {
                    debug!(%topic, "dropping message received while not connected");
                    return;
                }
                if let Err(e) = self.handle_message(&topic, &payload).await {
                    warn!(%topic, "message failed: {}", e);
                }
            }
            BusEvent::Idle => {}
        }
    }

    async fn handle_message(&mut self, topic: &str, payload: &[u8]) -> Result<(), Error> {
        let invalid = || Error::InvalidPayload {
            topic: topic.to_owned(),
            payload: String::from_utf8_lossy(payload).into_owned(),
        };
        let payload = std::str::from_utf8(payload).map_err(|_| invalid())?;
        info!(topic, payload, "received");

        let names = &self.config.topics;
        if topic == names.power_set {
            let on = topics::parse_power(payload).ok_or_else(invalid)?;
            tolerate(self.tv.set_power(on))?;
            if on {
                // Power status lags behind for a long time after power on,
                // so report it as on and hold off the periodic update.
                self.last_update = Some(Instant::now());
                self.publish_power_to(true).await
            } else {
                self.publish_power().await
            }
        } else if topic == names.input_set {
            tolerate(self.tv.set_input(payload))?;
            self.publish_input().await
        } else if topic == names.volume_set {
            let result = match topics::parse_volume(payload).ok_or_else(invalid)? {
                VolumeRequest::Up => self.tv.volume_up(),
                VolumeRequest::Down => self.tv.volume_down(),
                VolumeRequest::Level(level) => self.tv.set_volume(level),
            };
            tolerate(result)?;
            self.publish_volume().await
        } else if topic == names.command {
            let reply = tolerate(self.tv.command(payload, None))?;
            debug!(command = payload, ?reply, "passthrough");
            Ok(())
        } else {
            debug!(topic, "ignoring message");
            Ok(())
        }
    }

    /// Republishes everything once per interval.
    async fn update(&mut self) {
        let now = Instant::now();
        if let Some(last) = self.last_update {
            if now.duration_since(last) < self.config.interval {
                return;
            }
        }

        info!("updating status");
        let results = [
            self.publish_power().await,
            self.publish_input().await,
            self.publish_volume().await,
        ];
        for e in results.into_iter().filter_map(Result::err) {
            warn!("status update failed: {}", e);
        }
        self.last_update = Some(now);
    }

    async fn publish(&mut self, topic: &str, payload: &str) -> Result<(), Error> {
        info!(topic, payload, "publish");
        self.bus.publish(topic, payload).await
    }

    async fn publish_power_to(&mut self, on: bool) -> Result<(), Error> {
        let topic = self.config.topics.power.clone();
        self.publish(&topic, topics::power_payload(on)).await
    }

    async fn publish_power(&mut self) -> Result<(), Error> {
        let on = self.tv.power()?;
        self.publish_power_to(on).await
    }

    async fn publish_input(&mut self) -> Result<(), Error> {
        match self.tv.input()? {
            Some(input) => {
                let topic = self.config.topics.input.clone();
                self.publish(&topic, &input).await
            }
            None => Ok(()),
        }
    }

    async fn publish_volume(&mut self) -> Result<(), Error> {
        match self.tv.volume()? {
            Some(volume) => {
                let topic = self.config.topics.volume.clone();
                self.publish(&topic, &volume.to_string()).await
            }
            None => Ok(()),
        }
    }
}

/// A set that didn't answer a write still gets its state republished;
/// anything else fails the message.
fn tolerate<T>(result: Result<T, lgtv_serial::Error>) -> Result<Option<T>, Error> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(e) if e.is_transport() => {
            warn!("no answer from tv: {}", e);
            Ok(None)
        }
        Err(e) => Err(e.into()),
    }
}
