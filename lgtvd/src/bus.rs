//! The message bus the bridge sits on.

use std::time::Duration;

use rumqttc::{AsyncClient, Event, EventLoop, MqttOptions, Packet, QoS};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::Error;

/// Outcome of one round of bus I/O.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BusEvent {
    Connected,
    Disconnected(String),
    Message { topic: String, payload: Vec<u8> },
    /// Nothing the bridge has to act on.
    Idle,
}

#[allow(async_fn_in_trait)]
pub trait Bus {
    /// Drives the connection for one round, connecting first when there
    /// is no connection.
    async fn poll(&mut self) -> BusEvent;

    async fn subscribe(&mut self, topic: &str) -> Result<(), Error>;

    async fn publish(&mut self, topic: &str, payload: &str) -> Result<(), Error>;
}

#[derive(Debug, Clone)]
pub struct MqttConfig {
    pub host: String,
    pub port: u16,
    pub client_id: String,
    pub keep_alive: Duration,
    /// Upper bound for one poll while connected.
    pub poll_timeout: Duration,
    /// Pause between connection attempts.
    pub reconnect_delay: Duration,
}

impl MqttConfig {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            client_id: "lgtv-mqtt".to_owned(),
            keep_alive: Duration::from_secs(60),
            poll_timeout: Duration::from_secs(1),
            reconnect_delay: crate::bridge::RECONNECT_DELAY,
        }
    }
}

/// An MQTT broker connection. Publishes go out with QoS 2.
///
/// The rumqttc event loop runs in a task of its own, so requests queued by
/// `subscribe` and `publish` keep draining while the bridge is busy with
/// the set. Its events reach `poll` through an unbounded channel.
pub struct MqttBus {
    client: AsyncClient,
    events: mpsc::UnboundedReceiver<BusEvent>,
    connected: bool,
    poll_timeout: Duration,
}

impl MqttBus {
    /// Starts connecting right away. Must be called within a tokio runtime.
    pub fn new(config: &MqttConfig) -> Self {
        let mut options = MqttOptions::new(&config.client_id, &config.host, config.port);
        options.set_keep_alive(config.keep_alive);

        let (client, eventloop) = AsyncClient::new(options, 10);
        let (tx, events) = mpsc::unbounded_channel();
        tokio::spawn(drive(eventloop, tx, config.reconnect_delay));

        Self {
            client,
            events,
            connected: false,
            poll_timeout: config.poll_timeout,
        }
    }
}

/// Polls the event loop until the bus is dropped, forwarding everything
/// the bridge acts on.
async fn drive(
    mut eventloop: EventLoop,
    tx: mpsc::UnboundedSender<BusEvent>,
    reconnect_delay: Duration,
) {
    loop {
        let event = match eventloop.poll().await {
            Ok(Event::Incoming(Packet::ConnAck(ack))) => {
                debug!(?ack, "connack");
                BusEvent::Connected
            }
            Ok(Event::Incoming(Packet::Publish(publish))) => BusEvent::Message {
                topic: publish.topic,
                payload: publish.payload.to_vec(),
            },
            Ok(Event::Incoming(Packet::Disconnect)) => {
                BusEvent::Disconnected("broker closed the session".to_owned())
            }
            Ok(_) => continue,
            Err(e) => {
                let closed = tx.send(BusEvent::Disconnected(e.to_string())).is_err();
                if closed {
                    break;
                }
                // a connection attempt is bounded by rumqttc's own connect timeout
                tokio::time::sleep(reconnect_delay).await;
                continue;
            }
        };
        if tx.send(event).is_err() {
            break;
        }
    }
    debug!("bus dropped, event loop stopped");
}

impl Bus for MqttBus {
    async fn poll(&mut self) -> BusEvent {
        let event = if self.connected {
            match tokio::time::timeout(self.poll_timeout, self.events.recv()).await {
                Ok(event) => event,
                Err(_) => return BusEvent::Idle,
            }
        } else {
            self.events.recv().await
        };

        let event = event.unwrap_or_else(|| {
            warn!("mqtt event loop is gone");
            BusEvent::Disconnected("event loop stopped".to_owned())
        });
        match event {
            BusEvent::Connected => self.connected = true,
            BusEvent::Disconnected(_) => self.connected = false,
            _ => {}
        }
        event
    }

    async fn subscribe(&mut self, topic: &str) -> Result<(), Error> {
        self.client.subscribe(topic, QoS::ExactlyOnce).await?;
        Ok(())
    }

    async fn publish(&mut self, topic: &str, payload: &str) -> Result<(), Error> {
        if !self.connected {
            return Err(Error::Disconnected);
        }
        self.client
            .publish(topic, QoS::ExactlyOnce, false, payload.as_bytes().to_vec())
            .await?;
        Ok(())
    }
}
