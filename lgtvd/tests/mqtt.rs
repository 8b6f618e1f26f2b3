use std::io::Write;
use std::net::{Shutdown, TcpListener, TcpStream};
use std::sync::mpsc;
use std::time::Duration;

use lgtv_serial::{Controller, Simulator};
use lgtvd::{Bridge, BridgeConfig, BridgeState, Bus, BusEvent, Error, MqttBus, MqttConfig};

const CONNACK: [u8; 4] = [0x20, 0x02, 0x00, 0x00];

/// A loopback broker that accepts every connection, acknowledges it and
/// throws away whatever the client sends. Accepted connections are handed
/// to the test for pushing packets or hanging up.
struct Broker {
    port: u16,
    connections: mpsc::Receiver<TcpStream>,
}

impl Broker {
    fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        let (tx, connections) = mpsc::channel();
        std::thread::spawn(move || {
            for stream in listener.incoming() {
                let mut stream = stream.unwrap();
                let mut incoming = stream.try_clone().unwrap();
                std::thread::spawn(move || std::io::copy(&mut incoming, &mut std::io::sink()));
                if tx.send(stream.try_clone().unwrap()).is_err() {
                    return;
                }
                stream.write_all(&CONNACK).unwrap();
            }
        });
        Self { port, connections }
    }

    /// The connection a bus has just reported as connected.
    fn accepted(&self) -> TcpStream {
        self.connections
            .recv_timeout(Duration::from_secs(1))
            .unwrap()
    }

    fn config(&self) -> MqttConfig {
        let mut config = MqttConfig::new("127.0.0.1", self.port);
        config.poll_timeout = Duration::from_millis(100);
        config.reconnect_delay = Duration::from_millis(50);
        config
    }
}

/// A QoS 0 PUBLISH packet.
fn publish(topic: &str, payload: &str) -> Vec<u8> {
    let len = 2 + topic.len() + payload.len();
    assert!(len < 128);
    let mut packet = vec![0x30, len as u8, 0, topic.len() as u8];
    packet.extend_from_slice(topic.as_bytes());
    packet.extend_from_slice(payload.as_bytes());
    packet
}

/// Polls until something other than `Idle` turns up.
async fn next_event(bus: &mut MqttBus) -> BusEvent {
    let wait = async {
        loop {
            match bus.poll().await {
                BusEvent::Idle => continue,
                event => return event,
            }
        }
    };
    tokio::time::timeout(Duration::from_secs(5), wait)
        .await
        .unwrap()
}

#[tokio::test]
async fn publish_needs_a_connection() {
    let broker = Broker::start();
    let mut bus = MqttBus::new(&broker.config());
    assert!(matches!(
        bus.publish("lgtv/power", "ON").await.unwrap_err(),
        Error::Disconnected
    ));
}

#[tokio::test]
async fn connect_receive_and_reconnect() {
    let broker = Broker::start();
    let mut bus = MqttBus::new(&broker.config());

    assert_eq!(next_event(&mut bus).await, BusEvent::Connected);
    let mut stream = broker.accepted();
    bus.subscribe("lgtv/command").await.unwrap();
    bus.publish("lgtv/power", "ON").await.unwrap();

    stream
        .write_all(&publish("lgtv/command", "togglemute"))
        .unwrap();
    assert_eq!(
        next_event(&mut bus).await,
        BusEvent::Message {
            topic: "lgtv/command".to_owned(),
            payload: b"togglemute".to_vec(),
        }
    );

    stream.shutdown(Shutdown::Both).unwrap();
    assert!(matches!(
        next_event(&mut bus).await,
        BusEvent::Disconnected(_)
    ));
    assert!(matches!(
        bus.publish("lgtv/power", "ON").await.unwrap_err(),
        Error::Disconnected
    ));

    assert_eq!(next_event(&mut bus).await, BusEvent::Connected);
    broker.accepted();
    bus.publish("lgtv/power", "ON").await.unwrap();
}

#[tokio::test]
async fn poll_is_bounded_while_connected() {
    let broker = Broker::start();
    let mut bus = MqttBus::new(&broker.config());
    assert_eq!(next_event(&mut bus).await, BusEvent::Connected);
    let _stream = broker.accepted();

    let event = tokio::time::timeout(Duration::from_secs(1), bus.poll())
        .await
        .unwrap();
    assert_eq!(event, BusEvent::Idle);
}

#[tokio::test]
async fn burst_of_set_messages_is_worked_off() {
    let broker = Broker::start();
    let sim = Simulator::new();
    let tv = Controller::for_model("M42LK450", sim.clone()).unwrap();
    let mut bridge = Bridge::new(MqttBus::new(&broker.config()), tv, BridgeConfig::default());

    let connect = async {
        while bridge.state() != BridgeState::Connected {
            bridge.step().await;
        }
    };
    tokio::time::timeout(Duration::from_secs(5), connect)
        .await
        .unwrap();

    // far more republishes than the client's request queue holds
    let burst: Vec<u8> = (0..40)
        .flat_map(|_| publish("lgtv/volume/set", "UP"))
        .collect();
    broker.accepted().write_all(&burst).unwrap();

    let work_off = async {
        while sim.register(*b"kf") < 50 {
            bridge.step().await;
        }
    };
    tokio::time::timeout(Duration::from_secs(10), work_off)
        .await
        .unwrap();
    assert_eq!(sim.register(*b"kf"), 50);
    assert_eq!(bridge.state(), BridgeState::Connected);
}
