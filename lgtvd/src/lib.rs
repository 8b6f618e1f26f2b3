pub mod bridge;
pub mod bus;
pub mod topics;

use std::time::Duration;

use lgtv_serial::{Controller, Port, Tv};

pub use bridge::{Bridge, BridgeConfig, BridgeState};
pub use bus::{Bus, BusEvent, MqttBus, MqttConfig};
pub use topics::Topics;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Tv(#[from] lgtv_serial::Error),
    #[error(transparent)]
    Client(#[from] rumqttc::ClientError),

    #[error("invalid payload {payload:?} on {topic}")]
    InvalidPayload { topic: String, payload: String },
    #[error("not connected to the broker")]
    Disconnected,
}

/// Which set to talk to, and how.
#[derive(Debug, Clone, clap::Args)]
pub struct DeviceArgs {
    /// Model id as printed on the set, e.g. 42LK450
    #[arg(value_name = "MODEL")]
    pub model: String,

    #[arg(short, long, value_name = "SERIAL_DEVICE", default_value = lgtv_serial::DEFAULT_SERIAL)]
    pub serial: String,

    /// Talk to a simulated set instead of the serial device
    #[arg(long)]
    pub simulate: bool,

    /// Don't let COMMAND be sent again, by any process, until it settled
    #[arg(long, value_name = "COMMAND")]
    pub debounce: Vec<String>,

    #[arg(long, value_name = "MILLISECONDS", default_value_t = 500)]
    pub settle_ms: u64,
}

impl DeviceArgs {
    pub fn controller<P: Port>(&self, port: P) -> Result<Controller<P>, lgtv_serial::Error> {
        let mut tv = Tv::new(&self.model, port)?;
        for command in &self.debounce {
            tv.debounce(command, Duration::from_millis(self.settle_ms));
        }
        Ok(Controller::new(tv))
    }
}
