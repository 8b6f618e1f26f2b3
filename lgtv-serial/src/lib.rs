//! RS-232 control of LG televisions.
//!
//! [`Controller`] is the entry point: it resolves the model's code table,
//! talks to the set through a [`Port`] and caches the last known input and
//! volume.

pub mod codec;
pub mod codes;
pub mod controller;
pub mod debounce;
pub mod simulator;
pub mod transport;
pub mod tv;

pub use codec::{Reply, Toggles};
pub use codes::{Code, CodeTable, ModelFamily};
pub use controller::Controller;
pub use debounce::{DebounceGate, DebounceGuard};
pub use simulator::Simulator;
pub use transport::{Link, Port, SerialDevice};
pub use tv::Tv;

pub const DEFAULT_SERIAL: &str = "/dev/ttyUSB0";

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("unsupported model: {0}")]
    UnsupportedModel(String),
    #[error("malformed code {code:?} for {name}")]
    MalformedCode { name: &'static str, code: &'static str },

    #[error("unknown command: {0}")]
    UnknownCommand(String),
    #[error("{0} does not fit in a byte")]
    OutOfRange(i64),

    #[error("no response from tv")]
    NoResponse,
    #[error(transparent)]
    Serial(#[from] serialport::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("{0} is locked by another process")]
    LockContention(String),
}

impl Error {
    /// Whether the error means the set did not answer, as opposed to the
    /// request itself being wrong.
    pub fn is_transport(&self) -> bool {
        matches!(self, Error::NoResponse | Error::Serial(_) | Error::Io(_))
    }

    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Error::UnsupportedModel(_) | Error::MalformedCode { .. }
        )
    }
}
