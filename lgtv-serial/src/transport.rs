use std::io::{Read, Write};
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::codec::FRAME_LEN;
use crate::codes::Code;
use crate::Error;

pub const BAUD_RATE: u32 = 9600;
pub const READ_TIMEOUT: Duration = Duration::from_secs(1);
pub const OPEN_RETRY_DELAY: Duration = Duration::from_millis(70);
/// About five seconds of retrying before giving up on the port.
pub const OPEN_ATTEMPTS: usize = 70;

/// An open connection to the set. Closed on drop.
pub trait Link {
    /// Writes `code` and returns whatever arrived of the response frame
    /// before the read timeout.
    fn exchange(&mut self, code: Code) -> Result<Vec<u8>, Error>;
}

pub trait Port {
    type Link: Link;

    fn open(&self) -> Result<Self::Link, Error>;

    /// Serial adapters sometimes refuse to open for a moment, e.g. right
    /// after another process closed them.
    fn open_ensured(&self) -> Result<Self::Link, Error> {
        let mut attempt = 1;
        loop {
            match self.open() {
                Ok(link) => return Ok(link),
                Err(e) if e.is_transport() && attempt < OPEN_ATTEMPTS => {
                    debug!(attempt, "can't open port: {}", e);
                    attempt += 1;
                    std::thread::sleep(OPEN_RETRY_DELAY);
                }
                Err(e) => return Err(e),
            }
        }
    }
}

/// A reader whose blocking reads give up after a settable timeout.
trait TimedRead: Read {
    fn set_timeout(&mut self, timeout: Duration) -> Result<(), Error>;
}

impl TimedRead for Box<dyn serialport::SerialPort> {
    fn set_timeout(&mut self, timeout: Duration) -> Result<(), Error> {
        serialport::SerialPort::set_timeout(self.as_mut(), timeout)?;
        Ok(())
    }
}

/// Reads up to one frame, giving the whole frame `timeout` to arrive.
fn read_frame<R: TimedRead>(reader: &mut R, timeout: Duration) -> Result<Vec<u8>, Error> {
    let deadline = Instant::now() + timeout;
    let mut frame = vec![0u8; FRAME_LEN];
    let mut len = 0;
    while len < FRAME_LEN {
        let left = deadline.saturating_duration_since(Instant::now());
        if left.is_zero() {
            warn!(received = len, "read timed out");
            break;
        }
        reader.set_timeout(left)?;
        match reader.read(&mut frame[len..]) {
            Ok(0) => break,
            Ok(n) => len += n,
            Err(e) if e.kind() == std::io::ErrorKind::TimedOut => {
                warn!(received = len, "read timed out");
                break;
            }
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e.into()),
        }
    }
    frame.truncate(len);
    Ok(frame)
}

/// A set attached to a serial device such as `/dev/ttyUSB0`.
#[derive(Debug, Clone)]
pub struct SerialDevice {
    path: String,
}

impl SerialDevice {
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into() }
    }
}

impl Port for SerialDevice {
    type Link = SerialLink;

    fn open(&self) -> Result<SerialLink, Error> {
        let port = serialport::new(&self.path, BAUD_RATE)
            .data_bits(serialport::DataBits::Eight)
            .parity(serialport::Parity::None)
            .stop_bits(serialport::StopBits::One)
            .flow_control(serialport::FlowControl::None)
            .timeout(READ_TIMEOUT)
            .open()?;
        Ok(SerialLink { port })
    }
}

pub struct SerialLink {
    port: Box<dyn serialport::SerialPort>,
}

impl Link for SerialLink {
    fn exchange(&mut self, code: Code) -> Result<Vec<u8>, Error> {
        debug!(%code, "send");
        self.port.write_all(format!("{}\r", code).as_bytes())?;
        let frame = read_frame(&mut self.port, READ_TIMEOUT)?;
        debug!(frame = %String::from_utf8_lossy(&frame), "receive");
        Ok(frame)
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use super::*;

    struct Flaky {
        failures: Cell<usize>,
        opened: Cell<usize>,
    }

    #[derive(Debug)]
    struct Dummy;

    impl Link for Dummy {
        fn exchange(&mut self, _code: Code) -> Result<Vec<u8>, Error> {
            Ok(Vec::new())
        }
    }

    impl Port for Flaky {
        type Link = Dummy;

        fn open(&self) -> Result<Dummy, Error> {
            self.opened.set(self.opened.get() + 1);
            if self.failures.get() > 0 {
                self.failures.set(self.failures.get() - 1);
                return Err(Error::Io(std::io::ErrorKind::PermissionDenied.into()));
            }
            Ok(Dummy)
        }
    }

    #[test]
    fn open_ensured_retries() {
        let port = Flaky {
            failures: Cell::new(3),
            opened: Cell::new(0),
        };
        assert!(port.open_ensured().is_ok());
        assert_eq!(port.opened.get(), 4);
    }

    #[test]
    fn open_ensured_gives_up() {
        let port = Flaky {
            failures: Cell::new(usize::MAX),
            opened: Cell::new(0),
        };
        assert!(port.open_ensured().unwrap_err().is_transport());
        assert_eq!(port.opened.get(), OPEN_ATTEMPTS);
    }

    /// Hands out one byte of a response every `gap`.
    struct Trickle {
        gap: Duration,
        timeout: Duration,
        sent: usize,
    }

    impl Read for Trickle {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            if self.timeout < self.gap {
                std::thread::sleep(self.timeout);
                return Err(std::io::ErrorKind::TimedOut.into());
            }
            std::thread::sleep(self.gap);
            buf[0] = b"a 01 OK01x"[self.sent % FRAME_LEN];
            self.sent += 1;
            Ok(1)
        }
    }

    impl TimedRead for Trickle {
        fn set_timeout(&mut self, timeout: Duration) -> Result<(), Error> {
            self.timeout = timeout;
            Ok(())
        }
    }

    #[test]
    fn read_frame_has_one_deadline() {
        let mut trickle = Trickle {
            gap: Duration::from_millis(40),
            timeout: Duration::ZERO,
            sent: 0,
        };
        let start = Instant::now();
        let frame = read_frame(&mut trickle, Duration::from_millis(200)).unwrap();

        assert!(start.elapsed() < Duration::from_millis(350));
        assert!(frame.len() < FRAME_LEN, "{:?}", frame);
        assert!(frame.len() >= 2, "{:?}", frame);
    }

    #[test]
    fn read_frame_stops_at_a_full_frame() {
        let mut trickle = Trickle {
            gap: Duration::ZERO,
            timeout: Duration::ZERO,
            sent: 0,
        };
        assert_eq!(
            read_frame(&mut trickle, Duration::from_millis(200)).unwrap(),
            b"a 01 OK01x"
        );
    }

    #[test]
    fn missing_device_is_a_transport_error() {
        let err = SerialDevice::new("/nonexistent/ttyUSB9").open().err().unwrap();
        assert!(err.is_transport());
    }
}
