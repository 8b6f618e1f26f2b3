use tracing::warn;

use crate::codec::Reply;
use crate::transport::Port;
use crate::tv::Tv;
use crate::Error;

/// Power, input and volume of one set.
///
/// Input and volume reads that get no answer report the last value read
/// successfully instead.
#[derive(Debug)]
pub struct Controller<P> {
    tv: Tv<P>,
    last_known_input: Option<String>,
    last_known_volume: Option<u8>,
}

impl<P: Port> Controller<P> {
    pub fn new(tv: Tv<P>) -> Self {
        Self {
            tv,
            last_known_input: None,
            last_known_volume: None,
        }
    }

    pub fn for_model(model: &str, port: P) -> Result<Self, Error> {
        Ok(Self::new(Tv::new(model, port)?))
    }

    pub fn tv(&self) -> &Tv<P> {
        &self.tv
    }

    pub fn command(&mut self, name: &str, data: Option<i64>) -> Result<Reply, Error> {
        self.tv.send(name, data)
    }

    /// A set that doesn't answer counts as off.
    pub fn power(&mut self) -> Result<bool, Error> {
        match self.command("powerstatus", None) {
            Ok(Reply::Value(value)) => Ok(value != 0),
            Ok(_) => Ok(true),
            Err(e) if e.is_transport() => {
                warn!("power status: {}", e);
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }

    pub fn set_power(&mut self, on: bool) -> Result<(), Error> {
        self.command(if on { "poweron" } else { "poweroff" }, None)?;
        Ok(())
    }

    pub fn input(&mut self) -> Result<Option<String>, Error> {
        match self.command("inputstatus", None) {
            Ok(Reply::Input(name)) => {
                self.last_known_input = Some(name.to_owned());
            }
            Ok(Reply::Value(value)) => {
                self.last_known_input = Some(value.to_string());
            }
            Ok(Reply::Ack) => {}
            Err(e) if e.is_transport() => warn!("input status: {}", e),
            Err(e) => return Err(e),
        }
        Ok(self.last_known_input.clone())
    }

    /// `name` as listed by the model's table without the `input` prefix,
    /// e.g. `hdmi1`.
    pub fn set_input(&mut self, name: &str) -> Result<(), Error> {
        self.command(&format!("input{}", name), None)?;
        Ok(())
    }

    pub fn volume(&mut self) -> Result<Option<u8>, Error> {
        match self.command("volumelevel", None) {
            Ok(Reply::Value(value)) => self.last_known_volume = Some(value),
            Ok(_) => {}
            Err(e) if e.is_transport() => warn!("volume level: {}", e),
            Err(e) => return Err(e),
        }
        Ok(self.last_known_volume)
    }

    pub fn set_volume(&mut self, level: i64) -> Result<(), Error> {
        self.command("volumelevel", Some(level))?;
        Ok(())
    }

    pub fn volume_up(&mut self) -> Result<(), Error> {
        self.command("volumeup", None)?;
        Ok(())
    }

    pub fn volume_down(&mut self) -> Result<(), Error> {
        self.command("volumedown", None)?;
        Ok(())
    }
}
