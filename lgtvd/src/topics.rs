//! Topic names and payloads of the MQTT surface.

pub const DEFAULT_PREFIX: &str = "lgtv/";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Topics {
    pub power: String,
    pub power_set: String,
    pub input: String,
    pub input_set: String,
    pub volume: String,
    pub volume_set: String,
    pub command: String,
}

impl Topics {
    pub fn new(prefix: &str) -> Self {
        let power = format!("{}power", prefix);
        let input = format!("{}input", prefix);
        let volume = format!("{}volume", prefix);
        Self {
            power_set: format!("{}/set", power),
            input_set: format!("{}/set", input),
            volume_set: format!("{}/set", volume),
            command: format!("{}command", prefix),
            power,
            input,
            volume,
        }
    }

    /// Topics the bridge takes commands from.
    pub fn inbound(&self) -> [&str; 4] {
        [
            self.power_set.as_str(),
            self.input_set.as_str(),
            self.volume_set.as_str(),
            self.command.as_str(),
        ]
    }
}

impl Default for Topics {
    fn default() -> Self {
        Self::new(DEFAULT_PREFIX)
    }
}

pub fn power_payload(on: bool) -> &'static str {
    if on {
        "ON"
    } else {
        "OFF"
    }
}

pub fn parse_power(payload: &str) -> Option<bool> {
    match payload {
        "ON" => Some(true),
        "OFF" => Some(false),
        _ => None,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VolumeRequest {
    Up,
    Down,
    Level(i64),
}

pub fn parse_volume(payload: &str) -> Option<VolumeRequest> {
    match payload {
        "UP" => Some(VolumeRequest::Up),
        "DOWN" => Some(VolumeRequest::Down),
        level => level.trim().parse().ok().map(VolumeRequest::Level),
    }
}
