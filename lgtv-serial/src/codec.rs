//! Command name to wire code, and response frame to [`Reply`].

use std::collections::BTreeMap;

use crate::codes::{parse_hex, Code, CodeTable};
use crate::transport::Link;
use crate::Error;

/// Length of a response frame, e.g. `a 00 OK01x`.
pub const FRAME_LEN: usize = 10;
const SUCCESS: &[u8; 2] = b"OK";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// A command without a status payload succeeded.
    Ack,
    /// Data byte of a status or level query.
    Value(u8),
    /// An input status translated to the input's name.
    Input(&'static str),
}

/// How a command name is turned into a code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape<'a> {
    Toggle,
    /// `<base>up` / `<base>down`, adjusting `<base>level` by `delta`.
    Relative { base: &'a str, delta: i64 },
    Direct,
}

impl<'a> Shape<'a> {
    pub fn of(name: &'a str) -> Self {
        if name.starts_with("toggle") {
            Shape::Toggle
        } else if let Some(base) = name.strip_suffix("up") {
            Shape::Relative { base, delta: 1 }
        } else if let Some(base) = name.strip_suffix("down") {
            Shape::Relative { base, delta: -1 }
        } else {
            Shape::Direct
        }
    }
}

/// Whether the response to `name` carries a data byte worth reporting.
pub fn is_status(name: &str) -> bool {
    name.ends_with("status") || name.ends_with("level")
}

/// Commands that alternate between two states of the set.
#[derive(Debug, Clone)]
pub struct Toggles(BTreeMap<String, (String, String)>);

impl Default for Toggles {
    fn default() -> Self {
        let mut toggles = Toggles(BTreeMap::new());
        toggles.add("power", "poweron", "poweroff");
        toggles.add("mute", "mute", "unmute");
        toggles
    }
}

impl Toggles {
    /// Registers `toggle<name>`.
    pub fn add(&mut self, name: &str, state0: &str, state1: &str) {
        self.0.insert(
            format!("toggle{}", name),
            (state0.to_owned(), state1.to_owned()),
        );
    }

    pub fn get(&self, command: &str) -> Option<(&str, &str)> {
        self.0
            .get(command)
            .map(|(state0, state1)| (state0.as_str(), state1.as_str()))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, (&str, &str))> {
        self.0
            .iter()
            .map(|(name, (s0, s1))| (name.as_str(), (s0.as_str(), s1.as_str())))
    }
}

fn lookup(table: &CodeTable, name: &str) -> Result<Code, Error> {
    table
        .get(name)
        .ok_or_else(|| Error::UnknownCommand(name.to_owned()))
}

pub fn to_byte(value: i64) -> Result<u8, Error> {
    u8::try_from(value).map_err(|_| Error::OutOfRange(value))
}

/// Builds the code for `name`. Toggles and relative commands read the
/// current state through `link` first.
pub fn encode<L: Link + ?Sized>(
    table: &CodeTable,
    toggles: &Toggles,
    name: &str,
    data: Option<i64>,
    link: &mut L,
) -> Result<Code, Error> {
    match Shape::of(name) {
        Shape::Toggle => {
            let (state0, state1) = toggles
                .get(name)
                .ok_or_else(|| Error::UnknownCommand(name.to_owned()))?;
            let state0 = lookup(table, state0)?;
            let state1 = lookup(table, state1)?;

            let status = state0.status();
            let current = read_data(link, status)?;
            let next = if current == state0.data() {
                state1
            } else {
                state0
            };
            Ok(status.with_data(next.data()))
        }
        Shape::Relative { base, delta } => {
            let level = format!("{}level", base);
            let status = table
                .get(&level)
                .ok_or_else(|| Error::UnknownCommand(name.to_owned()))?
                .status();

            let current = read_data(link, status)?;
            let value = to_byte(i64::from(current) + delta)?;
            Ok(status.with_data(value))
        }
        Shape::Direct => {
            let code = lookup(table, name)?;
            match data {
                Some(data) => Ok(code.with_data(to_byte(data)?)),
                None => Ok(code),
            }
        }
    }
}

/// Data byte of a successful frame.
fn frame_data(frame: &[u8]) -> Option<u8> {
    if !is_success(frame) {
        return None;
    }
    let data = std::str::from_utf8(&frame[FRAME_LEN - 3..FRAME_LEN - 1]).ok()?;
    parse_hex(data)
}

pub fn is_success(frame: &[u8]) -> bool {
    frame.len() == FRAME_LEN && &frame[FRAME_LEN - 5..FRAME_LEN - 3] == SUCCESS
}

/// `None` when the set rejected the command or the frame is malformed.
pub fn decode(frame: &[u8], status: bool) -> Option<Reply> {
    if status {
        frame_data(frame).map(Reply::Value)
    } else if is_success(frame) {
        Some(Reply::Ack)
    } else {
        None
    }
}

/// Sends a status query and returns its data byte.
pub fn read_data<L: Link + ?Sized>(link: &mut L, code: Code) -> Result<u8, Error> {
    let frame = link.exchange(code)?;
    frame_data(&frame).ok_or(Error::NoResponse)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulator::Simulator;
    use crate::transport::Port;

    fn table() -> CodeTable {
        CodeTable::for_model("M42LK450").unwrap()
    }

    #[test]
    fn shapes() {
        assert_eq!(Shape::of("togglepower"), Shape::Toggle);
        assert_eq!(
            Shape::of("volumeup"),
            Shape::Relative {
                base: "volume",
                delta: 1
            }
        );
        assert_eq!(
            Shape::of("volumedown"),
            Shape::Relative {
                base: "volume",
                delta: -1
            }
        );
        assert_eq!(Shape::of("volumelevel"), Shape::Direct);
        assert_eq!(Shape::of("inputhdmi1"), Shape::Direct);

        assert!(is_status("powerstatus"));
        assert!(is_status("volumelevel"));
        assert!(!is_status("volumeup"));
        assert!(!is_status("poweron"));
    }

    #[test]
    fn direct_data_is_lowercase_hex() {
        let table = table();
        let toggles = Toggles::default();
        let mut link = Simulator::new().open().unwrap();
        for data in [0, 9, 10, 0x1e, 0xab, 255] {
            let code = encode(&table, &toggles, "volumelevel", Some(data), &mut link).unwrap();
            assert_eq!(code.to_string(), format!("kf 00 {:02x}", data));
        }
    }

    #[test]
    fn direct_data_out_of_range() {
        let table = table();
        let toggles = Toggles::default();
        let mut link = Simulator::new().open().unwrap();
        for data in [-1, 256, 1000, i64::MIN] {
            let err = encode(&table, &toggles, "volumelevel", Some(data), &mut link).unwrap_err();
            assert!(matches!(err, Error::OutOfRange(v) if v == data));
        }
    }

    #[test]
    fn direct_without_data_keeps_table_byte() {
        let table = table();
        let mut link = Simulator::new().open().unwrap();
        let toggles = Toggles::default();
        assert_eq!(
            encode(&table, &toggles, "powerstatus", None, &mut link)
                .unwrap()
                .to_string(),
            "ka 00 ff"
        );
        assert_eq!(
            encode(&table, &toggles, "inputhdmi2", None, &mut link)
                .unwrap()
                .to_string(),
            "xb 00 91"
        );
    }

    #[test]
    fn unknown_commands() {
        let table = table();
        let mut link = Simulator::new().open().unwrap();
        let toggles = Toggles::default();
        for name in ["inputhdmi9", "toggleinput", "brightnessup", ""] {
            let err = encode(&table, &toggles, name, None, &mut link).unwrap_err();
            assert!(matches!(err, Error::UnknownCommand(_)), "{}: {:?}", name, err);
        }
    }

    #[test]
    fn relative_reads_level() {
        let table = table();
        let sim = Simulator::new().with_register(*b"kf", 30);
        let mut link = sim.clone().open().unwrap();
        let toggles = Toggles::default();

        let code = encode(&table, &toggles, "volumeup", None, &mut link).unwrap();
        assert_eq!(code.to_string(), "kf 00 1f");
        let code = encode(&table, &toggles, "volumedown", None, &mut link).unwrap();
        assert_eq!(code.to_string(), "kf 00 1d");
        // encoding only reads
        assert_eq!(sim.register(*b"kf"), 30);
    }

    #[test]
    fn relative_bounds() {
        let table = table();
        let toggles = Toggles::default();

        let mut link = Simulator::new().with_register(*b"kf", 255).open().unwrap();
        let err = encode(&table, &toggles, "volumeup", None, &mut link).unwrap_err();
        assert!(matches!(err, Error::OutOfRange(256)));

        let mut link = Simulator::new().with_register(*b"kf", 0).open().unwrap();
        let err = encode(&table, &toggles, "volumedown", None, &mut link).unwrap_err();
        assert!(matches!(err, Error::OutOfRange(-1)));
    }

    #[test]
    fn toggle_picks_the_other_state() {
        let table = table();
        let toggles = Toggles::default();

        let mut link = Simulator::new().with_register(*b"ka", 1).open().unwrap();
        let code = encode(&table, &toggles, "togglepower", None, &mut link).unwrap();
        assert_eq!(code.to_string(), "ka 00 00");

        let mut link = Simulator::new().with_register(*b"ka", 0).open().unwrap();
        let code = encode(&table, &toggles, "togglepower", None, &mut link).unwrap();
        assert_eq!(code.to_string(), "ka 00 01");

        // neither state observed: first state
        let mut link = Simulator::new().with_register(*b"ka", 7).open().unwrap();
        let code = encode(&table, &toggles, "togglepower", None, &mut link).unwrap();
        assert_eq!(code.to_string(), "ka 00 01");
    }

    #[test]
    fn failed_status_read_propagates() {
        let table = table();
        let toggles = Toggles::default();
        let sim = Simulator::new();
        sim.set_offline(true);
        let mut link = sim.open().unwrap();

        let err = encode(&table, &toggles, "togglemute", None, &mut link).unwrap_err();
        assert!(err.is_transport());
        let err = encode(&table, &toggles, "volumeup", None, &mut link).unwrap_err();
        assert!(err.is_transport());
    }

    #[test]
    fn decode_frames() {
        assert_eq!(decode(b"a 01 OK01x", true), Some(Reply::Value(1)));
        assert_eq!(decode(b"f 01 OK00x", true), Some(Reply::Value(0)));
        assert_eq!(decode(b"f 01 OKffx", true), Some(Reply::Value(255)));
        assert_eq!(decode(b"a 01 OK01x", false), Some(Reply::Ack));

        assert_eq!(decode(b"a 01 NG01x", true), None);
        assert_eq!(decode(b"a 01 NG01x", false), None);
        assert_eq!(decode(b"a 01 OKzzx", true), None);
        assert_eq!(decode(b"a 01 OKzzx", false), Some(Reply::Ack));
        assert_eq!(decode(b"", true), None);
        assert_eq!(decode(b"OK01x", true), None);
        assert_eq!(decode(b"aa 01 OK01x", true), None);
    }
}
