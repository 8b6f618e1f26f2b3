//! An in-memory set for running without a serial device, and for tests.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use tracing::debug;

use crate::codes::Code;
use crate::transport::{Link, Port};
use crate::Error;

const POWER: [u8; 2] = *b"ka";

#[derive(Debug, Default)]
struct State {
    registers: HashMap<[u8; 2], u8>,
    offline: bool,
    power_on_lag: usize,
    /// Power status queries still to be answered with "off".
    pending_power_on: usize,
    exchanges: Vec<Code>,
}

/// Stores one data byte per set id. A status query reads it back, any
/// other code overwrites it. Clones share the same set.
#[derive(Debug, Clone, Default)]
pub struct Simulator {
    state: Rc<RefCell<State>>,
}

impl Simulator {
    /// A set that is on, showing HDMI 1 at volume 10.
    pub fn new() -> Self {
        Self::default()
            .with_register(POWER, 0x01)
            .with_register(*b"xb", 0x90)
            .with_register(*b"kf", 10)
    }

    pub fn with_register(self, set: [u8; 2], data: u8) -> Self {
        self.state.borrow_mut().registers.insert(set, data);
        self
    }

    /// After a power on, keep reporting "off" for `queries` status queries.
    pub fn with_power_on_lag(self, queries: usize) -> Self {
        self.state.borrow_mut().power_on_lag = queries;
        self
    }

    pub fn register(&self, set: [u8; 2]) -> u8 {
        self.state
            .borrow()
            .registers
            .get(&set)
            .copied()
            .unwrap_or(0)
    }

    /// While offline every exchange times out without a response.
    pub fn set_offline(&self, offline: bool) {
        self.state.borrow_mut().offline = offline;
    }

    /// Every code sent so far, oldest first.
    pub fn exchanges(&self) -> Vec<Code> {
        self.state.borrow().exchanges.clone()
    }

    pub fn clear_exchanges(&self) {
        self.state.borrow_mut().exchanges.clear();
    }
}

impl Port for Simulator {
    type Link = SimulatedLink;

    fn open(&self) -> Result<SimulatedLink, Error> {
        Ok(SimulatedLink {
            state: self.state.clone(),
        })
    }
}

pub struct SimulatedLink {
    state: Rc<RefCell<State>>,
}

impl Link for SimulatedLink {
    fn exchange(&mut self, code: Code) -> Result<Vec<u8>, Error> {
        let mut state = self.state.borrow_mut();
        state.exchanges.push(code);
        debug!(%code, "send (simulated)");
        if state.offline {
            return Ok(Vec::new());
        }

        let set = code.set();
        let data = if code.is_status() {
            let stored = state.registers.get(&set).copied().unwrap_or(0);
            if set == POWER && state.pending_power_on > 0 {
                state.pending_power_on -= 1;
                0
            } else {
                stored
            }
        } else {
            if set == POWER && code.data() == 0x01 && state.registers.get(&set) != Some(&0x01) {
                state.pending_power_on = state.power_on_lag;
            }
            state.registers.insert(set, code.data());
            code.data()
        };

        let frame = format!(
            "{} {:02x} OK{:02x}x",
            set[1] as char,
            code.sub(),
            data
        );
        Ok(frame.into_bytes())
    }
}
