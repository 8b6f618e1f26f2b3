use std::path::PathBuf;
use std::time::Duration;

use tracing::debug;

use crate::codec::{self, Reply, Toggles};
use crate::codes::CodeTable;
use crate::debounce::DebounceGate;
use crate::transport::{Link, Port};
use crate::Error;

/// Sends named commands to one set.
///
/// Every command opens the port and closes it again when done, also on
/// failure, so other tools can use the device in between.
#[derive(Debug)]
pub struct Tv<P> {
    table: CodeTable,
    toggles: Toggles,
    debounce: DebounceGate,
    port: P,
}

impl<P: Port> Tv<P> {
    pub fn new(model: &str, port: P) -> Result<Self, Error> {
        Ok(Self::with_table(CodeTable::for_model(model)?, port))
    }

    pub fn with_table(table: CodeTable, port: P) -> Self {
        Self {
            table,
            toggles: Toggles::default(),
            debounce: DebounceGate::default(),
            port,
        }
    }

    pub fn table(&self) -> &CodeTable {
        &self.table
    }

    pub fn port(&self) -> &P {
        &self.port
    }

    /// Registers `toggle<name>`, switching between two table commands.
    pub fn add_toggle(&mut self, name: &str, state0: &str, state1: &str) {
        self.toggles.add(name, state0, state1);
    }

    /// Keeps other senders of `command` out for `settle` after it was sent.
    pub fn debounce(&mut self, command: &str, settle: Duration) {
        self.debounce.register(command, settle);
    }

    pub fn set_lock_dir(&mut self, dir: impl Into<PathBuf>) {
        self.debounce.set_dir(dir);
    }

    fn query<L: Link>(
        &self,
        link: &mut L,
        command: &str,
        data: Option<i64>,
    ) -> Result<Reply, Error> {
        let code = codec::encode(&self.table, &self.toggles, command, data, link)?;
        let frame = link.exchange(code)?;
        codec::decode(&frame, codec::is_status(command)).ok_or(Error::NoResponse)
    }

    /// Sends `command`, with `data` replacing the data byte if given.
    ///
    /// Status and level commands reply with their value, `inputstatus`
    /// with the input name when the model knows it.
    pub fn send(&mut self, command: &str, data: Option<i64>) -> Result<Reply, Error> {
        debug!(command, ?data, "command");

        let reply = match self.debounce.try_acquire(command)? {
            Some(guard) => {
                let mut link = self.port.open()?;
                let reply = self.query(&mut link, command, data);
                guard.settle();
                reply
            }
            None => {
                let mut link = self.port.open_ensured()?;
                self.query(&mut link, command, data)
            }
        }?;

        let reply = match reply {
            Reply::Value(value) if command == "inputstatus" => self
                .table
                .input_name(value)
                .map(Reply::Input)
                .unwrap_or(Reply::Value(value)),
            reply => reply,
        };
        debug!(command, ?reply, "command status");
        Ok(reply)
    }

    /// Every command with its code. Level queries are also listed as
    /// their up/down forms, whose data byte depends on the current level.
    pub fn commands(&self) -> Vec<(String, String)> {
        let mut commands = Vec::new();
        for (name, code) in self.table.iter() {
            commands.push((name.to_owned(), code.to_string()));
            if let Some(base) = name.strip_suffix("level") {
                let pending = format!("{} ??", &code.to_string()[..5]);
                commands.push((format!("{}up", base), pending.clone()));
                commands.push((format!("{}down", base), pending));
            }
        }
        for (name, (state0, state1)) in self.toggles.iter() {
            commands.push((name.to_owned(), format!("{} / {}", state0, state1)));
        }
        commands
    }
}
